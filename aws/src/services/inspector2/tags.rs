//! Inspector resource tags

use crate::tags::KeyValueTags;
use crate::tfresource::Result;
use aws_sdk_inspector2::Client;

pub async fn update_tags(
    conn: &Client,
    arn: &str,
    removed: &KeyValueTags,
    updated: &KeyValueTags,
) -> Result<()> {
    if !removed.is_empty() {
        tracing::debug!(arn, keys = ?removed.keys(), "untagging Inspector resource");
        conn.untag_resource()
            .resource_arn(arn)
            .set_tag_keys(Some(removed.keys()))
            .send()
            .await?;
    }

    if !updated.is_empty() {
        tracing::debug!(arn, keys = ?updated.keys(), "tagging Inspector resource");
        conn.tag_resource()
            .resource_arn(arn)
            .set_tags(Some(updated.map()))
            .send()
            .await?;
    }

    Ok(())
}
