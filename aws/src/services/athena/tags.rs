//! Athena resource tags

use crate::tags::KeyValueTags;
use crate::tfresource::Result;
use aws_sdk_athena::types::Tag;
use aws_sdk_athena::Client;

pub async fn list_tags(conn: &Client, arn: &str) -> Result<KeyValueTags> {
    let mut tags = Vec::new();
    let mut next_token = None;

    loop {
        let output = conn
            .list_tags_for_resource()
            .resource_arn(arn)
            .set_next_token(next_token)
            .send()
            .await?;

        tags.extend(output.tags().iter().filter_map(|tag| {
            tag.key()
                .map(|key| (key.to_string(), tag.value().unwrap_or_default().to_string()))
        }));

        next_token = output.next_token().map(str::to_string);
        if next_token.is_none() {
            break;
        }
    }

    Ok(KeyValueTags::new(tags))
}

pub fn tags_in(tags: &KeyValueTags) -> Vec<Tag> {
    tags.iter()
        .map(|(key, value)| Tag::builder().key(key).value(value).build())
        .collect()
}

pub async fn update_tags(
    conn: &Client,
    arn: &str,
    removed: &KeyValueTags,
    updated: &KeyValueTags,
) -> Result<()> {
    if !removed.is_empty() {
        tracing::debug!(arn, keys = ?removed.keys(), "untagging Athena resource");
        conn.untag_resource()
            .resource_arn(arn)
            .set_tag_keys(Some(removed.keys()))
            .send()
            .await?;
    }

    if !updated.is_empty() {
        tracing::debug!(arn, keys = ?updated.keys(), "tagging Athena resource");
        conn.tag_resource()
            .resource_arn(arn)
            .set_tags(Some(tags_in(updated)))
            .send()
            .await?;
    }

    Ok(())
}
