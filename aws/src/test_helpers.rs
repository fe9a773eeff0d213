//! Mock AWS endpoints for unit tests

use crate::conns::{AwsClient, ClientSettings};
use crate::names;
use crate::tags::{DefaultConfig, IgnoreConfig, KeyValueTags};
use aws_config::retry::RetryConfig;
use aws_config::stalled_stream_protection::StalledStreamProtectionConfig;
use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_credential_types::provider::SharedCredentialsProvider;
use aws_credential_types::Credentials;
use mockito::{Matcher, Mock, Server};
use std::collections::HashMap;
use tfplug::{Context, Dynamic, State};

pub const ACCOUNT_ID: &str = "123456789012";
pub const REGION: &str = "us-west-2";

pub fn sdk_config(endpoint: &str) -> SdkConfig {
    SdkConfig::builder()
        .region(Region::new(REGION))
        .credentials_provider(SharedCredentialsProvider::new(Credentials::new(
            "AKID", "SECRET", None, None, "test",
        )))
        .behavior_version(BehaviorVersion::latest())
        .retry_config(RetryConfig::disabled())
        .stalled_stream_protection(StalledStreamProtectionConfig::disabled())
        .endpoint_url(endpoint)
        .build()
}

pub fn client(endpoint: &str) -> AwsClient {
    client_with_tags(endpoint, KeyValueTags::default(), IgnoreConfig::default())
}

pub fn client_with_tags(
    endpoint: &str,
    default_tags: KeyValueTags,
    ignore_tags: IgnoreConfig,
) -> AwsClient {
    AwsClient::new(
        sdk_config(endpoint),
        ClientSettings {
            account_id: ACCOUNT_ID.to_string(),
            region: REGION.to_string(),
            partition: names::partition_for_region(REGION).to_string(),
            endpoints: HashMap::new(),
            default_tags: DefaultConfig { tags: default_tags },
            ignore_tags,
        },
    )
}

/// An AWS JSON 1.1 call (Athena, Inspector Classic): `POST /` selected by
/// the `X-Amz-Target` header.
pub fn json_rpc(server: &mut Server, target: &str) -> Mock {
    server
        .mock("POST", "/")
        .match_header("x-amz-target", target)
        .with_header("content-type", "application/x-amz-json-1.1")
}

/// A REST JSON call (DataZone, Inspector2). Query parameters are ignored.
pub fn rest(server: &mut Server, method: &str, path: &str) -> Mock {
    server
        .mock(method, path)
        .match_query(Matcher::Any)
        .with_header("content-type", "application/json")
}

/// Body of an AWS JSON 1.1 error response.
pub fn json_error(code: &str, message: &str) -> String {
    serde_json::json!({ "__type": code, "Message": message }).to_string()
}

/// A REST JSON error response carrying its code in `x-amzn-errortype`.
pub fn rest_error(mock: Mock, status: usize, code: &str, message: &str) -> Mock {
    mock.with_status(status)
        .with_header("x-amzn-errortype", code)
        .with_body(serde_json::json!({ "message": message }).to_string())
}

pub fn state(values: &[(&str, Dynamic)]) -> State {
    let mut state = State::new();
    for (key, value) in values {
        state.set(key, value.clone());
    }
    state
}

pub fn ctx() -> Context {
    Context::new()
}
