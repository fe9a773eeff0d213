//! Per-service AWS SDK clients built from one shared `SdkConfig`

use crate::names;
use crate::tags::{DefaultConfig, IgnoreConfig};
use aws_config::SdkConfig;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

/// Account-level settings resolved while configuring the provider.
#[derive(Debug, Clone, Default)]
pub struct ClientSettings {
    pub account_id: String,
    pub region: String,
    pub partition: String,
    pub endpoints: HashMap<String, String>,
    pub default_tags: DefaultConfig,
    pub ignore_tags: IgnoreConfig,
}

/// Cheap to clone; every resource instance gets its own copy.
#[derive(Clone)]
pub struct AwsClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    sdk_config: SdkConfig,
    settings: ClientSettings,
    athena: OnceLock<aws_sdk_athena::Client>,
    datazone: OnceLock<aws_sdk_datazone::Client>,
    inspector: OnceLock<aws_sdk_inspector::Client>,
    inspector2: OnceLock<aws_sdk_inspector2::Client>,
}

impl fmt::Debug for AwsClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AwsClient")
            .field("account_id", &self.inner.settings.account_id)
            .field("region", &self.inner.settings.region)
            .field("partition", &self.inner.settings.partition)
            .finish_non_exhaustive()
    }
}

macro_rules! service_client {
    ($method:ident, $field:ident, $krate:ident, $endpoint:expr) => {
        pub fn $method(&self) -> &$krate::Client {
            self.inner.$field.get_or_init(|| {
                let mut builder = $krate::config::Builder::from(&self.inner.sdk_config);
                if let Some(url) = self.endpoint($endpoint) {
                    builder = builder.endpoint_url(url);
                }
                $krate::Client::from_conf(builder.build())
            })
        }
    };
}

impl AwsClient {
    pub fn new(sdk_config: SdkConfig, settings: ClientSettings) -> Self {
        Self {
            inner: Arc::new(ClientInner {
                sdk_config,
                settings,
                athena: OnceLock::new(),
                datazone: OnceLock::new(),
                inspector: OnceLock::new(),
                inspector2: OnceLock::new(),
            }),
        }
    }

    service_client!(athena, athena, aws_sdk_athena, names::ATHENA);
    service_client!(datazone, datazone, aws_sdk_datazone, names::DATAZONE);
    service_client!(inspector, inspector, aws_sdk_inspector, names::INSPECTOR);
    service_client!(inspector2, inspector2, aws_sdk_inspector2, names::INSPECTOR2);

    pub fn account_id(&self) -> &str {
        &self.inner.settings.account_id
    }

    pub fn region(&self) -> &str {
        &self.inner.settings.region
    }

    pub fn partition(&self) -> &str {
        &self.inner.settings.partition
    }

    pub fn default_tags_config(&self) -> &DefaultConfig {
        &self.inner.settings.default_tags
    }

    pub fn ignore_tags_config(&self) -> &IgnoreConfig {
        &self.inner.settings.ignore_tags
    }

    fn endpoint(&self, service: &str) -> Option<&str> {
        self.inner
            .settings
            .endpoints
            .get(service)
            .map(String::as_str)
            .filter(|url| !url.is_empty())
    }

    /// ARN of a resource in this client's partition, region and account.
    pub fn regional_arn(&self, service: &str, resource: &str) -> String {
        names::Arn {
            partition: self.partition().to_string(),
            service: service.to_string(),
            region: self.region().to_string(),
            account_id: self.account_id().to_string(),
            resource: resource.to_string(),
        }
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use crate::test_helpers;

    #[test]
    fn regional_arn_uses_client_settings() {
        let client = test_helpers::client("http://127.0.0.1:1");
        assert_eq!(
            client.regional_arn("athena", "workgroup/primary"),
            "arn:aws:athena:us-west-2:123456789012:workgroup/primary"
        );
    }

    #[test]
    fn clients_are_built_once() {
        let client = test_helpers::client("http://127.0.0.1:1");
        let first: *const _ = client.athena();
        let second: *const _ = client.athena();
        assert_eq!(first, second);

        let clone = client.clone();
        let third: *const _ = clone.athena();
        assert_eq!(first, third);
    }
}
