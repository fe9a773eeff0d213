//! Provider configuration: schema, environment fallbacks and client setup

use crate::conns::{AwsClient, ClientSettings};
use crate::names;
use crate::tags::{DefaultConfig, IgnoreConfig, KeyValueTags};
use crate::tfresource;
use aws_config::retry::RetryConfig;
use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_credential_types::Credentials;
use std::collections::HashMap;
use tfplug::schema::ProviderSchema;
use tfplug::validator::NumberRangeValidator;
use tfplug::{AttributeBuilder, AttributeType, BlockBuilder, Config, SchemaBuilder};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error(
        "region is required (set it in the provider configuration or the AWS_REGION environment variable)"
    )]
    MissingRegion,

    #[error("{0} is set but {1} is not; static credentials need both")]
    PartialCredentials(&'static str, &'static str),

    #[error("invalid max_retries {0:?}: expected a non-negative integer")]
    InvalidMaxRetries(String),

    #[error("unsupported endpoints key {key:?}; expected one of: {}", names::ENDPOINT_KEYS.join(", "))]
    UnknownEndpoint { key: String },

    #[error("endpoint for {key} must be an http or https URL, got {url:?}")]
    InvalidEndpoint { key: String, url: String },

    #[error("retrieving AWS account details: {0}")]
    AccountId(#[source] tfresource::Error),
}

pub fn provider_schema() -> ProviderSchema {
    SchemaBuilder::new()
        .description("Manages Athena, DataZone and Inspector resources in AWS")
        .attribute(
            AttributeBuilder::string("region")
                .optional()
                .description("AWS region. Falls back to AWS_REGION / AWS_DEFAULT_REGION."),
        )
        .attribute(
            AttributeBuilder::string("profile")
                .optional()
                .description("Shared config profile. Falls back to AWS_PROFILE."),
        )
        .attribute(
            AttributeBuilder::string("access_key")
                .optional()
                .description("Static access key. Falls back to AWS_ACCESS_KEY_ID."),
        )
        .attribute(
            AttributeBuilder::string("secret_key")
                .optional()
                .sensitive()
                .description("Static secret key. Falls back to AWS_SECRET_ACCESS_KEY."),
        )
        .attribute(
            AttributeBuilder::string("token")
                .optional()
                .sensitive()
                .description("Session token. Falls back to AWS_SESSION_TOKEN."),
        )
        .attribute(
            AttributeBuilder::number("max_retries")
                .optional()
                .description("Maximum attempts per API call. Falls back to AWS_MAX_ATTEMPTS.")
                .validator(NumberRangeValidator::at_least(0.0)),
        )
        .attribute(
            AttributeBuilder::bool("skip_requesting_account_id")
                .optional()
                .description("Skip the STS call that resolves the account ID"),
        )
        .attribute(
            AttributeBuilder::map("endpoints", AttributeType::String)
                .optional()
                .description("Custom endpoint URLs keyed by service (athena, datazone, inspector, inspector2, sts)"),
        )
        .block(
            BlockBuilder::single("default_tags")
                .description("Tags applied to every resource that supports tagging")
                .attribute(AttributeBuilder::map("tags", AttributeType::String).optional()),
        )
        .block(
            BlockBuilder::single("ignore_tags")
                .description("Tags the provider never manages")
                .attribute(AttributeBuilder::set("keys", AttributeType::String).optional())
                .attribute(AttributeBuilder::set("key_prefixes", AttributeType::String).optional()),
        )
        .build()
}

/// Provider settings after applying environment fallbacks.
#[derive(Debug, Clone, Default)]
pub struct ProviderConfig {
    pub region: Option<String>,
    pub profile: Option<String>,
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
    pub token: Option<String>,
    pub max_retries: Option<u32>,
    pub skip_requesting_account_id: bool,
    pub endpoints: HashMap<String, String>,
    pub default_tags: KeyValueTags,
    pub ignore_tags: IgnoreConfig,
}

fn string_or_env(config: &Config, key: &str, vars: &[&str]) -> Option<String> {
    config
        .get_string(key)
        .filter(|s| !s.is_empty())
        .or_else(|| {
            vars.iter()
                .find_map(|var| std::env::var(var).ok().filter(|s| !s.is_empty()))
        })
}

impl ProviderConfig {
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let access_key = string_or_env(config, "access_key", &["AWS_ACCESS_KEY_ID"]);
        let secret_key = string_or_env(config, "secret_key", &["AWS_SECRET_ACCESS_KEY"]);
        match (&access_key, &secret_key) {
            (Some(_), None) => {
                return Err(ConfigError::PartialCredentials("access_key", "secret_key"))
            }
            (None, Some(_)) => {
                return Err(ConfigError::PartialCredentials("secret_key", "access_key"))
            }
            _ => {}
        }

        let max_retries = match config.get_number("max_retries") {
            Some(n) if n >= 0.0 && n.fract() == 0.0 => Some(n as u32),
            Some(n) => return Err(ConfigError::InvalidMaxRetries(n.to_string())),
            None => match std::env::var("AWS_MAX_ATTEMPTS") {
                Ok(raw) => Some(
                    raw.trim()
                        .parse::<u32>()
                        .map_err(|_| ConfigError::InvalidMaxRetries(raw.clone()))?,
                ),
                Err(_) => None,
            },
        };

        let mut endpoints = HashMap::new();
        if let Some(map) = config.get_map("endpoints") {
            for (key, value) in map {
                if !names::ENDPOINT_KEYS.contains(&key.as_str()) {
                    return Err(ConfigError::UnknownEndpoint { key: key.clone() });
                }
                let Some(url) = value.as_string() else {
                    continue;
                };
                if !(url.starts_with("http://") || url.starts_with("https://")) {
                    return Err(ConfigError::InvalidEndpoint {
                        key: key.clone(),
                        url: url.clone(),
                    });
                }
                endpoints.insert(key.clone(), url.clone());
            }
        }

        let default_tags = config
            .get_block("default_tags")
            .map(|block| KeyValueTags::from_dynamic(block.get("tags")))
            .unwrap_or_default();

        let ignore_tags = config
            .get_block("ignore_tags")
            .map(|block| IgnoreConfig {
                keys: crate::flex::expand_string_list(block.get("keys")),
                key_prefixes: crate::flex::expand_string_list(block.get("key_prefixes")),
            })
            .unwrap_or_default();

        Ok(Self {
            region: string_or_env(config, "region", &["AWS_REGION", "AWS_DEFAULT_REGION"]),
            profile: string_or_env(config, "profile", &["AWS_PROFILE"]),
            access_key,
            secret_key,
            token: string_or_env(config, "token", &["AWS_SESSION_TOKEN"]),
            max_retries,
            skip_requesting_account_id: config
                .get_bool("skip_requesting_account_id")
                .unwrap_or(false),
            endpoints,
            default_tags,
            ignore_tags,
        })
    }

    pub async fn load_sdk_config(&self) -> SdkConfig {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = &self.region {
            loader = loader.region(Region::new(region.clone()));
        }
        if let Some(profile) = &self.profile {
            loader = loader.profile_name(profile);
        }
        if let (Some(access_key), Some(secret_key)) = (&self.access_key, &self.secret_key) {
            loader = loader.credentials_provider(Credentials::new(
                access_key,
                secret_key,
                self.token.clone(),
                None,
                "terraform-provider-aws",
            ));
        }
        if let Some(max_retries) = self.max_retries {
            loader = loader.retry_config(RetryConfig::standard().with_max_attempts(max_retries.max(1)));
        }
        loader.load().await
    }

    /// Loads the SDK configuration and resolves the account the
    /// credentials belong to.
    pub async fn client(self) -> Result<AwsClient, ConfigError> {
        let sdk_config = self.load_sdk_config().await;
        let region = sdk_config
            .region()
            .map(|r| r.to_string())
            .ok_or(ConfigError::MissingRegion)?;

        let account_id = if self.skip_requesting_account_id {
            String::new()
        } else {
            self.account_id(&sdk_config)
                .await
                .map_err(ConfigError::AccountId)?
        };

        tracing::info!(region = %region, account_id = %account_id, "configured AWS client");

        Ok(AwsClient::new(
            sdk_config,
            ClientSettings {
                account_id,
                partition: names::partition_for_region(&region).to_string(),
                region,
                endpoints: self.endpoints,
                default_tags: DefaultConfig {
                    tags: self.default_tags,
                },
                ignore_tags: self.ignore_tags,
            },
        ))
    }

    async fn account_id(&self, sdk_config: &SdkConfig) -> tfresource::Result<String> {
        let mut builder = aws_sdk_sts::config::Builder::from(sdk_config);
        if let Some(url) = self.endpoints.get(names::STS) {
            builder = builder.endpoint_url(url);
        }
        let sts = aws_sdk_sts::Client::from_conf(builder.build());

        let output = sts.get_caller_identity().send().await?;
        output
            .account()
            .map(str::to_string)
            .ok_or_else(|| tfresource::Error::Other("GetCallerIdentity returned no account".into()))
    }
}
