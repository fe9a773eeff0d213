//! Terraform provider for Athena, DataZone and Inspector

pub mod config;
pub mod conns;
pub mod create;
pub mod errs;
pub mod flex;
pub mod names;
pub mod registry;
pub mod services;
pub mod tags;
pub mod tfresource;
pub mod timeouts;

#[cfg(test)]
pub(crate) mod test_helpers;

use async_trait::async_trait;
use config::ProviderConfig;
use conns::AwsClient;
use std::collections::HashMap;
use std::sync::OnceLock;
use tfplug::request::{ConfigureRequest, ConfigureResponse};
use tfplug::schema::{DataSourceSchema, ProviderSchema, ResourceSchema};
use tfplug::{DataSourceV2, Diagnostics, ProviderV2, ResourceV2, TfplugError};

pub struct AwsProvider {
    client: Option<AwsClient>,
}

impl Default for AwsProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl AwsProvider {
    pub fn new() -> Self {
        Self { client: None }
    }

    fn client(&self) -> tfplug::Result<AwsClient> {
        self.client
            .clone()
            .ok_or(TfplugError::ProviderNotConfigured)
    }
}

fn registry() -> tfplug::Result<&'static registry::Registry> {
    registry::registry().map_err(|err| TfplugError::Custom(err.to_string()))
}

#[async_trait]
impl ProviderV2 for AwsProvider {
    async fn provider_schema(&self) -> ProviderSchema {
        config::provider_schema()
    }

    async fn configure(&mut self, request: ConfigureRequest) -> ConfigureResponse {
        let mut diagnostics = Diagnostics::new();

        let client = match ProviderConfig::from_config(&request.config) {
            Ok(config) => config.client().await,
            Err(err) => Err(err),
        };

        match client {
            Ok(client) => self.client = Some(client),
            Err(err) => {
                tracing::error!(error = %err, "configuring AWS provider");
                diagnostics.add_error("configuring AWS provider", Some(err.to_string()));
            }
        }

        ConfigureResponse { diagnostics }
    }

    async fn create_resource(&self, name: &str) -> tfplug::Result<Box<dyn ResourceV2>> {
        let client = self.client()?;
        registry()?
            .new_resource(name, client)
            .ok_or_else(|| TfplugError::ResourceNotFound(name.to_string()))
    }

    async fn create_data_source(&self, name: &str) -> tfplug::Result<Box<dyn DataSourceV2>> {
        let client = self.client()?;
        registry()?
            .new_data_source(name, client)
            .ok_or_else(|| TfplugError::DataSourceNotFound(name.to_string()))
    }

    async fn resource_schemas(&self) -> HashMap<String, ResourceSchema> {
        static SCHEMAS: OnceLock<HashMap<String, ResourceSchema>> = OnceLock::new();

        SCHEMAS
            .get_or_init(|| match registry::registry() {
                Ok(registry) => registry.resource_schemas(),
                Err(err) => {
                    tracing::error!(error = %err, "building resource schemas");
                    HashMap::new()
                }
            })
            .clone()
    }

    async fn data_source_schemas(&self) -> HashMap<String, DataSourceSchema> {
        static SCHEMAS: OnceLock<HashMap<String, DataSourceSchema>> = OnceLock::new();

        SCHEMAS
            .get_or_init(|| match registry::registry() {
                Ok(registry) => registry.data_source_schemas(),
                Err(err) => {
                    tracing::error!(error = %err, "building data source schemas");
                    HashMap::new()
                }
            })
            .clone()
    }
}
