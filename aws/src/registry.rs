//! Static registration table of service packages

use crate::conns::AwsClient;
use crate::services;
use std::collections::HashMap;
use std::sync::OnceLock;
use tfplug::schema::{DataSourceSchema, ResourceSchema};
use tfplug::{DataSourceV2, ResourceV2};

pub type ResourceFactory = fn(AwsClient) -> Box<dyn ResourceV2>;
pub type DataSourceFactory = fn(AwsClient) -> Box<dyn DataSourceV2>;

#[derive(Clone, Copy)]
pub struct ResourceRegistration {
    pub type_name: &'static str,
    /// Human readable name, e.g. "WorkGroup"
    pub name: &'static str,
    pub schema: fn() -> ResourceSchema,
    pub factory: ResourceFactory,
}

#[derive(Clone, Copy)]
pub struct DataSourceRegistration {
    pub type_name: &'static str,
    pub name: &'static str,
    pub schema: fn() -> DataSourceSchema,
    pub factory: DataSourceFactory,
}

/// One AWS service's resources and data sources.
pub trait ServicePackage: Send + Sync {
    fn service_package_name(&self) -> &'static str;

    fn resources(&self) -> Vec<ResourceRegistration>;

    fn data_sources(&self) -> Vec<DataSourceRegistration> {
        Vec::new()
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum RegistryError {
    #[error("type {type_name} is registered by both {first} and {second}")]
    Duplicate {
        type_name: &'static str,
        first: &'static str,
        second: &'static str,
    },
}

pub struct Registry {
    resources: HashMap<&'static str, (&'static str, ResourceRegistration)>,
    data_sources: HashMap<&'static str, (&'static str, DataSourceRegistration)>,
}

impl Registry {
    pub fn from_packages(packages: &[Box<dyn ServicePackage>]) -> Result<Self, RegistryError> {
        let mut resources = HashMap::new();
        let mut data_sources = HashMap::new();

        for package in packages {
            let package_name = package.service_package_name();
            for registration in package.resources() {
                if let Some((first, _)) =
                    resources.insert(registration.type_name, (package_name, registration))
                {
                    return Err(RegistryError::Duplicate {
                        type_name: registration.type_name,
                        first,
                        second: package_name,
                    });
                }
            }
            for registration in package.data_sources() {
                if let Some((first, _)) =
                    data_sources.insert(registration.type_name, (package_name, registration))
                {
                    return Err(RegistryError::Duplicate {
                        type_name: registration.type_name,
                        first,
                        second: package_name,
                    });
                }
            }
        }

        tracing::debug!(
            resources = resources.len(),
            data_sources = data_sources.len(),
            "service packages registered"
        );

        Ok(Self {
            resources,
            data_sources,
        })
    }

    pub fn resource_schemas(&self) -> HashMap<String, ResourceSchema> {
        self.resources
            .iter()
            .map(|(name, (_, r))| (name.to_string(), (r.schema)()))
            .collect()
    }

    pub fn data_source_schemas(&self) -> HashMap<String, DataSourceSchema> {
        self.data_sources
            .iter()
            .map(|(name, (_, d))| (name.to_string(), (d.schema)()))
            .collect()
    }

    pub fn new_resource(&self, type_name: &str, client: AwsClient) -> Option<Box<dyn ResourceV2>> {
        self.resources
            .get(type_name)
            .map(|(_, r)| (r.factory)(client))
    }

    pub fn new_data_source(
        &self,
        type_name: &str,
        client: AwsClient,
    ) -> Option<Box<dyn DataSourceV2>> {
        self.data_sources
            .get(type_name)
            .map(|(_, d)| (d.factory)(client))
    }

    /// Service package that registered `type_name`.
    pub fn service_package(&self, type_name: &str) -> Option<&'static str> {
        self.resources
            .get(type_name)
            .map(|(p, _)| *p)
            .or_else(|| self.data_sources.get(type_name).map(|(p, _)| *p))
    }
}

/// The registry of every built-in service package.
pub fn registry() -> Result<&'static Registry, RegistryError> {
    static REGISTRY: OnceLock<Result<Registry, RegistryError>> = OnceLock::new();
    REGISTRY
        .get_or_init(|| Registry::from_packages(&services::service_packages()))
        .as_ref()
        .map_err(Clone::clone)
}
