//! Amazon DataZone

pub mod domain;
pub mod environment;
pub mod environment_blueprint;
pub mod project;
mod tags;

use crate::registry::{self, DataSourceRegistration, ResourceRegistration};

pub struct ServicePackage;

impl registry::ServicePackage for ServicePackage {
    fn service_package_name(&self) -> &'static str {
        "datazone"
    }

    fn resources(&self) -> Vec<ResourceRegistration> {
        vec![
            domain::registration(),
            project::registration(),
            environment::registration(),
        ]
    }

    fn data_sources(&self) -> Vec<DataSourceRegistration> {
        vec![environment_blueprint::registration()]
    }
}
