//! Amazon Inspector Classic

pub mod assessment_target;
pub mod resource_group;

use crate::registry::{self, ResourceRegistration};

pub struct ServicePackage;

impl registry::ServicePackage for ServicePackage {
    fn service_package_name(&self) -> &'static str {
        "inspector"
    }

    fn resources(&self) -> Vec<ResourceRegistration> {
        vec![
            assessment_target::registration(),
            resource_group::registration(),
        ]
    }
}
