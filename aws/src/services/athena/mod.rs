//! Amazon Athena

mod tags;
pub mod workgroup;

use crate::registry::{self, ResourceRegistration};

pub struct ServicePackage;

impl registry::ServicePackage for ServicePackage {
    fn service_package_name(&self) -> &'static str {
        "athena"
    }

    fn resources(&self) -> Vec<ResourceRegistration> {
        vec![workgroup::registration()]
    }
}
