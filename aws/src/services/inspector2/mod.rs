//! Amazon Inspector

mod criteria;
pub mod filter;
mod tags;

use crate::registry::{self, ResourceRegistration};

pub struct ServicePackage;

impl registry::ServicePackage for ServicePackage {
    fn service_package_name(&self) -> &'static str {
        "inspector2"
    }

    fn resources(&self) -> Vec<ResourceRegistration> {
        vec![filter::registration()]
    }
}
