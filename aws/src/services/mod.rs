//! AWS service packages

pub mod athena;
pub mod datazone;
pub mod inspector;
pub mod inspector2;

use crate::registry::ServicePackage;

/// Every service package compiled into the provider.
pub fn service_packages() -> Vec<Box<dyn ServicePackage>> {
    vec![
        Box::new(athena::ServicePackage),
        Box::new(datazone::ServicePackage),
        Box::new(inspector::ServicePackage),
        Box::new(inspector2::ServicePackage),
    ]
}
