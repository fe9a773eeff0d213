//! Service names, endpoint keys and ARNs

use std::fmt;

pub const ATHENA: &str = "athena";
pub const DATAZONE: &str = "datazone";
pub const INSPECTOR: &str = "inspector";
pub const INSPECTOR2: &str = "inspector2";
pub const STS: &str = "sts";

/// Keys accepted in the provider `endpoints` map.
pub const ENDPOINT_KEYS: &[&str] = &[ATHENA, DATAZONE, INSPECTOR, INSPECTOR2, STS];

// Human readable names used in diagnostics.
pub const ATHENA_SERVICE_NAME: &str = "Athena";
pub const DATAZONE_SERVICE_NAME: &str = "DataZone";
pub const INSPECTOR_SERVICE_NAME: &str = "Inspector Classic";
pub const INSPECTOR2_SERVICE_NAME: &str = "Inspector";

pub fn partition_for_region(region: &str) -> &'static str {
    if region.starts_with("cn-") {
        "aws-cn"
    } else if region.starts_with("us-gov-") {
        "aws-us-gov"
    } else {
        "aws"
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Arn {
    pub partition: String,
    pub service: String,
    pub region: String,
    pub account_id: String,
    pub resource: String,
}

impl Arn {
    /// Parses `arn:partition:service:region:account:resource`. The resource
    /// part may itself contain colons.
    pub fn parse(s: &str) -> Option<Self> {
        let mut parts = s.splitn(6, ':');
        if parts.next()? != "arn" {
            return None;
        }
        let partition = parts.next()?;
        let service = parts.next()?;
        let region = parts.next()?;
        let account_id = parts.next()?;
        let resource = parts.next()?;
        if partition.is_empty() || service.is_empty() || resource.is_empty() {
            return None;
        }
        Some(Self {
            partition: partition.to_string(),
            service: service.to_string(),
            region: region.to_string(),
            account_id: account_id.to_string(),
            resource: resource.to_string(),
        })
    }
}

impl fmt::Display for Arn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "arn:{}:{}:{}:{}:{}",
            self.partition, self.service, self.region, self.account_id, self.resource
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partitions() {
        assert_eq!(partition_for_region("us-west-2"), "aws");
        assert_eq!(partition_for_region("cn-north-1"), "aws-cn");
        assert_eq!(partition_for_region("us-gov-west-1"), "aws-us-gov");
    }

    #[test]
    fn parses_and_formats_arns() {
        let raw = "arn:aws:inspector:us-west-2:123456789012:target/0-abcdefgh";
        let arn = Arn::parse(raw).unwrap();
        assert_eq!(arn.service, "inspector");
        assert_eq!(arn.account_id, "123456789012");
        assert_eq!(arn.resource, "target/0-abcdefgh");
        assert_eq!(arn.to_string(), raw);

        let with_colons = Arn::parse("arn:aws:athena:us-west-2:123456789012:workgroup/a:b").unwrap();
        assert_eq!(with_colons.resource, "workgroup/a:b");
    }

    #[test]
    fn rejects_non_arns() {
        for s in ["", "primary", "arn:aws:inspector", "urn:aws:s3:::b", "arn::s3:::bucket"] {
            assert!(Arn::parse(s).is_none(), "{s} should not parse");
        }
    }
}
