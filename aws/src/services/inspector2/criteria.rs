//! `filter_criteria` blocks and their `FilterCriteria` counterpart

use crate::flex;
use crate::tfresource::{Error, Result};
use aws_sdk_inspector2::types::{
    DateFilter, FilterCriteria, MapComparison, MapFilter, NumberFilter, PackageFilter,
    PortRangeFilter, StringComparison, StringFilter,
};
use tfplug::validator::{NumberRangeValidator, OneOfValidator};
use tfplug::{AttributeBuilder, BlockBuilder, Config, Dynamic};

/// Most filters of one kind a criteria block accepts.
const MAX_FILTERS: i64 = 20;

/// One kind of filter inside `filter_criteria`.
trait Criterion: Sized {
    fn attributes(block: BlockBuilder) -> BlockBuilder;

    fn expand(block: &Config) -> Result<Self>;

    fn flatten(&self) -> Dynamic;
}

impl Criterion for StringFilter {
    fn attributes(block: BlockBuilder) -> BlockBuilder {
        block
            .attribute(
                AttributeBuilder::string("comparison")
                    .required()
                    .validator(OneOfValidator::new(StringComparison::values())),
            )
            .attribute(AttributeBuilder::string("value").required())
    }

    fn expand(block: &Config) -> Result<Self> {
        let comparison = block.get_string("comparison").unwrap_or_default();
        Ok(StringFilter::builder()
            .comparison(StringComparison::from(comparison.as_str()))
            .value(block.get_string("value").unwrap_or_default())
            .build()?)
    }

    fn flatten(&self) -> Dynamic {
        let mut values = Config::new();
        values.set("comparison", flex::enum_value(self.comparison()));
        values.set("value", flex::string_value(self.value()));
        values.into_dynamic()
    }
}

impl Criterion for MapFilter {
    fn attributes(block: BlockBuilder) -> BlockBuilder {
        block
            .attribute(
                AttributeBuilder::string("comparison")
                    .required()
                    .validator(OneOfValidator::new(MapComparison::values())),
            )
            .attribute(AttributeBuilder::string("key").required())
            .attribute(AttributeBuilder::string("value").required())
    }

    fn expand(block: &Config) -> Result<Self> {
        let comparison = block.get_string("comparison").unwrap_or_default();
        Ok(MapFilter::builder()
            .comparison(MapComparison::from(comparison.as_str()))
            .key(block.get_string("key").unwrap_or_default())
            .set_value(block.get_string("value"))
            .build()?)
    }

    fn flatten(&self) -> Dynamic {
        let mut values = Config::new();
        values.set("comparison", flex::enum_value(self.comparison()));
        values.set("key", flex::string_value(self.key()));
        values.set("value", flex::string_value(self.value()));
        values.into_dynamic()
    }
}

/// RFC 3339 bounds; either end may be open.
impl Criterion for DateFilter {
    fn attributes(block: BlockBuilder) -> BlockBuilder {
        block
            .attribute(AttributeBuilder::string("start_inclusive").optional())
            .attribute(AttributeBuilder::string("end_inclusive").optional())
    }

    fn expand(block: &Config) -> Result<Self> {
        let start = flex::string(block, "start_inclusive")
            .map(|s| flex::parse_timestamp(&s))
            .transpose()?;
        let end = flex::string(block, "end_inclusive")
            .map(|s| flex::parse_timestamp(&s))
            .transpose()?;
        Ok(DateFilter::builder()
            .set_start_inclusive(start)
            .set_end_inclusive(end)
            .build())
    }

    fn flatten(&self) -> Dynamic {
        let mut values = Config::new();
        values.set("start_inclusive", flex::timestamp_value(self.start_inclusive()));
        values.set("end_inclusive", flex::timestamp_value(self.end_inclusive()));
        values.into_dynamic()
    }
}

impl Criterion for NumberFilter {
    fn attributes(block: BlockBuilder) -> BlockBuilder {
        block
            .attribute(AttributeBuilder::number("lower_inclusive").required())
            .attribute(AttributeBuilder::number("upper_inclusive").required())
    }

    fn expand(block: &Config) -> Result<Self> {
        Ok(NumberFilter::builder()
            .set_lower_inclusive(block.get_number("lower_inclusive"))
            .set_upper_inclusive(block.get_number("upper_inclusive"))
            .build())
    }

    fn flatten(&self) -> Dynamic {
        let mut values = Config::new();
        values.set("lower_inclusive", flex::float_value(self.lower_inclusive()));
        values.set("upper_inclusive", flex::float_value(self.upper_inclusive()));
        values.into_dynamic()
    }
}

impl Criterion for PortRangeFilter {
    fn attributes(block: BlockBuilder) -> BlockBuilder {
        block
            .attribute(port("begin_inclusive"))
            .attribute(port("end_inclusive"))
    }

    fn expand(block: &Config) -> Result<Self> {
        Ok(PortRangeFilter::builder()
            .set_begin_inclusive(port_value(block, "begin_inclusive")?)
            .set_end_inclusive(port_value(block, "end_inclusive")?)
            .build())
    }

    fn flatten(&self) -> Dynamic {
        let mut values = Config::new();
        values.set(
            "begin_inclusive",
            flex::int_value(self.begin_inclusive().map(i64::from)),
        );
        values.set(
            "end_inclusive",
            flex::int_value(self.end_inclusive().map(i64::from)),
        );
        values.into_dynamic()
    }
}

fn port(name: &str) -> AttributeBuilder {
    AttributeBuilder::number(name)
        .required()
        .validator(NumberRangeValidator::between(0.0, f64::from(u16::MAX)))
}

fn port_value(block: &Config, key: &str) -> Result<Option<i32>> {
    block
        .get_i64(key)
        .map(|value| {
            u16::try_from(value)
                .map(i32::from)
                .map_err(|_| Error::Other(format!("{key} {value} is not a valid port")))
        })
        .transpose()
}

/// Each package attribute is matched by at most one filter.
impl Criterion for PackageFilter {
    fn attributes(block: BlockBuilder) -> BlockBuilder {
        block
            .block(single::<StringFilter>("architecture"))
            .block(single::<NumberFilter>("epoch"))
            .block(single::<StringFilter>("file_path"))
            .block(single::<StringFilter>("name"))
            .block(single::<StringFilter>("release"))
            .block(single::<StringFilter>("source_lambda_layer_arn"))
            .block(single::<StringFilter>("source_layer_hash"))
            .block(single::<StringFilter>("version"))
    }

    fn expand(block: &Config) -> Result<Self> {
        Ok(PackageFilter::builder()
            .set_architecture(expand_single(block, "architecture")?)
            .set_epoch(expand_single(block, "epoch")?)
            .set_file_path(expand_single(block, "file_path")?)
            .set_name(expand_single(block, "name")?)
            .set_release(expand_single(block, "release")?)
            .set_source_lambda_layer_arn(expand_single(block, "source_lambda_layer_arn")?)
            .set_source_layer_hash(expand_single(block, "source_layer_hash")?)
            .set_version(expand_single(block, "version")?)
            .build())
    }

    fn flatten(&self) -> Dynamic {
        let mut values = Config::new();
        values.set("architecture", flatten_single(self.architecture()));
        values.set("epoch", flatten_single(self.epoch()));
        values.set("file_path", flatten_single(self.file_path()));
        values.set("name", flatten_single(self.name()));
        values.set("release", flatten_single(self.release()));
        values.set(
            "source_lambda_layer_arn",
            flatten_single(self.source_lambda_layer_arn()),
        );
        values.set("source_layer_hash", flatten_single(self.source_layer_hash()));
        values.set("version", flatten_single(self.version()));
        values.into_dynamic()
    }
}

fn single<T: Criterion>(name: &str) -> BlockBuilder {
    T::attributes(BlockBuilder::list(name).max_items(1))
}

fn expand_single<T: Criterion>(block: &Config, name: &str) -> Result<Option<T>> {
    block.get_block(name).map(|b| T::expand(&b)).transpose()
}

fn flatten_single<T: Criterion>(filter: Option<&T>) -> Dynamic {
    Dynamic::List(filter.map(T::flatten).into_iter().collect())
}

macro_rules! filter_criteria {
    ($($field:ident: $filter:ty),* $(,)?) => {
        /// The `filter_criteria` block with one set of filters per finding
        /// field.
        pub fn criteria_block() -> BlockBuilder {
            BlockBuilder::list("filter_criteria")
                .description("Finding attributes the filter matches on")
                .min_items(1)
                .max_items(1)
                $(
                    .block(<$filter as Criterion>::attributes(
                        BlockBuilder::set(stringify!($field)).max_items(MAX_FILTERS),
                    ))
                )*
        }

        pub fn expand_filter_criteria(block: &Config) -> Result<FilterCriteria> {
            let mut builder = FilterCriteria::builder();
            $(
                for item in block.get_blocks(stringify!($field)) {
                    builder = builder.$field(<$filter as Criterion>::expand(&item)?);
                }
            )*
            Ok(builder.build())
        }

        pub fn flatten_filter_criteria(criteria: &FilterCriteria) -> Dynamic {
            let mut values = Config::new();
            $(
                values.set(
                    stringify!($field),
                    Dynamic::List(
                        criteria
                            .$field()
                            .iter()
                            .map(<$filter as Criterion>::flatten)
                            .collect(),
                    ),
                );
            )*
            values.into_dynamic()
        }
    };
}

filter_criteria! {
    aws_account_id: StringFilter,
    code_vulnerability_detector_name: StringFilter,
    code_vulnerability_detector_tags: StringFilter,
    code_vulnerability_file_path: StringFilter,
    component_id: StringFilter,
    component_type: StringFilter,
    ec2_instance_image_id: StringFilter,
    ec2_instance_subnet_id: StringFilter,
    ec2_instance_vpc_id: StringFilter,
    ecr_image_architecture: StringFilter,
    ecr_image_hash: StringFilter,
    ecr_image_pushed_at: DateFilter,
    ecr_image_registry: StringFilter,
    ecr_image_repository_name: StringFilter,
    ecr_image_tags: StringFilter,
    epss_score: NumberFilter,
    exploit_available: StringFilter,
    finding_arn: StringFilter,
    finding_status: StringFilter,
    finding_type: StringFilter,
    first_observed_at: DateFilter,
    fix_available: StringFilter,
    inspector_score: NumberFilter,
    lambda_function_execution_role_arn: StringFilter,
    lambda_function_last_modified_at: DateFilter,
    lambda_function_layers: StringFilter,
    lambda_function_name: StringFilter,
    lambda_function_runtime: StringFilter,
    last_observed_at: DateFilter,
    network_protocol: StringFilter,
    port_range: PortRangeFilter,
    related_vulnerabilities: StringFilter,
    resource_id: StringFilter,
    resource_tags: MapFilter,
    resource_type: StringFilter,
    severity: StringFilter,
    title: StringFilter,
    updated_at: DateFilter,
    vendor_severity: StringFilter,
    vulnerability_id: StringFilter,
    vulnerability_source: StringFilter,
    vulnerable_packages: PackageFilter,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn object(pairs: &[(&str, Dynamic)]) -> Dynamic {
        Dynamic::Map(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect::<HashMap<_, _>>(),
        )
    }

    fn criteria(pairs: &[(&str, Dynamic)]) -> Config {
        match object(pairs) {
            Dynamic::Map(values) => Config::from(values),
            _ => unreachable!(),
        }
    }

    #[test]
    fn expands_each_filter_kind() {
        let block = criteria(&[
            (
                "severity",
                Dynamic::List(vec![
                    object(&[("comparison", "EQUALS".into()), ("value", "CRITICAL".into())]),
                    object(&[("comparison", "EQUALS".into()), ("value", "HIGH".into())]),
                ]),
            ),
            (
                "first_observed_at",
                Dynamic::List(vec![object(&[
                    ("start_inclusive", "2024-01-01T00:00:00Z".into()),
                    ("end_inclusive", Dynamic::Null),
                ])]),
            ),
            (
                "port_range",
                Dynamic::List(vec![object(&[
                    ("begin_inclusive", Dynamic::Number(22.0)),
                    ("end_inclusive", Dynamic::Number(443.0)),
                ])]),
            ),
            (
                "resource_tags",
                Dynamic::List(vec![object(&[
                    ("comparison", "EQUALS".into()),
                    ("key", "Team".into()),
                    ("value", "data".into()),
                ])]),
            ),
            (
                "vulnerable_packages",
                Dynamic::List(vec![object(&[
                    (
                        "name",
                        Dynamic::List(vec![object(&[
                            ("comparison", "EQUALS".into()),
                            ("value", "openssl".into()),
                        ])]),
                    ),
                    (
                        "epoch",
                        Dynamic::List(vec![object(&[
                            ("lower_inclusive", Dynamic::Number(0.0)),
                            ("upper_inclusive", Dynamic::Number(1.0)),
                        ])]),
                    ),
                ])]),
            ),
        ]);

        let expanded = expand_filter_criteria(&block).unwrap();

        let severities: Vec<_> = expanded
            .severity()
            .iter()
            .map(|f| flex::owned_string(f.value()))
            .collect();
        assert_eq!(severities, vec!["CRITICAL", "HIGH"]);

        let observed = &expanded.first_observed_at()[0];
        assert!(observed.start_inclusive().is_some());
        assert!(observed.end_inclusive().is_none());

        let ports = &expanded.port_range()[0];
        assert_eq!(ports.begin_inclusive(), Some(22));
        assert_eq!(ports.end_inclusive(), Some(443));

        assert_eq!(flex::owned_string(expanded.resource_tags()[0].key()), "Team");

        let package = &expanded.vulnerable_packages()[0];
        assert_eq!(
            package.name().map(|f| flex::owned_string(f.value())).as_deref(),
            Some("openssl")
        );
        assert_eq!(package.epoch().and_then(|e| e.upper_inclusive()), Some(1.0));
        assert!(package.version().is_none());

        assert!(expanded.aws_account_id().is_empty());
    }

    #[test]
    fn port_ranges_outside_valid_ports_are_rejected() {
        let out_of_range = || {
            criteria(&[(
                "port_range",
                Dynamic::List(vec![object(&[
                    ("begin_inclusive", Dynamic::Number(22.0)),
                    ("end_inclusive", Dynamic::Number(70000.0)),
                ])]),
            )])
        };

        let schema = tfplug::SchemaBuilder::new().block(criteria_block()).build();
        let mut config = HashMap::new();
        config.insert(
            "filter_criteria".to_string(),
            Dynamic::List(vec![out_of_range().into_dynamic()]),
        );
        let mut diags = tfplug::Diagnostics::new();
        schema
            .block
            .validate(&config, &tfplug::AttributePath::root(), &mut diags);
        assert_eq!(diags.errors.len(), 1);
        assert!(diags.errors[0].summary.contains("at most 65535"));

        let err = expand_filter_criteria(&out_of_range()).unwrap_err();
        assert_eq!(err.to_string(), "end_inclusive 70000 is not a valid port");
    }

    #[test]
    fn rejects_malformed_dates() {
        let block = criteria(&[(
            "updated_at",
            Dynamic::List(vec![object(&[("start_inclusive", "last tuesday".into())])]),
        )]);
        let err = expand_filter_criteria(&block).unwrap_err();
        assert!(err.to_string().contains("last tuesday"));
    }

    #[test]
    fn flattens_every_field_as_a_list() {
        let expanded = expand_filter_criteria(&criteria(&[(
            "finding_status",
            Dynamic::List(vec![object(&[
                ("comparison", "NOT_EQUALS".into()),
                ("value", "CLOSED".into()),
            ])]),
        )]))
        .unwrap();

        let flattened = flatten_filter_criteria(&expanded);
        let values = flattened.as_map().unwrap();
        assert_eq!(values.len(), 42);
        assert_eq!(
            values["finding_status"],
            Dynamic::List(vec![object(&[
                ("comparison", "NOT_EQUALS".into()),
                ("value", "CLOSED".into()),
            ])])
        );
        assert_eq!(values["vulnerable_packages"], Dynamic::List(Vec::new()));
    }
}
