//! Conversions between Terraform values and AWS SDK types

use crate::tfresource::{Error, Result};
use aws_smithy_types::date_time::Format;
use aws_smithy_types::DateTime;
use std::collections::HashMap;
use tfplug::{Config, Dynamic};

pub fn string_value<'a>(value: impl Into<Option<&'a str>>) -> Dynamic {
    value.into().map_or(Dynamic::Null, Dynamic::from)
}

pub fn bool_value(value: impl Into<Option<bool>>) -> Dynamic {
    value.into().map_or(Dynamic::Null, Dynamic::Bool)
}

pub fn int_value(value: impl Into<Option<i64>>) -> Dynamic {
    value.into().map_or(Dynamic::Null, Dynamic::from)
}

pub fn float_value(value: impl Into<Option<f64>>) -> Dynamic {
    value.into().map_or(Dynamic::Null, Dynamic::Number)
}

/// String form of an SDK enum.
pub fn enum_value<'a, E>(value: impl Into<Option<&'a E>>) -> Dynamic
where
    E: AsRef<str> + 'a,
{
    value
        .into()
        .map_or(Dynamic::Null, |v| Dynamic::from(AsRef::<str>::as_ref(v)))
}

/// Status name of an SDK enum, empty when absent.
pub fn enum_string<'a, E>(value: impl Into<Option<&'a E>>) -> String
where
    E: AsRef<str> + 'a,
{
    value
        .into()
        .map(|v| AsRef::<str>::as_ref(v).to_string())
        .unwrap_or_default()
}

pub fn owned_string<'a>(value: impl Into<Option<&'a str>>) -> String {
    value.into().unwrap_or_default().to_string()
}

/// RFC 3339 timestamp.
pub fn timestamp_value<'a>(value: impl Into<Option<&'a DateTime>>) -> Dynamic {
    value
        .into()
        .and_then(|t| t.fmt(Format::DateTime).ok())
        .map_or(Dynamic::Null, Dynamic::String)
}

pub fn string_list_value<S: AsRef<str>>(items: &[S]) -> Dynamic {
    Dynamic::List(
        items
            .iter()
            .map(|s| Dynamic::from(AsRef::<str>::as_ref(s)))
            .collect(),
    )
}

/// Like `string_list_value`, but an empty list is null.
pub fn optional_string_list_value<S: AsRef<str>>(items: &[S]) -> Dynamic {
    if items.is_empty() {
        Dynamic::Null
    } else {
        string_list_value(items)
    }
}

pub fn string_map_value(map: Option<&HashMap<String, String>>) -> Dynamic {
    match map {
        Some(map) if !map.is_empty() => Dynamic::Map(
            map.iter()
                .map(|(k, v)| (k.clone(), Dynamic::from(v.as_str())))
                .collect(),
        ),
        _ => Dynamic::Null,
    }
}

/// Non-empty string attribute.
pub fn string(config: &Config, key: &str) -> Option<String> {
    config.get_string(key).filter(|s| !s.is_empty())
}

pub fn expand_string_list(value: Option<&Dynamic>) -> Vec<String> {
    value
        .and_then(Dynamic::as_list)
        .map(|items| {
            items
                .iter()
                .filter_map(Dynamic::as_string)
                .cloned()
                .collect()
        })
        .unwrap_or_default()
}

pub fn expand_string_map(value: Option<&Dynamic>) -> HashMap<String, String> {
    value
        .and_then(Dynamic::as_map)
        .map(|map| {
            map.iter()
                .filter_map(|(k, v)| v.as_string().map(|v| (k.clone(), v.clone())))
                .collect()
        })
        .unwrap_or_default()
}

pub fn parse_timestamp(value: &str) -> Result<DateTime> {
    DateTime::from_str(value, Format::DateTime)
        .map_err(|err| Error::Other(format!("parsing timestamp {value:?}: {err}")))
}

/// Elements of a list or set attribute whose elements are strings differ
/// only in order.
pub fn same_string_set(a: &[String], b: &[String]) -> bool {
    let mut a = a.to_vec();
    let mut b = b.to_vec();
    a.sort();
    b.sort();
    a == b
}

/// Reports whether a planned value differs from the prior one. Unknown
/// parts of the plan match anything.
pub fn changed(prior: Option<&Dynamic>, planned: Option<&Dynamic>) -> bool {
    !plan_matches(prior.unwrap_or(&Dynamic::Null), planned.unwrap_or(&Dynamic::Null))
}

fn plan_matches(prior: &Dynamic, planned: &Dynamic) -> bool {
    match (prior, planned) {
        (_, Dynamic::Unknown) => true,
        (Dynamic::List(a), Dynamic::List(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(a, b)| plan_matches(a, b))
        }
        (Dynamic::Map(a), Dynamic::Map(b)) => {
            a.keys().chain(b.keys()).all(|key| {
                plan_matches(
                    a.get(key).unwrap_or(&Dynamic::Null),
                    b.get(key).unwrap_or(&Dynamic::Null),
                )
            })
        }
        (a, b) => a == b,
    }
}
