//! Core value types shared by providers and the gRPC layer
//!
//! Terraform values cross the wire as msgpack (or JSON for upgraded state)
//! and land here as `Dynamic`. Objects are plain maps; configuration, plan
//! and state objects are wrapped in `Config` so resources get typed
//! accessors instead of matching on `Dynamic` directly.

use serde::de::{self, IgnoredAny, SeqAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;

/// msgpack extension type Terraform uses for values not yet known at plan time.
const UNKNOWN_EXT_TYPE: i8 = 0;

// Largest integer an f64 represents exactly.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_992.0;

/// Dynamic represents any Terraform value
#[derive(Debug, Clone, PartialEq)]
pub enum Dynamic {
    Null,
    Bool(bool),
    /// All numbers are f64 to match Terraform
    Number(f64),
    String(String),
    /// Lists, sets and tuples
    List(Vec<Dynamic>),
    /// Maps and objects
    Map(HashMap<String, Dynamic>),
    /// Value not yet known (during planning)
    Unknown,
}

impl Dynamic {
    pub fn as_string(&self) -> Option<&String> {
        match self {
            Dynamic::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        self.as_string().map(String::as_str)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Dynamic::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Dynamic::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        self.as_number()
            .filter(|n| n.is_finite() && n.fract() == 0.0)
            .map(|n| n as i64)
    }

    pub fn as_list(&self) -> Option<&Vec<Dynamic>> {
        match self {
            Dynamic::List(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&HashMap<String, Dynamic>> {
        match self {
            Dynamic::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Dynamic::Null)
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Dynamic::Unknown)
    }

    /// True when neither this value nor anything nested in it is unknown.
    pub fn is_fully_known(&self) -> bool {
        match self {
            Dynamic::Unknown => false,
            Dynamic::List(l) => l.iter().all(Dynamic::is_fully_known),
            Dynamic::Map(m) => m.values().all(Dynamic::is_fully_known),
            _ => true,
        }
    }

    /// Replaces every nested unknown with null.
    pub fn unknown_to_null(self) -> Self {
        match self {
            Dynamic::Unknown => Dynamic::Null,
            Dynamic::List(l) => Dynamic::List(l.into_iter().map(Dynamic::unknown_to_null).collect()),
            Dynamic::Map(m) => Dynamic::Map(
                m.into_iter()
                    .map(|(k, v)| (k, v.unknown_to_null()))
                    .collect(),
            ),
            other => other,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Dynamic::Null => "null",
            Dynamic::Bool(_) => "bool",
            Dynamic::Number(_) => "number",
            Dynamic::String(_) => "string",
            Dynamic::List(_) => "list",
            Dynamic::Map(_) => "map",
            Dynamic::Unknown => "unknown",
        }
    }
}

impl From<&str> for Dynamic {
    fn from(value: &str) -> Self {
        Dynamic::String(value.to_string())
    }
}

impl From<String> for Dynamic {
    fn from(value: String) -> Self {
        Dynamic::String(value)
    }
}

impl From<bool> for Dynamic {
    fn from(value: bool) -> Self {
        Dynamic::Bool(value)
    }
}

impl From<f64> for Dynamic {
    fn from(value: f64) -> Self {
        Dynamic::Number(value)
    }
}

impl From<i64> for Dynamic {
    fn from(value: i64) -> Self {
        Dynamic::Number(value as f64)
    }
}

impl From<i32> for Dynamic {
    fn from(value: i32) -> Self {
        Dynamic::Number(f64::from(value))
    }
}

impl From<Vec<Dynamic>> for Dynamic {
    fn from(value: Vec<Dynamic>) -> Self {
        Dynamic::List(value)
    }
}

impl From<HashMap<String, Dynamic>> for Dynamic {
    fn from(value: HashMap<String, Dynamic>) -> Self {
        Dynamic::Map(value)
    }
}

impl<T: Into<Dynamic>> From<Option<T>> for Dynamic {
    fn from(value: Option<T>) -> Self {
        value.map_or(Dynamic::Null, Into::into)
    }
}

struct UnknownPayload;

impl Serialize for UnknownPayload {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_bytes(&[0])
    }
}

impl Serialize for Dynamic {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Dynamic::Null => serializer.serialize_unit(),
            Dynamic::Bool(b) => serializer.serialize_bool(*b),
            Dynamic::Number(n) if n.fract() == 0.0 && n.abs() < MAX_SAFE_INTEGER => {
                serializer.serialize_i64(*n as i64)
            }
            Dynamic::Number(n) => serializer.serialize_f64(*n),
            Dynamic::String(s) => serializer.serialize_str(s),
            Dynamic::List(l) => l.serialize(serializer),
            Dynamic::Map(m) => m.serialize(serializer),
            Dynamic::Unknown => serializer.serialize_newtype_struct(
                rmp_serde::MSGPACK_EXT_STRUCT_NAME,
                &(UNKNOWN_EXT_TYPE, UnknownPayload),
            ),
        }
    }
}

struct DynamicVisitor;

impl<'de> Visitor<'de> for DynamicVisitor {
    type Value = Dynamic;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a Terraform value")
    }

    fn visit_unit<E: de::Error>(self) -> Result<Dynamic, E> {
        Ok(Dynamic::Null)
    }

    fn visit_none<E: de::Error>(self) -> Result<Dynamic, E> {
        Ok(Dynamic::Null)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Dynamic, D::Error> {
        deserializer.deserialize_any(DynamicVisitor)
    }

    fn visit_bool<E: de::Error>(self, value: bool) -> Result<Dynamic, E> {
        Ok(Dynamic::Bool(value))
    }

    fn visit_i64<E: de::Error>(self, value: i64) -> Result<Dynamic, E> {
        Ok(Dynamic::Number(value as f64))
    }

    fn visit_u64<E: de::Error>(self, value: u64) -> Result<Dynamic, E> {
        Ok(Dynamic::Number(value as f64))
    }

    fn visit_f64<E: de::Error>(self, value: f64) -> Result<Dynamic, E> {
        Ok(Dynamic::Number(value))
    }

    fn visit_str<E: de::Error>(self, value: &str) -> Result<Dynamic, E> {
        Ok(Dynamic::String(value.to_string()))
    }

    fn visit_string<E: de::Error>(self, value: String) -> Result<Dynamic, E> {
        Ok(Dynamic::String(value))
    }

    fn visit_seq<V: SeqAccess<'de>>(self, mut seq: V) -> Result<Dynamic, V::Error> {
        let mut values = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(elem) = seq.next_element()? {
            values.push(elem);
        }
        Ok(Dynamic::List(values))
    }

    fn visit_map<V: de::MapAccess<'de>>(self, mut map: V) -> Result<Dynamic, V::Error> {
        let mut values = HashMap::with_capacity(map.size_hint().unwrap_or(0));
        while let Some((key, value)) = map.next_entry::<String, Dynamic>()? {
            values.insert(key, value);
        }
        Ok(Dynamic::Map(values))
    }

    // rmp-serde surfaces msgpack extension values as a newtype struct over
    // (type, payload). Terraform only sends extensions for unknown values,
    // refined or not, so the payload is ignored.
    fn visit_newtype_struct<D: Deserializer<'de>>(
        self,
        deserializer: D,
    ) -> Result<Dynamic, D::Error> {
        deserializer.deserialize_tuple(2, ExtVisitor)
    }
}

struct ExtVisitor;

impl<'de> Visitor<'de> for ExtVisitor {
    type Value = Dynamic;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a msgpack extension value")
    }

    fn visit_seq<V: SeqAccess<'de>>(self, mut seq: V) -> Result<Dynamic, V::Error> {
        let _ext_type: Option<i8> = seq.next_element()?;
        let _payload: Option<IgnoredAny> = seq.next_element()?;
        Ok(Dynamic::Unknown)
    }
}

impl<'de> Deserialize<'de> for Dynamic {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(DynamicVisitor)
    }
}

/// Config is an object value: provider configuration, resource
/// configuration, a plan, or a state
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Config {
    pub values: HashMap<String, Dynamic>,
}

/// State uses the same representation as configuration
pub type State = Config;

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&Dynamic> {
        self.values.get(key)
    }

    pub fn set(&mut self, key: &str, value: impl Into<Dynamic>) {
        self.values.insert(key.to_string(), value.into());
    }

    /// String value of a known, non-null attribute.
    pub fn get_string(&self, key: &str) -> Option<String> {
        self.get(key).and_then(Dynamic::as_string).cloned()
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(Dynamic::as_bool)
    }

    pub fn get_number(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(Dynamic::as_number)
    }

    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(Dynamic::as_i64)
    }

    pub fn get_list(&self, key: &str) -> Option<&Vec<Dynamic>> {
        self.get(key).and_then(Dynamic::as_list)
    }

    pub fn get_map(&self, key: &str) -> Option<&HashMap<String, Dynamic>> {
        self.get(key).and_then(Dynamic::as_map)
    }

    /// Elements of a nested block as objects. Single-nesting blocks yield at
    /// most one element.
    pub fn get_blocks(&self, key: &str) -> Vec<Config> {
        match self.get(key) {
            Some(Dynamic::List(items)) => items
                .iter()
                .filter_map(Dynamic::as_map)
                .map(|values| Config {
                    values: values.clone(),
                })
                .collect(),
            Some(Dynamic::Map(values)) => vec![Config {
                values: values.clone(),
            }],
            _ => Vec::new(),
        }
    }

    /// First element of a nested block.
    pub fn get_block(&self, key: &str) -> Option<Config> {
        self.get_blocks(key).into_iter().next()
    }

    /// Attribute is present and has no unknown parts.
    pub fn is_known(&self, key: &str) -> bool {
        self.get(key).is_some_and(Dynamic::is_fully_known)
    }

    pub fn into_dynamic(self) -> Dynamic {
        Dynamic::Map(self.values)
    }
}

impl From<HashMap<String, Dynamic>> for Config {
    fn from(values: HashMap<String, Dynamic>) -> Self {
        Self { values }
    }
}

/// AttributePath points at a value within an object
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AttributePath {
    pub steps: Vec<AttributePathStep>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AttributePathStep {
    AttributeName(String),
    ElementKeyString(String),
    ElementKeyInt(i64),
}

impl AttributePath {
    pub fn new(name: &str) -> Self {
        Self {
            steps: vec![AttributePathStep::AttributeName(name.to_string())],
        }
    }

    pub fn root() -> Self {
        Self { steps: Vec::new() }
    }

    pub fn attribute(mut self, name: &str) -> Self {
        self.steps
            .push(AttributePathStep::AttributeName(name.to_string()));
        self
    }

    pub fn index(mut self, idx: i64) -> Self {
        self.steps.push(AttributePathStep::ElementKeyInt(idx));
        self
    }

    pub fn key(mut self, key: &str) -> Self {
        self.steps
            .push(AttributePathStep::ElementKeyString(key.to_string()));
        self
    }
}

impl fmt::Display for AttributePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, step) in self.steps.iter().enumerate() {
            match step {
                AttributePathStep::AttributeName(name) if i == 0 => write!(f, "{name}")?,
                AttributePathStep::AttributeName(name) => write!(f, ".{name}")?,
                AttributePathStep::ElementKeyString(key) => write!(f, "[\"{key}\"]")?,
                AttributePathStep::ElementKeyInt(idx) => write!(f, "[{idx}]")?,
            }
        }
        Ok(())
    }
}

/// Diagnostic is a single error or warning returned to Terraform
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub summary: String,
    pub detail: Option<String>,
    pub attribute: Option<AttributePath>,
}

/// Diagnostics collects errors and warnings for one operation
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    pub errors: Vec<Diagnostic>,
    pub warnings: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_error<S: Into<String>, D: Into<String>>(&mut self, summary: S, detail: Option<D>) {
        self.errors.push(Diagnostic {
            summary: summary.into(),
            detail: detail.map(Into::into),
            attribute: None,
        });
    }

    pub fn add_warning<S: Into<String>, D: Into<String>>(&mut self, summary: S, detail: Option<D>) {
        self.warnings.push(Diagnostic {
            summary: summary.into(),
            detail: detail.map(Into::into),
            attribute: None,
        });
    }

    pub fn add_attribute_error<S: Into<String>, D: Into<String>>(
        &mut self,
        path: AttributePath,
        summary: S,
        detail: Option<D>,
    ) {
        self.errors.push(Diagnostic {
            summary: summary.into(),
            detail: detail.map(Into::into),
            attribute: Some(path),
        });
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty() && self.warnings.is_empty()
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn object(pairs: &[(&str, Dynamic)]) -> HashMap<String, Dynamic> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn unknown_values_use_msgpack_extension() {
        let encoded = rmp_serde::encode::to_vec_named(&Dynamic::Unknown).unwrap();
        assert_eq!(encoded, vec![0xd4, 0x00, 0x00]);

        let decoded: Dynamic = rmp_serde::decode::from_slice(&encoded).unwrap();
        assert!(decoded.is_unknown());
    }

    #[test]
    fn refined_unknown_payload_is_ignored() {
        // ext8, length 3, type 0x0c
        let encoded = vec![0xc7, 0x03, 0x0c, 0x81, 0x01, 0xc3];
        let decoded: Dynamic = rmp_serde::decode::from_slice(&encoded).unwrap();
        assert!(decoded.is_unknown());
    }

    #[test]
    fn object_with_unknown_attribute_decodes() {
        let values = object(&[
            ("name", Dynamic::from("primary")),
            ("arn", Dynamic::Unknown),
        ]);
        let encoded = rmp_serde::encode::to_vec_named(&values).unwrap();
        let decoded: HashMap<String, Dynamic> = rmp_serde::decode::from_slice(&encoded).unwrap();

        assert_eq!(decoded.get("name").and_then(Dynamic::as_str), Some("primary"));
        assert!(decoded.get("arn").is_some_and(Dynamic::is_unknown));
    }

    #[test]
    fn whole_numbers_encode_as_integers() {
        let encoded = rmp_serde::encode::to_vec(&Dynamic::Number(42.0)).unwrap();
        assert_eq!(encoded, vec![42]);

        let json = serde_json::to_string(&Dynamic::Number(1.5)).unwrap();
        assert_eq!(json, "1.5");
    }

    #[test]
    fn unknown_to_null_is_recursive() {
        let value = Dynamic::Map(object(&[(
            "configuration",
            Dynamic::List(vec![Dynamic::Map(object(&[(
                "effective_engine_version",
                Dynamic::Unknown,
            )]))]),
        )]));

        assert!(!value.is_fully_known());
        let cleaned = value.unknown_to_null();
        assert!(cleaned.is_fully_known());
    }

    #[test]
    fn config_block_accessors() {
        let mut config = Config::new();
        config.set(
            "timeouts",
            Dynamic::Map(object(&[("create", Dynamic::from("5m"))])),
        );
        config.set(
            "configuration",
            Dynamic::List(vec![Dynamic::Map(object(&[(
                "bytes_scanned_cutoff_per_query",
                Dynamic::from(10485760_i64),
            )]))]),
        );

        let timeouts = config.get_block("timeouts").unwrap();
        assert_eq!(timeouts.get_string("create").as_deref(), Some("5m"));

        let configuration = config.get_block("configuration").unwrap();
        assert_eq!(
            configuration.get_i64("bytes_scanned_cutoff_per_query"),
            Some(10485760)
        );
        assert!(config.get_block("missing").is_none());
    }

    #[test]
    fn nested_unknowns_make_attribute_unknown() {
        let mut config = Config::new();
        config.set("name", "primary");
        config.set(
            "configuration",
            Dynamic::List(vec![Dynamic::Map(object(&[("bytes_scanned_cutoff_per_query", Dynamic::Unknown)]))]),
        );

        assert!(config.is_known("name"));
        assert!(!config.is_known("configuration"));
        assert!(!config.is_known("missing"));
    }

    #[test]
    fn attribute_path_display() {
        let path = AttributePath::new("filter_criteria")
            .index(0)
            .attribute("resource_tags")
            .key("Name");
        assert_eq!(path.to_string(), "filter_criteria[0].resource_tags[\"Name\"]");
    }

    #[test]
    fn diagnostics_track_errors_and_warnings() {
        let mut diags = Diagnostics::new();
        assert!(diags.is_empty());

        diags.add_warning("resource removed", None::<String>);
        assert!(!diags.has_errors());

        let mut other = Diagnostics::new();
        other.add_error("creating Athena WorkGroup (primary)", Some("boom"));
        diags.extend(other);

        assert!(diags.has_errors());
        assert_eq!(diags.errors[0].detail.as_deref(), Some("boom"));
    }
}
