//! Schema types and builders for tfplug
//!
//! A `Schema` describes the object a provider, resource or data source works
//! with: top-level attributes plus nested blocks. Besides advertising the
//! schema to Terraform, the server uses it to validate configuration, apply
//! defaults, mark computed attributes unknown during planning and trim state
//! to the declared shape before encoding.

pub use crate::attribute_type::AttributeType;
use crate::defaults::Default as DefaultValue;
use crate::plan_modifier::PlanModifier;
use crate::proto::tfplugin6 as proto;
use crate::types::{AttributePath, Diagnostics, Dynamic};
use crate::validator::Validator;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Attribute represents a single configuration attribute
#[derive(Clone)]
pub struct Attribute {
    pub name: String,
    pub r#type: AttributeType,
    pub description: String,
    pub required: bool,
    pub optional: bool,
    pub computed: bool,
    pub sensitive: bool,
    pub deprecated: bool,
    pub validators: Vec<Arc<dyn Validator>>,
    pub plan_modifiers: Vec<Arc<dyn PlanModifier>>,
    pub default: Option<Arc<dyn DefaultValue>>,
}

// Manual Debug implementation since validators/modifiers don't implement Debug
impl fmt::Debug for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Attribute")
            .field("name", &self.name)
            .field("type", &self.r#type)
            .field("required", &self.required)
            .field("optional", &self.optional)
            .field("computed", &self.computed)
            .field("sensitive", &self.sensitive)
            .field("validators", &self.validators.len())
            .field("plan_modifiers", &self.plan_modifiers.len())
            .field("default", &self.default.is_some())
            .finish()
    }
}

impl Attribute {
    fn to_proto(&self) -> proto::schema::Attribute {
        proto::schema::Attribute {
            name: self.name.clone(),
            r#type: self.r#type.to_bytes(),
            description: self.description.clone(),
            required: self.required,
            optional: self.optional,
            computed: self.computed,
            sensitive: self.sensitive,
            description_kind: proto::StringKind::Plain as i32,
            deprecated: self.deprecated,
            ..Default::default()
        }
    }
}

/// NestingMode defines how nested blocks are structured
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NestingMode {
    Single,
    List,
    Set,
}

impl NestingMode {
    fn to_proto(self) -> proto::schema::nested_block::NestingMode {
        match self {
            NestingMode::Single => proto::schema::nested_block::NestingMode::Single,
            NestingMode::List => proto::schema::nested_block::NestingMode::List,
            NestingMode::Set => proto::schema::nested_block::NestingMode::Set,
        }
    }
}

/// Block holds attributes and nested blocks
#[derive(Debug, Clone, Default)]
pub struct Block {
    pub attributes: HashMap<String, Attribute>,
    pub blocks: HashMap<String, NestedBlock>,
    pub description: String,
}

/// NestedBlock represents a nested configuration block
#[derive(Debug, Clone)]
pub struct NestedBlock {
    pub nesting: NestingMode,
    pub block: Block,
    pub min_items: i64,
    pub max_items: i64,
}

/// Schema is the versioned root block of a provider, resource or data source
#[derive(Debug, Clone, Default)]
pub struct Schema {
    pub version: i64,
    pub block: Block,
}

pub type ResourceSchema = Schema;
pub type DataSourceSchema = Schema;
pub type ProviderSchema = Schema;

type Object = HashMap<String, Dynamic>;

impl Schema {
    pub fn to_proto(&self) -> proto::Schema {
        proto::Schema {
            version: self.version,
            block: Some(self.block.to_proto(self.version)),
        }
    }
}

impl Block {
    pub fn to_proto(&self, version: i64) -> proto::schema::Block {
        let mut attributes: Vec<_> = self.attributes.values().map(Attribute::to_proto).collect();
        attributes.sort_by(|a, b| a.name.cmp(&b.name));

        let mut block_types: Vec<_> = self
            .blocks
            .iter()
            .map(|(name, nested)| proto::schema::NestedBlock {
                type_name: name.clone(),
                block: Some(nested.block.to_proto(0)),
                nesting: nested.nesting.to_proto() as i32,
                min_items: nested.min_items,
                max_items: nested.max_items,
            })
            .collect();
        block_types.sort_by(|a, b| a.type_name.cmp(&b.type_name));

        proto::schema::Block {
            version,
            attributes,
            block_types,
            description: self.description.clone(),
            description_kind: proto::StringKind::Plain as i32,
            deprecated: false,
        }
    }

    /// Checks a configuration object against this block.
    pub fn validate(&self, config: &Object, path: &AttributePath, diagnostics: &mut Diagnostics) {
        for key in config.keys() {
            if !self.attributes.contains_key(key) && !self.blocks.contains_key(key) {
                diagnostics.add_attribute_error(
                    path.clone().attribute(key),
                    "Unsupported argument",
                    Some(format!("An argument named \"{key}\" is not expected here.")),
                );
            }
        }

        for (name, attr) in &self.attributes {
            let attr_path = path.clone().attribute(name);
            let value = config.get(name).unwrap_or(&Dynamic::Null);

            if attr.required && value.is_null() {
                diagnostics.add_attribute_error(
                    attr_path,
                    "Missing required argument",
                    Some(format!(
                        "The argument \"{name}\" is required, but no definition was found."
                    )),
                );
                continue;
            }

            if attr.computed && !attr.optional && !value.is_null() && !value.is_unknown() {
                diagnostics.add_attribute_error(
                    attr_path,
                    "Invalid Configuration for Read-Only Attribute",
                    Some(format!("Cannot set value for \"{name}\", it is computed by the provider.")),
                );
                continue;
            }

            if !attr.r#type.accepts(value) {
                diagnostics.add_attribute_error(
                    attr_path,
                    "Incorrect attribute value type",
                    Some(format!(
                        "Inappropriate value for attribute \"{name}\": {} required, got {}.",
                        attr.r#type.type_name(),
                        value.type_name()
                    )),
                );
                continue;
            }

            if value.is_null() || value.is_unknown() {
                continue;
            }
            let path_name = attr_path.to_string();
            let first_new = diagnostics.errors.len();
            for validator in &attr.validators {
                validator.validate(value, &path_name, diagnostics);
            }
            for diag in &mut diagnostics.errors[first_new..] {
                diag.attribute.get_or_insert_with(|| attr_path.clone());
            }
        }

        for (name, nested) in &self.blocks {
            let block_path = path.clone().attribute(name);
            match config.get(name) {
                Some(Dynamic::List(items)) => {
                    let count = items.len() as i64;
                    let all_known = items.iter().all(|i| !i.is_unknown());
                    if all_known && nested.min_items > 0 && count < nested.min_items {
                        diagnostics.add_attribute_error(
                            block_path.clone(),
                            "Insufficient blocks",
                            Some(format!(
                                "At least {} \"{name}\" blocks are required.",
                                nested.min_items
                            )),
                        );
                    }
                    if all_known && nested.max_items > 0 && count > nested.max_items {
                        diagnostics.add_attribute_error(
                            block_path.clone(),
                            "Too many blocks",
                            Some(format!(
                                "No more than {} \"{name}\" blocks are allowed.",
                                nested.max_items
                            )),
                        );
                    }
                    for (idx, item) in items.iter().enumerate() {
                        if let Dynamic::Map(values) = item {
                            nested.block.validate(
                                values,
                                &block_path.clone().index(idx as i64),
                                diagnostics,
                            );
                        }
                    }
                }
                Some(Dynamic::Map(values)) if nested.nesting == NestingMode::Single => {
                    nested.block.validate(values, &block_path, diagnostics);
                }
                Some(Dynamic::Unknown) => {}
                _ if nested.min_items > 0 => {
                    diagnostics.add_attribute_error(
                        block_path,
                        "Insufficient blocks",
                        Some(format!(
                            "At least {} \"{name}\" blocks are required.",
                            nested.min_items
                        )),
                    );
                }
                _ => {}
            }
        }
    }

    /// Fills null optional attributes that declare a default.
    pub fn apply_defaults(&self, config: &Object, planned: &mut Object) {
        for (name, attr) in &self.attributes {
            let Some(default) = &attr.default else {
                continue;
            };
            let configured = config.get(name).is_some_and(|v| !v.is_null());
            if !configured {
                planned.insert(name.clone(), default.default_value());
            }
        }

        self.for_each_nested(config, planned, |block, config, planned| {
            block.apply_defaults(config, planned)
        });
    }

    /// Marks computed attributes without a configured value as unknown so
    /// the provider can fill them in during apply.
    pub fn mark_computed_unknown(&self, config: &Object, planned: &mut Object) {
        for (name, attr) in &self.attributes {
            if !attr.computed || attr.default.is_some() {
                continue;
            }
            let configured = config.get(name).is_some_and(|v| !v.is_null());
            if !configured {
                planned.insert(name.clone(), Dynamic::Unknown);
            }
        }

        self.for_each_nested(config, planned, |block, config, planned| {
            block.mark_computed_unknown(config, planned)
        });
    }

    fn for_each_nested<F>(&self, config: &Object, planned: &mut Object, f: F)
    where
        F: Fn(&Block, &Object, &mut Object) + Copy,
    {
        let empty = Object::new();
        for (name, nested) in &self.blocks {
            match planned.get_mut(name) {
                Some(Dynamic::List(items)) => {
                    let config_items = config.get(name).and_then(Dynamic::as_list);
                    for (idx, item) in items.iter_mut().enumerate() {
                        if let Dynamic::Map(values) = item {
                            let config_values = config_items
                                .and_then(|c| c.get(idx))
                                .and_then(Dynamic::as_map)
                                .unwrap_or(&empty);
                            f(&nested.block, config_values, values);
                        }
                    }
                }
                Some(Dynamic::Map(values)) => {
                    let config_values = config.get(name).and_then(Dynamic::as_map).unwrap_or(&empty);
                    f(&nested.block, config_values, values);
                }
                _ => {}
            }
        }
    }

    /// Reshapes an object to exactly the declared attributes and blocks:
    /// undeclared keys are dropped, missing attributes become null and
    /// missing list or set blocks become empty.
    pub fn normalize(&self, mut values: Object) -> Object {
        let mut normalized = Object::with_capacity(self.attributes.len() + self.blocks.len());

        for name in self.attributes.keys() {
            let value = values.remove(name).unwrap_or(Dynamic::Null);
            normalized.insert(name.clone(), value);
        }

        for (name, nested) in &self.blocks {
            let value = match (values.remove(name), nested.nesting) {
                (Some(Dynamic::List(items)), _) => Dynamic::List(
                    items
                        .into_iter()
                        .map(|item| match item {
                            Dynamic::Map(obj) => Dynamic::Map(nested.block.normalize(obj)),
                            other => other,
                        })
                        .collect(),
                ),
                (Some(Dynamic::Map(obj)), NestingMode::Single) => {
                    Dynamic::Map(nested.block.normalize(obj))
                }
                (Some(Dynamic::Unknown), _) => Dynamic::Unknown,
                (_, NestingMode::Single) => Dynamic::Null,
                (_, NestingMode::List | NestingMode::Set) => Dynamic::List(Vec::new()),
            };
            normalized.insert(name.clone(), value);
        }

        normalized
    }
}

/// AttributeBuilder provides a fluent API for building attributes
pub struct AttributeBuilder {
    attribute: Attribute,
}

impl AttributeBuilder {
    pub fn new(name: &str, r#type: AttributeType) -> Self {
        Self {
            attribute: Attribute {
                name: name.to_string(),
                r#type,
                description: String::new(),
                required: false,
                optional: false,
                computed: false,
                sensitive: false,
                deprecated: false,
                validators: Vec::new(),
                plan_modifiers: Vec::new(),
                default: None,
            },
        }
    }

    pub fn string(name: &str) -> Self {
        Self::new(name, AttributeType::String)
    }

    pub fn bool(name: &str) -> Self {
        Self::new(name, AttributeType::Bool)
    }

    pub fn number(name: &str) -> Self {
        Self::new(name, AttributeType::Number)
    }

    pub fn list(name: &str, elem: AttributeType) -> Self {
        Self::new(name, AttributeType::list(elem))
    }

    pub fn set(name: &str, elem: AttributeType) -> Self {
        Self::new(name, AttributeType::set(elem))
    }

    pub fn map(name: &str, elem: AttributeType) -> Self {
        Self::new(name, AttributeType::map(elem))
    }

    pub fn description(mut self, desc: &str) -> Self {
        self.attribute.description = desc.to_string();
        self
    }

    pub fn required(mut self) -> Self {
        self.attribute.required = true;
        self.attribute.optional = false;
        self
    }

    pub fn optional(mut self) -> Self {
        self.attribute.optional = true;
        self.attribute.required = false;
        self
    }

    pub fn computed(mut self) -> Self {
        self.attribute.computed = true;
        self
    }

    pub fn sensitive(mut self) -> Self {
        self.attribute.sensitive = true;
        self
    }

    pub fn deprecated(mut self) -> Self {
        self.attribute.deprecated = true;
        self
    }

    pub fn validator(mut self, validator: impl Validator + 'static) -> Self {
        self.attribute.validators.push(Arc::new(validator));
        self
    }

    pub fn plan_modifier(mut self, modifier: impl PlanModifier + 'static) -> Self {
        self.attribute.plan_modifiers.push(Arc::new(modifier));
        self
    }

    pub fn default(mut self, default: Arc<dyn DefaultValue>) -> Self {
        self.attribute.default = Some(default);
        self
    }

    pub fn build(self) -> Attribute {
        self.attribute
    }
}

/// BlockBuilder builds a nested block
pub struct BlockBuilder {
    name: String,
    nested: NestedBlock,
}

impl BlockBuilder {
    fn new(name: &str, nesting: NestingMode) -> Self {
        Self {
            name: name.to_string(),
            nested: NestedBlock {
                nesting,
                block: Block::default(),
                min_items: 0,
                max_items: 0,
            },
        }
    }

    pub fn list(name: &str) -> Self {
        Self::new(name, NestingMode::List)
    }

    pub fn set(name: &str) -> Self {
        Self::new(name, NestingMode::Set)
    }

    pub fn single(name: &str) -> Self {
        Self::new(name, NestingMode::Single)
    }

    pub fn description(mut self, desc: &str) -> Self {
        self.nested.block.description = desc.to_string();
        self
    }

    pub fn min_items(mut self, min: i64) -> Self {
        self.nested.min_items = min;
        self
    }

    pub fn max_items(mut self, max: i64) -> Self {
        self.nested.max_items = max;
        self
    }

    pub fn attribute(mut self, attr: AttributeBuilder) -> Self {
        let attr = attr.build();
        self.nested.block.attributes.insert(attr.name.clone(), attr);
        self
    }

    pub fn block(mut self, block: BlockBuilder) -> Self {
        self.nested.block.blocks.insert(block.name, block.nested);
        self
    }
}

/// SchemaBuilder provides a fluent API for building schemas
pub struct SchemaBuilder {
    schema: Schema,
}

impl SchemaBuilder {
    pub fn new() -> Self {
        Self {
            schema: Schema::default(),
        }
    }

    pub fn version(mut self, version: i64) -> Self {
        self.schema.version = version;
        self
    }

    pub fn description(mut self, desc: &str) -> Self {
        self.schema.block.description = desc.to_string();
        self
    }

    pub fn attribute(mut self, attr: AttributeBuilder) -> Self {
        let attr = attr.build();
        self.schema.block.attributes.insert(attr.name.clone(), attr);
        self
    }

    pub fn block(mut self, block: BlockBuilder) -> Self {
        self.schema.block.blocks.insert(block.name, block.nested);
        self
    }

    pub fn build(self) -> Schema {
        self.schema
    }
}

impl std::default::Default for SchemaBuilder {
    fn default() -> Self {
        Self::new()
    }
}
