//! Resource tagging: `tags`, `tags_all`, provider default and ignored tags

use crate::conns::AwsClient;
use std::collections::{BTreeMap, HashMap};
use tfplug::request::{ModifyPlanRequest, ModifyPlanResponse};
use tfplug::{AttributeBuilder, AttributeType, Diagnostics, Dynamic, State};

const AWS_TAG_PREFIX: &str = "aws:";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyValueTags(BTreeMap<String, String>);

impl KeyValueTags {
    pub fn new<I, K, V>(tags: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self(
            tags.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Tags from a `map(string)` value. Null and unknown values are empty.
    pub fn from_dynamic(value: Option<&Dynamic>) -> Self {
        let Some(map) = value.and_then(Dynamic::as_map) else {
            return Self::default();
        };
        Self(
            map.iter()
                .filter_map(|(k, v)| v.as_string().map(|v| (k.clone(), v.clone())))
                .collect(),
        )
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn keys(&self) -> Vec<String> {
        self.0.keys().cloned().collect()
    }

    pub fn map(&self) -> HashMap<String, String> {
        self.0.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Drops tags managed by AWS itself (`aws:` prefix).
    pub fn ignore_aws(mut self) -> Self {
        self.0.retain(|k, _| !k.starts_with(AWS_TAG_PREFIX));
        self
    }

    /// Drops tags the provider is configured to ignore.
    pub fn ignore_config(mut self, ignore: &IgnoreConfig) -> Self {
        self.0.retain(|k, _| !ignore.ignores(k));
        self
    }

    /// Union of both tag sets; `other` wins on conflicts.
    pub fn merge(&self, other: &KeyValueTags) -> Self {
        let mut merged = self.0.clone();
        merged.extend(other.0.iter().map(|(k, v)| (k.clone(), v.clone())));
        Self(merged)
    }

    /// Tags present here but missing from `new`.
    pub fn removed(&self, new: &KeyValueTags) -> Self {
        Self(
            self.0
                .iter()
                .filter(|(k, _)| !new.0.contains_key(*k))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        )
    }

    /// Tags in `new` that are missing here or carry a different value.
    pub fn updated(&self, new: &KeyValueTags) -> Self {
        Self(
            new.0
                .iter()
                .filter(|(k, v)| self.0.get(*k) != Some(*v))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        )
    }

    /// Drops tags that only exist because of provider default tags.
    pub fn remove_default_config(mut self, defaults: &DefaultConfig) -> Self {
        self.0
            .retain(|k, v| defaults.tags.0.get(k).map_or(true, |default| default != v));
        self
    }

    /// A `map(string)` value; null when there are no tags.
    pub fn to_dynamic(&self) -> Dynamic {
        if self.0.is_empty() {
            return Dynamic::Null;
        }
        Dynamic::Map(
            self.0
                .iter()
                .map(|(k, v)| (k.clone(), Dynamic::from(v.as_str())))
                .collect(),
        )
    }
}

/// Provider-level `default_tags`.
#[derive(Debug, Clone, Default)]
pub struct DefaultConfig {
    pub tags: KeyValueTags,
}

impl DefaultConfig {
    /// Resource tags layered over the default tags.
    pub fn merge_tags(&self, tags: &KeyValueTags) -> KeyValueTags {
        self.tags.merge(tags)
    }
}

/// Provider-level `ignore_tags`.
#[derive(Debug, Clone, Default)]
pub struct IgnoreConfig {
    pub keys: Vec<String>,
    pub key_prefixes: Vec<String>,
}

impl IgnoreConfig {
    pub fn ignores(&self, key: &str) -> bool {
        self.keys.iter().any(|k| k == key) || self.key_prefixes.iter().any(|p| key.starts_with(p))
    }
}

pub fn tags_attribute() -> AttributeBuilder {
    AttributeBuilder::map("tags", AttributeType::String)
        .optional()
        .description("Resource tags")
}

pub fn tags_all_attribute() -> AttributeBuilder {
    AttributeBuilder::map("tags_all", AttributeType::String)
        .computed()
        .description("Resource tags merged with the provider default tags")
}

/// Writes remote tags into `tags` and `tags_all`, filtering AWS-managed and
/// ignored keys.
pub fn set_tags_out(state: &mut State, client: &AwsClient, remote: KeyValueTags) {
    let all = remote.ignore_aws().ignore_config(client.ignore_tags_config());
    let resource_tags = all.clone().remove_default_config(client.default_tags_config());
    state.set("tags", resource_tags.to_dynamic());
    state.set("tags_all", all.to_dynamic());
}

/// Tags to send on create: resource tags merged over the default tags.
pub fn tags_in(client: &AwsClient, planned: &State) -> KeyValueTags {
    client
        .default_tags_config()
        .merge_tags(&KeyValueTags::from_dynamic(planned.get("tags")))
        .ignore_config(client.ignore_tags_config())
}

/// Tag changes between prior and planned `tags_all`, as (removed, updated).
pub fn changes(prior: &State, planned: &State) -> Option<(KeyValueTags, KeyValueTags)> {
    let old = KeyValueTags::from_dynamic(prior.get("tags_all"));
    let new = KeyValueTags::from_dynamic(planned.get("tags_all"));
    let removed = old.removed(&new);
    let updated = old.updated(&new);
    if removed.is_empty() && updated.is_empty() {
        None
    } else {
        Some((removed, updated))
    }
}

/// Plans `tags_all` from the resource tags and the provider default tags.
pub fn modify_plan(client: &AwsClient, request: ModifyPlanRequest) -> ModifyPlanResponse {
    let mut planned_state = request.planned_state;

    let tags_all = match planned_state.get("tags") {
        Some(Dynamic::Unknown) => Dynamic::Unknown,
        tags => client
            .default_tags_config()
            .merge_tags(&KeyValueTags::from_dynamic(tags))
            .ignore_config(client.ignore_tags_config())
            .to_dynamic(),
    };
    planned_state.set("tags_all", tags_all);

    ModifyPlanResponse {
        planned_state,
        requires_replace: Vec::new(),
        diagnostics: Diagnostics::new(),
    }
}
