//! `aws_inspector_resource_group`
//!
//! Inspector Classic has no API to update or delete resource groups. Any tag
//! change creates a new group, and delete only forgets it.

use crate::conns::AwsClient;
use crate::create::{self, Action};
use crate::flex;
use crate::names::INSPECTOR_SERVICE_NAME;
use crate::registry::ResourceRegistration;
use crate::tfresource::{self, Error, Result};
use async_trait::async_trait;
use aws_sdk_inspector::types::{ResourceGroup, ResourceGroupTag};
use aws_sdk_inspector::Client;
use std::collections::HashMap;
use tfplug::import::import_state_passthrough_id;
use tfplug::plan_modifier::{RequiresReplaceIfChanged, UseStateForUnknown};
use tfplug::request::{
    CreateRequest, CreateResponse, DeleteRequest, DeleteResponse, ImportStateRequest,
    ImportStateResponse, ReadRequest, ReadResponse, UpdateRequest, UpdateResponse,
};
use tfplug::schema::ResourceSchema;
use tfplug::{AttributeBuilder, AttributeType, Diagnostics, Dynamic, ResourceV2, SchemaBuilder, State};

pub const TYPE_NAME: &str = "aws_inspector_resource_group";
const RESOURCE_NAME: &str = "Resource Group";

pub struct ResourceGroupResource {
    client: AwsClient,
}

impl ResourceGroupResource {
    pub fn new(client: AwsClient) -> Self {
        Self { client }
    }

    pub fn schema() -> ResourceSchema {
        SchemaBuilder::new()
            .version(0)
            .description("Manages an Inspector Classic resource group")
            .attribute(
                AttributeBuilder::string("id")
                    .computed()
                    .plan_modifier(UseStateForUnknown),
            )
            .attribute(
                AttributeBuilder::string("arn")
                    .computed()
                    .plan_modifier(UseStateForUnknown),
            )
            .attribute(
                AttributeBuilder::map("tags", AttributeType::String)
                    .required()
                    .description("EC2 instance tags that select the group's members")
                    .plan_modifier(RequiresReplaceIfChanged),
            )
            .build()
    }
}

fn factory(client: AwsClient) -> Box<dyn ResourceV2> {
    Box::new(ResourceGroupResource::new(client))
}

pub fn registration() -> ResourceRegistration {
    ResourceRegistration {
        type_name: TYPE_NAME,
        name: RESOURCE_NAME,
        schema: ResourceGroupResource::schema,
        factory,
    }
}

#[async_trait]
impl ResourceV2 for ResourceGroupResource {
    async fn create(&self, request: CreateRequest) -> CreateResponse {
        let mut diagnostics = Diagnostics::new();
        let mut state = request.planned_state;
        let conn = self.client.inspector();

        let arn = match create_resource_group(conn, &state).await {
            Ok(arn) => arn,
            Err(err) => {
                add_error(&mut diagnostics, Action::Creating, "", &err);
                return CreateResponse { state, diagnostics };
            }
        };

        tracing::info!(arn = %arn, "created Inspector Classic resource group");
        state.set("id", arn.as_str());

        match find_resource_group_by_arn(conn, &arn).await {
            Ok(group) => flatten_resource_group(&mut state, &group),
            Err(err) => add_error(&mut diagnostics, Action::Reading, &arn, &err),
        }

        CreateResponse { state, diagnostics }
    }

    async fn read(&self, request: ReadRequest) -> ReadResponse {
        let mut diagnostics = Diagnostics::new();
        let mut state = request.current_state;
        let arn = state.get_string("id").unwrap_or_default();

        match find_resource_group_by_arn(self.client.inspector(), &arn).await {
            Ok(group) => flatten_resource_group(&mut state, &group),
            Err(err) if tfresource::not_found(&err) => {
                tracing::warn!(arn = %arn, "Inspector Classic Resource Group not found, removing from state");
                return ReadResponse {
                    state: None,
                    diagnostics,
                };
            }
            Err(err) => add_error(&mut diagnostics, Action::Reading, &arn, &err),
        }

        ReadResponse {
            state: Some(state),
            diagnostics,
        }
    }

    /// Every attribute forces replacement.
    async fn update(&self, request: UpdateRequest) -> UpdateResponse {
        UpdateResponse {
            state: request.planned_state,
            diagnostics: Diagnostics::new(),
        }
    }

    async fn delete(&self, request: DeleteRequest) -> DeleteResponse {
        tracing::debug!(
            arn = %request.current_state.get_string("id").unwrap_or_default(),
            "Inspector Classic resource groups cannot be deleted, removing from state only"
        );
        DeleteResponse {
            diagnostics: Diagnostics::new(),
        }
    }

    async fn import_state(&self, request: ImportStateRequest) -> ImportStateResponse {
        import_state_passthrough_id("id", &request.id)
    }
}

fn add_error(diagnostics: &mut Diagnostics, action: Action, id: &str, err: &Error) {
    create::add_error(diagnostics, INSPECTOR_SERVICE_NAME, action, RESOURCE_NAME, id, err);
}

async fn create_resource_group(conn: &Client, state: &State) -> Result<String> {
    let output = conn
        .create_resource_group()
        .set_resource_group_tags(Some(expand_resource_group_tags(state)?))
        .send()
        .await?;
    Ok(flex::owned_string(output.resource_group_arn()))
}

pub async fn find_resource_group_by_arn(conn: &Client, arn: &str) -> Result<ResourceGroup> {
    let output = conn
        .describe_resource_groups()
        .resource_group_arns(arn)
        .send()
        .await?;

    tfresource::assert_single_value_result(output.resource_groups().to_vec())
}

fn expand_resource_group_tags(state: &State) -> Result<Vec<ResourceGroupTag>> {
    let mut tags: Vec<_> = flex::expand_string_map(state.get("tags")).into_iter().collect();
    tags.sort();
    tags.into_iter()
        .map(|(key, value)| {
            ResourceGroupTag::builder()
                .key(key)
                .value(value)
                .build()
                .map_err(Error::from)
        })
        .collect()
}

fn flatten_resource_group(state: &mut State, group: &ResourceGroup) {
    let arn = flex::owned_string(group.arn());
    state.set("id", arn.as_str());
    state.set("arn", arn.as_str());

    let tags: HashMap<String, String> = group
        .tags()
        .iter()
        .map(|tag| (flex::owned_string(tag.key()), flex::owned_string(tag.value())))
        .collect();
    state.set(
        "tags",
        Dynamic::Map(
            tags.into_iter()
                .map(|(key, value)| (key, Dynamic::String(value)))
                .collect(),
        ),
    );
}
