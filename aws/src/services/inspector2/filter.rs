//! `aws_inspector2_filter`

use super::criteria::{criteria_block, expand_filter_criteria, flatten_filter_criteria};
use super::tags::update_tags;
use crate::conns::AwsClient;
use crate::create::{self, Action};
use crate::errs;
use crate::flex;
use crate::names::INSPECTOR2_SERVICE_NAME;
use crate::registry::ResourceRegistration;
use crate::tags::{self as tftags, KeyValueTags};
use crate::tfresource::{self, Error, Result};
use crate::timeouts::{self, Timeouts};
use async_trait::async_trait;
use aws_sdk_inspector2::types::{Filter, FilterAction};
use aws_sdk_inspector2::Client;
use tfplug::import::import_state_passthrough_id;
use tfplug::plan_modifier::{RequiresReplaceIfChanged, UseStateForUnknown};
use tfplug::request::{
    CreateRequest, CreateResponse, DeleteRequest, DeleteResponse, ImportStateRequest,
    ImportStateResponse, ModifyPlanRequest, ModifyPlanResponse, ReadRequest, ReadResponse,
    UpdateRequest, UpdateResponse,
};
use tfplug::schema::ResourceSchema;
use tfplug::validator::{OneOfValidator, StringLengthValidator};
use tfplug::{AttributeBuilder, Diagnostics, Dynamic, ResourceV2, SchemaBuilder, State};

pub const TYPE_NAME: &str = "aws_inspector2_filter";
const RESOURCE_NAME: &str = "Filter";

const DEFAULT_TIMEOUTS: Timeouts = Timeouts::minutes(30, 30, 30);
const NOT_FOUND_CODE: &str = "ResourceNotFoundException";

pub struct FilterResource {
    client: AwsClient,
}

impl FilterResource {
    pub fn new(client: AwsClient) -> Self {
        Self { client }
    }

    pub fn schema() -> ResourceSchema {
        SchemaBuilder::new()
            .version(0)
            .description("Manages an Inspector findings filter")
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
                AttributeBuilder::string("action")
                    .required()
                    .description("What happens to matching findings")
                    .validator(OneOfValidator::new(FilterAction::values())),
            )
            .attribute(
                AttributeBuilder::string("name")
                    .required()
                    .validator(StringLengthValidator::between(1, 128))
                    .plan_modifier(RequiresReplaceIfChanged),
            )
            .attribute(
                AttributeBuilder::string("description")
                    .optional()
                    .validator(StringLengthValidator::between(1, 512)),
            )
            .attribute(
                AttributeBuilder::string("reason")
                    .optional()
                    .validator(StringLengthValidator::between(1, 512)),
            )
            .attribute(tftags::tags_attribute())
            .attribute(tftags::tags_all_attribute())
            .block(criteria_block())
            .block(timeouts::block(&["create", "update", "delete"]))
            .build()
    }
}

fn factory(client: AwsClient) -> Box<dyn ResourceV2> {
    Box::new(FilterResource::new(client))
}

pub fn registration() -> ResourceRegistration {
    ResourceRegistration {
        type_name: TYPE_NAME,
        name: RESOURCE_NAME,
        schema: FilterResource::schema,
        factory,
    }
}

#[async_trait]
impl ResourceV2 for FilterResource {
    async fn create(&self, request: CreateRequest) -> CreateResponse {
        let mut diagnostics = Diagnostics::new();
        let mut state = request.planned_state;
        let conn = self.client.inspector2();
        let name = state.get_string("name").unwrap_or_default();
        let timeouts = Timeouts::from_state(&state, DEFAULT_TIMEOUTS);

        let arn = match create_filter(conn, &self.client, &state).await {
            Ok(arn) => arn,
            Err(err) => {
                add_error(&mut diagnostics, Action::Creating, &name, &err);
                return CreateResponse { state, diagnostics };
            }
        };

        tracing::info!(arn = %arn, "created Inspector filter");
        state.set("id", arn.as_str());
        state.set("arn", arn.as_str());

        let filter = tfresource::retry_when_new_resource_not_found(
            &request.context,
            timeouts.create,
            || find_filter_by_arn(conn, &arn),
            true,
        )
        .await;

        match filter {
            Ok(filter) => flatten_filter(&mut state, &self.client, &filter),
            Err(err) => add_error(&mut diagnostics, Action::Reading, &arn, &err),
        }

        CreateResponse { state, diagnostics }
    }

    async fn read(&self, request: ReadRequest) -> ReadResponse {
        let mut diagnostics = Diagnostics::new();
        let mut state = request.current_state;
        let arn = state_arn(&state);

        match find_filter_by_arn(self.client.inspector2(), &arn).await {
            Ok(filter) => flatten_filter(&mut state, &self.client, &filter),
            Err(err) if tfresource::not_found(&err) => {
                tracing::warn!(arn = %arn, "Inspector Filter not found, removing from state");
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

    async fn update(&self, request: UpdateRequest) -> UpdateResponse {
        let mut diagnostics = Diagnostics::new();
        let mut state = request.planned_state;
        let prior = request.current_state;
        let conn = self.client.inspector2();
        let arn = state_arn(&prior);

        let changed = ["action", "name", "description", "reason", "filter_criteria"]
            .iter()
            .any(|key| flex::changed(prior.get(key), state.get(key)));

        if changed {
            if let Err(err) = update_filter(conn, &arn, &state).await {
                add_error(&mut diagnostics, Action::Updating, &arn, &err);
                return UpdateResponse { state, diagnostics };
            }
        }

        if let Some((removed, updated)) = tftags::changes(&prior, &state) {
            if let Err(err) = update_tags(conn, &arn, &removed, &updated).await {
                add_error(&mut diagnostics, Action::Tagging, &arn, &err);
                return UpdateResponse { state, diagnostics };
            }
        }

        match find_filter_by_arn(conn, &arn).await {
            Ok(filter) => flatten_filter(&mut state, &self.client, &filter),
            Err(err) => add_error(&mut diagnostics, Action::Reading, &arn, &err),
        }

        UpdateResponse { state, diagnostics }
    }

    async fn delete(&self, request: DeleteRequest) -> DeleteResponse {
        let mut diagnostics = Diagnostics::new();
        let arn = state_arn(&request.current_state);

        tracing::info!(arn = %arn, "deleting Inspector filter");
        let result = self.client.inspector2().delete_filter().arn(&arn).send().await;

        if let Err(err) = result {
            let err = Error::from(err);
            if !errs::is_a(&err, NOT_FOUND_CODE) {
                add_error(&mut diagnostics, Action::Deleting, &arn, &err);
            }
        }

        DeleteResponse { diagnostics }
    }

    async fn import_state(&self, request: ImportStateRequest) -> ImportStateResponse {
        let mut response = import_state_passthrough_id("arn", &request.id);
        if let Some(state) = response.state.as_mut() {
            state.set("id", request.id.as_str());
        }
        response
    }

    async fn modify_plan(&self, request: ModifyPlanRequest) -> ModifyPlanResponse {
        tftags::modify_plan(&self.client, request)
    }
}

fn add_error(diagnostics: &mut Diagnostics, action: Action, id: &str, err: &Error) {
    create::add_error(diagnostics, INSPECTOR2_SERVICE_NAME, action, RESOURCE_NAME, id, err);
}

/// Imported state may only carry `id`.
fn state_arn(state: &State) -> String {
    flex::string(state, "arn")
        .or_else(|| flex::string(state, "id"))
        .unwrap_or_default()
}

async fn create_filter(conn: &Client, client: &AwsClient, state: &State) -> Result<String> {
    let criteria = match state.get_block("filter_criteria") {
        Some(block) => Some(expand_filter_criteria(&block)?),
        None => None,
    };
    let tags = tftags::tags_in(client, state);

    let output = conn
        .create_filter()
        .set_action(flex::string(state, "action").map(|a| FilterAction::from(a.as_str())))
        .set_name(flex::string(state, "name"))
        .set_description(flex::string(state, "description"))
        .set_reason(flex::string(state, "reason"))
        .set_filter_criteria(criteria)
        .set_tags((!tags.is_empty()).then(|| tags.map()))
        .send()
        .await?;

    Ok(flex::owned_string(output.arn()))
}

async fn update_filter(conn: &Client, arn: &str, state: &State) -> Result<()> {
    let criteria = match state.get_block("filter_criteria") {
        Some(block) => Some(expand_filter_criteria(&block)?),
        None => None,
    };

    conn.update_filter()
        .filter_arn(arn)
        .set_action(flex::string(state, "action").map(|a| FilterAction::from(a.as_str())))
        .set_name(flex::string(state, "name"))
        .set_description(flex::string(state, "description"))
        .set_reason(flex::string(state, "reason"))
        .set_filter_criteria(criteria)
        .send()
        .await?;

    Ok(())
}

pub async fn find_filter_by_arn(conn: &Client, arn: &str) -> Result<Filter> {
    let output = conn.list_filters().arns(arn).send().await.map_err(|err| {
        let err = Error::from(err);
        if errs::is_a(&err, NOT_FOUND_CODE) {
            Error::not_found(err)
        } else {
            err
        }
    })?;

    match tfresource::assert_single_value_result(output.filters().to_vec()) {
        Err(Error::EmptyResult) => Err(Error::not_found(format!(
            "Inspector Filter {arn} not found"
        ))),
        result => result,
    }
}

fn flatten_filter(state: &mut State, client: &AwsClient, filter: &Filter) {
    let arn = flex::owned_string(filter.arn());
    state.set("id", arn.as_str());
    state.set("arn", arn.as_str());
    state.set("action", flex::enum_value(filter.action()));
    state.set("name", flex::owned_string(filter.name()));
    state.set("description", flex::string_value(filter.description()));
    state.set("reason", flex::string_value(filter.reason()));
    state.set(
        "filter_criteria",
        Dynamic::List(filter.criteria().map(flatten_filter_criteria).into_iter().collect()),
    );

    let tags = filter
        .tags()
        .map(|tags| KeyValueTags::new(tags.clone()))
        .unwrap_or_default();
    tftags::set_tags_out(state, client, tags);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{self, ctx, rest, rest_error};
    use mockito::{Matcher, Server};
    use serde_json::json;
    use std::collections::HashMap;
    use tfplug::Config;

    const ARN: &str = "arn:aws:inspector2:us-west-2:123456789012:owner/123456789012/filter/f-1a2b3c";

    fn filter_body(action: &str, description: &str) -> String {
        json!({
            "filters": [{
                "arn": ARN,
                "ownerId": "123456789012",
                "name": "suppress-low",
                "action": action,
                "description": description,
                "criteria": {
                    "severity": [{"comparison": "EQUALS", "value": "LOW"}],
                    "portRange": [{"beginInclusive": 22, "endInclusive": 22}]
                },
                "createdAt": 1704067200,
                "updatedAt": 1704067200,
                "tags": {"Team": "security"}
            }]
        })
        .to_string()
    }

    fn string_filter(comparison: &str, value: &str) -> Dynamic {
        let mut block = Config::new();
        block.set("comparison", comparison);
        block.set("value", value);
        block.into_dynamic()
    }

    fn criteria() -> Dynamic {
        let mut ports = Config::new();
        ports.set("begin_inclusive", Dynamic::Number(22.0));
        ports.set("end_inclusive", Dynamic::Number(22.0));

        let mut block = Config::new();
        block.set("severity", Dynamic::List(vec![string_filter("EQUALS", "LOW")]));
        block.set("port_range", Dynamic::List(vec![ports.into_dynamic()]));
        Dynamic::List(vec![block.into_dynamic()])
    }

    fn planned(description: &str) -> State {
        test_helpers::state(&[
            ("id", Dynamic::Unknown),
            ("arn", Dynamic::Unknown),
            ("name", Dynamic::from("suppress-low")),
            ("action", Dynamic::from("SUPPRESS")),
            ("description", Dynamic::from(description)),
            ("filter_criteria", criteria()),
            (
                "tags",
                Dynamic::Map(HashMap::from([(
                    "Team".to_string(),
                    Dynamic::from("security"),
                )])),
            ),
            ("tags_all", Dynamic::Unknown),
        ])
    }

    #[tokio::test]
    async fn create_sends_criteria_and_reads_back() {
        let mut server = Server::new_async().await;
        let create = rest(&mut server, "POST", "/filters/create")
            .match_body(Matcher::PartialJson(json!({
                "name": "suppress-low",
                "action": "SUPPRESS",
                "filterCriteria": {
                    "severity": [{"comparison": "EQUALS", "value": "LOW"}],
                    "portRange": [{"beginInclusive": 22, "endInclusive": 22}]
                },
                "tags": {"Team": "security"}
            })))
            .with_body(json!({"arn": ARN}).to_string())
            .expect(1)
            .create_async()
            .await;
        let _list = rest(&mut server, "POST", "/filters/list")
            .match_body(Matcher::PartialJson(json!({"arns": [ARN]})))
            .with_body(filter_body("SUPPRESS", "low severity"))
            .create_async()
            .await;

        let resource = FilterResource::new(test_helpers::client(&server.url()));
        let response = resource
            .create(CreateRequest {
                context: ctx(),
                config: Config::new(),
                planned_state: planned("low severity"),
            })
            .await;

        create.assert_async().await;
        assert!(response.diagnostics.errors.is_empty(), "{:?}", response.diagnostics.errors);
        let state = response.state;
        assert_eq!(state.get_string("id").as_deref(), Some(ARN));
        assert_eq!(state.get_string("arn").as_deref(), Some(ARN));

        let criteria = state.get_block("filter_criteria").unwrap();
        assert_eq!(
            criteria.get("severity"),
            Some(&Dynamic::List(vec![string_filter("EQUALS", "LOW")]))
        );
        assert_eq!(criteria.get_blocks("port_range").len(), 1);
        assert_eq!(criteria.get("fix_available"), Some(&Dynamic::List(Vec::new())));
        assert_eq!(
            KeyValueTags::from_dynamic(state.get("tags_all")).get("Team"),
            Some("security")
        );
    }

    #[tokio::test]
    async fn failed_read_after_create_keeps_the_arn() {
        let mut server = Server::new_async().await;
        let _create = rest(&mut server, "POST", "/filters/create")
            .with_body(json!({"arn": ARN}).to_string())
            .create_async()
            .await;
        let _list = rest_error(
            rest(&mut server, "POST", "/filters/list"),
            403,
            "AccessDeniedException",
            "not authorized",
        )
        .create_async()
        .await;

        let resource = FilterResource::new(test_helpers::client(&server.url()));
        let response = resource
            .create(CreateRequest {
                context: ctx(),
                config: Config::new(),
                planned_state: planned("low severity"),
            })
            .await;

        assert_eq!(response.state.get_string("id").as_deref(), Some(ARN));
        assert!(response.diagnostics.errors[0]
            .summary
            .starts_with(&format!("reading Inspector Filter ({ARN}): ")));
    }

    #[tokio::test]
    async fn read_removes_missing_filter() {
        let mut server = Server::new_async().await;
        let _list = rest(&mut server, "POST", "/filters/list")
            .with_body(json!({"filters": []}).to_string())
            .create_async()
            .await;

        let resource = FilterResource::new(test_helpers::client(&server.url()));
        let response = resource
            .read(ReadRequest {
                context: ctx(),
                current_state: test_helpers::state(&[
                    ("id", Dynamic::from(ARN)),
                    ("arn", Dynamic::from(ARN)),
                ]),
            })
            .await;

        assert!(response.state.is_none());
        assert!(response.diagnostics.is_empty());
    }

    #[tokio::test]
    async fn update_sends_changed_filter() {
        let mut server = Server::new_async().await;
        let update = rest(&mut server, "POST", "/filters/update")
            .match_body(Matcher::PartialJson(json!({
                "filterArn": ARN,
                "action": "NONE",
                "description": "informational"
            })))
            .with_body(json!({"arn": ARN}).to_string())
            .expect(1)
            .create_async()
            .await;
        let _list = rest(&mut server, "POST", "/filters/list")
            .with_body(filter_body("NONE", "informational"))
            .create_async()
            .await;

        let mut prior = planned("low severity");
        prior.set("id", ARN);
        prior.set("arn", ARN);
        prior.set("tags_all", prior.get("tags").cloned().unwrap_or(Dynamic::Null));

        let mut plan = prior.clone();
        plan.set("action", "NONE");
        plan.set("description", "informational");

        let resource = FilterResource::new(test_helpers::client(&server.url()));
        let response = resource
            .update(UpdateRequest {
                context: ctx(),
                config: Config::new(),
                current_state: prior,
                planned_state: plan,
            })
            .await;

        update.assert_async().await;
        assert!(response.diagnostics.errors.is_empty(), "{:?}", response.diagnostics.errors);
        assert_eq!(response.state.get_string("action").as_deref(), Some("NONE"));
    }

    #[tokio::test]
    async fn delete_ignores_missing_filter() {
        let mut server = Server::new_async().await;
        let delete = rest_error(
            rest(&mut server, "POST", "/filters/delete"),
            404,
            NOT_FOUND_CODE,
            "filter does not exist",
        )
        .match_body(Matcher::PartialJson(json!({"arn": ARN})))
        .expect(1)
        .create_async()
        .await;

        let resource = FilterResource::new(test_helpers::client(&server.url()));
        let response = resource
            .delete(DeleteRequest {
                context: ctx(),
                current_state: test_helpers::state(&[("arn", Dynamic::from(ARN))]),
            })
            .await;

        delete.assert_async().await;
        assert!(response.diagnostics.is_empty());
    }

    #[tokio::test]
    async fn import_seeds_arn_and_id() {
        let server = Server::new_async().await;
        let resource = FilterResource::new(test_helpers::client(&server.url()));
        let response = resource
            .import_state(ImportStateRequest {
                context: ctx(),
                id: ARN.to_string(),
            })
            .await;

        let state = response.state.unwrap();
        assert_eq!(state.get_string("arn").as_deref(), Some(ARN));
        assert_eq!(state.get_string("id").as_deref(), Some(ARN));
    }
}
