//! `aws_datazone_environment`

use crate::conns::AwsClient;
use crate::create::{self, Action};
use crate::errs;
use crate::flex;
use crate::names::DATAZONE_SERVICE_NAME;
use crate::registry::ResourceRegistration;
use crate::tfresource::{self, Error, Result, StateChangeConf};
use crate::timeouts::{self, Timeouts};
use async_trait::async_trait;
use aws_sdk_datazone::operation::get_environment::GetEnvironmentOutput;
use aws_sdk_datazone::types::{EnvironmentParameter, EnvironmentStatus};
use aws_sdk_datazone::Client;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tfplug::import::import_state_composite_id;
use tfplug::plan_modifier::{RequiresReplaceIfChanged, UseStateForUnknown};
use tfplug::request::{
    CreateRequest, CreateResponse, DeleteRequest, DeleteResponse, ImportStateRequest,
    ImportStateResponse, ModifyPlanRequest, ModifyPlanResponse, ReadRequest, ReadResponse,
    UpdateRequest, UpdateResponse,
};
use tfplug::schema::ResourceSchema;
use tfplug::validator::ListLengthValidator;
use tfplug::{
    AttributeBuilder, AttributePath, AttributeType, BlockBuilder, Config, Context, Diagnostics,
    Dynamic, ResourceV2, SchemaBuilder, State,
};

pub const TYPE_NAME: &str = "aws_datazone_environment";
const RESOURCE_NAME: &str = "Environment";

const DEFAULT_TIMEOUTS: Timeouts = Timeouts::minutes(20, 20, 20);
const IMPORT_ID_SEPARATOR: &str = ",";
const NOT_FOUND_CODE: &str = "ResourceNotFoundException";

pub struct EnvironmentResource {
    client: AwsClient,
}

impl EnvironmentResource {
    pub fn new(client: AwsClient) -> Self {
        Self { client }
    }

    pub fn schema() -> ResourceSchema {
        let provisioned_resource = AttributeType::Object(HashMap::from([
            ("name".to_string(), AttributeType::String),
            ("provider".to_string(), AttributeType::String),
            ("type".to_string(), AttributeType::String),
            ("value".to_string(), AttributeType::String),
        ]));

        SchemaBuilder::new()
            .version(0)
            .description("Manages a DataZone environment")
            .attribute(
                AttributeBuilder::string("id")
                    .computed()
                    .plan_modifier(UseStateForUnknown),
            )
            .attribute(
                AttributeBuilder::string("domain_identifier")
                    .required()
                    .plan_modifier(RequiresReplaceIfChanged),
            )
            .attribute(
                AttributeBuilder::string("profile_identifier")
                    .required()
                    .description("Environment profile the environment is created from")
                    .plan_modifier(RequiresReplaceIfChanged),
            )
            .attribute(
                AttributeBuilder::string("project_identifier")
                    .required()
                    .plan_modifier(RequiresReplaceIfChanged),
            )
            .attribute(AttributeBuilder::string("name").required())
            .attribute(AttributeBuilder::string("description").optional())
            .attribute(
                AttributeBuilder::list("glossary_terms", AttributeType::String)
                    .optional()
                    .validator(ListLengthValidator::between(1, 20)),
            )
            .attribute(
                AttributeBuilder::string("account_identifier")
                    .optional()
                    .computed()
                    .plan_modifier(UseStateForUnknown)
                    .plan_modifier(RequiresReplaceIfChanged),
            )
            .attribute(
                AttributeBuilder::string("account_region")
                    .optional()
                    .computed()
                    .plan_modifier(UseStateForUnknown)
                    .plan_modifier(RequiresReplaceIfChanged),
            )
            .attribute(
                AttributeBuilder::string("blueprint_identifier")
                    .optional()
                    .computed()
                    .plan_modifier(UseStateForUnknown)
                    .plan_modifier(RequiresReplaceIfChanged),
            )
            .attribute(
                AttributeBuilder::string("created_at")
                    .computed()
                    .plan_modifier(UseStateForUnknown),
            )
            .attribute(
                AttributeBuilder::string("created_by")
                    .computed()
                    .plan_modifier(UseStateForUnknown),
            )
            .attribute(
                AttributeBuilder::string("provider_environment")
                    .computed()
                    .plan_modifier(UseStateForUnknown),
            )
            .attribute(
                AttributeBuilder::list("provisioned_resources", provisioned_resource).computed(),
            )
            .block(
                BlockBuilder::list("user_parameters")
                    .description("Parameter values for the environment profile. Changes force replacement.")
                    .attribute(AttributeBuilder::string("name").optional())
                    .attribute(AttributeBuilder::string("value").optional()),
            )
            .block(timeouts::block(&["create", "update", "delete"]))
            .build()
    }
}

fn factory(client: AwsClient) -> Box<dyn ResourceV2> {
    Box::new(EnvironmentResource::new(client))
}

pub fn registration() -> ResourceRegistration {
    ResourceRegistration {
        type_name: TYPE_NAME,
        name: RESOURCE_NAME,
        schema: EnvironmentResource::schema,
        factory,
    }
}

#[async_trait]
impl ResourceV2 for EnvironmentResource {
    async fn create(&self, request: CreateRequest) -> CreateResponse {
        let mut diagnostics = Diagnostics::new();
        let mut state = request.planned_state;
        let conn = self.client.datazone();
        let domain = state.get_string("domain_identifier").unwrap_or_default();
        let name = state.get_string("name").unwrap_or_default();
        let timeouts = Timeouts::from_state(&state, DEFAULT_TIMEOUTS);

        let glossary_terms = flex::expand_string_list(state.get("glossary_terms"));
        let user_parameters = expand_user_parameters(&state);
        let result = conn
            .create_environment()
            .domain_identifier(&domain)
            .project_identifier(state.get_string("project_identifier").unwrap_or_default())
            .environment_profile_identifier(
                state.get_string("profile_identifier").unwrap_or_default(),
            )
            .name(&name)
            .set_description(flex::string(&state, "description"))
            .set_glossary_terms((!glossary_terms.is_empty()).then_some(glossary_terms))
            .set_environment_account_identifier(flex::string(&state, "account_identifier"))
            .set_environment_account_region(flex::string(&state, "account_region"))
            .set_environment_blueprint_identifier(flex::string(&state, "blueprint_identifier"))
            .set_user_parameters((!user_parameters.is_empty()).then_some(user_parameters))
            .send()
            .await;

        let id = match result {
            Ok(output) => flex::owned_string(output.id()),
            Err(err) => {
                add_error(&mut diagnostics, Action::Creating, &name, &err.into());
                return CreateResponse { state, diagnostics };
            }
        };

        tracing::info!(domain = %domain, id = %id, "created DataZone environment");
        state.set("id", id.as_str());

        match wait_environment_created(&request.context, conn, &domain, &id, timeouts.create).await
        {
            Ok(environment) => flatten_environment(&mut state, &environment),
            Err(err) => add_error(&mut diagnostics, Action::WaitingForCreation, &id, &err),
        }

        CreateResponse { state, diagnostics }
    }

    async fn read(&self, request: ReadRequest) -> ReadResponse {
        let mut diagnostics = Diagnostics::new();
        let mut state = request.current_state;
        let domain = state.get_string("domain_identifier").unwrap_or_default();
        let id = state.get_string("id").unwrap_or_default();

        match find_environment_by_id(self.client.datazone(), &domain, &id).await {
            Ok(environment) => flatten_environment(&mut state, &environment),
            Err(err) if tfresource::not_found(&err) => {
                tracing::warn!(domain = %domain, id = %id, "DataZone Environment not found, removing from state");
                return ReadResponse {
                    state: None,
                    diagnostics,
                };
            }
            Err(err) => add_error(&mut diagnostics, Action::Reading, &id, &err),
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
        let conn = self.client.datazone();
        let domain = prior.get_string("domain_identifier").unwrap_or_default();
        let id = prior.get_string("id").unwrap_or_default();
        let timeouts = Timeouts::from_state(&state, DEFAULT_TIMEOUTS);

        let changed = ["name", "description", "glossary_terms"]
            .iter()
            .any(|key| flex::changed(prior.get(key), state.get(key)));
        if !changed {
            match find_environment_by_id(conn, &domain, &id).await {
                Ok(environment) => flatten_environment(&mut state, &environment),
                Err(err) => add_error(&mut diagnostics, Action::Reading, &id, &err),
            }
            return UpdateResponse { state, diagnostics };
        }

        let glossary_terms = flex::expand_string_list(state.get("glossary_terms"));
        let result = conn
            .update_environment()
            .domain_identifier(&domain)
            .identifier(&id)
            .set_name(flex::string(&state, "name"))
            .description(state.get_string("description").unwrap_or_default())
            .set_glossary_terms((!glossary_terms.is_empty()).then_some(glossary_terms))
            .send()
            .await;
        if let Err(err) = result {
            add_error(&mut diagnostics, Action::Updating, &id, &err.into());
            return UpdateResponse { state, diagnostics };
        }

        match wait_environment_updated(&request.context, conn, &domain, &id, timeouts.update).await
        {
            Ok(environment) => flatten_environment(&mut state, &environment),
            Err(err) => add_error(&mut diagnostics, Action::WaitingForUpdate, &id, &err),
        }

        UpdateResponse { state, diagnostics }
    }

    async fn delete(&self, request: DeleteRequest) -> DeleteResponse {
        let mut diagnostics = Diagnostics::new();
        let state = request.current_state;
        let conn = self.client.datazone();
        let domain = state.get_string("domain_identifier").unwrap_or_default();
        let id = state.get_string("id").unwrap_or_default();
        let timeouts = Timeouts::from_state(&state, DEFAULT_TIMEOUTS);

        tracing::info!(domain = %domain, id = %id, "deleting DataZone environment");
        let result = conn
            .delete_environment()
            .domain_identifier(&domain)
            .identifier(&id)
            .send()
            .await;

        if let Err(err) = result {
            let err = Error::from(err);
            if !errs::is_a(&err, NOT_FOUND_CODE) {
                add_error(&mut diagnostics, Action::Deleting, &id, &err);
            }
            return DeleteResponse { diagnostics };
        }

        if let Err(err) =
            wait_environment_deleted(&request.context, conn, &domain, &id, timeouts.delete).await
        {
            add_error(&mut diagnostics, Action::WaitingForDeletion, &id, &err);
        }

        DeleteResponse { diagnostics }
    }

    async fn import_state(&self, request: ImportStateRequest) -> ImportStateResponse {
        import_state_composite_id(&request.id, IMPORT_ID_SEPARATOR, &["domain_identifier", "id"])
    }

    /// Parameter values are fixed at creation; any change replaces the
    /// environment.
    async fn modify_plan(&self, request: ModifyPlanRequest) -> ModifyPlanResponse {
        let mut requires_replace = Vec::new();
        if let Some(prior) = &request.prior_state {
            if flex::changed(
                prior.get("user_parameters"),
                request.planned_state.get("user_parameters"),
            ) {
                requires_replace.push(AttributePath::new("user_parameters"));
            }
        }

        ModifyPlanResponse {
            planned_state: request.planned_state,
            requires_replace,
            diagnostics: Diagnostics::new(),
        }
    }
}

fn add_error(diagnostics: &mut Diagnostics, action: Action, id: &str, err: &Error) {
    create::add_error(diagnostics, DATAZONE_SERVICE_NAME, action, RESOURCE_NAME, id, err);
}

/// An environment reported as DELETED counts as gone.
pub async fn find_environment_by_id(
    conn: &Client,
    domain: &str,
    id: &str,
) -> Result<GetEnvironmentOutput> {
    let output = conn
        .get_environment()
        .domain_identifier(domain)
        .identifier(id)
        .send()
        .await
        .map_err(|err| {
            let err = Error::from(err);
            if errs::is_a(&err, NOT_FOUND_CODE) {
                Error::not_found(err)
            } else {
                err
            }
        })?;

    if flex::enum_string(output.status()) == EnvironmentStatus::Deleted.as_str() {
        return Err(Error::not_found(format!(
            "DataZone Environment {id} is deleted"
        )));
    }

    Ok(output)
}

/// Message of the last failed deployment, if any.
fn deployment_failure(environment: &GetEnvironmentOutput) -> String {
    environment
        .last_deployment()
        .and_then(|deployment| deployment.failure_reason())
        .map(|reason| flex::owned_string(reason.message()))
        .unwrap_or_default()
}

/// Polls the environment, recording the last deployment failure seen.
async fn status_environment(
    conn: &Client,
    domain: &str,
    id: &str,
    last_failure: &Mutex<String>,
) -> Result<Option<(GetEnvironmentOutput, String)>> {
    match find_environment_by_id(conn, domain, id).await {
        Ok(environment) => {
            if let Ok(mut last) = last_failure.lock() {
                *last = deployment_failure(&environment);
            }
            let status = flex::enum_string(environment.status());
            Ok(Some((environment, status)))
        }
        Err(err) if tfresource::not_found(&err) => Ok(None),
        Err(err) => Err(err),
    }
}

async fn wait_environment(
    ctx: &Context,
    conn: &Client,
    domain: &str,
    id: &str,
    pending: &[&str],
    target: &[&str],
    timeout: Duration,
) -> Result<Option<GetEnvironmentOutput>> {
    let last_failure = Mutex::new(String::new());
    let last_failure_ref = &last_failure;

    let result = StateChangeConf::new(pending, target, timeout, move || {
        status_environment(conn, domain, id, last_failure_ref)
    })
    .wait_for_state(ctx)
    .await;

    let reason = last_failure.lock().map(|last| last.clone()).unwrap_or_default();
    result.map_err(|err| err.with_last_error(reason))
}

async fn wait_environment_created(
    ctx: &Context,
    conn: &Client,
    domain: &str,
    id: &str,
    timeout: Duration,
) -> Result<GetEnvironmentOutput> {
    wait_environment(
        ctx,
        conn,
        domain,
        id,
        &[EnvironmentStatus::Creating.as_str()],
        &[EnvironmentStatus::Active.as_str()],
        timeout,
    )
    .await?
    .ok_or(Error::EmptyResult)
}

async fn wait_environment_updated(
    ctx: &Context,
    conn: &Client,
    domain: &str,
    id: &str,
    timeout: Duration,
) -> Result<GetEnvironmentOutput> {
    wait_environment(
        ctx,
        conn,
        domain,
        id,
        &[EnvironmentStatus::Updating.as_str()],
        &[EnvironmentStatus::Active.as_str()],
        timeout,
    )
    .await?
    .ok_or(Error::EmptyResult)
}

async fn wait_environment_deleted(
    ctx: &Context,
    conn: &Client,
    domain: &str,
    id: &str,
    timeout: Duration,
) -> Result<()> {
    wait_environment(
        ctx,
        conn,
        domain,
        id,
        &[
            EnvironmentStatus::Active.as_str(),
            EnvironmentStatus::Deleting.as_str(),
        ],
        &[],
        timeout,
    )
    .await?;
    Ok(())
}

fn expand_user_parameters(config: &Config) -> Vec<EnvironmentParameter> {
    config
        .get_blocks("user_parameters")
        .iter()
        .map(|parameter| {
            EnvironmentParameter::builder()
                .set_name(parameter.get_string("name"))
                .set_value(parameter.get_string("value"))
                .build()
        })
        .collect()
}

/// `user_parameters` stays as configured: the API echoes the profile's
/// parameter definitions rather than the submitted values.
fn flatten_environment(state: &mut State, environment: &GetEnvironmentOutput) {
    state.set("id", flex::owned_string(environment.id()));
    state.set("domain_identifier", flex::owned_string(environment.domain_id()));
    state.set("project_identifier", flex::owned_string(environment.project_id()));
    state.set(
        "profile_identifier",
        flex::string_value(environment.environment_profile_id()),
    );
    state.set("name", flex::owned_string(environment.name()));
    state.set("description", flex::string_value(environment.description()));
    state.set(
        "glossary_terms",
        flex::optional_string_list_value(environment.glossary_terms()),
    );
    state.set(
        "account_identifier",
        flex::string_value(environment.aws_account_id()),
    );
    state.set(
        "account_region",
        flex::string_value(environment.aws_account_region()),
    );
    state.set(
        "blueprint_identifier",
        flex::string_value(environment.environment_blueprint_id()),
    );
    state.set("created_at", flex::timestamp_value(environment.created_at()));
    state.set("created_by", flex::string_value(environment.created_by()));
    state.set("provider_environment", flex::string_value(environment.provider()));

    let resources = environment
        .provisioned_resources()
        .iter()
        .map(|resource| {
            let mut values = Config::new();
            values.set("name", flex::string_value(resource.name()));
            values.set("provider", flex::string_value(resource.provider()));
            values.set("type", flex::string_value(resource.r#type()));
            values.set("value", flex::string_value(resource.value()));
            values.into_dynamic()
        })
        .collect();
    state.set("provisioned_resources", Dynamic::List(resources));

    if state.get("user_parameters").is_none() {
        state.set("user_parameters", Dynamic::List(Vec::new()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{self, ctx, rest, rest_error};
    use mockito::{Matcher, Server};
    use serde_json::json;

    const ENVIRONMENTS_PATH: &str = "/v2/domains/dzd_123/environments";
    const ENVIRONMENT_PATH: &str = "/v2/domains/dzd_123/environments/env_789";

    fn environment_body(status: &str) -> serde_json::Value {
        json!({
            "id": "env_789",
            "domainId": "dzd_123",
            "projectId": "prj_456",
            "environmentProfileId": "ep_1",
            "name": "lake",
            "createdBy": "user-1",
            "provider": "Amazon SageMaker",
            "status": status,
            "awsAccountId": test_helpers::ACCOUNT_ID,
            "awsAccountRegion": test_helpers::REGION,
            "environmentBlueprintId": "bp_1",
            "provisionedResources": [
                {"name": "glueDatabase", "provider": "Amazon Glue", "type": "string", "value": "lake_db"}
            ]
        })
    }

    fn planned() -> State {
        test_helpers::state(&[
            ("id", Dynamic::Unknown),
            ("domain_identifier", Dynamic::from("dzd_123")),
            ("project_identifier", Dynamic::from("prj_456")),
            ("profile_identifier", Dynamic::from("ep_1")),
            ("name", Dynamic::from("lake")),
            ("account_identifier", Dynamic::Unknown),
            ("account_region", Dynamic::Unknown),
            (
                "user_parameters",
                Dynamic::List(vec![Config::from(HashMap::from([
                    ("name".to_string(), Dynamic::from("consumerGlueDbName")),
                    ("value".to_string(), Dynamic::from("lake_db")),
                ]))
                .into_dynamic()]),
            ),
        ])
    }

    #[tokio::test]
    async fn create_waits_for_active() {
        let mut server = Server::new_async().await;
        let create = rest(&mut server, "POST", ENVIRONMENTS_PATH)
            .match_body(Matcher::PartialJson(json!({
                "projectIdentifier": "prj_456",
                "environmentProfileIdentifier": "ep_1",
                "userParameters": [{"name": "consumerGlueDbName", "value": "lake_db"}]
            })))
            .with_status(201)
            .with_body(environment_body("CREATING").to_string())
            .expect(1)
            .create_async()
            .await;
        let _get = rest(&mut server, "GET", ENVIRONMENT_PATH)
            .with_body(environment_body("ACTIVE").to_string())
            .create_async()
            .await;

        let resource = EnvironmentResource::new(test_helpers::client(&server.url()));
        let response = resource
            .create(CreateRequest {
                context: ctx(),
                config: Config::new(),
                planned_state: planned(),
            })
            .await;

        create.assert_async().await;
        assert!(response.diagnostics.errors.is_empty(), "{:?}", response.diagnostics.errors);
        let state = response.state;
        assert_eq!(state.get_string("id").as_deref(), Some("env_789"));
        assert_eq!(
            state.get_string("account_identifier").as_deref(),
            Some(test_helpers::ACCOUNT_ID)
        );
        assert_eq!(state.get_string("blueprint_identifier").as_deref(), Some("bp_1"));
        assert_eq!(
            state.get_string("provider_environment").as_deref(),
            Some("Amazon SageMaker")
        );
        let resources = state.get_blocks("provisioned_resources");
        assert_eq!(resources.len(), 1);
        assert_eq!(resources[0].get_string("value").as_deref(), Some("lake_db"));
        assert_eq!(state.get_blocks("user_parameters").len(), 1);
    }

    #[tokio::test]
    async fn failed_deployment_is_reported() {
        let mut server = Server::new_async().await;
        let _create = rest(&mut server, "POST", ENVIRONMENTS_PATH)
            .with_status(201)
            .with_body(environment_body("CREATING").to_string())
            .create_async()
            .await;
        let mut failed = environment_body("CREATE_FAILED");
        failed["lastDeployment"] = json!({
            "deploymentStatus": "FAILED",
            "failureReason": {"code": "400", "message": "blueprint not enabled"}
        });
        let _get = rest(&mut server, "GET", ENVIRONMENT_PATH)
            .with_body(failed.to_string())
            .create_async()
            .await;

        let resource = EnvironmentResource::new(test_helpers::client(&server.url()));
        let response = resource
            .create(CreateRequest {
                context: ctx(),
                config: Config::new(),
                planned_state: planned(),
            })
            .await;

        assert_eq!(response.state.get_string("id").as_deref(), Some("env_789"));
        assert_eq!(
            response.diagnostics.errors[0].summary,
            "waiting for creation DataZone Environment (env_789): unexpected state 'CREATE_FAILED', wanted target 'ACTIVE'. last error: blueprint not enabled"
        );
    }

    #[tokio::test]
    async fn update_renames_and_waits() {
        let mut server = Server::new_async().await;
        let update = rest(&mut server, "PATCH", ENVIRONMENT_PATH)
            .match_body(Matcher::PartialJson(json!({"name": "lakehouse"})))
            .with_body(environment_body("UPDATING").to_string())
            .expect(1)
            .create_async()
            .await;
        let mut renamed = environment_body("ACTIVE");
        renamed["name"] = json!("lakehouse");
        let _get = rest(&mut server, "GET", ENVIRONMENT_PATH)
            .with_body(renamed.to_string())
            .create_async()
            .await;

        let mut prior = planned();
        prior.set("id", "env_789");
        let mut plan = prior.clone();
        plan.set("name", "lakehouse");

        let resource = EnvironmentResource::new(test_helpers::client(&server.url()));
        let response = resource
            .update(UpdateRequest {
                context: ctx(),
                config: Config::new(),
                planned_state: plan,
                current_state: prior,
            })
            .await;

        update.assert_async().await;
        assert!(response.diagnostics.errors.is_empty(), "{:?}", response.diagnostics.errors);
        assert_eq!(response.state.get_string("name").as_deref(), Some("lakehouse"));
    }

    #[tokio::test]
    async fn read_removes_deleted_environment() {
        let mut server = Server::new_async().await;
        let _get = rest(&mut server, "GET", ENVIRONMENT_PATH)
            .with_body(environment_body("DELETED").to_string())
            .create_async()
            .await;

        let resource = EnvironmentResource::new(test_helpers::client(&server.url()));
        let response = resource
            .read(ReadRequest {
                context: ctx(),
                current_state: test_helpers::state(&[
                    ("domain_identifier", Dynamic::from("dzd_123")),
                    ("id", Dynamic::from("env_789")),
                ]),
            })
            .await;

        assert!(response.state.is_none());
        assert!(response.diagnostics.is_empty());
    }

    #[tokio::test]
    async fn delete_of_missing_environment_succeeds() {
        let mut server = Server::new_async().await;
        let delete = rest(&mut server, "DELETE", ENVIRONMENT_PATH);
        let _delete = rest_error(delete, 404, NOT_FOUND_CODE, "environment not found")
            .create_async()
            .await;

        let resource = EnvironmentResource::new(test_helpers::client(&server.url()));
        let response = resource
            .delete(DeleteRequest {
                context: ctx(),
                current_state: test_helpers::state(&[
                    ("domain_identifier", Dynamic::from("dzd_123")),
                    ("id", Dynamic::from("env_789")),
                ]),
            })
            .await;

        assert!(response.diagnostics.is_empty());
    }

    #[tokio::test]
    async fn changed_user_parameters_force_replacement() {
        let resource = EnvironmentResource::new(test_helpers::client("http://127.0.0.1:1"));
        let mut prior = planned();
        prior.set("id", "env_789");

        let unchanged = resource
            .modify_plan(ModifyPlanRequest {
                context: ctx(),
                config: Config::new(),
                prior_state: Some(prior.clone()),
                planned_state: prior.clone(),
            })
            .await;
        assert!(unchanged.requires_replace.is_empty());

        let mut plan = prior.clone();
        plan.set("user_parameters", Dynamic::List(Vec::new()));
        let changed = resource
            .modify_plan(ModifyPlanRequest {
                context: ctx(),
                config: Config::new(),
                prior_state: Some(prior),
                planned_state: plan.clone(),
            })
            .await;
        assert_eq!(changed.requires_replace, vec![AttributePath::new("user_parameters")]);

        let create = resource
            .modify_plan(ModifyPlanRequest {
                context: ctx(),
                config: Config::new(),
                prior_state: None,
                planned_state: plan,
            })
            .await;
        assert!(create.requires_replace.is_empty());
    }

    #[tokio::test]
    async fn import_uses_comma_separated_identifier() {
        let resource = EnvironmentResource::new(test_helpers::client("http://127.0.0.1:1"));
        let response = resource
            .import_state(ImportStateRequest {
                context: ctx(),
                id: "dzd_123,env_789".to_string(),
            })
            .await;
        let state = response.state.unwrap();
        assert_eq!(state.get_string("domain_identifier").as_deref(), Some("dzd_123"));
        assert_eq!(state.get_string("id").as_deref(), Some("env_789"));

        let response = resource
            .import_state(ImportStateRequest {
                context: ctx(),
                id: "dzd_123:env_789".to_string(),
            })
            .await;
        assert!(response.state.is_none());
        assert_eq!(response.diagnostics.errors[0].summary, "Unexpected Import Identifier");
    }
}
