//! `aws_datazone_project`

use crate::conns::AwsClient;
use crate::create::{self, Action};
use crate::errs;
use crate::flex;
use crate::names::DATAZONE_SERVICE_NAME;
use crate::registry::ResourceRegistration;
use crate::tfresource::{self, Error, Result, StateChangeConf};
use crate::timeouts::{self, Timeouts};
use async_trait::async_trait;
use aws_sdk_datazone::operation::get_project::GetProjectOutput;
use aws_sdk_datazone::types::{ProjectDeletionError, ProjectStatus};
use aws_sdk_datazone::Client;
use regex::Regex;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tfplug::import::import_state_composite_id;
use tfplug::plan_modifier::{RequiresReplaceIfChanged, UseStateForUnknown};
use tfplug::request::{
    CreateRequest, CreateResponse, DeleteRequest, DeleteResponse, ImportStateRequest,
    ImportStateResponse, ReadRequest, ReadResponse, UpdateRequest, UpdateResponse,
};
use tfplug::schema::ResourceSchema;
use tfplug::validator::{ListLengthValidator, StringLengthValidator, StringPatternValidator};
use tfplug::{
    AttributeBuilder, AttributeType, Config, Context, Diagnostics, Dynamic, ResourceV2,
    SchemaBuilder, State,
};

pub const TYPE_NAME: &str = "aws_datazone_project";
const RESOURCE_NAME: &str = "Project";

const DEFAULT_TIMEOUTS: Timeouts = Timeouts::minutes(3, 3, 3);
const IMPORT_ID_SEPARATOR: &str = ":";
const DOMAIN_IDENTIFIER_PATTERN: &str = r"^dzd[-_][a-zA-Z0-9_-]{1,36}$";
const NAME_PATTERN: &str = r"^[\w -]+$";
const NOT_FOUND_CODE: &str = "ResourceNotFoundException";

pub struct ProjectResource {
    client: AwsClient,
}

impl ProjectResource {
    pub fn new(client: AwsClient) -> Self {
        Self { client }
    }

    pub fn schema() -> ResourceSchema {
        let mut domain_identifier = AttributeBuilder::string("domain_identifier")
            .required()
            .description("Domain the project belongs to")
            .plan_modifier(RequiresReplaceIfChanged);
        if let Ok(pattern) = Regex::new(DOMAIN_IDENTIFIER_PATTERN) {
            domain_identifier =
                domain_identifier.validator(StringPatternValidator::new(pattern, "a domain ID"));
        }

        let mut name = AttributeBuilder::string("name")
            .required()
            .validator(StringLengthValidator::between(1, 64));
        if let Ok(pattern) = Regex::new(NAME_PATTERN) {
            name = name.validator(StringPatternValidator::new(
                pattern,
                "letters, digits, '_', '-' or spaces",
            ));
        }

        let failure_reason = AttributeType::Object(HashMap::from([
            ("code".to_string(), AttributeType::String),
            ("message".to_string(), AttributeType::String),
        ]));

        SchemaBuilder::new()
            .version(0)
            .description("Manages a DataZone project")
            .attribute(
                AttributeBuilder::string("id")
                    .computed()
                    .plan_modifier(UseStateForUnknown),
            )
            .attribute(domain_identifier)
            .attribute(name)
            .attribute(
                AttributeBuilder::string("description")
                    .optional()
                    .validator(StringLengthValidator::at_most(2048)),
            )
            .attribute(
                AttributeBuilder::list("glossary_terms", AttributeType::String)
                    .optional()
                    .description("Business glossary terms attached to the project")
                    .validator(ListLengthValidator::between(1, 20)),
            )
            .attribute(AttributeBuilder::bool("skip_deletion_check").optional())
            .attribute(
                AttributeBuilder::string("created_by")
                    .computed()
                    .plan_modifier(UseStateForUnknown),
            )
            .attribute(
                AttributeBuilder::string("created_at")
                    .computed()
                    .plan_modifier(UseStateForUnknown),
            )
            .attribute(AttributeBuilder::string("last_updated_at").computed())
            .attribute(AttributeBuilder::string("project_status").computed())
            .attribute(AttributeBuilder::list("failure_reasons", failure_reason).computed())
            .block(timeouts::block(&["create", "update", "delete"]))
            .build()
    }
}

fn factory(client: AwsClient) -> Box<dyn ResourceV2> {
    Box::new(ProjectResource::new(client))
}

pub fn registration() -> ResourceRegistration {
    ResourceRegistration {
        type_name: TYPE_NAME,
        name: RESOURCE_NAME,
        schema: ProjectResource::schema,
        factory,
    }
}

#[async_trait]
impl ResourceV2 for ProjectResource {
    async fn create(&self, request: CreateRequest) -> CreateResponse {
        let mut diagnostics = Diagnostics::new();
        let mut state = request.planned_state;
        let conn = self.client.datazone();
        let domain = state.get_string("domain_identifier").unwrap_or_default();
        let name = state.get_string("name").unwrap_or_default();
        let timeouts = Timeouts::from_state(&state, DEFAULT_TIMEOUTS);

        let glossary_terms = flex::expand_string_list(state.get("glossary_terms"));
        let result = conn
            .create_project()
            .domain_identifier(&domain)
            .name(&name)
            .set_description(flex::string(&state, "description"))
            .set_glossary_terms((!glossary_terms.is_empty()).then_some(glossary_terms))
            .send()
            .await;

        let id = match result {
            Ok(output) => flex::owned_string(output.id()),
            Err(err) => {
                add_error(&mut diagnostics, Action::Creating, &name, &err.into());
                return CreateResponse { state, diagnostics };
            }
        };

        tracing::info!(domain = %domain, id = %id, "created DataZone project");
        state.set("id", id.as_str());

        match wait_project_created(&request.context, conn, &domain, &id, timeouts.create).await {
            Ok(project) => flatten_project(&mut state, &project),
            Err(err) => add_error(&mut diagnostics, Action::WaitingForCreation, &id, &err),
        }

        CreateResponse { state, diagnostics }
    }

    async fn read(&self, request: ReadRequest) -> ReadResponse {
        let mut diagnostics = Diagnostics::new();
        let mut state = request.current_state;
        let domain = state.get_string("domain_identifier").unwrap_or_default();
        let id = state.get_string("id").unwrap_or_default();

        match find_project_by_id(self.client.datazone(), &domain, &id).await {
            Ok(project) => flatten_project(&mut state, &project),
            Err(err) if tfresource::not_found(&err) => {
                tracing::warn!(domain = %domain, id = %id, "DataZone Project not found, removing from state");
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

        if changed {
            let glossary_terms = flex::expand_string_list(state.get("glossary_terms"));
            let result = conn
                .update_project()
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
        }

        match wait_project_created(&request.context, conn, &domain, &id, timeouts.update).await {
            Ok(project) => flatten_project(&mut state, &project),
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

        tracing::info!(domain = %domain, id = %id, "deleting DataZone project");
        let result = conn
            .delete_project()
            .domain_identifier(&domain)
            .identifier(&id)
            .set_skip_deletion_check(state.get_bool("skip_deletion_check"))
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
            wait_project_deleted(&request.context, conn, &domain, &id, timeouts.delete).await
        {
            add_error(&mut diagnostics, Action::WaitingForDeletion, &id, &err);
        }

        DeleteResponse { diagnostics }
    }

    async fn import_state(&self, request: ImportStateRequest) -> ImportStateResponse {
        import_state_composite_id(&request.id, IMPORT_ID_SEPARATOR, &["domain_identifier", "id"])
    }
}

fn add_error(diagnostics: &mut Diagnostics, action: Action, id: &str, err: &Error) {
    create::add_error(diagnostics, DATAZONE_SERVICE_NAME, action, RESOURCE_NAME, id, err);
}

pub async fn find_project_by_id(conn: &Client, domain: &str, id: &str) -> Result<GetProjectOutput> {
    conn.get_project()
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
        })
}

async fn status_project(
    conn: &Client,
    domain: &str,
    id: &str,
) -> Result<Option<(GetProjectOutput, String)>> {
    match find_project_by_id(conn, domain, id).await {
        Ok(project) => {
            let status = flex::enum_string(project.project_status());
            Ok(Some((project, status)))
        }
        Err(err) if tfresource::not_found(&err) => Ok(None),
        Err(err) => Err(err),
    }
}

/// Joined `code: message` pairs of a project's failure reasons.
fn failure_reasons_message(reasons: &[ProjectDeletionError]) -> String {
    reasons
        .iter()
        .map(|reason| {
            format!(
                "{}: {}",
                flex::owned_string(reason.code()),
                flex::owned_string(reason.message())
            )
        })
        .collect::<Vec<_>>()
        .join("; ")
}

/// Waits for the project to settle in ACTIVE. New projects may not be
/// visible immediately; not-found results are retried.
async fn wait_project_created(
    ctx: &Context,
    conn: &Client,
    domain: &str,
    id: &str,
    timeout: Duration,
) -> Result<GetProjectOutput> {
    StateChangeConf::new(
        &[],
        &[ProjectStatus::Active.as_str()],
        timeout,
        move || status_project(conn, domain, id),
    )
    .wait_for_state(ctx)
    .await?
    .ok_or(Error::EmptyResult)
}

async fn wait_project_deleted(
    ctx: &Context,
    conn: &Client,
    domain: &str,
    id: &str,
    timeout: Duration,
) -> Result<()> {
    let last_failure = Mutex::new(String::new());
    let last_failure_ref = &last_failure;

    let result = StateChangeConf::new(
        &[ProjectStatus::Active.as_str(), ProjectStatus::Deleting.as_str()],
        &[],
        timeout,
        move || async move {
            let refreshed = status_project(conn, domain, id).await?;
            if let (Some((project, _)), Ok(mut last)) = (&refreshed, last_failure_ref.lock()) {
                *last = failure_reasons_message(project.failure_reasons());
            }
            Ok(refreshed)
        },
    )
    .wait_for_state(ctx)
    .await;

    let reason = last_failure.lock().map(|last| last.clone()).unwrap_or_default();
    result.map(|_| ()).map_err(|err| err.with_last_error(reason))
}

fn flatten_project(state: &mut State, project: &GetProjectOutput) {
    state.set("id", flex::owned_string(project.id()));
    state.set("domain_identifier", flex::owned_string(project.domain_id()));
    state.set("name", flex::owned_string(project.name()));
    state.set("description", flex::string_value(project.description()));
    state.set(
        "glossary_terms",
        flex::optional_string_list_value(project.glossary_terms()),
    );
    state.set("project_status", flex::enum_value(project.project_status()));
    state.set("created_by", flex::string_value(project.created_by()));
    state.set("created_at", flex::timestamp_value(project.created_at()));
    state.set("last_updated_at", flex::timestamp_value(project.last_updated_at()));

    let failure_reasons = project
        .failure_reasons()
        .iter()
        .map(|reason| {
            let mut values = Config::new();
            values.set("code", flex::string_value(reason.code()));
            values.set("message", flex::string_value(reason.message()));
            values.into_dynamic()
        })
        .collect();
    state.set("failure_reasons", Dynamic::List(failure_reasons));
}
