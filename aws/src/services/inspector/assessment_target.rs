//! `aws_inspector_assessment_target`

use crate::conns::AwsClient;
use crate::create::{self, Action};
use crate::errs;
use crate::flex;
use crate::names::INSPECTOR_SERVICE_NAME;
use crate::registry::ResourceRegistration;
use crate::tfresource::{self, Error, Result};
use async_trait::async_trait;
use aws_sdk_inspector::types::{
    AssessmentRunFilter, AssessmentRunState, AssessmentTarget, StopAction,
};
use aws_sdk_inspector::Client;
use std::time::Duration;
use tfplug::import::import_state_passthrough_id;
use tfplug::plan_modifier::UseStateForUnknown;
use tfplug::request::{
    CreateRequest, CreateResponse, DeleteRequest, DeleteResponse, ImportStateRequest,
    ImportStateResponse, ReadRequest, ReadResponse, UpdateRequest, UpdateResponse,
};
use tfplug::schema::ResourceSchema;
use tfplug::validator::StringLengthValidator;
use tfplug::{AttributeBuilder, Diagnostics, ResourceV2, SchemaBuilder, State};

pub const TYPE_NAME: &str = "aws_inspector_assessment_target";
const RESOURCE_NAME: &str = "Assessment Target";

const DELETE_TIMEOUT: Duration = Duration::from_secs(60 * 60);
const RUN_IN_PROGRESS_CODE: &str = "AssessmentRunInProgressException";
const NO_SUCH_ENTITY_CODE: &str = "NoSuchEntityException";

/// Runs that still hold the target.
const ACTIVE_RUN_STATES: &[AssessmentRunState] = &[
    AssessmentRunState::Created,
    AssessmentRunState::StartDataCollectionPending,
    AssessmentRunState::StartDataCollectionInProgress,
    AssessmentRunState::CollectingData,
    AssessmentRunState::StopDataCollectionPending,
    AssessmentRunState::DataCollected,
    AssessmentRunState::StartEvaluatingRulesPending,
    AssessmentRunState::EvaluatingRules,
];

pub struct AssessmentTargetResource {
    client: AwsClient,
}

impl AssessmentTargetResource {
    pub fn new(client: AwsClient) -> Self {
        Self { client }
    }

    pub fn schema() -> ResourceSchema {
        SchemaBuilder::new()
            .version(0)
            .description("Manages an Inspector Classic assessment target")
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
                AttributeBuilder::string("name")
                    .required()
                    .validator(StringLengthValidator::between(1, 140)),
            )
            .attribute(
                AttributeBuilder::string("resource_group_arn")
                    .optional()
                    .description("Resource group selecting the EC2 instances to assess; all instances when unset"),
            )
            .build()
    }
}

fn factory(client: AwsClient) -> Box<dyn ResourceV2> {
    Box::new(AssessmentTargetResource::new(client))
}

pub fn registration() -> ResourceRegistration {
    ResourceRegistration {
        type_name: TYPE_NAME,
        name: RESOURCE_NAME,
        schema: AssessmentTargetResource::schema,
        factory,
    }
}

#[async_trait]
impl ResourceV2 for AssessmentTargetResource {
    async fn create(&self, request: CreateRequest) -> CreateResponse {
        let mut diagnostics = Diagnostics::new();
        let mut state = request.planned_state;
        let conn = self.client.inspector();
        let name = state.get_string("name").unwrap_or_default();

        let result = conn
            .create_assessment_target()
            .assessment_target_name(&name)
            .set_resource_group_arn(state.get_string("resource_group_arn"))
            .send()
            .await;

        let arn = match result {
            Ok(output) => flex::owned_string(output.assessment_target_arn()),
            Err(err) => {
                add_error(&mut diagnostics, Action::Creating, &name, &err.into());
                return CreateResponse { state, diagnostics };
            }
        };

        tracing::info!(arn = %arn, "created Inspector Classic assessment target");
        state.set("id", arn.as_str());

        match find_assessment_target_by_arn(conn, &arn).await {
            Ok(target) => flatten_assessment_target(&mut state, &target),
            Err(err) => add_error(&mut diagnostics, Action::Reading, &arn, &err),
        }

        CreateResponse { state, diagnostics }
    }

    async fn read(&self, request: ReadRequest) -> ReadResponse {
        let mut diagnostics = Diagnostics::new();
        let mut state = request.current_state;
        let arn = state.get_string("id").unwrap_or_default();

        match find_assessment_target_by_arn(self.client.inspector(), &arn).await {
            Ok(target) => flatten_assessment_target(&mut state, &target),
            Err(err) if tfresource::not_found(&err) => {
                tracing::warn!(arn = %arn, "Inspector Classic Assessment Target not found, removing from state");
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
        let conn = self.client.inspector();
        let arn = request.current_state.get_string("id").unwrap_or_default();

        let result = conn
            .update_assessment_target()
            .assessment_target_arn(&arn)
            .assessment_target_name(state.get_string("name").unwrap_or_default())
            .set_resource_group_arn(state.get_string("resource_group_arn"))
            .send()
            .await;
        if let Err(err) = result {
            add_error(&mut diagnostics, Action::Updating, &arn, &err.into());
            return UpdateResponse { state, diagnostics };
        }

        match find_assessment_target_by_arn(conn, &arn).await {
            Ok(target) => flatten_assessment_target(&mut state, &target),
            Err(err) => add_error(&mut diagnostics, Action::Reading, &arn, &err),
        }

        UpdateResponse { state, diagnostics }
    }

    /// Targets with running assessments cannot be deleted; those runs are
    /// stopped and the delete retried.
    async fn delete(&self, request: DeleteRequest) -> DeleteResponse {
        let mut diagnostics = Diagnostics::new();
        let conn = self.client.inspector();
        let arn = request.current_state.get_string("id").unwrap_or_default();

        tracing::info!(arn = %arn, "deleting Inspector Classic assessment target");
        let result = tfresource::retry_when(
            &request.context,
            DELETE_TIMEOUT,
            || delete_assessment_target(conn, &arn),
            |err| errs::is_a(err, RUN_IN_PROGRESS_CODE),
        )
        .await;

        match result {
            Ok(()) => {}
            Err(err) if errs::is_a(&err, NO_SUCH_ENTITY_CODE) => {}
            Err(err) => add_error(&mut diagnostics, Action::Deleting, &arn, &err),
        }

        DeleteResponse { diagnostics }
    }

    async fn import_state(&self, request: ImportStateRequest) -> ImportStateResponse {
        import_state_passthrough_id("id", &request.id)
    }
}

fn add_error(diagnostics: &mut Diagnostics, action: Action, id: &str, err: &Error) {
    create::add_error(diagnostics, INSPECTOR_SERVICE_NAME, action, RESOURCE_NAME, id, err);
}

async fn delete_assessment_target(conn: &Client, arn: &str) -> Result<()> {
    let result = conn
        .delete_assessment_target()
        .assessment_target_arn(arn)
        .send()
        .await;

    match result {
        Ok(_) => Ok(()),
        Err(err) => {
            let err = Error::from(err);
            if errs::is_a(&err, RUN_IN_PROGRESS_CODE) {
                stop_assessment_runs(conn, arn).await?;
            }
            Err(err)
        }
    }
}

/// Stops every active run of every template that uses the target.
async fn stop_assessment_runs(conn: &Client, target_arn: &str) -> Result<()> {
    let mut template_arns = Vec::new();
    let mut next_token = None;
    loop {
        let output = conn
            .list_assessment_templates()
            .assessment_target_arns(target_arn)
            .set_next_token(next_token)
            .send()
            .await?;
        template_arns.extend_from_slice(output.assessment_template_arns());
        next_token = output.next_token().map(str::to_string);
        if next_token.is_none() {
            break;
        }
    }

    if template_arns.is_empty() {
        return Ok(());
    }

    let filter = AssessmentRunFilter::builder()
        .set_states(Some(ACTIVE_RUN_STATES.to_vec()))
        .build();

    let mut run_arns = Vec::new();
    let mut next_token = None;
    loop {
        let output = conn
            .list_assessment_runs()
            .set_assessment_template_arns(Some(template_arns.clone()))
            .filter(filter.clone())
            .set_next_token(next_token)
            .send()
            .await?;
        run_arns.extend_from_slice(output.assessment_run_arns());
        next_token = output.next_token().map(str::to_string);
        if next_token.is_none() {
            break;
        }
    }

    for run_arn in run_arns {
        tracing::debug!(run = %run_arn, target = %target_arn, "stopping Inspector Classic assessment run");
        let result = conn
            .stop_assessment_run()
            .assessment_run_arn(&run_arn)
            .stop_action(StopAction::SkipEvaluation)
            .send()
            .await;
        if let Err(err) = result {
            let err = Error::from(err);
            if !errs::is_a(&err, NO_SUCH_ENTITY_CODE) {
                return Err(err);
            }
        }
    }

    Ok(())
}

/// Unknown ARNs come back as failed items rather than an error.
pub async fn find_assessment_target_by_arn(conn: &Client, arn: &str) -> Result<AssessmentTarget> {
    let output = conn
        .describe_assessment_targets()
        .assessment_target_arns(arn)
        .send()
        .await?;

    tfresource::assert_single_value_result(output.assessment_targets().to_vec())
}

fn flatten_assessment_target(state: &mut State, target: &AssessmentTarget) {
    state.set("id", flex::owned_string(target.arn()));
    state.set("arn", flex::owned_string(target.arn()));
    state.set("name", flex::owned_string(target.name()));
    state.set(
        "resource_group_arn",
        flex::string_value(target.resource_group_arn()),
    );
}
