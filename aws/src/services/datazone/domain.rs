//! `aws_datazone_domain`

use super::tags::update_tags;
use crate::conns::AwsClient;
use crate::create::{self, Action};
use crate::errs;
use crate::flex;
use crate::names::DATAZONE_SERVICE_NAME;
use crate::registry::ResourceRegistration;
use crate::tags::{self as tftags, KeyValueTags};
use crate::tfresource::{self, Error, Result, StateChangeConf};
use crate::timeouts::{self, Timeouts};
use async_trait::async_trait;
use aws_sdk_datazone::operation::get_domain::GetDomainOutput;
use aws_sdk_datazone::types::{AuthType, DomainStatus, SingleSignOn, UserAssignment};
use aws_sdk_datazone::Client;
use std::time::Duration;
use tfplug::import::import_state_passthrough_id;
use tfplug::plan_modifier::{RequiresReplaceIfChanged, UseStateForUnknown};
use tfplug::request::{
    CreateRequest, CreateResponse, DeleteRequest, DeleteResponse, ImportStateRequest,
    ImportStateResponse, ModifyPlanRequest, ModifyPlanResponse, ReadRequest, ReadResponse,
    UpdateRequest, UpdateResponse,
};
use tfplug::schema::ResourceSchema;
use tfplug::validator::OneOfValidator;
use tfplug::{
    AttributeBuilder, BlockBuilder, Config, Context, Diagnostics, Dynamic, ResourceV2,
    SchemaBuilder, State,
};

pub const TYPE_NAME: &str = "aws_datazone_domain";
const RESOURCE_NAME: &str = "Domain";

const DEFAULT_TIMEOUTS: Timeouts = Timeouts::minutes(10, 10, 10);
/// IAM role propagation
const CREATE_ATTEMPTS: usize = 12;
const CREATE_RETRY_DELAY: Duration = Duration::from_secs(10);
const NOT_FOUND_CODE: &str = "ResourceNotFoundException";

pub struct DomainResource {
    client: AwsClient,
}

impl DomainResource {
    pub fn new(client: AwsClient) -> Self {
        Self { client }
    }

    pub fn schema() -> ResourceSchema {
        SchemaBuilder::new()
            .version(0)
            .description("Manages a DataZone domain")
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
                    .description("Name of the domain"),
            )
            .attribute(AttributeBuilder::string("description").optional())
            .attribute(
                AttributeBuilder::string("domain_execution_role")
                    .required()
                    .description("ARN of the role DataZone uses to act on the domain's behalf"),
            )
            .attribute(
                AttributeBuilder::string("kms_key_identifier")
                    .optional()
                    .description("KMS key that encrypts the domain's metadata")
                    .plan_modifier(RequiresReplaceIfChanged),
            )
            .attribute(
                AttributeBuilder::bool("skip_deletion_check")
                    .optional()
                    .description("Delete the domain even if it still holds projects"),
            )
            .attribute(
                AttributeBuilder::string("portal_url")
                    .computed()
                    .plan_modifier(UseStateForUnknown),
            )
            .attribute(tftags::tags_attribute())
            .attribute(tftags::tags_all_attribute())
            .block(
                BlockBuilder::list("single_sign_on")
                    .max_items(1)
                    .attribute(
                        AttributeBuilder::string("type")
                            .optional()
                            .validator(OneOfValidator::new(&["IAM_IDC", "DISABLED"])),
                    )
                    .attribute(
                        AttributeBuilder::string("user_assignment")
                            .optional()
                            .validator(OneOfValidator::new(&["AUTOMATIC", "MANUAL"])),
                    ),
            )
            .block(timeouts::block(&["create", "delete"]))
            .build()
    }
}

fn factory(client: AwsClient) -> Box<dyn ResourceV2> {
    Box::new(DomainResource::new(client))
}

pub fn registration() -> ResourceRegistration {
    ResourceRegistration {
        type_name: TYPE_NAME,
        name: RESOURCE_NAME,
        schema: DomainResource::schema,
        factory,
    }
}

#[async_trait]
impl ResourceV2 for DomainResource {
    async fn create(&self, request: CreateRequest) -> CreateResponse {
        let mut diagnostics = Diagnostics::new();
        let mut state = request.planned_state;
        let conn = self.client.datazone();
        let name = state.get_string("name").unwrap_or_default();
        let timeouts = Timeouts::from_state(&state, DEFAULT_TIMEOUTS);

        let tags = tftags::tags_in(&self.client, &state);
        let input = conn
            .create_domain()
            .name(&name)
            .set_description(flex::string(&state, "description"))
            .set_domain_execution_role(flex::string(&state, "domain_execution_role"))
            .set_kms_key_identifier(flex::string(&state, "kms_key_identifier"))
            .set_single_sign_on(
                state.get_block("single_sign_on").map(|b| expand_single_sign_on(&b)),
            )
            .set_tags((!tags.is_empty()).then(|| tags.map()));

        let output = tfresource::retry_while_access_denied(
            &request.context,
            CREATE_ATTEMPTS,
            CREATE_RETRY_DELAY,
            || {
                let input = input.clone();
                async move { input.send().await.map_err(Error::from) }
            },
        )
        .await;

        let id = match output {
            Ok(output) => flex::owned_string(output.id()),
            Err(err) => {
                add_error(&mut diagnostics, Action::Creating, &name, &err);
                return CreateResponse { state, diagnostics };
            }
        };

        tracing::info!(id = %id, "created DataZone domain");
        state.set("id", id.as_str());

        let domain = match wait_domain_created(&request.context, conn, &id, timeouts.create).await {
            Ok(domain) => domain,
            Err(err) => {
                add_error(&mut diagnostics, Action::WaitingForCreation, &id, &err);
                return CreateResponse { state, diagnostics };
            }
        };

        let keep_single_sign_on = !state.get_blocks("single_sign_on").is_empty();
        flatten_domain(&mut state, &self.client, &domain, keep_single_sign_on);

        CreateResponse { state, diagnostics }
    }

    async fn read(&self, request: ReadRequest) -> ReadResponse {
        let mut diagnostics = Diagnostics::new();
        let mut state = request.current_state;
        let id = state.get_string("id").unwrap_or_default();

        match find_domain_by_id(self.client.datazone(), &id).await {
            Ok(domain) => {
                let keep_single_sign_on = !state.get_blocks("single_sign_on").is_empty();
                flatten_domain(&mut state, &self.client, &domain, keep_single_sign_on);
            }
            Err(err) if tfresource::not_found(&err) => {
                tracing::warn!(id = %id, "DataZone Domain not found, removing from state");
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
        let id = prior.get_string("id").unwrap_or_default();

        let changed = ["name", "description", "domain_execution_role", "single_sign_on"]
            .iter()
            .any(|key| flex::changed(prior.get(key), state.get(key)));

        if changed {
            let result = conn
                .update_domain()
                .identifier(&id)
                .set_name(flex::string(&state, "name"))
                .description(state.get_string("description").unwrap_or_default())
                .set_domain_execution_role(flex::string(&state, "domain_execution_role"))
                .set_single_sign_on(
                    state.get_block("single_sign_on").map(|b| expand_single_sign_on(&b)),
                )
                .send()
                .await;
            if let Err(err) = result {
                add_error(&mut diagnostics, Action::Updating, &id, &err.into());
                return UpdateResponse { state, diagnostics };
            }
        }

        if let Some((removed, updated)) = tftags::changes(&prior, &state) {
            let arn = prior.get_string("arn").unwrap_or_default();
            if let Err(err) = update_tags(conn, &arn, &removed, &updated).await {
                add_error(&mut diagnostics, Action::Tagging, &id, &err);
                return UpdateResponse { state, diagnostics };
            }
        }

        match find_domain_by_id(conn, &id).await {
            Ok(domain) => {
                let keep_single_sign_on = !state.get_blocks("single_sign_on").is_empty();
                flatten_domain(&mut state, &self.client, &domain, keep_single_sign_on);
            }
            Err(err) => add_error(&mut diagnostics, Action::Reading, &id, &err),
        }

        UpdateResponse { state, diagnostics }
    }

    async fn delete(&self, request: DeleteRequest) -> DeleteResponse {
        let mut diagnostics = Diagnostics::new();
        let state = request.current_state;
        let conn = self.client.datazone();
        let id = state.get_string("id").unwrap_or_default();
        let timeouts = Timeouts::from_state(&state, DEFAULT_TIMEOUTS);

        tracing::info!(id = %id, "deleting DataZone domain");
        let result = conn
            .delete_domain()
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

        if let Err(err) = wait_domain_deleted(&request.context, conn, &id, timeouts.delete).await {
            add_error(&mut diagnostics, Action::WaitingForDeletion, &id, &err);
        }

        DeleteResponse { diagnostics }
    }

    async fn import_state(&self, request: ImportStateRequest) -> ImportStateResponse {
        import_state_passthrough_id("id", &request.id)
    }

    async fn modify_plan(&self, request: ModifyPlanRequest) -> ModifyPlanResponse {
        tftags::modify_plan(&self.client, request)
    }
}

fn add_error(diagnostics: &mut Diagnostics, action: Action, id: &str, err: &Error) {
    create::add_error(diagnostics, DATAZONE_SERVICE_NAME, action, RESOURCE_NAME, id, err);
}

/// A domain that no longer exists, including one reported as DELETED.
pub async fn find_domain_by_id(conn: &Client, id: &str) -> Result<GetDomainOutput> {
    let output = conn
        .get_domain()
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

    if flex::enum_string(output.status()) == DomainStatus::Deleted.as_str() {
        return Err(Error::not_found(format!("DataZone Domain {id} is deleted")));
    }

    Ok(output)
}

async fn status_domain(conn: &Client, id: &str) -> Result<Option<(GetDomainOutput, String)>> {
    match find_domain_by_id(conn, id).await {
        Ok(output) => {
            let status = flex::enum_string(output.status());
            Ok(Some((output, status)))
        }
        Err(err) if tfresource::not_found(&err) => Ok(None),
        Err(err) => Err(err),
    }
}

async fn wait_domain_created(
    ctx: &Context,
    conn: &Client,
    id: &str,
    timeout: Duration,
) -> Result<GetDomainOutput> {
    StateChangeConf::new(
        &[DomainStatus::Creating.as_str()],
        &[DomainStatus::Available.as_str()],
        timeout,
        move || status_domain(conn, id),
    )
    .wait_for_state(ctx)
    .await?
    .ok_or(Error::EmptyResult)
}

async fn wait_domain_deleted(
    ctx: &Context,
    conn: &Client,
    id: &str,
    timeout: Duration,
) -> Result<()> {
    StateChangeConf::new(
        &[DomainStatus::Available.as_str(), DomainStatus::Deleting.as_str()],
        &[],
        timeout,
        move || status_domain(conn, id),
    )
    .wait_for_state(ctx)
    .await?;
    Ok(())
}

fn expand_single_sign_on(block: &Config) -> SingleSignOn {
    SingleSignOn::builder()
        .set_type(flex::string(block, "type").map(|t| AuthType::from(t.as_str())))
        .set_user_assignment(
            flex::string(block, "user_assignment").map(|u| UserAssignment::from(u.as_str())),
        )
        .build()
}

fn flatten_domain(
    state: &mut State,
    client: &AwsClient,
    domain: &GetDomainOutput,
    keep_single_sign_on: bool,
) {
    state.set("id", flex::owned_string(domain.id()));
    state.set("arn", flex::string_value(domain.arn()));
    state.set("name", flex::string_value(domain.name()));
    state.set("description", flex::string_value(domain.description()));
    state.set(
        "domain_execution_role",
        flex::string_value(domain.domain_execution_role()),
    );
    state.set(
        "kms_key_identifier",
        flex::string_value(domain.kms_key_identifier()),
    );
    state.set("portal_url", flex::string_value(domain.portal_url()));

    state.set(
        "single_sign_on",
        flatten_single_sign_on(domain.single_sign_on(), keep_single_sign_on),
    );

    let tags = domain
        .tags()
        .map(|tags| KeyValueTags::new(tags.clone()))
        .unwrap_or_default();
    tftags::set_tags_out(state, client, tags);
}

/// Single sign-on settings. A disabled setup is only written back when the
/// block is already in state.
fn flatten_single_sign_on(sso: Option<&SingleSignOn>, keep: bool) -> Dynamic {
    let sso = sso.filter(|sso| keep || sso.r#type().is_some_and(|t| *t != AuthType::Disabled));
    let block = sso.map(|sso| {
        let mut values = Config::new();
        values.set("type", flex::enum_value(sso.r#type()));
        values.set("user_assignment", flex::enum_value(sso.user_assignment()));
        values.into_dynamic()
    });
    Dynamic::List(block.into_iter().collect())
}
