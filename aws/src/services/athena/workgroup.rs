//! `aws_athena_workgroup`

use super::tags::{list_tags, tags_in, update_tags};
use crate::conns::AwsClient;
use crate::create::{self, Action};
use crate::errs;
use crate::flex;
use crate::names::ATHENA_SERVICE_NAME;
use crate::registry::ResourceRegistration;
use crate::tags as tftags;
use crate::tfresource::{self, Error, Result};
use async_trait::async_trait;
use aws_sdk_athena::types::{
    AclConfiguration, EncryptionConfiguration, EncryptionOption, EngineVersion,
    ResultConfiguration, ResultConfigurationUpdates, S3AclOption, WorkGroup,
    WorkGroupConfiguration, WorkGroupConfigurationUpdates, WorkGroupState,
};
use aws_sdk_athena::Client;
use regex::Regex;
use tfplug::defaults::StaticDefault;
use tfplug::import::import_state_passthrough_id;
use tfplug::plan_modifier::{RequiresReplaceIfChanged, UseStateForUnknown};
use tfplug::request::{
    CreateRequest, CreateResponse, DeleteRequest, DeleteResponse, ImportStateRequest,
    ImportStateResponse, ModifyPlanRequest, ModifyPlanResponse, ReadRequest, ReadResponse,
    UpdateRequest, UpdateResponse,
};
use tfplug::schema::ResourceSchema;
use tfplug::validator::{
    NumberRangeValidator, OneOfValidator, StringLengthValidator, StringPatternValidator,
};
use tfplug::{
    AttributeBuilder, BlockBuilder, Config, Diagnostics, Dynamic, ResourceV2, SchemaBuilder, State,
};

pub const TYPE_NAME: &str = "aws_athena_workgroup";
const RESOURCE_NAME: &str = "WorkGroup";

const NAME_PATTERN: &str = r"^[a-zA-Z0-9._-]{1,128}$";
const DEFAULT_ENGINE_VERSION: &str = "AUTO";
const MIN_BYTES_SCANNED_CUTOFF: f64 = 10_485_760.0;
const NOT_FOUND_CODE: &str = "InvalidRequestException";
const NOT_FOUND_MESSAGE: &str = "is not found";

pub struct WorkGroupResource {
    client: AwsClient,
}

impl WorkGroupResource {
    pub fn new(client: AwsClient) -> Self {
        Self { client }
    }

    pub fn schema() -> ResourceSchema {
        let mut name = AttributeBuilder::string("name")
            .required()
            .description("Name of the workgroup")
            .plan_modifier(RequiresReplaceIfChanged);
        if let Ok(pattern) = Regex::new(NAME_PATTERN) {
            name = name.validator(StringPatternValidator::new(
                pattern,
                "1-128 letters, digits, '.', '_' or '-'",
            ));
        }

        SchemaBuilder::new()
            .version(0)
            .description("Manages an Athena workgroup")
            .attribute(
                AttributeBuilder::string("id")
                    .computed()
                    .description("Name of the workgroup")
                    .plan_modifier(UseStateForUnknown),
            )
            .attribute(
                AttributeBuilder::string("arn")
                    .computed()
                    .description("ARN of the workgroup")
                    .plan_modifier(UseStateForUnknown),
            )
            .attribute(name)
            .attribute(
                AttributeBuilder::string("description")
                    .optional()
                    .description("Description of the workgroup")
                    .validator(StringLengthValidator::at_most(1024)),
            )
            .attribute(
                AttributeBuilder::string("state")
                    .optional()
                    .computed()
                    .description("ENABLED or DISABLED")
                    .default(StaticDefault::string(WorkGroupState::Enabled.as_str()))
                    .validator(OneOfValidator::new(&["ENABLED", "DISABLED"])),
            )
            .attribute(
                AttributeBuilder::bool("force_destroy")
                    .optional()
                    .computed()
                    .description("Delete the workgroup together with its named queries")
                    .default(StaticDefault::bool(false)),
            )
            .attribute(tftags::tags_attribute())
            .attribute(tftags::tags_all_attribute())
            .block(configuration_block())
            .build()
    }
}

fn configuration_block() -> BlockBuilder {
    BlockBuilder::list("configuration")
        .description("Workgroup settings")
        .max_items(1)
        .attribute(
            AttributeBuilder::number("bytes_scanned_cutoff_per_query")
                .optional()
                .description("Upper data usage limit in bytes for each query")
                .validator(NumberRangeValidator::at_least(MIN_BYTES_SCANNED_CUTOFF)),
        )
        .attribute(
            AttributeBuilder::bool("enforce_workgroup_configuration")
                .optional()
                .computed()
                .default(StaticDefault::bool(true)),
        )
        .attribute(
            AttributeBuilder::bool("publish_cloudwatch_metrics_enabled")
                .optional()
                .computed()
                .default(StaticDefault::bool(true)),
        )
        .attribute(
            AttributeBuilder::bool("requester_pays_enabled")
                .optional()
                .computed()
                .default(StaticDefault::bool(false)),
        )
        .attribute(
            AttributeBuilder::string("execution_role")
                .optional()
                .description("Role used by Spark-enabled workgroups"),
        )
        .block(
            BlockBuilder::list("engine_version")
                .max_items(1)
                .attribute(
                    AttributeBuilder::string("selected_engine_version")
                        .optional()
                        .computed()
                        .default(StaticDefault::string(DEFAULT_ENGINE_VERSION)),
                )
                .attribute(AttributeBuilder::string("effective_engine_version").computed()),
        )
        .block(
            BlockBuilder::list("result_configuration")
                .max_items(1)
                .attribute(AttributeBuilder::string("output_location").optional())
                .attribute(AttributeBuilder::string("expected_bucket_owner").optional())
                .block(
                    BlockBuilder::list("encryption_configuration")
                        .max_items(1)
                        .attribute(
                            AttributeBuilder::string("encryption_option")
                                .optional()
                                .validator(OneOfValidator::new(&["SSE_S3", "SSE_KMS", "CSE_KMS"])),
                        )
                        .attribute(AttributeBuilder::string("kms_key_arn").optional()),
                )
                .block(
                    BlockBuilder::list("acl_configuration")
                        .max_items(1)
                        .attribute(
                            AttributeBuilder::string("s3_acl_option")
                                .required()
                                .validator(OneOfValidator::new(&["BUCKET_OWNER_FULL_CONTROL"])),
                        ),
                ),
        )
}

fn factory(client: AwsClient) -> Box<dyn ResourceV2> {
    Box::new(WorkGroupResource::new(client))
}

pub fn registration() -> ResourceRegistration {
    ResourceRegistration {
        type_name: TYPE_NAME,
        name: RESOURCE_NAME,
        schema: WorkGroupResource::schema,
        factory,
    }
}

#[async_trait]
impl ResourceV2 for WorkGroupResource {
    async fn create(&self, request: CreateRequest) -> CreateResponse {
        let mut diagnostics = Diagnostics::new();
        let mut state = request.planned_state;
        let conn = self.client.athena();
        let name = state.get_string("name").unwrap_or_default();

        let configuration = match state
            .get_block("configuration")
            .map(|block| expand_configuration(&block))
            .transpose()
        {
            Ok(configuration) => configuration,
            Err(err) => {
                add_error(&mut diagnostics, Action::Creating, &name, &err);
                return CreateResponse { state, diagnostics };
            }
        };

        let tags = tftags::tags_in(&self.client, &state);
        let result = conn
            .create_work_group()
            .name(&name)
            .set_description(flex::string(&state, "description"))
            .set_configuration(configuration)
            .set_tags((!tags.is_empty()).then(|| tags_in(&tags)))
            .send()
            .await;
        if let Err(err) = result {
            add_error(&mut diagnostics, Action::Creating, &name, &err.into());
            return CreateResponse { state, diagnostics };
        }

        tracing::info!(name = %name, "created Athena workgroup");
        state.set("id", name.as_str());

        if state.get_string("state").as_deref() == Some(WorkGroupState::Disabled.as_str()) {
            let result = conn
                .update_work_group()
                .work_group(&name)
                .state(WorkGroupState::Disabled)
                .send()
                .await;
            if let Err(err) = result {
                add_error(&mut diagnostics, Action::Updating, &name, &err.into());
                return CreateResponse { state, diagnostics };
            }
        }

        let keep_configuration = !state.get_blocks("configuration").is_empty();
        if let Err(err) = self.refresh(&mut state, &name, keep_configuration).await {
            add_error(&mut diagnostics, Action::Reading, &name, &err);
        }

        CreateResponse { state, diagnostics }
    }

    async fn read(&self, request: ReadRequest) -> ReadResponse {
        let mut diagnostics = Diagnostics::new();
        let mut state = request.current_state;
        let name = work_group_name(&state);

        let keep_configuration = !state.get_blocks("configuration").is_empty();
        match self.refresh(&mut state, &name, keep_configuration).await {
            Ok(()) => {}
            Err(err) if tfresource::not_found(&err) => {
                tracing::warn!(name = %name, "Athena WorkGroup not found, removing from state");
                return ReadResponse {
                    state: None,
                    diagnostics,
                };
            }
            Err(err) => {
                add_error(&mut diagnostics, Action::Reading, &name, &err);
            }
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
        let conn = self.client.athena();
        let name = work_group_name(&prior);

        let description_changed = flex::changed(prior.get("description"), state.get("description"));
        let state_changed = flex::changed(prior.get("state"), state.get("state"));
        let configuration_changed =
            flex::changed(prior.get("configuration"), state.get("configuration"));

        if description_changed || state_changed || configuration_changed {
            let mut input = conn.update_work_group().work_group(&name);
            if description_changed {
                input = input.description(state.get_string("description").unwrap_or_default());
            }
            if state_changed {
                if let Some(s) = state.get_string("state") {
                    input = input.state(WorkGroupState::from(s.as_str()));
                }
            }
            if configuration_changed {
                match expand_configuration_updates(state.get_block("configuration").as_ref()) {
                    Ok(updates) => input = input.configuration_updates(updates),
                    Err(err) => {
                        add_error(&mut diagnostics, Action::Updating, &name, &err);
                        return UpdateResponse { state, diagnostics };
                    }
                }
            }

            if let Err(err) = input.send().await {
                add_error(&mut diagnostics, Action::Updating, &name, &err.into());
                return UpdateResponse { state, diagnostics };
            }
        }

        if let Some((removed, updated)) = tftags::changes(&prior, &state) {
            let arn = self.arn(&name);
            if let Err(err) = update_tags(conn, &arn, &removed, &updated).await {
                add_error(&mut diagnostics, Action::Tagging, &name, &err);
                return UpdateResponse { state, diagnostics };
            }
        }

        let keep_configuration = !state.get_blocks("configuration").is_empty();
        if let Err(err) = self.refresh(&mut state, &name, keep_configuration).await {
            add_error(&mut diagnostics, Action::Reading, &name, &err);
        }

        UpdateResponse { state, diagnostics }
    }

    async fn delete(&self, request: DeleteRequest) -> DeleteResponse {
        let mut diagnostics = Diagnostics::new();
        let state = request.current_state;
        let name = work_group_name(&state);

        tracing::info!(name = %name, "deleting Athena workgroup");
        let result = self
            .client
            .athena()
            .delete_work_group()
            .work_group(&name)
            .recursive_delete_option(state.get_bool("force_destroy").unwrap_or(false))
            .send()
            .await;

        if let Err(err) = result {
            let err = Error::from(err);
            if !errs::is_a_error_message_contains(&err, NOT_FOUND_CODE, NOT_FOUND_MESSAGE) {
                add_error(&mut diagnostics, Action::Deleting, &name, &err);
            }
        }

        DeleteResponse { diagnostics }
    }

    async fn import_state(&self, request: ImportStateRequest) -> ImportStateResponse {
        let mut response = import_state_passthrough_id("name", &request.id);
        if let Some(state) = response.state.as_mut() {
            state.set("id", request.id.as_str());
            state.set("force_destroy", false);
        }
        response
    }

    async fn modify_plan(&self, request: ModifyPlanRequest) -> ModifyPlanResponse {
        tftags::modify_plan(&self.client, request)
    }
}

impl WorkGroupResource {
    fn arn(&self, name: &str) -> String {
        self.client.regional_arn("athena", &format!("workgroup/{name}"))
    }

    /// Reads the workgroup and its tags into `state`.
    async fn refresh(&self, state: &mut State, name: &str, keep_configuration: bool) -> Result<()> {
        let conn = self.client.athena();
        let work_group = find_work_group_by_name(conn, name).await?;
        let arn = self.arn(name);

        state.set("id", flex::owned_string(work_group.name()));
        state.set("name", flex::owned_string(work_group.name()));
        state.set("arn", arn.as_str());
        state.set("description", flex::string_value(work_group.description()));
        state.set("state", flex::enum_value(work_group.state()));
        state.set(
            "configuration",
            flatten_configuration(work_group.configuration(), keep_configuration),
        );
        if state.get_bool("force_destroy").is_none() {
            state.set("force_destroy", false);
        }

        let tags = list_tags(conn, &arn).await?;
        tftags::set_tags_out(state, &self.client, tags);

        Ok(())
    }
}

fn add_error(diagnostics: &mut Diagnostics, action: Action, name: &str, err: &Error) {
    create::add_error(diagnostics, ATHENA_SERVICE_NAME, action, RESOURCE_NAME, name, err);
}

fn work_group_name(state: &State) -> String {
    flex::string(state, "name")
        .or_else(|| flex::string(state, "id"))
        .unwrap_or_default()
}

pub async fn find_work_group_by_name(conn: &Client, name: &str) -> Result<WorkGroup> {
    let output = conn
        .get_work_group()
        .work_group(name)
        .send()
        .await
        .map_err(|err| {
            let err = Error::from(err);
            if errs::is_a_error_message_contains(&err, NOT_FOUND_CODE, NOT_FOUND_MESSAGE) {
                Error::not_found(err)
            } else {
                err
            }
        })?;

    output.work_group.ok_or(Error::EmptyResult)
}

fn expand_configuration(block: &Config) -> Result<WorkGroupConfiguration> {
    let mut builder = WorkGroupConfiguration::builder()
        .enforce_work_group_configuration(
            block.get_bool("enforce_workgroup_configuration").unwrap_or(true),
        )
        .publish_cloud_watch_metrics_enabled(
            block.get_bool("publish_cloudwatch_metrics_enabled").unwrap_or(true),
        )
        .requester_pays_enabled(block.get_bool("requester_pays_enabled").unwrap_or(false))
        .engine_version(expand_engine_version(block))
        .set_bytes_scanned_cutoff_per_query(block.get_i64("bytes_scanned_cutoff_per_query"))
        .set_execution_role(flex::string(block, "execution_role"));

    if let Some(result) = block.get_block("result_configuration") {
        builder = builder.result_configuration(expand_result_configuration(&result)?);
    }

    Ok(builder.build())
}

fn expand_engine_version(block: &Config) -> EngineVersion {
    let selected = block
        .get_block("engine_version")
        .and_then(|engine| flex::string(&engine, "selected_engine_version"))
        .unwrap_or_else(|| DEFAULT_ENGINE_VERSION.to_string());
    EngineVersion::builder()
        .selected_engine_version(selected)
        .build()
}

fn expand_result_configuration(block: &Config) -> Result<ResultConfiguration> {
    let mut builder = ResultConfiguration::builder()
        .set_output_location(flex::string(block, "output_location"))
        .set_expected_bucket_owner(flex::string(block, "expected_bucket_owner"));

    if let Some(encryption) = block.get_block("encryption_configuration") {
        builder = builder.encryption_configuration(expand_encryption_configuration(&encryption)?);
    }
    if let Some(acl) = block.get_block("acl_configuration") {
        builder = builder.acl_configuration(expand_acl_configuration(&acl)?);
    }

    Ok(builder.build())
}

fn expand_encryption_configuration(block: &Config) -> Result<EncryptionConfiguration> {
    Ok(EncryptionConfiguration::builder()
        .set_encryption_option(
            flex::string(block, "encryption_option").map(|o| EncryptionOption::from(o.as_str())),
        )
        .set_kms_key(flex::string(block, "kms_key_arn"))
        .build()?)
}

fn expand_acl_configuration(block: &Config) -> Result<AclConfiguration> {
    Ok(AclConfiguration::builder()
        .set_s3_acl_option(
            flex::string(block, "s3_acl_option").map(|o| S3AclOption::from(o.as_str())),
        )
        .build()?)
}

/// Settings to send when the `configuration` block changes. A removed block
/// resets the workgroup to the service defaults.
fn expand_configuration_updates(block: Option<&Config>) -> Result<WorkGroupConfigurationUpdates> {
    let empty = Config::new();
    let block = block.unwrap_or(&empty);

    let mut builder = WorkGroupConfigurationUpdates::builder()
        .enforce_work_group_configuration(
            block.get_bool("enforce_workgroup_configuration").unwrap_or(true),
        )
        .publish_cloud_watch_metrics_enabled(
            block.get_bool("publish_cloudwatch_metrics_enabled").unwrap_or(true),
        )
        .requester_pays_enabled(block.get_bool("requester_pays_enabled").unwrap_or(false))
        .engine_version(expand_engine_version(block))
        .set_execution_role(flex::string(block, "execution_role"));

    builder = match block.get_i64("bytes_scanned_cutoff_per_query") {
        Some(cutoff) => builder.bytes_scanned_cutoff_per_query(cutoff),
        None => builder.remove_bytes_scanned_cutoff_per_query(true),
    };

    let result = block.get_block("result_configuration").unwrap_or_default();
    builder = builder.result_configuration_updates(expand_result_configuration_updates(&result)?);

    Ok(builder.build())
}

fn expand_result_configuration_updates(block: &Config) -> Result<ResultConfigurationUpdates> {
    let mut builder = ResultConfigurationUpdates::builder();

    builder = match flex::string(block, "output_location") {
        Some(location) => builder.output_location(location),
        None => builder.remove_output_location(true),
    };
    builder = match flex::string(block, "expected_bucket_owner") {
        Some(owner) => builder.expected_bucket_owner(owner),
        None => builder.remove_expected_bucket_owner(true),
    };
    builder = match block.get_block("encryption_configuration") {
        Some(encryption) => {
            builder.encryption_configuration(expand_encryption_configuration(&encryption)?)
        }
        None => builder.remove_encryption_configuration(true),
    };
    builder = match block.get_block("acl_configuration") {
        Some(acl) => builder.acl_configuration(expand_acl_configuration(&acl)?),
        None => builder.remove_acl_configuration(true),
    };

    Ok(builder.build())
}

/// Workgroup settings left at the service defaults.
fn is_default_configuration(configuration: &WorkGroupConfiguration) -> bool {
    let result_is_empty = configuration.result_configuration().map_or(true, |result| {
        result.output_location().is_none()
            && result.expected_bucket_owner().is_none()
            && result.encryption_configuration().is_none()
            && result.acl_configuration().is_none()
    });
    let engine_is_default = configuration
        .engine_version()
        .and_then(EngineVersion::selected_engine_version)
        .map_or(true, |version| version == DEFAULT_ENGINE_VERSION);

    configuration.bytes_scanned_cutoff_per_query().is_none()
        && configuration.enforce_work_group_configuration().unwrap_or(true)
        && configuration.publish_cloud_watch_metrics_enabled().unwrap_or(true)
        && !configuration.requester_pays_enabled().unwrap_or(false)
        && configuration.execution_role().is_none()
        && result_is_empty
        && engine_is_default
}

/// The `configuration` block. Default settings are only written back when
/// the block is already in state, so an unconfigured workgroup shows no
/// drift.
fn flatten_configuration(configuration: Option<&WorkGroupConfiguration>, keep: bool) -> Dynamic {
    let Some(configuration) = configuration else {
        return Dynamic::List(Vec::new());
    };
    if !keep && is_default_configuration(configuration) {
        return Dynamic::List(Vec::new());
    }

    let mut block = Config::new();
    block.set(
        "bytes_scanned_cutoff_per_query",
        flex::int_value(configuration.bytes_scanned_cutoff_per_query()),
    );
    block.set(
        "enforce_workgroup_configuration",
        flex::bool_value(configuration.enforce_work_group_configuration()),
    );
    block.set(
        "publish_cloudwatch_metrics_enabled",
        flex::bool_value(configuration.publish_cloud_watch_metrics_enabled()),
    );
    block.set(
        "requester_pays_enabled",
        flex::bool_value(configuration.requester_pays_enabled()),
    );
    block.set("execution_role", flex::string_value(configuration.execution_role()));

    let engine_version = configuration.engine_version().map(|engine| {
        let mut values = Config::new();
        values.set(
            "selected_engine_version",
            flex::string_value(engine.selected_engine_version()),
        );
        values.set(
            "effective_engine_version",
            flex::string_value(engine.effective_engine_version()),
        );
        values.into_dynamic()
    });
    block.set("engine_version", Dynamic::List(engine_version.into_iter().collect()));

    let result_configuration = configuration
        .result_configuration()
        .map(flatten_result_configuration);
    block.set(
        "result_configuration",
        Dynamic::List(result_configuration.into_iter().collect()),
    );

    Dynamic::List(vec![block.into_dynamic()])
}

fn flatten_result_configuration(result: &ResultConfiguration) -> Dynamic {
    let mut values = Config::new();
    values.set("output_location", flex::string_value(result.output_location()));
    values.set(
        "expected_bucket_owner",
        flex::string_value(result.expected_bucket_owner()),
    );

    let encryption = result.encryption_configuration().map(|encryption| {
        let mut values = Config::new();
        values.set(
            "encryption_option",
            flex::enum_value(encryption.encryption_option()),
        );
        values.set("kms_key_arn", flex::string_value(encryption.kms_key()));
        values.into_dynamic()
    });
    values.set(
        "encryption_configuration",
        Dynamic::List(encryption.into_iter().collect()),
    );

    let acl = result.acl_configuration().map(|acl| {
        let mut values = Config::new();
        values.set("s3_acl_option", flex::enum_value(acl.s3_acl_option()));
        values.into_dynamic()
    });
    values.set("acl_configuration", Dynamic::List(acl.into_iter().collect()));

    values.into_dynamic()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{self, ctx, json_error, json_rpc};
    use mockito::{Matcher, Server};
    use serde_json::json;

    const GET_WORK_GROUP: &str = "AmazonAthena.GetWorkGroup";
    const LIST_TAGS: &str = "AmazonAthena.ListTagsForResource";

    fn work_group_body(state: &str, configuration: serde_json::Value) -> String {
        json!({
            "WorkGroup": {
                "Name": "primary",
                "State": state,
                "Description": "analytics",
                "Configuration": configuration,
                "CreationTime": 1_700_000_000.0
            }
        })
        .to_string()
    }

    fn default_configuration() -> serde_json::Value {
        json!({
            "EnforceWorkGroupConfiguration": true,
            "PublishCloudWatchMetricsEnabled": true,
            "RequesterPaysEnabled": false,
            "EngineVersion": {
                "SelectedEngineVersion": "AUTO",
                "EffectiveEngineVersion": "Athena engine version 3"
            }
        })
    }

    fn planned(state: &str) -> State {
        test_helpers::state(&[
            ("id", Dynamic::Unknown),
            ("arn", Dynamic::Unknown),
            ("name", Dynamic::from("primary")),
            ("description", Dynamic::from("analytics")),
            ("state", Dynamic::from(state)),
            ("force_destroy", Dynamic::Bool(false)),
            ("tags", Dynamic::Null),
            ("tags_all", Dynamic::Null),
            ("configuration", Dynamic::List(Vec::new())),
        ])
    }

    #[tokio::test]
    async fn create_reads_back_the_workgroup() {
        let mut server = Server::new_async().await;
        let create = json_rpc(&mut server, "AmazonAthena.CreateWorkGroup")
            .match_body(Matcher::PartialJson(json!({"Name": "primary", "Description": "analytics"})))
            .with_body("{}")
            .expect(1)
            .create_async()
            .await;
        let _get = json_rpc(&mut server, GET_WORK_GROUP)
            .with_body(work_group_body("ENABLED", default_configuration()))
            .create_async()
            .await;
        let _tags = json_rpc(&mut server, LIST_TAGS)
            .with_body(json!({"Tags": [{"Key": "Team", "Value": "data"}]}).to_string())
            .create_async()
            .await;

        let resource = WorkGroupResource::new(test_helpers::client(&server.url()));
        let response = resource
            .create(CreateRequest {
                context: ctx(),
                config: Config::new(),
                planned_state: planned("ENABLED"),
            })
            .await;

        create.assert_async().await;
        assert!(response.diagnostics.errors.is_empty(), "{:?}", response.diagnostics.errors);
        let state = response.state;
        assert_eq!(state.get_string("id").as_deref(), Some("primary"));
        assert_eq!(
            state.get_string("arn").as_deref(),
            Some("arn:aws:athena:us-west-2:123456789012:workgroup/primary")
        );
        assert_eq!(state.get_string("state").as_deref(), Some("ENABLED"));
        // Service defaults are not written into an unconfigured block.
        assert_eq!(state.get_blocks("configuration").len(), 0);
        assert_eq!(
            tftags::KeyValueTags::from_dynamic(state.get("tags")).get("Team"),
            Some("data")
        );
    }

    #[tokio::test]
    async fn create_disabled_workgroup_updates_state() {
        let mut server = Server::new_async().await;
        let _create = json_rpc(&mut server, "AmazonAthena.CreateWorkGroup")
            .with_body("{}")
            .create_async()
            .await;
        let update = json_rpc(&mut server, "AmazonAthena.UpdateWorkGroup")
            .match_body(Matcher::PartialJson(json!({"WorkGroup": "primary", "State": "DISABLED"})))
            .with_body("{}")
            .expect(1)
            .create_async()
            .await;
        let _get = json_rpc(&mut server, GET_WORK_GROUP)
            .with_body(work_group_body("DISABLED", default_configuration()))
            .create_async()
            .await;
        let _tags = json_rpc(&mut server, LIST_TAGS)
            .with_body(json!({"Tags": []}).to_string())
            .create_async()
            .await;

        let resource = WorkGroupResource::new(test_helpers::client(&server.url()));
        let response = resource
            .create(CreateRequest {
                context: ctx(),
                config: Config::new(),
                planned_state: planned("DISABLED"),
            })
            .await;

        update.assert_async().await;
        assert!(response.diagnostics.errors.is_empty());
        assert_eq!(response.state.get_string("state").as_deref(), Some("DISABLED"));
    }

    #[tokio::test]
    async fn failed_create_keeps_no_identifier() {
        let mut server = Server::new_async().await;
        let _create = json_rpc(&mut server, "AmazonAthena.CreateWorkGroup")
            .with_status(400)
            .with_body(json_error("InvalidRequestException", "WorkGroup primary already exists"))
            .create_async()
            .await;

        let resource = WorkGroupResource::new(test_helpers::client(&server.url()));
        let response = resource
            .create(CreateRequest {
                context: ctx(),
                config: Config::new(),
                planned_state: planned("ENABLED"),
            })
            .await;

        assert!(response.diagnostics.has_errors());
        assert!(response.diagnostics.errors[0]
            .summary
            .starts_with("creating Athena WorkGroup (primary): "));
        assert!(response.state.get_string("id").is_none());
    }

    #[tokio::test]
    async fn read_removes_missing_workgroup() {
        let mut server = Server::new_async().await;
        let _get = json_rpc(&mut server, GET_WORK_GROUP)
            .with_status(400)
            .with_body(json_error("InvalidRequestException", "WorkGroup primary is not found."))
            .create_async()
            .await;

        let resource = WorkGroupResource::new(test_helpers::client(&server.url()));
        let response = resource
            .read(ReadRequest {
                context: ctx(),
                current_state: test_helpers::state(&[("id", Dynamic::from("primary"))]),
            })
            .await;

        assert!(response.state.is_none());
        assert!(response.diagnostics.is_empty());
    }

    #[tokio::test]
    async fn read_surfaces_other_errors() {
        let mut server = Server::new_async().await;
        let _get = json_rpc(&mut server, GET_WORK_GROUP)
            .with_status(400)
            .with_body(json_error("InternalServerException", "boom"))
            .create_async()
            .await;

        let resource = WorkGroupResource::new(test_helpers::client(&server.url()));
        let response = resource
            .read(ReadRequest {
                context: ctx(),
                current_state: test_helpers::state(&[("name", Dynamic::from("primary"))]),
            })
            .await;

        assert!(response.state.is_some());
        assert!(response.diagnostics.errors[0]
            .summary
            .starts_with("reading Athena WorkGroup (primary): "));
    }

    #[tokio::test]
    async fn read_keeps_configuration_block_in_state() {
        let mut server = Server::new_async().await;
        let mut configuration = default_configuration();
        configuration["BytesScannedCutoffPerQuery"] = json!(10_485_760);
        configuration["ResultConfiguration"] = json!({
            "OutputLocation": "s3://results/",
            "EncryptionConfiguration": {"EncryptionOption": "SSE_KMS", "KmsKey": "arn:aws:kms:us-west-2:123456789012:key/k"}
        });
        let _get = json_rpc(&mut server, GET_WORK_GROUP)
            .with_body(work_group_body("ENABLED", configuration))
            .create_async()
            .await;
        let _tags = json_rpc(&mut server, LIST_TAGS)
            .with_body(json!({"Tags": []}).to_string())
            .create_async()
            .await;

        let resource = WorkGroupResource::new(test_helpers::client(&server.url()));
        let response = resource
            .read(ReadRequest {
                context: ctx(),
                current_state: test_helpers::state(&[("name", Dynamic::from("primary"))]),
            })
            .await;

        let state = response.state.unwrap();
        let configuration = state.get_block("configuration").unwrap();
        assert_eq!(configuration.get_i64("bytes_scanned_cutoff_per_query"), Some(10_485_760));
        let result = configuration.get_block("result_configuration").unwrap();
        assert_eq!(result.get_string("output_location").as_deref(), Some("s3://results/"));
        let encryption = result.get_block("encryption_configuration").unwrap();
        assert_eq!(encryption.get_string("encryption_option").as_deref(), Some("SSE_KMS"));
        let engine = configuration.get_block("engine_version").unwrap();
        assert_eq!(
            engine.get_string("effective_engine_version").as_deref(),
            Some("Athena engine version 3")
        );
        assert_eq!(state.get_bool("force_destroy"), Some(false));
    }

    #[tokio::test]
    async fn update_sends_only_changed_settings() {
        let mut server = Server::new_async().await;
        let update = json_rpc(&mut server, "AmazonAthena.UpdateWorkGroup")
            .match_body(Matcher::PartialJson(json!({"WorkGroup": "primary", "Description": "reporting"})))
            .with_body("{}")
            .expect(1)
            .create_async()
            .await;
        let tag = json_rpc(&mut server, "AmazonAthena.TagResource")
            .match_body(Matcher::PartialJson(json!({"Tags": [{"Key": "Team", "Value": "bi"}]})))
            .with_body("{}")
            .expect(1)
            .create_async()
            .await;
        let _get = json_rpc(&mut server, GET_WORK_GROUP)
            .with_body(work_group_body("ENABLED", default_configuration()))
            .create_async()
            .await;
        let _tags = json_rpc(&mut server, LIST_TAGS)
            .with_body(json!({"Tags": [{"Key": "Team", "Value": "bi"}]}).to_string())
            .create_async()
            .await;

        let mut prior = planned("ENABLED");
        prior.set("id", "primary");
        prior.set("tags_all", tftags::KeyValueTags::new([("Team", "data")]).to_dynamic());
        let mut plan = prior.clone();
        plan.set("description", "reporting");
        plan.set("tags_all", tftags::KeyValueTags::new([("Team", "bi")]).to_dynamic());

        let resource = WorkGroupResource::new(test_helpers::client(&server.url()));
        let response = resource
            .update(UpdateRequest {
                context: ctx(),
                config: Config::new(),
                planned_state: plan,
                current_state: prior,
            })
            .await;

        update.assert_async().await;
        tag.assert_async().await;
        assert!(response.diagnostics.errors.is_empty(), "{:?}", response.diagnostics.errors);
    }

    #[tokio::test]
    async fn delete_honours_force_destroy() {
        let mut server = Server::new_async().await;
        let delete = json_rpc(&mut server, "AmazonAthena.DeleteWorkGroup")
            .match_body(Matcher::PartialJson(json!({"WorkGroup": "primary", "RecursiveDeleteOption": true})))
            .with_body("{}")
            .expect(1)
            .create_async()
            .await;

        let resource = WorkGroupResource::new(test_helpers::client(&server.url()));
        let response = resource
            .delete(DeleteRequest {
                context: ctx(),
                current_state: test_helpers::state(&[
                    ("name", Dynamic::from("primary")),
                    ("force_destroy", Dynamic::Bool(true)),
                ]),
            })
            .await;

        delete.assert_async().await;
        assert!(response.diagnostics.is_empty());
    }

    #[tokio::test]
    async fn delete_of_missing_workgroup_succeeds() {
        let mut server = Server::new_async().await;
        let _delete = json_rpc(&mut server, "AmazonAthena.DeleteWorkGroup")
            .with_status(400)
            .with_body(json_error("InvalidRequestException", "WorkGroup primary is not found."))
            .create_async()
            .await;

        let resource = WorkGroupResource::new(test_helpers::client(&server.url()));
        let response = resource
            .delete(DeleteRequest {
                context: ctx(),
                current_state: test_helpers::state(&[("name", Dynamic::from("primary"))]),
            })
            .await;

        assert!(response.diagnostics.is_empty());
    }

    #[tokio::test]
    async fn import_uses_the_name() {
        let resource = WorkGroupResource::new(test_helpers::client("http://127.0.0.1:1"));
        let response = resource
            .import_state(ImportStateRequest {
                context: ctx(),
                id: "primary".to_string(),
            })
            .await;

        let state = response.state.unwrap();
        assert_eq!(state.get_string("name").as_deref(), Some("primary"));
        assert_eq!(state.get_string("id").as_deref(), Some("primary"));
    }

    #[test]
    fn default_configuration_is_hidden_unless_tracked() {
        let configuration = WorkGroupConfiguration::builder()
            .enforce_work_group_configuration(true)
            .publish_cloud_watch_metrics_enabled(true)
            .engine_version(EngineVersion::builder().selected_engine_version("AUTO").build())
            .build();

        assert_eq!(flatten_configuration(Some(&configuration), false), Dynamic::List(Vec::new()));
        assert!(matches!(
            flatten_configuration(Some(&configuration), true),
            Dynamic::List(items) if items.len() == 1
        ));

        let custom = WorkGroupConfiguration::builder()
            .requester_pays_enabled(true)
            .build();
        assert!(!is_default_configuration(&custom));
    }

    #[test]
    fn removed_configuration_resets_defaults() {
        let updates = expand_configuration_updates(None).unwrap();
        assert_eq!(updates.enforce_work_group_configuration(), Some(true));
        assert_eq!(updates.remove_bytes_scanned_cutoff_per_query(), Some(true));
        let result = updates.result_configuration_updates().unwrap();
        assert_eq!(result.remove_output_location(), Some(true));
        assert_eq!(result.remove_encryption_configuration(), Some(true));
    }

    #[test]
    fn encryption_requires_an_option() {
        let mut block = Config::new();
        block.set("kms_key_arn", "arn:aws:kms:us-west-2:123456789012:key/k");
        assert!(expand_encryption_configuration(&block).is_err());

        block.set("encryption_option", "SSE_KMS");
        let encryption = expand_encryption_configuration(&block).unwrap();
        assert_eq!(flex::enum_string(encryption.encryption_option()), "SSE_KMS");
    }
}
