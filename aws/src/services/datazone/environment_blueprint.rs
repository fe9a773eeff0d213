//! `aws_datazone_environment_blueprint` data source

use crate::conns::AwsClient;
use crate::create::{self, Action};
use crate::flex;
use crate::names::DATAZONE_SERVICE_NAME;
use crate::registry::DataSourceRegistration;
use crate::tfresource::{self, Result};
use async_trait::async_trait;
use aws_sdk_datazone::types::EnvironmentBlueprintSummary;
use aws_sdk_datazone::Client;
use tfplug::request::{ReadRequest, ReadResponse};
use tfplug::schema::DataSourceSchema;
use tfplug::{AttributeBuilder, DataSourceV2, Diagnostics, SchemaBuilder};

pub const TYPE_NAME: &str = "aws_datazone_environment_blueprint";
const DATA_SOURCE_NAME: &str = "Environment Blueprint";

pub struct EnvironmentBlueprintDataSource {
    client: AwsClient,
}

impl EnvironmentBlueprintDataSource {
    pub fn new(client: AwsClient) -> Self {
        Self { client }
    }

    pub fn schema() -> DataSourceSchema {
        SchemaBuilder::new()
            .version(0)
            .description("Looks up a DataZone environment blueprint by name")
            .attribute(AttributeBuilder::string("domain_id").required())
            .attribute(AttributeBuilder::string("name").required())
            .attribute(
                AttributeBuilder::bool("managed")
                    .required()
                    .description("Whether the blueprint is managed by AWS"),
            )
            .attribute(AttributeBuilder::string("id").computed())
            .attribute(AttributeBuilder::string("description").computed())
            .attribute(AttributeBuilder::string("blueprint_provider").computed())
            .build()
    }
}

fn factory(client: AwsClient) -> Box<dyn DataSourceV2> {
    Box::new(EnvironmentBlueprintDataSource::new(client))
}

pub fn registration() -> DataSourceRegistration {
    DataSourceRegistration {
        type_name: TYPE_NAME,
        name: DATA_SOURCE_NAME,
        schema: EnvironmentBlueprintDataSource::schema,
        factory,
    }
}

#[async_trait]
impl DataSourceV2 for EnvironmentBlueprintDataSource {
    async fn read(&self, request: ReadRequest) -> ReadResponse {
        let mut diagnostics = Diagnostics::new();
        let mut state = request.current_state;
        let domain = state.get_string("domain_id").unwrap_or_default();
        let name = state.get_string("name").unwrap_or_default();
        let managed = state.get_bool("managed").unwrap_or_default();

        match find_environment_blueprint_by_name(self.client.datazone(), &domain, &name, managed)
            .await
        {
            Ok(blueprint) => {
                state.set("id", flex::owned_string(blueprint.id()));
                state.set("name", flex::owned_string(blueprint.name()));
                state.set("description", flex::string_value(blueprint.description()));
                state.set("blueprint_provider", flex::string_value(blueprint.provider()));
            }
            Err(err) => {
                create::add_error(
                    &mut diagnostics,
                    DATAZONE_SERVICE_NAME,
                    Action::Reading,
                    DATA_SOURCE_NAME,
                    &name,
                    &err,
                );
                return ReadResponse {
                    state: None,
                    diagnostics,
                };
            }
        }

        ReadResponse {
            state: Some(state),
            diagnostics,
        }
    }
}

/// The API filters by name prefix; only an exact match is accepted.
pub async fn find_environment_blueprint_by_name(
    conn: &Client,
    domain: &str,
    name: &str,
    managed: bool,
) -> Result<EnvironmentBlueprintSummary> {
    let mut matches = Vec::new();
    let mut next_token = None;

    loop {
        let output = conn
            .list_environment_blueprints()
            .domain_identifier(domain)
            .managed(managed)
            .name(name)
            .set_next_token(next_token)
            .send()
            .await?;

        matches.extend(
            output
                .items()
                .iter()
                .filter(|blueprint| flex::owned_string(blueprint.name()) == name)
                .cloned(),
        );

        next_token = output.next_token().map(str::to_string);
        if next_token.is_none() {
            break;
        }
    }

    tfresource::assert_single_value_result(matches)
}
