//! gRPC service implementation for ProviderV2
//!
//! This module implements the Terraform Plugin Protocol v6.9 on top of the
//! factory-based ProviderV2 traits. Resources and data sources are created
//! per request; the schema drives validation, planning and state shaping.

use crate::context::Context;
use crate::plan_modifier::PlanModifyRequest;
use crate::proto::tfplugin6::{
    provider_server::{Provider as ProtoProvider, ProviderServer as ProtoProviderServer},
    *,
};
use crate::provider::ProviderV2;
use crate::request::{
    ConfigureRequest, CreateRequest, DeleteRequest, ImportStateRequest, ModifyPlanRequest,
    ReadRequest, UpdateRequest,
};
use crate::schema::Schema as FrameworkSchema;
use crate::types::{
    AttributePath as FrameworkPath, AttributePathStep, Config, Diagnostics as TfplugDiagnostics,
    Dynamic,
};
use crate::Result;
use rmp_serde::{decode, encode};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::RwLock;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::transport::{Identity, Server, ServerTlsConfig};
use tonic::{Request, Response, Status};

type Object = HashMap<String, Dynamic>;

pub struct ProviderServer<P: ProviderV2> {
    provider: Arc<RwLock<P>>,
    cert_path: PathBuf,
    key_path: PathBuf,
    max_message_size: usize,
}

impl<P: ProviderV2 + 'static> ProviderServer<P> {
    pub fn new(provider: P, cert_path: PathBuf, key_path: PathBuf) -> Self {
        Self {
            provider: Arc::new(RwLock::new(provider)),
            cert_path,
            key_path,
            max_message_size: 256 << 20,
        }
    }

    pub fn with_max_message_size(mut self, size: usize) -> Self {
        self.max_message_size = size;
        self
    }

    pub async fn run(self) -> Result<()> {
        self.run_with_shutdown(std::future::pending()).await
    }

    /// Serves until `signal` resolves, then drains in-flight requests.
    pub async fn run_with_shutdown<F>(self, signal: F) -> Result<()>
    where
        F: std::future::Future<Output = ()> + Send,
    {
        // A second install in the same process is harmless.
        let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();

        let cert = tokio::fs::read(&self.cert_path).await?;
        let key = tokio::fs::read(&self.key_path).await?;
        let identity = Identity::from_pem(cert, key);

        let tls_config = ServerTlsConfig::new().identity(identity);

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let bound_addr = listener.local_addr()?;

        println!("1|6|tcp|127.0.0.1:{}|grpc", bound_addr.port());
        tracing::info!(port = bound_addr.port(), "provider server started");

        let stream = TcpListenerStream::new(listener);

        let service = ProviderService {
            provider: self.provider.clone(),
            stop: Context::new(),
        };

        Server::builder()
            .tls_config(tls_config)?
            .add_service(
                ProtoProviderServer::new(service)
                    .max_decoding_message_size(self.max_message_size)
                    .max_encoding_message_size(self.max_message_size),
            )
            .serve_with_incoming_shutdown(stream, signal)
            .await?;

        Ok(())
    }
}

/// Protocol handler. Holds the root context that `StopProvider` cancels.
pub struct ProviderService<P: ProviderV2> {
    provider: Arc<RwLock<P>>,
    stop: Context,
}

impl<P: ProviderV2 + 'static> ProviderService<P> {
    pub fn new(provider: P) -> Self {
        Self {
            provider: Arc::new(RwLock::new(provider)),
            stop: Context::new(),
        }
    }

    async fn resource_schema(&self, type_name: &str) -> std::result::Result<FrameworkSchema, Status> {
        let provider = self.provider.read().await;
        provider
            .resource_schemas()
            .await
            .remove(type_name)
            .ok_or_else(|| Status::not_found(format!("Unknown resource type: {}", type_name)))
    }

    async fn data_source_schema(
        &self,
        type_name: &str,
    ) -> std::result::Result<FrameworkSchema, Status> {
        let provider = self.provider.read().await;
        provider
            .data_source_schemas()
            .await
            .remove(type_name)
            .ok_or_else(|| Status::not_found(format!("Unknown data source type: {}", type_name)))
    }
}

#[tonic::async_trait]
impl<P: ProviderV2 + 'static> ProtoProvider for ProviderService<P> {
    async fn get_metadata(
        &self,
        _request: Request<get_metadata::Request>,
    ) -> std::result::Result<Response<get_metadata::Response>, Status> {
        let provider = self.provider.read().await;
        let mut resources: Vec<_> = provider
            .resource_schemas()
            .await
            .into_keys()
            .map(|type_name| get_metadata::ResourceMetadata { type_name })
            .collect();
        resources.sort_by(|a, b| a.type_name.cmp(&b.type_name));
        let mut data_sources: Vec<_> = provider
            .data_source_schemas()
            .await
            .into_keys()
            .map(|type_name| get_metadata::DataSourceMetadata { type_name })
            .collect();
        data_sources.sort_by(|a, b| a.type_name.cmp(&b.type_name));

        Ok(Response::new(get_metadata::Response {
            server_capabilities: Some(server_capabilities()),
            diagnostics: vec![],
            data_sources,
            resources,
            functions: vec![],
            ephemeral_resources: vec![],
        }))
    }

    async fn get_provider_schema(
        &self,
        _request: Request<get_provider_schema::Request>,
    ) -> std::result::Result<Response<get_provider_schema::Response>, Status> {
        let provider = self.provider.read().await;
        let provider_schema = provider.provider_schema().await;
        let resource_schemas = provider
            .resource_schemas()
            .await
            .into_iter()
            .map(|(name, schema)| (name, schema.to_proto()))
            .collect();
        let data_source_schemas = provider
            .data_source_schemas()
            .await
            .into_iter()
            .map(|(name, schema)| (name, schema.to_proto()))
            .collect();

        Ok(Response::new(get_provider_schema::Response {
            provider: Some(provider_schema.to_proto()),
            resource_schemas,
            data_source_schemas,
            server_capabilities: Some(server_capabilities()),
            ..Default::default()
        }))
    }

    async fn validate_provider_config(
        &self,
        request: Request<validate_provider_config::Request>,
    ) -> std::result::Result<Response<validate_provider_config::Response>, Status> {
        let req = request.into_inner();
        let config = decode_object(&req.config)?.unwrap_or_default();

        let schema = self.provider.read().await.provider_schema().await;
        let mut diagnostics = TfplugDiagnostics::new();
        schema
            .block
            .validate(&config, &FrameworkPath::root(), &mut diagnostics);

        Ok(Response::new(validate_provider_config::Response {
            diagnostics: convert_diagnostics(diagnostics),
        }))
    }

    async fn validate_resource_config(
        &self,
        request: Request<validate_resource_config::Request>,
    ) -> std::result::Result<Response<validate_resource_config::Response>, Status> {
        let req = request.into_inner();
        let schema = self.resource_schema(&req.type_name).await?;
        let config = decode_object(&req.config)?.unwrap_or_default();

        let mut diagnostics = TfplugDiagnostics::new();
        schema
            .block
            .validate(&config, &FrameworkPath::root(), &mut diagnostics);

        Ok(Response::new(validate_resource_config::Response {
            diagnostics: convert_diagnostics(diagnostics),
        }))
    }

    async fn validate_data_resource_config(
        &self,
        request: Request<validate_data_resource_config::Request>,
    ) -> std::result::Result<Response<validate_data_resource_config::Response>, Status> {
        let req = request.into_inner();
        let schema = self.data_source_schema(&req.type_name).await?;
        let config = decode_object(&req.config)?.unwrap_or_default();

        let mut diagnostics = TfplugDiagnostics::new();
        schema
            .block
            .validate(&config, &FrameworkPath::root(), &mut diagnostics);

        Ok(Response::new(validate_data_resource_config::Response {
            diagnostics: convert_diagnostics(diagnostics),
        }))
    }

    async fn upgrade_resource_state(
        &self,
        request: Request<upgrade_resource_state::Request>,
    ) -> std::result::Result<Response<upgrade_resource_state::Response>, Status> {
        let req = request.into_inner();
        let schema = self.resource_schema(&req.type_name).await?;
        let mut diagnostics = TfplugDiagnostics::new();

        let raw = match req.raw_state {
            Some(raw) if !raw.json.is_empty() => raw,
            Some(raw) if !raw.flatmap.is_empty() => {
                diagnostics.add_error(
                    "Unsupported state format",
                    Some(format!(
                        "State for {} uses the legacy flatmap format, which cannot be upgraded.",
                        req.type_name
                    )),
                );
                return Ok(Response::new(upgrade_resource_state::Response {
                    upgraded_state: None,
                    diagnostics: convert_diagnostics(diagnostics),
                }));
            }
            _ => {
                return Ok(Response::new(upgrade_resource_state::Response {
                    upgraded_state: None,
                    diagnostics: vec![],
                }))
            }
        };

        let values: Object = serde_json::from_slice(&raw.json)
            .map_err(|e| Status::invalid_argument(format!("Failed to decode state json: {}", e)))?;
        let upgraded = schema.block.normalize(values);

        Ok(Response::new(upgrade_resource_state::Response {
            upgraded_state: Some(encode_object(Some(&upgraded))?),
            diagnostics: convert_diagnostics(diagnostics),
        }))
    }

    async fn get_resource_identity_schemas(
        &self,
        _request: Request<get_resource_identity_schemas::Request>,
    ) -> std::result::Result<Response<get_resource_identity_schemas::Response>, Status> {
        Ok(Response::new(get_resource_identity_schemas::Response {
            identity_schemas: HashMap::new(),
            diagnostics: vec![],
        }))
    }

    async fn upgrade_resource_identity(
        &self,
        request: Request<upgrade_resource_identity::Request>,
    ) -> std::result::Result<Response<upgrade_resource_identity::Response>, Status> {
        let req = request.into_inner();
        Ok(Response::new(upgrade_resource_identity::Response {
            upgraded_identity: None,
            diagnostics: vec![error_diagnostic(
                "Resource Identity Not Supported",
                &format!("{} does not define a resource identity.", req.type_name),
            )],
        }))
    }

    async fn configure_provider(
        &self,
        request: Request<configure_provider::Request>,
    ) -> std::result::Result<Response<configure_provider::Response>, Status> {
        let req = request.into_inner();
        let config = decode_object(&req.config)?.unwrap_or_default();

        let mut provider = self.provider.write().await;
        let response = provider
            .configure(ConfigureRequest {
                context: self.stop.clone(),
                terraform_version: req.terraform_version,
                config: Config::from(config),
            })
            .await;

        Ok(Response::new(configure_provider::Response {
            diagnostics: convert_diagnostics(response.diagnostics),
        }))
    }

    async fn read_resource(
        &self,
        request: Request<read_resource::Request>,
    ) -> std::result::Result<Response<read_resource::Response>, Status> {
        let req = request.into_inner();
        let schema = self.resource_schema(&req.type_name).await?;

        let Some(current_state) = decode_object(&req.current_state)? else {
            return Ok(Response::new(read_resource::Response {
                new_state: req.current_state,
                private: req.private,
                ..Default::default()
            }));
        };

        let provider = self.provider.read().await;
        let resource = provider.create_resource(&req.type_name).await?;

        let read_resp = resource
            .read(ReadRequest {
                context: self.stop.clone(),
                current_state: Config::from(current_state.clone()),
            })
            .await;

        let new_state = match read_resp.state {
            Some(state) => Some(finalize_state(&schema, state.values)),
            // A failed read must not drop the object from state.
            None if read_resp.diagnostics.has_errors() => Some(current_state),
            None => {
                tracing::debug!(type_name = %req.type_name, "remote object gone, removing from state");
                None
            }
        };

        Ok(Response::new(read_resource::Response {
            new_state: Some(encode_object(new_state.as_ref())?),
            diagnostics: convert_diagnostics(read_resp.diagnostics),
            private: req.private,
            deferred: None,
            new_identity: None,
        }))
    }

    async fn plan_resource_change(
        &self,
        request: Request<plan_resource_change::Request>,
    ) -> std::result::Result<Response<plan_resource_change::Response>, Status> {
        let req = request.into_inner();
        let type_name = req.type_name.clone();
        let schema = self.resource_schema(&type_name).await?;

        let prior_state = decode_object(&req.prior_state)?;
        let config = decode_object(&req.config)?.unwrap_or_default();

        // Destroy plans are passed through untouched.
        let Some(mut planned_state) = decode_object(&req.proposed_new_state)? else {
            return Ok(Response::new(plan_resource_change::Response {
                planned_state: Some(encode_object(None)?),
                planned_private: req.prior_private,
                ..Default::default()
            }));
        };

        let is_create = prior_state.is_none();
        let mut requires_replace: Vec<FrameworkPath> = Vec::new();
        let mut all_diagnostics = TfplugDiagnostics::new();

        schema.block.apply_defaults(&config, &mut planned_state);

        if is_create || prior_state.as_ref() != Some(&planned_state) {
            schema
                .block
                .mark_computed_unknown(&config, &mut planned_state);
        }

        for (attr_name, attr_schema) in &schema.block.attributes {
            if attr_schema.plan_modifiers.is_empty() {
                continue;
            }

            let state_value = prior_state
                .as_ref()
                .and_then(|s| s.get(attr_name))
                .cloned()
                .unwrap_or(Dynamic::Null);
            let config_value = config.get(attr_name).cloned().unwrap_or(Dynamic::Null);
            let mut current_plan_value = planned_state
                .get(attr_name)
                .cloned()
                .unwrap_or(Dynamic::Null);

            for modifier in &attr_schema.plan_modifiers {
                let response = modifier.modify_plan(PlanModifyRequest {
                    state: state_value.clone(),
                    plan: current_plan_value.clone(),
                    config: config_value.clone(),
                    attribute_path: attr_name.clone(),
                });

                current_plan_value = response.plan_value;

                if response.requires_replace && !is_create {
                    let path = FrameworkPath::new(attr_name);
                    if !requires_replace.contains(&path) {
                        requires_replace.push(path);
                    }
                }

                all_diagnostics.extend(response.diagnostics);
            }

            planned_state.insert(attr_name.clone(), current_plan_value);
        }

        if !all_diagnostics.has_errors() {
            let provider = self.provider.read().await;
            // Planning can run against an unconfigured provider during
            // validation; resource-level plan hooks are skipped then.
            match provider.create_resource(&type_name).await {
                Ok(resource) => {
                    let response = resource
                        .modify_plan(ModifyPlanRequest {
                            context: self.stop.clone(),
                            config: Config::from(config.clone()),
                            prior_state: prior_state.clone().map(Config::from),
                            planned_state: Config::from(planned_state),
                        })
                        .await;
                    planned_state = response.planned_state.values;
                    if !is_create {
                        for path in response.requires_replace {
                            if !requires_replace.contains(&path) {
                                requires_replace.push(path);
                            }
                        }
                    }
                    all_diagnostics.extend(response.diagnostics);
                }
                Err(e) => {
                    tracing::debug!(type_name = %type_name, error = %e, "skipping resource plan hook");
                }
            }
        }

        let planned_state = schema.block.normalize(planned_state);

        Ok(Response::new(plan_resource_change::Response {
            planned_state: Some(encode_object(Some(&planned_state))?),
            requires_replace: requires_replace.iter().map(convert_path).collect(),
            planned_private: req.prior_private,
            diagnostics: convert_diagnostics(all_diagnostics),
            legacy_type_system: false,
            deferred: None,
            planned_identity: None,
        }))
    }

    async fn apply_resource_change(
        &self,
        request: Request<apply_resource_change::Request>,
    ) -> std::result::Result<Response<apply_resource_change::Response>, Status> {
        let req = request.into_inner();
        let type_name = req.type_name;
        let schema = self.resource_schema(&type_name).await?;

        let provider = self.provider.read().await;
        let resource = provider.create_resource(&type_name).await?;

        let prior_state = decode_object(&req.prior_state)?;
        let planned_state = decode_object(&req.planned_state)?;
        let config = Config::from(decode_object(&req.config)?.unwrap_or_default());

        let context = self.stop.clone();

        let (new_state, diagnostics) = match (prior_state, planned_state) {
            (None, Some(planned_state)) => {
                let create_resp = resource
                    .create(CreateRequest {
                        context,
                        config,
                        planned_state: Config::from(planned_state),
                    })
                    .await;
                let state = create_resp.state;
                // Keep a partially created object only when it has an id,
                // so Terraform can taint it instead of losing track of it.
                let keep = !create_resp.diagnostics.has_errors()
                    || state.get_string("id").is_some_and(|id| !id.is_empty());
                (keep.then_some(state.values), create_resp.diagnostics)
            }
            (Some(prior_state), None) => {
                let delete_resp = resource
                    .delete(DeleteRequest {
                        context,
                        current_state: Config::from(prior_state.clone()),
                    })
                    .await;
                if delete_resp.diagnostics.has_errors() {
                    (Some(prior_state), delete_resp.diagnostics)
                } else {
                    (None, delete_resp.diagnostics)
                }
            }
            (Some(prior_state), Some(planned_state)) => {
                let update_resp = resource
                    .update(UpdateRequest {
                        context,
                        config,
                        planned_state: Config::from(planned_state),
                        current_state: Config::from(prior_state.clone()),
                    })
                    .await;
                if update_resp.diagnostics.has_errors() {
                    (Some(prior_state), update_resp.diagnostics)
                } else {
                    (Some(update_resp.state.values), update_resp.diagnostics)
                }
            }
            (None, None) => (None, TfplugDiagnostics::new()),
        };

        let new_state = new_state.map(|values| finalize_state(&schema, values));

        Ok(Response::new(apply_resource_change::Response {
            new_state: Some(encode_object(new_state.as_ref())?),
            diagnostics: convert_diagnostics(diagnostics),
            private: vec![],
            legacy_type_system: false,
            new_identity: None,
        }))
    }

    async fn import_resource_state(
        &self,
        request: Request<import_resource_state::Request>,
    ) -> std::result::Result<Response<import_resource_state::Response>, Status> {
        let req = request.into_inner();
        let schema = self.resource_schema(&req.type_name).await?;

        let provider = self.provider.read().await;
        let resource = provider.create_resource(&req.type_name).await?;

        let import_resp = resource
            .import_state(ImportStateRequest {
                context: self.stop.clone(),
                id: req.id,
            })
            .await;

        let mut imported_resources = Vec::new();
        if let Some(state) = import_resp.state {
            if !import_resp.diagnostics.has_errors() {
                let state = schema.block.normalize(state.values);
                imported_resources.push(import_resource_state::ImportedResource {
                    type_name: req.type_name.clone(),
                    state: Some(encode_object(Some(&state))?),
                    private: vec![],
                    identity: None,
                });
            }
        }

        Ok(Response::new(import_resource_state::Response {
            imported_resources,
            diagnostics: convert_diagnostics(import_resp.diagnostics),
            deferred: None,
        }))
    }

    async fn move_resource_state(
        &self,
        request: Request<move_resource_state::Request>,
    ) -> std::result::Result<Response<move_resource_state::Response>, Status> {
        let req = request.into_inner();
        Ok(Response::new(move_resource_state::Response {
            diagnostics: vec![error_diagnostic(
                "Move Resource State Not Supported",
                &format!(
                    "Moving state from {} to {} is not supported.",
                    req.source_type_name, req.target_type_name
                ),
            )],
            ..Default::default()
        }))
    }

    async fn read_data_source(
        &self,
        request: Request<read_data_source::Request>,
    ) -> std::result::Result<Response<read_data_source::Response>, Status> {
        let req = request.into_inner();
        let type_name = req.type_name;
        let schema = self.data_source_schema(&type_name).await?;
        let config = decode_object(&req.config)?.unwrap_or_default();

        let provider = self.provider.read().await;
        let data_source = provider.create_data_source(&type_name).await?;

        tracing::debug!(type_name = %type_name, "reading data source");

        let read_resp = data_source
            .read(ReadRequest {
                context: self.stop.clone(),
                current_state: Config::from(config),
            })
            .await;

        let state = read_resp
            .state
            .map(|state| finalize_state(&schema, state.values));

        Ok(Response::new(read_data_source::Response {
            state: Some(encode_object(state.as_ref())?),
            diagnostics: convert_diagnostics(read_resp.diagnostics),
            deferred: None,
        }))
    }

    async fn validate_ephemeral_resource_config(
        &self,
        request: Request<validate_ephemeral_resource_config::Request>,
    ) -> std::result::Result<Response<validate_ephemeral_resource_config::Response>, Status> {
        let req = request.into_inner();
        Ok(Response::new(validate_ephemeral_resource_config::Response {
            diagnostics: vec![unknown_ephemeral(&req.type_name)],
        }))
    }

    async fn open_ephemeral_resource(
        &self,
        request: Request<open_ephemeral_resource::Request>,
    ) -> std::result::Result<Response<open_ephemeral_resource::Response>, Status> {
        let req = request.into_inner();
        Ok(Response::new(open_ephemeral_resource::Response {
            diagnostics: vec![unknown_ephemeral(&req.type_name)],
            ..Default::default()
        }))
    }

    async fn renew_ephemeral_resource(
        &self,
        request: Request<renew_ephemeral_resource::Request>,
    ) -> std::result::Result<Response<renew_ephemeral_resource::Response>, Status> {
        let req = request.into_inner();
        Ok(Response::new(renew_ephemeral_resource::Response {
            diagnostics: vec![unknown_ephemeral(&req.type_name)],
            ..Default::default()
        }))
    }

    async fn close_ephemeral_resource(
        &self,
        request: Request<close_ephemeral_resource::Request>,
    ) -> std::result::Result<Response<close_ephemeral_resource::Response>, Status> {
        let req = request.into_inner();
        Ok(Response::new(close_ephemeral_resource::Response {
            diagnostics: vec![unknown_ephemeral(&req.type_name)],
        }))
    }

    async fn get_functions(
        &self,
        _request: Request<get_functions::Request>,
    ) -> std::result::Result<Response<get_functions::Response>, Status> {
        Ok(Response::new(get_functions::Response {
            functions: HashMap::new(),
            diagnostics: vec![],
        }))
    }

    async fn call_function(
        &self,
        request: Request<call_function::Request>,
    ) -> std::result::Result<Response<call_function::Response>, Status> {
        let req = request.into_inner();
        Ok(Response::new(call_function::Response {
            result: None,
            error: Some(FunctionError {
                text: format!("Function not found: {}", req.name),
                function_argument: None,
            }),
        }))
    }

    async fn stop_provider(
        &self,
        _request: Request<stop_provider::Request>,
    ) -> std::result::Result<Response<stop_provider::Response>, Status> {
        tracing::info!("stop requested, cancelling in-flight operations");
        self.stop.cancel();
        Ok(Response::new(stop_provider::Response {
            error: String::new(),
        }))
    }
}

// Helper functions

fn server_capabilities() -> ServerCapabilities {
    ServerCapabilities {
        plan_destroy: false,
        get_provider_schema_optional: true,
        move_resource_state: false,
    }
}

/// Unknowns left after apply become null, and the object is trimmed to the
/// schema so Terraform can decode it.
fn finalize_state(schema: &FrameworkSchema, values: Object) -> Object {
    let values = values
        .into_iter()
        .map(|(k, v)| (k, v.unknown_to_null()))
        .collect();
    schema.block.normalize(values)
}

/// Decodes an object value. `None` means the value itself is null.
#[allow(clippy::result_large_err)]
fn decode_object(value: &Option<DynamicValue>) -> std::result::Result<Option<Object>, Status> {
    let Some(value) = value else {
        return Ok(None);
    };

    if !value.msgpack.is_empty() {
        decode::from_slice::<Option<Object>>(&value.msgpack).map_err(|e| {
            let preview = &value.msgpack[..value.msgpack.len().min(50)];
            tracing::debug!(?preview, "undecodable msgpack value");
            Status::invalid_argument(format!("Failed to decode msgpack: {}", e))
        })
    } else if !value.json.is_empty() {
        serde_json::from_slice::<Option<Object>>(&value.json)
            .map_err(|e| Status::invalid_argument(format!("Failed to decode json: {}", e)))
    } else {
        Ok(None)
    }
}

#[allow(clippy::result_large_err)]
fn encode_object(values: Option<&Object>) -> std::result::Result<DynamicValue, Status> {
    let msgpack = encode::to_vec_named(&values)
        .map_err(|e| Status::internal(format!("Failed to encode msgpack: {}", e)))?;

    Ok(DynamicValue {
        msgpack,
        json: vec![],
    })
}

fn convert_path(path: &FrameworkPath) -> AttributePath {
    AttributePath {
        steps: path
            .steps
            .iter()
            .map(|step| attribute_path::Step {
                selector: Some(match step {
                    AttributePathStep::AttributeName(name) => {
                        attribute_path::step::Selector::AttributeName(name.clone())
                    }
                    AttributePathStep::ElementKeyString(key) => {
                        attribute_path::step::Selector::ElementKeyString(key.clone())
                    }
                    AttributePathStep::ElementKeyInt(idx) => {
                        attribute_path::step::Selector::ElementKeyInt(*idx)
                    }
                }),
            })
            .collect(),
    }
}

fn error_diagnostic(summary: &str, detail: &str) -> Diagnostic {
    Diagnostic {
        severity: diagnostic::Severity::Error as i32,
        summary: summary.to_string(),
        detail: detail.to_string(),
        attribute: None,
        function_argument: None,
    }
}

fn unknown_ephemeral(type_name: &str) -> Diagnostic {
    error_diagnostic(
        "Ephemeral Resource Not Found",
        &format!("The provider does not define an ephemeral resource named {}.", type_name),
    )
}

fn convert_diagnostics(diags: TfplugDiagnostics) -> Vec<Diagnostic> {
    let mut result = Vec::new();

    for diag in diags.errors {
        result.push(Diagnostic {
            severity: diagnostic::Severity::Error as i32,
            summary: diag.summary,
            detail: diag.detail.unwrap_or_default(),
            attribute: diag.attribute.as_ref().map(convert_path),
            function_argument: None,
        });
    }

    for diag in diags.warnings {
        result.push(Diagnostic {
            severity: diagnostic::Severity::Warning as i32,
            summary: diag.summary,
            detail: diag.detail.unwrap_or_default(),
            attribute: diag.attribute.as_ref().map(convert_path),
            function_argument: None,
        });
    }

    result
}
