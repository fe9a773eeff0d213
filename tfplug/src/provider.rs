//! Provider, resource and data source traits
//!
//! Providers are factories: the server asks for a fresh resource or data
//! source instance on every RPC and drops it afterwards. Schemas are served
//! separately so validation and planning never need a configured provider.

use crate::request::{
    ConfigureRequest, ConfigureResponse, CreateRequest, CreateResponse, DeleteRequest,
    DeleteResponse, ImportStateRequest, ImportStateResponse, ModifyPlanRequest,
    ModifyPlanResponse, ReadRequest, ReadResponse, UpdateRequest, UpdateResponse,
};
use crate::schema::{DataSourceSchema, ProviderSchema, ResourceSchema};
use crate::types::Diagnostics;
use crate::Result;
use async_trait::async_trait;
use std::collections::HashMap;

#[async_trait]
pub trait ProviderV2: Send + Sync {
    /// Schema of the `provider "..." {}` block
    async fn provider_schema(&self) -> ProviderSchema;

    async fn configure(&mut self, request: ConfigureRequest) -> ConfigureResponse;

    async fn create_resource(&self, name: &str) -> Result<Box<dyn ResourceV2>>;

    async fn create_data_source(&self, name: &str) -> Result<Box<dyn DataSourceV2>>;

    async fn resource_schemas(&self) -> HashMap<String, ResourceSchema>;

    async fn data_source_schemas(&self) -> HashMap<String, DataSourceSchema>;
}

#[async_trait]
pub trait ResourceV2: Send + Sync {
    /// Must return state for every schema attribute. On failure after the
    /// remote object exists, return partial state carrying its id so
    /// Terraform can track (and taint) it.
    async fn create(&self, request: CreateRequest) -> CreateResponse;

    /// Returns `None` state when the remote object is gone.
    async fn read(&self, request: ReadRequest) -> ReadResponse;

    async fn update(&self, request: UpdateRequest) -> UpdateResponse;

    /// A remote object that is already gone counts as deleted.
    async fn delete(&self, request: DeleteRequest) -> DeleteResponse;

    /// Turns an import identifier into seed state for a subsequent read.
    async fn import_state(&self, request: ImportStateRequest) -> ImportStateResponse {
        let mut diagnostics = Diagnostics::new();
        diagnostics.add_error(
            "Resource Import Not Implemented",
            Some(format!(
                "This resource does not support import (requested id \"{}\").",
                request.id
            )),
        );
        ImportStateResponse {
            state: None,
            diagnostics,
        }
    }

    /// Last chance to adjust the plan after schema defaults and modifiers ran.
    async fn modify_plan(&self, request: ModifyPlanRequest) -> ModifyPlanResponse {
        ModifyPlanResponse {
            planned_state: request.planned_state,
            requires_replace: Vec::new(),
            diagnostics: Diagnostics::new(),
        }
    }
}

#[async_trait]
pub trait DataSourceV2: Send + Sync {
    /// `current_state` carries the data source configuration.
    async fn read(&self, request: ReadRequest) -> ReadResponse;
}
