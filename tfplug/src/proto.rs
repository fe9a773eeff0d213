//! Generated Terraform Plugin Protocol v6.9 types.
//!
//! Messages are nested the way prost lays them out: RPC request/response
//! pairs live in snake_case modules (`read_resource::Request`), nested
//! enums in their parent's module (`diagnostic::Severity`). Several names
//! collide with framework types, so always refer to these through the
//! `proto::tfplugin6::` path.

pub mod tfplugin6 {
    tonic::include_proto!("tfplugin6");
}

#[cfg(test)]
mod tests {
    use super::tfplugin6::*;

    #[test]
    fn nested_types_are_reachable() {
        let _ = diagnostic::Severity::Warning;
        let _ = attribute_path::step::Selector::AttributeName("name".to_string());
        let _ = schema::nested_block::NestingMode::Single;
        let _ = import_resource_state::ImportedResource::default();
    }

    #[test]
    fn dynamic_value_defaults_to_empty_payloads() {
        let value = DynamicValue::default();
        assert!(value.msgpack.is_empty());
        assert!(value.json.is_empty());
    }
}
