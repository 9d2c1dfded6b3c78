use schemars::JsonSchema;
use serde::de::DeserializeOwned;

/// Types Claude can return via a forced tool call. The JSON schema is derived
/// with schemars and sent as the tool's input schema, so the model is
/// constrained to the struct's shape instead of free-form text.
pub trait StructuredOutput: DeserializeOwned + JsonSchema {
    fn schema() -> serde_json::Value {
        let schema = schemars::gen::SchemaGenerator::default().into_root_schema_for::<Self>();
        serde_json::to_value(schema).unwrap_or_default()
    }
}

impl<T: DeserializeOwned + JsonSchema> StructuredOutput for T {}
