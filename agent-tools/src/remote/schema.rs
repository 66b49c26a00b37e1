use agent_primitives::{ParameterSpec, ParameterType};
use serde_json::Value;

/// Maps a JSON Schema `object` definition to parameter declarations.
///
/// Reads `properties` (type and description of each entry) and the
/// `required` list. Anything else in the schema is ignored.
#[must_use]
pub fn parameters_from_schema(schema: &Value) -> Vec<ParameterSpec> {
    let Some(properties) = schema.get("properties").and_then(Value::as_object) else {
        return Vec::new();
    };
    let required: Vec<&str> = schema
        .get("required")
        .and_then(Value::as_array)
        .map(|names| names.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();

    properties
        .iter()
        .map(|(name, property)| {
            let kind = property
                .get("type")
                .and_then(Value::as_str)
                .map_or(ParameterType::String, ParameterType::from_schema_type);
            let description = property
                .get("description")
                .and_then(Value::as_str)
                .unwrap_or_default();
            let spec = if required.contains(&name.as_str()) {
                ParameterSpec::required(name.as_str(), kind, description)
            } else {
                ParameterSpec::optional(name.as_str(), kind, description)
            };
            match property.get("default") {
                Some(default) if !default.is_null() => spec.with_default(default.clone()),
                _ => spec,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn maps_types_and_required_flags() {
        let schema = json!({
            "type": "object",
            "properties": {
                "path": {"type": "string", "description": "File to read"},
                "limit": {"type": "integer", "default": 10},
                "tags": {"type": "array"},
                "weird": {"type": "uuid"}
            },
            "required": ["path"]
        });
        let specs = parameters_from_schema(&schema);
        let find = |name: &str| specs.iter().find(|s| s.name() == name).unwrap();

        assert_eq!(specs.len(), 4);
        assert!(find("path").is_required());
        assert_eq!(find("path").description(), "File to read");
        assert_eq!(find("limit").kind(), ParameterType::Integer);
        assert_eq!(find("limit").default_value(), Some(&json!(10)));
        assert!(!find("limit").is_required());
        assert_eq!(find("tags").kind(), ParameterType::Object);
        assert_eq!(find("weird").kind(), ParameterType::String);
    }

    #[test]
    fn parameters_follow_schema_order() {
        let schema: Value = serde_json::from_str(
            r#"{"type": "object", "properties": {
                "repo_path": {"type": "string"},
                "max_count": {"type": "integer"},
                "branch": {"type": "string"}
            }}"#,
        )
        .unwrap();
        let params = parameters_from_schema(&schema);
        let names: Vec<&str> = params
            .iter()
            .map(ParameterSpec::name)
            .collect();
        assert_eq!(names, ["repo_path", "max_count", "branch"]);
    }

    #[test]
    fn schema_without_properties_has_no_parameters() {
        assert!(parameters_from_schema(&json!({"type": "object"})).is_empty());
        assert!(parameters_from_schema(&Value::Null).is_empty());
    }
}
