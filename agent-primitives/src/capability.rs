//! Capability descriptors shared across the agent runtime.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

const MAX_NAME_LEN: usize = 96;

/// Primitive type a capability parameter is declared with.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterType {
    /// Free-form text.
    String,
    /// Whole number.
    Integer,
    /// Floating point number.
    Number,
    /// True / false flag.
    Boolean,
    /// Structured JSON value.
    Object,
}

impl ParameterType {
    /// Maps a JSON-schema `type` keyword onto a parameter type.
    ///
    /// Arrays are carried as structured values; anything unrecognised is
    /// treated as text.
    #[must_use]
    pub fn from_schema_type(keyword: &str) -> Self {
        match keyword {
            "integer" => Self::Integer,
            "number" => Self::Number,
            "boolean" => Self::Boolean,
            "object" | "array" => Self::Object,
            _ => Self::String,
        }
    }

    /// Returns the lowercase keyword for this type.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Object => "object",
        }
    }
}

impl fmt::Display for ParameterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Declaration of a single named, typed parameter.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ParameterSpec {
    name: String,
    #[serde(rename = "type")]
    kind: ParameterType,
    #[serde(default)]
    description: String,
    #[serde(default = "default_required")]
    required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    default: Option<Value>,
}

fn default_required() -> bool {
    true
}

impl ParameterSpec {
    /// Declares a required parameter.
    #[must_use]
    pub fn required(
        name: impl Into<String>,
        kind: ParameterType,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            description: description.into(),
            required: true,
            default: None,
        }
    }

    /// Declares an optional parameter.
    #[must_use]
    pub fn optional(
        name: impl Into<String>,
        kind: ParameterType,
        description: impl Into<String>,
    ) -> Self {
        Self {
            required: false,
            ..Self::required(name, kind, description)
        }
    }

    /// Attaches a default value used when the parameter is omitted.
    #[must_use]
    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    /// Parameter name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared primitive type.
    #[must_use]
    pub const fn kind(&self) -> ParameterType {
        self.kind
    }

    /// Human-readable description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Whether callers must supply the parameter.
    #[must_use]
    pub const fn is_required(&self) -> bool {
        self.required
    }

    /// Default value, if one was declared.
    #[must_use]
    pub fn default_value(&self) -> Option<&Value> {
        self.default.as_ref()
    }
}

/// Immutable description of one invocable tool.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CapabilityDescriptor {
    name: String,
    description: String,
    parameters: Vec<ParameterSpec>,
}

impl CapabilityDescriptor {
    /// Starts building a descriptor for the supplied tool name.
    #[must_use]
    pub fn builder(name: impl Into<String>) -> CapabilityDescriptorBuilder {
        CapabilityDescriptorBuilder {
            name: name.into(),
            description: String::new(),
            parameters: Vec::new(),
        }
    }

    /// Tool name, unique within a registry.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Human-readable description shown to the model.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Declared parameters in declaration order.
    #[must_use]
    pub fn parameters(&self) -> &[ParameterSpec] {
        &self.parameters
    }

    /// Looks up a parameter declaration by name.
    #[must_use]
    pub fn parameter(&self, name: &str) -> Option<&ParameterSpec> {
        self.parameters.iter().find(|spec| spec.name == name)
    }
}

/// Builder for [`CapabilityDescriptor`].
#[derive(Debug)]
pub struct CapabilityDescriptorBuilder {
    name: String,
    description: String,
    parameters: Vec<ParameterSpec>,
}

impl CapabilityDescriptorBuilder {
    /// Sets the description.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Appends a parameter declaration.
    #[must_use]
    pub fn parameter(mut self, spec: ParameterSpec) -> Self {
        self.parameters.push(spec);
        self
    }

    /// Appends several parameter declarations.
    #[must_use]
    pub fn parameters<I>(mut self, specs: I) -> Self
    where
        I: IntoIterator<Item = ParameterSpec>,
    {
        self.parameters.extend(specs);
        self
    }

    /// Finalises the descriptor.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidCapability`] if the name cannot appear inside a
    /// tool-call directive, or [`Error::DuplicateParameter`] if two parameters
    /// share a name.
    pub fn build(self) -> Result<CapabilityDescriptor> {
        validate_name(&self.name)?;

        let mut seen = BTreeSet::new();
        for spec in &self.parameters {
            if spec.name.trim().is_empty() {
                return Err(Error::InvalidCapability {
                    name: self.name.clone(),
                    reason: "parameter names cannot be empty".into(),
                });
            }
            if !seen.insert(spec.name.as_str()) {
                return Err(Error::DuplicateParameter {
                    capability: self.name.clone(),
                    parameter: spec.name.clone(),
                });
            }
        }

        Ok(CapabilityDescriptor {
            name: self.name,
            description: self.description,
            parameters: self.parameters,
        })
    }
}

fn validate_name(name: &str) -> Result<()> {
    let reject = |reason: &str| {
        Err(Error::InvalidCapability {
            name: name.to_owned(),
            reason: reason.to_owned(),
        })
    };

    if name.trim().is_empty() {
        return reject("name cannot be empty");
    }
    if name.trim() != name {
        return reject("name cannot start or end with whitespace");
    }
    if name.len() > MAX_NAME_LEN {
        return Err(Error::InvalidCapability {
            name: name.to_owned(),
            reason: format!("name length must be <= {MAX_NAME_LEN}"),
        });
    }
    // The directive grammar delimits names with these characters.
    if name.contains([':', '[', ']']) {
        return reject("name cannot contain `:`, `[` or `]`");
    }
    Ok(())
}
