//! Conversion of a directive's `key=value` blob into typed arguments.

use agent_primitives::{ParameterSpec, ParameterType};
use serde_json::{Number, Value};

use crate::capability::Parameters;

/// Lower-cased tokens read as `true` for boolean parameters.
pub const TRUTHY_TOKENS: [&str; 4] = ["true", "1", "yes", "是"];

/// Splits a parameter blob into trimmed `(key, value)` pairs.
///
/// Pairs are separated by commas and split at their first `=`. Commas inside
/// `{...}`, `[...]` or double quotes do not separate pairs, so a JSON object
/// value survives intact. Segments without `=` or with an empty key are
/// dropped, and a blob without any `=` yields nothing.
#[must_use]
pub fn split_parameters(raw: &str) -> Vec<(&str, &str)> {
    if !raw.contains('=') {
        return Vec::new();
    }

    top_level_segments(raw)
        .into_iter()
        .filter_map(|segment| {
            let (key, value) = segment.split_once('=')?;
            let key = key.trim();
            (!key.is_empty()).then(|| (key, value.trim()))
        })
        .collect()
}

fn top_level_segments(raw: &str) -> Vec<&str> {
    let mut segments = Vec::new();
    let mut depth = 0_usize;
    let mut quoted = false;
    let mut escaped = false;
    let mut start = 0;

    for (index, ch) in raw.char_indices() {
        if quoted {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => quoted = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => quoted = true,
            '{' | '[' => depth += 1,
            '}' | ']' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                segments.push(&raw[start..index]);
                start = index + 1;
            }
            _ => {}
        }
    }
    segments.push(&raw[start..]);
    segments
}

/// Converts one raw value to the declared type.
///
/// Conversion never fails: a value that does not parse as the declared type
/// is kept as the original string.
#[must_use]
pub fn coerce_value(raw: &str, kind: ParameterType) -> Value {
    match kind {
        ParameterType::String => Value::String(raw.to_owned()),
        ParameterType::Integer => raw
            .parse::<i64>()
            .map_or_else(|_| Value::String(raw.to_owned()), Value::from),
        ParameterType::Number => raw
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map_or_else(|| Value::String(raw.to_owned()), Value::Number),
        ParameterType::Boolean => {
            let lowered = raw.to_lowercase();
            Value::Bool(TRUTHY_TOKENS.contains(&lowered.as_str()))
        }
        ParameterType::Object => match serde_json::from_str::<Value>(raw) {
            Ok(value @ (Value::Object(_) | Value::Array(_))) => value,
            _ => Value::String(raw.to_owned()),
        },
    }
}

/// Parses a parameter blob against a capability's declarations.
///
/// Declared keys are coerced to their type; undeclared keys pass through as
/// strings. Omitted parameters that declare a default receive it. Later
/// duplicates of a key overwrite earlier ones.
///
/// # Examples
///
/// ```
/// use agent_primitives::{ParameterSpec, ParameterType};
/// use agent_tools::coerce_parameters;
/// use serde_json::json;
///
/// let specs = [
///     ParameterSpec::required("a", ParameterType::Integer, ""),
///     ParameterSpec::required("b", ParameterType::Boolean, ""),
/// ];
/// let params = coerce_parameters("a=1,b=true", &specs);
/// assert_eq!(params["a"], json!(1));
/// assert_eq!(params["b"], json!(true));
/// ```
#[must_use]
pub fn coerce_parameters(raw: &str, specs: &[ParameterSpec]) -> Parameters {
    let mut parameters = Parameters::new();

    for (key, value) in split_parameters(raw) {
        let coerced = match specs.iter().find(|spec| spec.name() == key) {
            Some(spec) => coerce_value(value, spec.kind()),
            None => Value::String(value.to_owned()),
        };
        parameters.insert(key.to_owned(), coerced);
    }

    for spec in specs {
        if let Some(default) = spec.default_value() {
            parameters
                .entry(spec.name().to_owned())
                .or_insert_with(|| default.clone());
        }
    }

    parameters
}
