//! Runs parsed directives against a capability registry.

use std::any::Any;
use std::panic::AssertUnwindSafe;

use agent_telemetry::{AgentEvent, EventSink, ToolOutcome};
use agent_tools::{CapabilityRegistry, Directive, coerce_parameters};
use futures::FutureExt;
use tracing::{debug, warn};

/// Result of dispatching one directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolReport {
    tool: String,
    outcome: ToolOutcome,
    text: String,
}

impl ToolReport {
    /// Requested tool name.
    #[must_use]
    pub fn tool(&self) -> &str {
        &self.tool
    }

    /// How the dispatch ended.
    #[must_use]
    pub fn outcome(&self) -> &ToolOutcome {
        &self.outcome
    }

    /// Text injected into the conversation.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    fn new(tool: &str, outcome: ToolOutcome, text: String) -> Self {
        Self {
            tool: tool.to_owned(),
            outcome,
            text,
        }
    }
}

/// Dispatches one directive.
///
/// Never fails: unknown tools, invocation errors and panicking capabilities
/// are rendered as text so the model can react to them.
pub async fn dispatch(
    registry: &CapabilityRegistry,
    directive: &Directive<'_>,
    events: &dyn EventSink,
) -> ToolReport {
    let name = directive.tool_name();
    let report = match registry.get(name) {
        None => {
            warn!(tool = name, "directive names an unknown tool");
            ToolReport::new(name, ToolOutcome::NotFound, not_found_text(name))
        }
        Some(capability) => {
            let parameters =
                coerce_parameters(directive.raw_parameters(), capability.descriptor().parameters());
            debug!(tool = name, parameters = parameters.len(), "invoking tool");
            let invocation = AssertUnwindSafe(capability.invoke(parameters)).catch_unwind();
            match invocation.await {
                Ok(Ok(result)) => {
                    ToolReport::new(name, ToolOutcome::Succeeded, result_text(name, &result))
                }
                Ok(Err(err)) => {
                    warn!(tool = name, error = %err, "tool invocation failed");
                    failed(name, err.to_string())
                }
                Err(payload) => {
                    let reason = format!("tool panicked: {}", panic_message(payload.as_ref()));
                    warn!(tool = name, %reason, "tool invocation panicked");
                    failed(name, reason)
                }
            }
        }
    };

    events.emit(AgentEvent::ToolDispatched {
        tool: report.tool.clone(),
        outcome: report.outcome.clone(),
    });
    report
}

fn failed(tool: &str, reason: String) -> ToolReport {
    let text = failure_text(tool, &reason);
    ToolReport::new(tool, ToolOutcome::Failed { reason }, text)
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}

/// Text injected for a successful invocation.
#[must_use]
pub fn result_text(tool: &str, result: &str) -> String {
    format!("Tool {tool} result:\n{result}")
}

/// Text injected when no capability has the requested name.
#[must_use]
pub fn not_found_text(tool: &str) -> String {
    format!("Error: tool {tool} not found")
}

/// Text injected when the capability reports an error.
#[must_use]
pub fn failure_text(tool: &str, reason: &str) -> String {
    format!("Tool {tool} invocation failed: {reason}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_primitives::{CapabilityDescriptor, ParameterSpec, ParameterType};
    use agent_telemetry::CollectingSink;
    use agent_tools::{FnCapability, Parameters, ToolError, parse_directives};

    fn registry() -> CapabilityRegistry {
        let mut registry = CapabilityRegistry::new();
        let divide = CapabilityDescriptor::builder("divide")
            .description("Divides a by b")
            .parameter(ParameterSpec::required("a", ParameterType::Number, "dividend"))
            .parameter(ParameterSpec::required("b", ParameterType::Number, "divisor"))
            .build()
            .unwrap();
        registry.add(
            FnCapability::new(divide, |params: Parameters| async move {
                let a = params.get("a").and_then(serde_json::Value::as_f64).unwrap_or_default();
                let b = params.get("b").and_then(serde_json::Value::as_f64).unwrap_or_default();
                if b.abs() < f64::EPSILON {
                    return Err(ToolError::execution("division by zero"));
                }
                Ok(format!("{}", a / b))
            })
            .shared(),
        );
        let gauge = CapabilityDescriptor::builder("gauge")
            .description("Reads a sensor")
            .build()
            .unwrap();
        registry.add(
            FnCapability::new(gauge, |params: Parameters| async move {
                let readings: Vec<String> = Vec::new();
                let sensor = params.len() + 3;
                Ok::<_, ToolError>(readings[sensor].clone())
            })
            .shared(),
        );
        registry
    }

    async fn run(text: &str) -> (ToolReport, Vec<AgentEvent>) {
        let sink = CollectingSink::new();
        let directive = parse_directives(text).next().unwrap();
        let report = dispatch(&registry(), &directive, sink.as_ref()).await;
        (report, sink.drain())
    }

    #[tokio::test]
    async fn success_is_prefixed_with_tool_name() {
        let (report, events) = run("[TOOL_CALL:divide:a=9,b=3]").await;
        assert_eq!(report.text(), "Tool divide result:\n3");
        assert_eq!(report.outcome(), &ToolOutcome::Succeeded);
        assert_eq!(events.len(), 1);
    }

    #[tokio::test]
    async fn unknown_tool_is_reported_not_raised() {
        let (report, events) = run("[TOOL_CALL:sqrt:x=4]").await;
        assert_eq!(report.text(), "Error: tool sqrt not found");
        assert_eq!(
            events,
            [AgentEvent::ToolDispatched {
                tool: "sqrt".into(),
                outcome: ToolOutcome::NotFound,
            }]
        );
    }

    #[tokio::test]
    async fn invocation_error_is_rendered() {
        let (report, _) = run("[TOOL_CALL:divide:a=1,b=0]").await;
        assert_eq!(report.text(), "Tool divide invocation failed: division by zero");
        assert!(matches!(
            report.outcome(),
            ToolOutcome::Failed { reason } if reason == "division by zero"
        ));
    }

    #[tokio::test]
    async fn panicking_tool_is_rendered_as_failure() {
        let (report, events) = run("[TOOL_CALL:gauge:x=1]").await;
        assert!(report.text().starts_with("Tool gauge invocation failed: tool panicked: "));
        assert!(report.text().contains("index out of bounds"));
        assert!(matches!(
            report.outcome(),
            ToolOutcome::Failed { reason } if reason.starts_with("tool panicked")
        ));
        assert_eq!(events.len(), 1);
    }
}
