use std::sync::Arc;

use agent_primitives::{CapabilityDescriptor, ParameterSpec, ParameterType};
use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

use super::schema::parameters_from_schema;
use super::source::{RemoteToolInfo, ToolSession, ToolSource};
use crate::capability::{Capability, Parameters, ToolError, ToolResult};
use crate::registry::NO_CAPABILITIES;

/// Expandable capability fronting every tool of one remote server.
///
/// Registered with expansion, it is replaced by one [`RemoteTool`] per
/// catalog entry, named `<toolset>_<tool>`. Registered as-is, the model
/// drives it through `action=list_tools` or
/// `action=call_tool,tool_name=...,arguments={...}`.
pub struct RemoteToolset {
    descriptor: CapabilityDescriptor,
    source: Arc<dyn ToolSource>,
    expandable: bool,
}

impl std::fmt::Debug for RemoteToolset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteToolset")
            .field("name", &self.descriptor.name())
            .field("source", &self.source.label())
            .field("expandable", &self.expandable)
            .finish()
    }
}

impl RemoteToolset {
    /// Creates a toolset named `name` backed by `source`.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::InvalidDescriptor`] when `name` cannot be used as
    /// a capability name.
    pub fn new(name: impl Into<String>, source: Arc<dyn ToolSource>) -> ToolResult<Self> {
        let name = name.into();
        let description = format!(
            "Tools provided by the `{}` server. Use action=list_tools to see them or \
             action=call_tool with tool_name and arguments to run one",
            source.label()
        );
        Self::with_description(name, description, source)
    }

    /// Creates a toolset with an explicit description.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::InvalidDescriptor`] when `name` cannot be used as
    /// a capability name.
    pub fn with_description(
        name: impl Into<String>,
        description: impl Into<String>,
        source: Arc<dyn ToolSource>,
    ) -> ToolResult<Self> {
        let descriptor = CapabilityDescriptor::builder(name)
            .description(description)
            .parameter(ParameterSpec::required(
                "action",
                ParameterType::String,
                "Either list_tools or call_tool",
            ))
            .parameter(ParameterSpec::optional(
                "tool_name",
                ParameterType::String,
                "Tool to run when action=call_tool",
            ))
            .parameter(ParameterSpec::optional(
                "arguments",
                ParameterType::Object,
                "JSON object of tool arguments",
            ))
            .build()?;
        Ok(Self {
            descriptor,
            source,
            expandable: true,
        })
    }

    /// Controls whether registration may expand this toolset.
    #[must_use]
    pub fn with_expansion(mut self, expandable: bool) -> Self {
        self.expandable = expandable;
        self
    }

    /// Wraps the toolset for registration.
    #[must_use]
    pub fn shared(self) -> Arc<dyn Capability> {
        Arc::new(self)
    }

    async fn list_remote(&self) -> ToolResult<Vec<RemoteToolInfo>> {
        let mut session = self.source.connect().await?;
        let listed = session.list_tools().await;
        close_quietly(session.as_mut(), self.source.label()).await;
        listed
    }

    async fn call_remote(&self, tool_name: &str, arguments: Parameters) -> ToolResult<String> {
        call_once(self.source.as_ref(), tool_name, arguments).await
    }

    fn child(&self, info: RemoteToolInfo) -> Option<Arc<dyn Capability>> {
        let name = format!("{}_{}", self.descriptor.name(), info.name);
        let built = CapabilityDescriptor::builder(name.as_str())
            .description(info.description.clone().unwrap_or_default())
            .parameters(parameters_from_schema(&info.input_schema))
            .build();
        match built {
            Ok(descriptor) => Some(Arc::new(RemoteTool {
                descriptor,
                remote_name: info.name,
                source: Arc::clone(&self.source),
            })),
            Err(err) => {
                warn!(tool = %name, error = %err, "skipping remote tool with unusable descriptor");
                None
            }
        }
    }
}

#[async_trait]
impl Capability for RemoteToolset {
    fn descriptor(&self) -> &CapabilityDescriptor {
        &self.descriptor
    }

    fn is_expandable(&self) -> bool {
        self.expandable
    }

    async fn expand(&self) -> ToolResult<Vec<Arc<dyn Capability>>> {
        let listed = self.list_remote().await?;
        debug!(toolset = %self.name(), count = listed.len(), "remote catalog listed");
        Ok(listed.into_iter().filter_map(|info| self.child(info)).collect())
    }

    async fn invoke(&self, parameters: Parameters) -> ToolResult<String> {
        let action = parameters
            .get("action")
            .and_then(Value::as_str)
            .ok_or_else(|| ToolError::invalid_arguments("`action` is required"))?;

        match action {
            "list_tools" => {
                let listed = self.list_remote().await?;
                if listed.is_empty() {
                    return Ok(NO_CAPABILITIES.to_owned());
                }
                Ok(listed
                    .iter()
                    .map(|info| {
                        let description = info.description.as_deref().unwrap_or_default();
                        format!("{}: {description}", info.name)
                    })
                    .collect::<Vec<_>>()
                    .join("\n"))
            }
            "call_tool" => {
                let tool_name = parameters
                    .get("tool_name")
                    .and_then(Value::as_str)
                    .ok_or_else(|| {
                        ToolError::invalid_arguments("`tool_name` is required for call_tool")
                    })?;
                let arguments = arguments_object(parameters.get("arguments"))?;
                self.call_remote(tool_name, arguments).await
            }
            other => Err(ToolError::invalid_arguments(format!(
                "unsupported action `{other}`; expected list_tools or call_tool"
            ))),
        }
    }
}

fn arguments_object(value: Option<&Value>) -> ToolResult<Parameters> {
    match value {
        None | Some(Value::Null) => Ok(Parameters::new()),
        Some(Value::Object(map)) => Ok(map.clone()),
        Some(Value::String(text)) => match serde_json::from_str::<Value>(text) {
            Ok(Value::Object(map)) => Ok(map),
            _ => Err(ToolError::invalid_arguments("`arguments` must be a JSON object")),
        },
        Some(_) => Err(ToolError::invalid_arguments("`arguments` must be a JSON object")),
    }
}

/// One tool discovered on a remote server.
pub struct RemoteTool {
    descriptor: CapabilityDescriptor,
    remote_name: String,
    source: Arc<dyn ToolSource>,
}

impl RemoteTool {
    /// Server-side name used on the wire.
    #[must_use]
    pub fn remote_name(&self) -> &str {
        &self.remote_name
    }
}

impl std::fmt::Debug for RemoteTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteTool")
            .field("name", &self.descriptor.name())
            .field("remote_name", &self.remote_name)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Capability for RemoteTool {
    fn descriptor(&self) -> &CapabilityDescriptor {
        &self.descriptor
    }

    async fn invoke(&self, parameters: Parameters) -> ToolResult<String> {
        call_once(self.source.as_ref(), &self.remote_name, parameters).await
    }
}

async fn call_once(
    source: &dyn ToolSource,
    tool_name: &str,
    arguments: Parameters,
) -> ToolResult<String> {
    let mut session = source.connect().await?;
    let result = session.call_tool(tool_name, arguments).await;
    close_quietly(session.as_mut(), source.label()).await;
    result
}

async fn close_quietly(session: &mut dyn ToolSession, label: &str) {
    if let Err(err) = session.close().await {
        debug!(source = %label, error = %err, "tool session did not close cleanly");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::stdio::testing::mock_source;
    use crate::registry::CapabilityRegistry;
    use serde_json::json;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeServer {
        calls: Mutex<Vec<(String, Parameters)>>,
    }

    struct FakeSession(Arc<FakeServer>);

    struct FakeSource(Arc<FakeServer>);

    #[async_trait]
    impl ToolSource for FakeSource {
        fn label(&self) -> &str {
            "fake"
        }

        async fn connect(&self) -> ToolResult<Box<dyn ToolSession>> {
            Ok(Box::new(FakeSession(Arc::clone(&self.0))))
        }
    }

    #[async_trait]
    impl ToolSession for FakeSession {
        async fn list_tools(&mut self) -> ToolResult<Vec<RemoteToolInfo>> {
            Ok(vec![
                RemoteToolInfo {
                    name: "status".into(),
                    description: Some("Show working tree status".into()),
                    input_schema: json!({"type": "object", "properties": {}}),
                },
                RemoteToolInfo {
                    name: "log".into(),
                    description: None,
                    input_schema: json!({
                        "type": "object",
                        "properties": {"max_count": {"type": "integer"}},
                        "required": ["max_count"]
                    }),
                },
                RemoteToolInfo {
                    name: "bad:name".into(),
                    description: None,
                    input_schema: Value::Null,
                },
            ])
        }

        async fn call_tool(&mut self, name: &str, arguments: Parameters) -> ToolResult<String> {
            self.0
                .calls
                .lock()
                .unwrap()
                .push((name.to_owned(), arguments));
            if name == "explode" {
                return Err(ToolError::execution("boom"));
            }
            Ok(format!("called {name}"))
        }

        async fn close(&mut self) -> ToolResult<()> {
            Ok(())
        }
    }

    fn toolset() -> (Arc<FakeServer>, RemoteToolset) {
        let server = Arc::new(FakeServer::default());
        let toolset = RemoteToolset::new("git", Arc::new(FakeSource(Arc::clone(&server)))).unwrap();
        (server, toolset)
    }

    #[tokio::test]
    async fn expansion_prefixes_names_and_maps_schemas() {
        let (_, toolset) = toolset();
        let children = toolset.expand().await.unwrap();
        let names: Vec<_> = children.iter().map(|c| c.name().to_owned()).collect();

        assert_eq!(names, ["git_status", "git_log"]);
        let log = children[1].descriptor();
        assert_eq!(log.parameter("max_count").unwrap().kind(), ParameterType::Integer);
        assert_eq!(children[0].descriptor().description(), "Show working tree status");
    }

    #[tokio::test]
    async fn discovered_tool_calls_remote_name() {
        let (server, toolset) = toolset();
        let children = toolset.expand().await.unwrap();
        let mut params = Parameters::new();
        params.insert("max_count".into(), json!(3));

        assert_eq!(children[1].invoke(params).await.unwrap(), "called log");
        let calls = server.calls.lock().unwrap();
        assert_eq!(calls[0].0, "log");
        assert_eq!(calls[0].1["max_count"], json!(3));
    }

    #[tokio::test]
    async fn action_dispatch_on_unexpanded_toolset() {
        let (server, toolset) = toolset();

        let mut list = Parameters::new();
        list.insert("action".into(), json!("list_tools"));
        let listing = toolset.invoke(list).await.unwrap();
        assert!(listing.starts_with("status: Show working tree status\nlog: "));

        let mut call = Parameters::new();
        call.insert("action".into(), json!("call_tool"));
        call.insert("tool_name".into(), json!("status"));
        call.insert("arguments".into(), json!(r#"{"short":true}"#));
        assert_eq!(toolset.invoke(call).await.unwrap(), "called status");
        assert_eq!(server.calls.lock().unwrap()[0].1["short"], json!(true));
    }

    #[tokio::test]
    async fn bad_actions_and_remote_failures_are_errors() {
        let (_, toolset) = toolset();

        let mut unknown = Parameters::new();
        unknown.insert("action".into(), json!("read_resource"));
        assert!(matches!(
            toolset.invoke(unknown).await,
            Err(ToolError::InvalidArguments { .. })
        ));

        let mut failing = Parameters::new();
        failing.insert("action".into(), json!("call_tool"));
        failing.insert("tool_name".into(), json!("explode"));
        let err = toolset.invoke(failing).await.unwrap_err();
        assert_eq!(err.to_string(), "boom");
    }

    #[tokio::test]
    async fn registry_expands_toolset() {
        let (_, toolset) = toolset();
        let mut registry = CapabilityRegistry::new();
        registry.register(toolset.shared(), true).await;
        assert_eq!(registry.names(), ["git_status", "git_log"]);
    }

    #[tokio::test]
    async fn stdio_server_round_trip() {
        let Some(source) = mock_source("mock") else {
            return;
        };
        let toolset = RemoteToolset::new("shell", Arc::new(source)).unwrap();

        let children = toolset.expand().await.unwrap();
        let names: Vec<&str> = children.iter().map(|child| child.name()).collect();
        assert_eq!(names, ["shell_echo", "shell_fail"]);
        assert_eq!(children[0].descriptor().description(), "Echo text");
        let params: Vec<&str> = children[0]
            .descriptor()
            .parameters()
            .iter()
            .map(|spec| spec.name())
            .collect();
        assert_eq!(params, ["text", "count"]);

        let mut arguments = Parameters::new();
        arguments.insert("text".into(), json!("hi there"));
        assert_eq!(children[0].invoke(arguments).await.unwrap(), "hi there");
    }
}
