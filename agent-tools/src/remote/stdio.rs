use std::future::Future;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use rmcp::ClientHandler;
use rmcp::model::{CallToolRequestParam, CallToolResult, RawContent, Tool as McpTool};
use rmcp::service::{RoleClient, RunningService, ServiceExt};
use rmcp::transport::{ConfigureCommandExt, TokioChildProcess};
use serde_json::{Value, json};
use tokio::process::Command;
use tracing::{debug, warn};

use super::source::{RemoteToolInfo, ToolSession, ToolSource};
use crate::capability::{Parameters, ToolError, ToolResult};

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Client side of the session. Server-initiated requests get the default
/// handling, notifications are ignored.
#[derive(Debug, Clone, Copy, Default)]
struct QuietClient;

impl ClientHandler for QuietClient {}

/// MCP tool server reached through a child process on stdin/stdout.
#[derive(Clone, Debug)]
pub struct StdioToolSource {
    label: String,
    command: String,
    args: Vec<String>,
    env: Vec<(String, String)>,
    request_timeout: Duration,
}

impl StdioToolSource {
    /// Describes how to launch the server.
    #[must_use]
    pub fn new(label: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            command: command.into(),
            args: Vec::new(),
            env: Vec::new(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Appends command-line arguments.
    #[must_use]
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Adds environment variables for the child process.
    #[must_use]
    pub fn with_env<I, K, V>(mut self, env: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.env
            .extend(env.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Bounds the handshake and every request/response exchange.
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Program that is launched.
    #[must_use]
    pub fn command(&self) -> &str {
        &self.command
    }
}

#[async_trait]
impl ToolSource for StdioToolSource {
    fn label(&self) -> &str {
        &self.label
    }

    async fn connect(&self) -> ToolResult<Box<dyn ToolSession>> {
        let args = self.args.clone();
        let env = self.env.clone();
        let transport = TokioChildProcess::new(Command::new(&self.command).configure(move |cmd| {
            cmd.args(&args);
            for (key, value) in &env {
                cmd.env(key, value);
            }
            cmd.stderr(Stdio::null());
        }))?;

        let service = bounded(self.request_timeout, "initialize", async {
            QuietClient
                .serve(transport)
                .await
                .map_err(|err| ToolError::protocol(format!("handshake failed: {err}")))
        })
        .await?;
        debug!(source = %self.label, "tool server session initialised");

        Ok(Box::new(StdioSession {
            label: self.label.clone(),
            service: Some(service),
            request_timeout: self.request_timeout,
        }))
    }
}

async fn bounded<T, F>(limit: Duration, operation: &str, future: F) -> ToolResult<T>
where
    F: Future<Output = ToolResult<T>>,
{
    tokio::time::timeout(limit, future).await.map_err(|_| {
        ToolError::protocol(format!("`{operation}` got no response within {limit:?}"))
    })?
}

impl From<McpTool> for RemoteToolInfo {
    fn from(tool: McpTool) -> Self {
        Self {
            name: tool.name.into_owned(),
            description: tool.description.map(|text| text.into_owned()),
            input_schema: Value::Object(tool.input_schema.as_ref().clone()),
        }
    }
}

/// Joins text content with newlines. Other content kinds become a
/// `[<kind> content]` placeholder; a result without content falls back to
/// its structured payload.
fn result_text(result: CallToolResult) -> String {
    if result.content.is_empty() {
        return result
            .structured_content
            .map(|value| value.to_string())
            .unwrap_or_default();
    }
    result
        .content
        .iter()
        .map(|content| match &content.raw {
            RawContent::Text(text) => text.text.clone(),
            other => {
                let kind = serde_json::to_value(other)
                    .ok()
                    .and_then(|value| value.get("type").and_then(Value::as_str).map(str::to_owned))
                    .unwrap_or_else(|| "unknown".to_owned());
                format!("[{kind} content]")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

struct StdioSession {
    label: String,
    service: Option<RunningService<RoleClient, QuietClient>>,
    request_timeout: Duration,
}

impl StdioSession {
    fn service(&self) -> ToolResult<&RunningService<RoleClient, QuietClient>> {
        self.service
            .as_ref()
            .ok_or_else(|| ToolError::protocol("session already closed"))
    }
}

#[async_trait]
impl ToolSession for StdioSession {
    async fn list_tools(&mut self) -> ToolResult<Vec<RemoteToolInfo>> {
        let service = self.service()?;
        let tools = bounded(self.request_timeout, "tools/list", async {
            service
                .list_all_tools()
                .await
                .map_err(|err| ToolError::protocol(format!("listing tools failed: {err}")))
        })
        .await?;
        Ok(tools.into_iter().map(RemoteToolInfo::from).collect())
    }

    async fn call_tool(&mut self, name: &str, arguments: Parameters) -> ToolResult<String> {
        let request: CallToolRequestParam =
            serde_json::from_value(json!({ "name": name, "arguments": arguments }))?;
        let service = self.service()?;
        let result = bounded(self.request_timeout, "tools/call", async {
            service
                .call_tool(request)
                .await
                .map_err(|err| ToolError::protocol(format!("calling `{name}` failed: {err}")))
        })
        .await?;

        let failed = result.is_error.unwrap_or(false);
        let text = result_text(result);
        if failed {
            return Err(ToolError::execution(text));
        }
        Ok(text)
    }

    async fn close(&mut self) -> ToolResult<()> {
        let Some(service) = self.service.take() else {
            return Ok(());
        };
        match service.cancel().await {
            Ok(reason) => {
                debug!(source = %self.label, ?reason, "tool server session closed");
                Ok(())
            }
            Err(err) => {
                warn!(source = %self.label, error = %err, "tool server did not shut down cleanly");
                Err(ToolError::protocol(format!("shutdown failed: {err}")))
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::StdioToolSource;

    /// Minimal MCP server: two pages of tools (`echo`, then `fail`), `echo`
    /// returns its `text` argument and `fail` reports an error result.
    const MOCK_SERVER: &str = r#"
import json, sys

PAGES = {
    None: ([{"name": "echo", "description": "Echo text",
             "inputSchema": {"type": "object",
                             "properties": {"text": {"type": "string"},
                                            "count": {"type": "integer"}},
                             "required": ["text"]}}], "2"),
    "2": ([{"name": "fail", "description": "Always fails",
            "inputSchema": {"type": "object", "properties": {}}}], None),
}

for line in sys.stdin:
    line = line.strip()
    if not line:
        continue
    message = json.loads(line)
    if "id" not in message or "method" not in message:
        continue
    method = message["method"]
    params = message.get("params") or {}
    if method == "initialize":
        result = {"protocolVersion": params.get("protocolVersion", "2024-11-05"),
                  "capabilities": {"tools": {}},
                  "serverInfo": {"name": "mock", "version": "0.1.0"}}
    elif method == "tools/list":
        tools, cursor = PAGES[params.get("cursor")]
        result = {"tools": tools}
        if cursor:
            result["nextCursor"] = cursor
    elif method == "tools/call":
        arguments = params.get("arguments") or {}
        if params.get("name") == "fail":
            result = {"content": [{"type": "text", "text": "boom"}], "isError": True}
        else:
            result = {"content": [{"type": "text", "text": str(arguments.get("text", ""))}]}
    else:
        print(json.dumps({"jsonrpc": "2.0", "id": message["id"],
                          "error": {"code": -32601, "message": "unknown method"}}), flush=True)
        continue
    print(json.dumps({"jsonrpc": "2.0", "id": message["id"], "result": result}), flush=True)
"#;

    /// A source running the mock server, or `None` when `python3` is not
    /// installed.
    pub(crate) fn mock_source(label: &str) -> Option<StdioToolSource> {
        let available = std::process::Command::new("python3")
            .arg("--version")
            .output()
            .is_ok_and(|output| output.status.success());
        available.then(|| StdioToolSource::new(label, "python3").with_args(["-c", MOCK_SERVER]))
    }
}
