//! MCP stdio client
//!
//! Spawns a tool server as a child process and speaks newline-delimited
//! JSON-RPC 2.0 over its stdin/stdout. Requests are serialised through one
//! async mutex, so at most one request is in flight and responses can be
//! matched by reading forward until the expected id appears. Requests the
//! server sends meanwhile are answered inline: `ping` gets an empty result,
//! anything else a method-not-found error. The server's stderr is forwarded
//! to `tracing` at debug level.

use serde::Serialize;
use serde_json::{json, Value};
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::error::{McpError, Result};
use super::types::{
    CallToolResult, JsonRpcMessage, JsonRpcReply, JsonRpcRequest, ListToolsResult, McpToolInfo,
    PROTOCOL_VERSION,
};
use crate::secrets::SecretString;

/// How long `close` waits for the child to exit before killing it
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Upper bound on `tools/list` pages, in case a server loops its cursor
const MAX_LIST_PAGES: usize = 32;

/// How to launch a tool server
#[derive(Debug, Clone)]
pub struct McpServerConfig {
    /// Label used in logs
    pub name: String,

    /// Program to execute (e.g. `npx`)
    pub command: String,

    /// Program arguments
    pub args: Vec<String>,

    /// Extra environment for the child; values are secrets
    pub env: Vec<(String, SecretString)>,

    /// Per-request timeout
    pub request_timeout: Duration,
}

impl McpServerConfig {
    pub fn new(name: impl Into<String>, command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
            args,
            env: Vec::new(),
            request_timeout: Duration::from_secs(60),
        }
    }

    /// Add an environment variable for the child process
    pub fn with_env(mut self, key: impl Into<String>, value: SecretString) -> Self {
        self.env.push((key.into(), value));
        self
    }

    pub fn with_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self
    }
}

struct Transport {
    child: Child,
    stdin: ChildStdin,
    stdout: Lines<BufReader<ChildStdout>>,
}

impl Transport {
    async fn send<T: Serialize>(&mut self, message: &T) -> Result<()> {
        let mut line = serde_json::to_string(message)
            .map_err(|e| McpError::Protocol(format!("Failed to encode message: {}", e)))?;
        line.push('\n');

        self.stdin
            .write_all(line.as_bytes())
            .await
            .map_err(|e| McpError::Communication(e.to_string()))?;
        self.stdin
            .flush()
            .await
            .map_err(|e| McpError::Communication(e.to_string()))
    }

    async fn read_response(&mut self, id: u64) -> Result<Value> {
        loop {
            let line = self
                .stdout
                .next_line()
                .await
                .map_err(|e| McpError::Communication(e.to_string()))?
                .ok_or_else(|| McpError::ProcessTerminated("stdout closed".to_string()))?;

            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let message: JsonRpcMessage = match serde_json::from_str(line) {
                Ok(message) => message,
                Err(_) => {
                    // Some servers print banners on stdout
                    debug!("Skipping non-JSON line from server: {}", line);
                    continue;
                }
            };

            if let Some((method, request_id)) = message.server_request() {
                let reply = if method == "ping" {
                    JsonRpcReply::result(request_id.clone(), json!({}))
                } else {
                    warn!("Rejecting unsupported server request: {}", method);
                    JsonRpcReply::method_not_found(request_id.clone(), method)
                };
                self.send(&reply).await?;
                continue;
            }

            if !message.answers(id) {
                debug!("Skipping unrelated server message: {}", line);
                continue;
            }

            if let Some(error) = message.error {
                return Err(McpError::JsonRpc {
                    code: error.code,
                    message: error.message,
                });
            }

            return Ok(message.result.unwrap_or(Value::Null));
        }
    }
}

/// Connected MCP stdio client
pub struct McpClient {
    name: String,
    request_timeout: Duration,
    next_id: AtomicU64,
    connected: AtomicBool,
    transport: Mutex<Option<Transport>>,
}

impl McpClient {
    /// Launch the server and complete the `initialize` handshake
    ///
    /// # Errors
    /// `McpError::Spawn` if the process cannot start, or any request error
    /// raised during the handshake.
    pub async fn spawn(config: McpServerConfig) -> Result<Self> {
        info!(
            server = %config.name,
            command = %config.command,
            args = ?config.args,
            "Starting MCP server"
        );

        let mut command = Command::new(&config.command);
        command
            .args(&config.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        for (key, value) in &config.env {
            command.env(key, value.unsecure());
        }

        let mut child = command.spawn()?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| McpError::Communication("child stdin unavailable".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| McpError::Communication("child stdout unavailable".to_string()))?;

        if let Some(stderr) = child.stderr.take() {
            let server = config.name.clone();
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    debug!(server = %server, "{}", line);
                }
            });
        }

        let client = Self {
            name: config.name,
            request_timeout: config.request_timeout,
            next_id: AtomicU64::new(1),
            connected: AtomicBool::new(true),
            transport: Mutex::new(Some(Transport {
                child,
                stdin,
                stdout: BufReader::new(stdout).lines(),
            })),
        };

        client.initialize().await?;
        Ok(client)
    }

    async fn initialize(&self) -> Result<()> {
        let result = self
            .request(
                "initialize",
                Some(json!({
                    "protocolVersion": PROTOCOL_VERSION,
                    "capabilities": {},
                    "clientInfo": {
                        "name": "switchboard",
                        "version": env!("CARGO_PKG_VERSION"),
                    },
                })),
            )
            .await?;

        let server_name = result
            .pointer("/serverInfo/name")
            .and_then(Value::as_str)
            .unwrap_or("unknown");
        info!(server = %self.name, remote = %server_name, "MCP session initialised");

        self.notify("notifications/initialized", None).await
    }

    /// Label this client was spawned with
    pub fn name(&self) -> &str {
        &self.name
    }

    /// True until `close` is called or the server dies
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Send a request and wait for its response
    pub async fn request(&self, method: &str, params: Option<Value>) -> Result<Value> {
        let mut guard = self.transport.lock().await;
        let transport = guard.as_mut().ok_or(McpError::NotConnected)?;

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        debug!(server = %self.name, id, method, "MCP request");

        let exchange = async {
            transport
                .send(&JsonRpcRequest::request(id, method, params))
                .await?;
            transport.read_response(id).await
        };

        let result = match tokio::time::timeout(self.request_timeout, exchange).await {
            Ok(result) => result,
            Err(_) => Err(McpError::Timeout(method.to_string())),
        };

        if let Err(McpError::ProcessTerminated(_)) | Err(McpError::Communication(_)) = &result {
            warn!(server = %self.name, "MCP server connection lost");
            self.connected.store(false, Ordering::SeqCst);
        }

        result
    }

    /// Send a notification (no response expected)
    pub async fn notify(&self, method: &str, params: Option<Value>) -> Result<()> {
        let mut guard = self.transport.lock().await;
        let transport = guard.as_mut().ok_or(McpError::NotConnected)?;
        transport
            .send(&JsonRpcRequest::notification(method, params))
            .await
    }

    /// List every tool the server exposes, following pagination
    pub async fn list_tools(&self) -> Result<Vec<McpToolInfo>> {
        let mut tools = Vec::new();
        let mut cursor: Option<String> = None;

        for _ in 0..MAX_LIST_PAGES {
            let params = cursor.as_ref().map(|c| json!({ "cursor": c }));
            let result = self.request("tools/list", params).await?;
            let page: ListToolsResult = serde_json::from_value(result)
                .map_err(|e| McpError::Protocol(format!("Invalid tools/list result: {}", e)))?;

            tools.extend(page.tools);

            match page.next_cursor {
                Some(next) if !next.is_empty() => cursor = Some(next),
                _ => return Ok(tools),
            }
        }

        warn!(server = %self.name, "tools/list pagination limit reached");
        Ok(tools)
    }

    /// Invoke a tool and return its text content
    ///
    /// # Errors
    /// `McpError::ToolFailed` when the server flags the result with `isError`.
    pub async fn call_tool(&self, name: &str, arguments: Value) -> Result<String> {
        let result = self
            .request(
                "tools/call",
                Some(json!({ "name": name, "arguments": arguments })),
            )
            .await?;

        let result: CallToolResult = serde_json::from_value(result)
            .map_err(|e| McpError::Protocol(format!("Invalid tools/call result: {}", e)))?;

        let text = result.joined_text();
        if result.is_error {
            return Err(McpError::ToolFailed(text));
        }
        Ok(text)
    }

    /// Close stdin and wait for the server to exit, killing it if needed
    pub async fn close(&self) -> Result<()> {
        let Some(mut transport) = self.transport.lock().await.take() else {
            return Ok(());
        };
        self.connected.store(false, Ordering::SeqCst);

        info!(server = %self.name, "Stopping MCP server");
        drop(transport.stdin);

        match tokio::time::timeout(SHUTDOWN_GRACE, transport.child.wait()).await {
            Ok(Ok(status)) => {
                info!(server = %self.name, ?status, "MCP server exited");
            }
            Ok(Err(e)) => {
                warn!(server = %self.name, error = ?e, "Error waiting for MCP server to exit");
            }
            Err(_) => {
                warn!(server = %self.name, "MCP server shutdown timeout, forcing kill");
                let _ = transport.child.kill().await;
            }
        }

        Ok(())
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn scripted(script: &str) -> McpServerConfig {
        McpServerConfig::new("test", "sh", vec!["-c".to_string(), script.to_string()])
            .with_timeout(Duration::from_secs(5))
    }

    const INIT: &str = r#"read l; echo '{"jsonrpc":"2.0","id":1,"result":{"protocolVersion":"2024-11-05","capabilities":{},"serverInfo":{"name":"mock","version":"0"}}}'; read l;"#;

    #[tokio::test]
    async fn test_spawn_failure() {
        let config = McpServerConfig::new("missing", "/nonexistent/switchboard-mcp", vec![]);
        assert!(matches!(McpClient::spawn(config).await, Err(McpError::Spawn { .. })));
    }

    #[tokio::test]
    async fn test_handshake_list_and_call() {
        let script = format!(
            "{INIT} \
             read l; echo 'banner text'; echo '{{\"jsonrpc\":\"2.0\",\"method\":\"notifications/message\"}}'; \
             echo '{{\"jsonrpc\":\"2.0\",\"id\":2,\"result\":{{\"tools\":[{{\"name\":\"asana_list_workspaces\",\"description\":\"List workspaces\",\"inputSchema\":{{\"type\":\"object\"}}}}]}}}}'; \
             read l; echo '{{\"jsonrpc\":\"2.0\",\"id\":3,\"result\":{{\"content\":[{{\"type\":\"text\",\"text\":\"Engineering\"}}]}}}}'; \
             read l"
        );
        let client = McpClient::spawn(scripted(&script)).await.unwrap();
        assert!(client.is_connected());

        let tools = client.list_tools().await.unwrap();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].name, "asana_list_workspaces");

        let text = client
            .call_tool("asana_list_workspaces", json!({}))
            .await
            .unwrap();
        assert_eq!(text, "Engineering");

        client.close().await.unwrap();
        assert!(!client.is_connected());
        assert!(matches!(
            client.list_tools().await,
            Err(McpError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn test_tool_error_and_rpc_error() {
        let script = format!(
            "{INIT} \
             read l; echo '{{\"jsonrpc\":\"2.0\",\"id\":2,\"result\":{{\"content\":[{{\"type\":\"text\",\"text\":\"bad gid\"}}],\"isError\":true}}}}'; \
             read l; echo '{{\"jsonrpc\":\"2.0\",\"id\":3,\"error\":{{\"code\":-32601,\"message\":\"Method not found\"}}}}'; \
             read l"
        );
        let client = McpClient::spawn(scripted(&script)).await.unwrap();

        match client.call_tool("asana_get_task", json!({"task_id": "x"})).await {
            Err(McpError::ToolFailed(text)) => assert_eq!(text, "bad gid"),
            other => panic!("unexpected: {:?}", other),
        }

        match client.request("resources/list", None).await {
            Err(McpError::JsonRpc { code, .. }) => assert_eq!(code, -32601),
            other => panic!("unexpected: {:?}", other),
        }

        client.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_server_requests_are_answered() {
        // The server only answers tools/list after its ping and its
        // sampling request have both been replied to
        let script = format!(
            "{INIT} \
             read l; echo '{{\"jsonrpc\":\"2.0\",\"id\":\"s1\",\"method\":\"ping\"}}'; \
             read pong; case \"$pong\" in *'\"id\":\"s1\"'*'\"result\":{{}}'*) ;; *) exit 1;; esac; \
             echo '{{\"jsonrpc\":\"2.0\",\"id\":\"s2\",\"method\":\"sampling/createMessage\"}}'; \
             read rejected; case \"$rejected\" in *'-32601'*) ;; *) exit 1;; esac; \
             echo '{{\"jsonrpc\":\"2.0\",\"id\":2,\"result\":{{\"tools\":[]}}}}'; \
             read l"
        );
        let client = McpClient::spawn(scripted(&script)).await.unwrap();

        let tools = client.list_tools().await.unwrap();
        assert!(tools.is_empty());

        client.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_server_exit_marks_disconnected() {
        let script = format!("{INIT} read l; exit 0");
        let client = McpClient::spawn(scripted(&script)).await.unwrap();

        assert!(matches!(
            client.list_tools().await,
            Err(McpError::ProcessTerminated(_))
        ));
        assert!(!client.is_connected());
    }
}
