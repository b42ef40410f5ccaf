use std::io::{self, BufRead, BufReader, Read, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::protocol::{RpcRequest, RpcResponse, PROTOCOL_VERSION};
use crate::tools::ToolSpec;

const CLIENT_NAME: &str = "hk-weather-assistant";
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to start server {path}: {source}")]
    Spawn {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("connection to server closed")]
    Closed,
    #[error("server error {code}: {message}")]
    Rpc { code: i64, message: String },
    #[error("protocol error: {0}")]
    Protocol(String),
    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),
}

/// What the assistant needs from a tool server.
pub trait ToolTransport {
    fn list_tools(&mut self) -> Result<Vec<ToolSpec>, TransportError>;

    /// Returns the raw `tools/call` result envelope.
    fn call_tool(&mut self, name: &str, arguments: Value) -> Result<Value, TransportError>;

    fn close(&mut self) {}
}

/// Blocking JSON-RPC over a byte stream pair. Writes newline-delimited JSON;
/// reads either newline-delimited or Content-Length framed messages and skips
/// lines that are not JSON.
pub struct JsonRpc<R, W> {
    next_id: u64,
    reader: BufReader<R>,
    writer: W,
}

impl<R: Read, W: Write> JsonRpc<R, W> {
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            next_id: 1,
            reader: BufReader::new(reader),
            writer,
        }
    }

    pub fn request(&mut self, method: &str, params: Value) -> Result<Value, TransportError> {
        let id = self.next_id;
        self.next_id += 1;
        self.write_message(&serde_json::to_value(RpcRequest::new(id, method, params))?)?;

        loop {
            let message = self.read_message()?;
            if message.get("method").is_some() {
                debug!(message = %message, "server notification ignored");
                continue;
            }
            if message.get("id").and_then(Value::as_u64) != Some(id) {
                debug!(message = %message, "unrelated response ignored");
                continue;
            }
            let response: RpcResponse = serde_json::from_value(message)?;
            if let Some(err) = response.error {
                return Err(TransportError::Rpc {
                    code: err.code,
                    message: err.message,
                });
            }
            return Ok(response.result.unwrap_or(Value::Null));
        }
    }

    pub fn notify(&mut self, method: &str, params: Value) -> Result<(), TransportError> {
        self.write_message(&serde_json::to_value(RpcRequest::notification(method, params))?)
    }

    fn write_message(&mut self, message: &Value) -> Result<(), TransportError> {
        let mut body = serde_json::to_vec(message)?;
        body.push(b'\n');
        self.writer.write_all(&body).map_err(closed_on_pipe)?;
        self.writer.flush().map_err(closed_on_pipe)?;
        Ok(())
    }

    fn read_message(&mut self) -> Result<Value, TransportError> {
        let mut content_len: Option<usize> = None;
        loop {
            let mut line = String::new();
            if self.reader.read_line(&mut line)? == 0 {
                return Err(TransportError::Closed);
            }
            let trimmed = line.trim_end_matches(['\r', '\n']);
            if trimmed.is_empty() {
                if let Some(len) = content_len.take() {
                    let mut body = vec![0u8; len];
                    self.reader.read_exact(&mut body)?;
                    return Ok(serde_json::from_slice(&body)?);
                }
                continue;
            }
            if trimmed.to_ascii_lowercase().starts_with("content-length:") {
                content_len = trimmed
                    .split_once(':')
                    .and_then(|(_, len)| len.trim().parse().ok());
                continue;
            }
            match serde_json::from_str::<Value>(trimmed) {
                Ok(value) => return Ok(value),
                Err(_) => debug!(line = trimmed, "skipping non-json output"),
            }
        }
    }

    fn into_writer(self) -> W {
        self.writer
    }
}

fn closed_on_pipe(err: io::Error) -> TransportError {
    if err.kind() == io::ErrorKind::BrokenPipe {
        TransportError::Closed
    } else {
        TransportError::Io(err)
    }
}

#[derive(Deserialize)]
struct ToolList {
    #[serde(default)]
    tools: Vec<ToolSpec>,
}

/// A tool server running as a child process.
pub struct McpClient {
    child: Option<Child>,
    rpc: Option<JsonRpc<ChildStdout, ChildStdin>>,
}

impl McpClient {
    /// Spawns the server at `path` and completes the initialize handshake.
    pub fn connect(path: &str) -> Result<Self, TransportError> {
        let mut child = Command::new(path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|source| TransportError::Spawn {
                path: path.to_string(),
                source,
            })?;

        let stdin = child.stdin.take();
        let stdout = child.stdout.take();
        let (stdin, stdout) = match (stdin, stdout) {
            (Some(stdin), Some(stdout)) => (stdin, stdout),
            _ => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(TransportError::Protocol("server stdio not captured".to_string()));
            }
        };

        let mut client = Self {
            child: Some(child),
            rpc: Some(JsonRpc::new(stdout, stdin)),
        };
        client.initialize()?;
        Ok(client)
    }

    fn initialize(&mut self) -> Result<(), TransportError> {
        let rpc = self.rpc()?;
        let result = rpc.request(
            "initialize",
            json!({
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": {},
                "clientInfo": {"name": CLIENT_NAME, "version": env!("CARGO_PKG_VERSION")},
            }),
        )?;
        rpc.notify("notifications/initialized", Value::Null)?;
        info!(
            server = result["serverInfo"]["name"].as_str().unwrap_or("unknown"),
            protocol = result["protocolVersion"].as_str().unwrap_or("unknown"),
            "connected to tool server"
        );
        Ok(())
    }

    fn rpc(&mut self) -> Result<&mut JsonRpc<ChildStdout, ChildStdin>, TransportError> {
        self.rpc.as_mut().ok_or(TransportError::Closed)
    }

    fn shutdown(&mut self) {
        // Dropping stdin is the server's signal to finish.
        if let Some(rpc) = self.rpc.take() {
            drop(rpc.into_writer());
        }
        let Some(mut child) = self.child.take() else {
            return;
        };

        let deadline = Instant::now() + SHUTDOWN_GRACE;
        loop {
            match child.try_wait() {
                Ok(Some(status)) => {
                    debug!(%status, "tool server exited");
                    return;
                }
                Ok(None) if Instant::now() < deadline => thread::sleep(Duration::from_millis(50)),
                Ok(None) => break,
                Err(err) => {
                    warn!(error = %err, "could not poll tool server");
                    break;
                }
            }
        }
        warn!("tool server still running, killing it");
        let _ = child.kill();
        let _ = child.wait();
    }
}

impl ToolTransport for McpClient {
    fn list_tools(&mut self) -> Result<Vec<ToolSpec>, TransportError> {
        let result = self.rpc()?.request("tools/list", json!({}))?;
        let list: ToolList = serde_json::from_value(result)?;
        Ok(list.tools)
    }

    fn call_tool(&mut self, name: &str, arguments: Value) -> Result<Value, TransportError> {
        self.rpc()?
            .request("tools/call", json!({"name": name, "arguments": arguments}))
    }

    fn close(&mut self) {
        self.shutdown();
    }
}

impl Drop for McpClient {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn rpc_with(input: &str) -> JsonRpc<Cursor<Vec<u8>>, Vec<u8>> {
        JsonRpc::new(Cursor::new(input.as_bytes().to_vec()), Vec::new())
    }

    #[test]
    fn request_skips_noise_and_notifications() {
        let mut rpc = rpc_with(concat!(
            "starting up...\n",
            "{\"jsonrpc\":\"2.0\",\"method\":\"notifications/message\",\"params\":{}}\n",
            "{\"jsonrpc\":\"2.0\",\"id\":1,\"result\":{\"ok\":true}}\n",
        ));
        let result = rpc.request("ping", json!({})).unwrap();
        assert_eq!(result, json!({"ok": true}));

        let sent: Value = serde_json::from_slice(rpc.into_writer().as_slice()).unwrap();
        assert_eq!(sent["method"], "ping");
        assert_eq!(sent["id"], 1);
    }

    #[test]
    fn reads_content_length_frames() {
        let body = "{\"jsonrpc\":\"2.0\",\"id\":1,\"result\":{}}";
        let framed = format!("Content-Length: {}\r\n\r\n{}", body.len(), body);
        let mut rpc = rpc_with(&framed);
        assert_eq!(rpc.request("ping", json!({})).unwrap(), json!({}));
    }

    #[test]
    fn rpc_errors_and_eof() {
        let mut rpc = rpc_with("{\"jsonrpc\":\"2.0\",\"id\":1,\"error\":{\"code\":-32601,\"message\":\"Method not found: x\"}}\n");
        match rpc.request("x", json!({})) {
            Err(TransportError::Rpc { code, .. }) => assert_eq!(code, -32601),
            other => panic!("unexpected: {:?}", other),
        }
        assert!(matches!(rpc.request("y", json!({})), Err(TransportError::Closed)));
    }

    #[test]
    fn spawn_failure_names_the_path() {
        let err = McpClient::connect("/nonexistent/hk-weather-server").err().unwrap();
        assert!(matches!(err, TransportError::Spawn { .. }));
        assert!(err.to_string().contains("/nonexistent/hk-weather-server"));
    }
}
