use std::io;
use std::sync::Arc;

use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use super::protocol::{
    CallToolParams, RpcError, RpcRequest, RpcResponse, ServerInfo, INVALID_PARAMS, INVALID_REQUEST,
    METHOD_NOT_FOUND, PARSE_ERROR, PROTOCOL_VERSION,
};
use crate::tools::ToolRegistry;

/// Everything a request handler may touch.
pub struct ServerContext {
    pub registry: Arc<ToolRegistry>,
    pub info: ServerInfo,
}

impl ServerContext {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self {
            registry,
            info: ServerInfo::default(),
        }
    }
}

/// Serves newline-delimited JSON-RPC until `reader` hits EOF, then waits for
/// in-flight requests and flushes every response.
pub async fn serve<R, W>(ctx: Arc<ServerContext>, reader: R, writer: W) -> io::Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    let writer_task = tokio::spawn(async move {
        let mut writer = writer;
        while let Some(line) = rx.recv().await {
            writer.write_all(line.as_bytes()).await?;
            writer.write_all(b"\n").await?;
            writer.flush().await?;
        }
        Ok::<(), io::Error>(())
    });

    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    let mut in_flight = JoinSet::new();
    info!(server = %ctx.info.name, "listening on stdio");

    loop {
        tokio::select! {
            // Partial reads stay in `buf` when the other branch wins.
            read = reader.read_until(b'\n', &mut buf) => {
                match read {
                    Ok(0) => {
                        spawn_request(&mut in_flight, &ctx, &tx, std::mem::take(&mut buf));
                        break;
                    }
                    Ok(_) => spawn_request(&mut in_flight, &ctx, &tx, std::mem::take(&mut buf)),
                    Err(err) => {
                        error!(error = %err, "failed to read request, stopping input");
                        break;
                    }
                }
            }
            Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                if let Err(err) = joined {
                    error!(error = %err, "request task failed");
                }
            }
        }
    }

    debug!(pending = in_flight.len(), "input closed, draining requests");
    while let Some(joined) = in_flight.join_next().await {
        if let Err(err) = joined {
            error!(error = %err, "request task failed");
        }
    }
    drop(tx);

    match writer_task.await {
        Ok(result) => result,
        Err(err) => Err(io::Error::new(io::ErrorKind::Other, err.to_string())),
    }
}

fn spawn_request(
    in_flight: &mut JoinSet<()>,
    ctx: &Arc<ServerContext>,
    tx: &mpsc::UnboundedSender<String>,
    message: Vec<u8>,
) {
    if message.iter().all(u8::is_ascii_whitespace) {
        return;
    }
    let ctx = ctx.clone();
    let tx = tx.clone();
    in_flight.spawn(async move {
        if let Some(response) = handle_message(&ctx, &message).await {
            match serde_json::to_string(&response) {
                Ok(text) => {
                    let _ = tx.send(text);
                }
                Err(err) => error!(error = %err, "failed to encode response"),
            }
        }
    });
}

/// Returns `None` for notifications.
pub async fn handle_line(ctx: &ServerContext, line: &str) -> Option<RpcResponse> {
    handle_message(ctx, line.as_bytes()).await
}

/// Bytes that are not valid JSON (including invalid UTF-8) get a parse error.
pub async fn handle_message(ctx: &ServerContext, message: &[u8]) -> Option<RpcResponse> {
    let value: Value = match serde_json::from_slice(message) {
        Ok(value) => value,
        Err(err) => {
            warn!(error = %err, "malformed request line");
            return Some(RpcResponse::failure(
                Value::Null,
                RpcError::new(PARSE_ERROR, format!("Parse error: {}", err)),
            ));
        }
    };

    let id = value.get("id").cloned().unwrap_or(Value::Null);
    let request: RpcRequest = match serde_json::from_value(value) {
        Ok(request) => request,
        Err(err) => {
            return Some(RpcResponse::failure(
                id,
                RpcError::new(INVALID_REQUEST, format!("Invalid request: {}", err)),
            ));
        }
    };

    let Some(id) = request.id else {
        debug!(method = %request.method, "notification ignored");
        return None;
    };

    Some(match dispatch(ctx, &request.method, request.params).await {
        Ok(result) => RpcResponse::ok(id, result),
        Err(err) => RpcResponse::failure(id, err),
    })
}

async fn dispatch(ctx: &ServerContext, method: &str, params: Value) -> Result<Value, RpcError> {
    match method {
        "initialize" => Ok(json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {"tools": {}},
            "serverInfo": ctx.info,
        })),
        "ping" => Ok(json!({})),
        "tools/list" => Ok(json!({"tools": ctx.registry.list_tools()})),
        "tools/call" => {
            let params: CallToolParams = serde_json::from_value(params)
                .map_err(|err| RpcError::new(INVALID_PARAMS, format!("Invalid params: {}", err)))?;
            info!(tool = %params.name, "tool call");
            let result = ctx.registry.execute(&params.name, params.arguments).await;
            Ok(json!({
                "content": [{"type": "text", "text": result.to_wire().to_string()}],
                "isError": !result.is_success(),
            }))
        }
        other => Err(RpcError::new(METHOD_NOT_FOUND, format!("Method not found: {}", other))),
    }
}
