//! Inter-process communication for the panel daemon
//!
//! Provides a Unix domain socket server speaking line-delimited JSON. Each
//! request names one panel operation; each response carries an
//! HTTP-equivalent status code.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use uuid::Uuid;

use crate::daemon::PanelState;
use crate::error::PanelError;

/// A request envelope: correlation id plus the operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IpcRequest {
    /// Unique request ID for tracking
    pub request_id: String,
    #[serde(flatten)]
    pub operation: Operation,
}

/// Panel operations, one per HTTP-style endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Operation {
    /// GET /health
    Health,
    /// GET /status
    GetStatus,
    /// GET /configs
    ListConfigs,
    /// GET /config/{filename}
    ReadConfig { filename: String },
    /// PUT /config/{filename}
    WriteConfig { filename: String, content: String },
    /// POST /validate
    ValidateConfig,
    /// POST /reload
    Reload,
    /// POST /restart
    Restart,
    /// GET /logs?lines=N
    GetLogs {
        #[serde(default)]
        lines: Option<i64>,
    },
}

impl Operation {
    /// HTTP-style route used in logs
    pub fn route(&self) -> String {
        match self {
            Operation::Health => "GET /health".to_string(),
            Operation::GetStatus => "GET /status".to_string(),
            Operation::ListConfigs => "GET /configs".to_string(),
            Operation::ReadConfig { filename } => format!("GET /config/{}", filename),
            Operation::WriteConfig { filename, .. } => format!("PUT /config/{}", filename),
            Operation::ValidateConfig => "POST /validate".to_string(),
            Operation::Reload => "POST /reload".to_string(),
            Operation::Restart => "POST /restart".to_string(),
            Operation::GetLogs { lines: Some(n) } => format!("GET /logs?lines={}", n),
            Operation::GetLogs { lines: None } => "GET /logs".to_string(),
        }
    }
}

/// IPC response types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status")]
pub enum IpcResponse {
    /// Successful operation
    Success {
        request_id: String,
        code: u16,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        data: Option<serde_json::Value>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    /// Operation failed
    Error {
        request_id: String,
        code: u16,
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        details: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        data: Option<serde_json::Value>,
    },
}

impl IpcResponse {
    pub fn data(request_id: String, data: serde_json::Value) -> Self {
        IpcResponse::Success {
            request_id,
            code: 200,
            data: Some(data),
            message: None,
        }
    }

    pub fn message(request_id: String, message: impl Into<String>) -> Self {
        IpcResponse::Success {
            request_id,
            code: 200,
            data: None,
            message: Some(message.into()),
        }
    }

    /// Error response for a failed operation, prefixed with what was attempted
    pub fn failure(request_id: String, action: &str, err: &PanelError) -> Self {
        IpcResponse::Error {
            request_id,
            code: err.status_code(),
            message: format!("{}: {}", action, err),
            details: None,
            data: None,
        }
    }

    pub fn internal(request_id: String, message: impl Into<String>) -> Self {
        IpcResponse::Error {
            request_id,
            code: 500,
            message: message.into(),
            details: None,
            data: None,
        }
    }

    pub fn code(&self) -> u16 {
        match self {
            IpcResponse::Success { code, .. } | IpcResponse::Error { code, .. } => *code,
        }
    }

    pub fn request_id(&self) -> &str {
        match self {
            IpcResponse::Success { request_id, .. } | IpcResponse::Error { request_id, .. } => {
                request_id
            }
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, IpcResponse::Success { .. })
    }
}

/// Generate unique request ID
pub fn generate_request_id() -> String {
    Uuid::new_v4().to_string()
}

/// IPC server for handling client connections
pub struct IpcServer {
    socket_path: PathBuf,
    listener: Option<UnixListener>,
}

impl Drop for IpcServer {
    fn drop(&mut self) {
        // Clean up socket file when server is dropped
        if self.listener.is_some() && self.socket_path.exists() {
            let _ = std::fs::remove_file(&self.socket_path);
        }
    }
}

impl IpcServer {
    pub fn new(socket_path: PathBuf) -> Self {
        Self {
            socket_path,
            listener: None,
        }
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// Bind the socket, replacing a stale socket file if one is left over
    pub fn bind(&mut self) -> Result<()> {
        if self.socket_path.exists() {
            std::fs::remove_file(&self.socket_path).with_context(|| {
                format!("Failed to remove existing socket: {}", self.socket_path.display())
            })?;
        }

        if let Some(parent) = self.socket_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create socket directory: {}", parent.display()))?;
        }

        let listener = UnixListener::bind(&self.socket_path)
            .with_context(|| format!("Failed to bind to socket: {}", self.socket_path.display()))?;

        // Owner and group only; the socket grants control over nginx
        std::fs::set_permissions(&self.socket_path, std::fs::Permissions::from_mode(0o660))
            .with_context(|| format!("Failed to set socket permissions: {}", self.socket_path.display()))?;

        self.listener = Some(listener);
        Ok(())
    }

    /// Accept connections until the listener fails, one task per connection
    pub async fn serve(&self, state: Arc<PanelState>) -> Result<()> {
        let listener = self
            .listener
            .as_ref()
            .context("IPC server must be bound before serving")?;

        loop {
            match listener.accept().await {
                Ok((stream, _)) => {
                    let state = state.clone();
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, state.clone()).await {
                            state
                                .logger
                                .log_error(&format!("Error handling IPC connection: {:#}", e), None);
                        }
                    });
                }
                Err(e) => {
                    state
                        .logger
                        .log_error(&format!("Error accepting IPC connection: {}", e), None);
                    return Err(e).context("IPC listener failed");
                }
            }
        }
    }

    /// Stop the server and clean up socket file
    pub fn stop(&mut self) -> Result<()> {
        self.listener = None;
        if self.socket_path.exists() {
            std::fs::remove_file(&self.socket_path).with_context(|| {
                format!("Failed to remove socket file: {}", self.socket_path.display())
            })?;
        }
        Ok(())
    }
}

/// Serve requests on one connection until the client closes it
async fn handle_connection(stream: UnixStream, state: Arc<PanelState>) -> Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    while let Some(line) = lines.next_line().await.context("Failed to read from client")? {
        if line.trim().is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<IpcRequest>(line.trim()) {
            Ok(request) => process_message(&state, request).await,
            Err(e) => IpcResponse::Error {
                request_id: String::new(),
                code: 400,
                message: "Invalid request".to_string(),
                details: Some(e.to_string()),
                data: None,
            },
        };

        let response_json =
            serde_json::to_string(&response).context("Failed to serialize response")?;
        writer
            .write_all(response_json.as_bytes())
            .await
            .context("Failed to write response")?;
        writer.write_all(b"\n").await.context("Failed to write newline")?;
    }

    Ok(())
}

/// Execute one request against the panel state and log the outcome
pub async fn process_message(state: &PanelState, request: IpcRequest) -> IpcResponse {
    let started = Instant::now();
    let route = request.operation.route();
    let request_id = request.request_id.clone();

    let response = dispatch(state, request).await;

    state
        .logger
        .log_request(&request_id, &route, response.code(), started.elapsed().as_millis());
    response
}

async fn dispatch(state: &PanelState, request: IpcRequest) -> IpcResponse {
    let IpcRequest {
        request_id,
        operation,
    } = request;

    match operation {
        Operation::Health => {
            let status = state.controller.check_installation().await;
            let healthy = status.is_installed;
            let label = if healthy { "healthy" } else { "unhealthy" };
            let data = json!({ "status": label, "nginx": status });
            if healthy {
                IpcResponse::data(request_id, data)
            } else {
                IpcResponse::Error {
                    request_id,
                    code: 503,
                    message: "nginx is not installed".to_string(),
                    details: None,
                    data: Some(data),
                }
            }
        }
        Operation::GetStatus => {
            let status = state.controller.check_installation().await;
            match serde_json::to_value(&status) {
                Ok(value) => IpcResponse::data(request_id, value),
                Err(e) => IpcResponse::internal(request_id, format!("Failed to encode status: {}", e)),
            }
        }
        Operation::ListConfigs => {
            let store = state.store.clone();
            match tokio::task::spawn_blocking(move || store.list_files()).await {
                Ok(Ok(configs)) => IpcResponse::data(request_id, json!({ "configs": configs })),
                Ok(Err(e)) => IpcResponse::failure(request_id, "Failed to list config files", &e),
                Err(e) => IpcResponse::internal(request_id, format!("Internal error: {}", e)),
            }
        }
        Operation::ReadConfig { filename } => {
            let store = state.store.clone();
            let name = filename.clone();
            match tokio::task::spawn_blocking(move || store.read_file(&name)).await {
                Ok(Ok(content)) => IpcResponse::data(
                    request_id,
                    json!({ "filename": filename, "content": content }),
                ),
                Ok(Err(e)) => IpcResponse::failure(request_id, "Failed to read config file", &e),
                Err(e) => IpcResponse::internal(request_id, format!("Internal error: {}", e)),
            }
        }
        Operation::WriteConfig { filename, content } => {
            let store = state.store.clone();
            match tokio::task::spawn_blocking(move || store.write_file(&filename, &content)).await {
                Ok(Ok(outcome)) => {
                    state
                        .logger
                        .log_config_written(&outcome.path, outcome.backup.as_deref());
                    IpcResponse::message(request_id, "Configuration file updated successfully")
                }
                Ok(Err(e)) => IpcResponse::failure(request_id, "Failed to update config file", &e),
                Err(e) => IpcResponse::internal(request_id, format!("Internal error: {}", e)),
            }
        }
        Operation::ValidateConfig => {
            let result = state.controller.validate_config().await;
            let data = json!(result);
            if result.valid {
                IpcResponse::data(request_id, data)
            } else {
                IpcResponse::Error {
                    request_id,
                    code: 400,
                    message: "Configuration test failed".to_string(),
                    details: result.message,
                    data: Some(data),
                }
            }
        }
        Operation::Reload => match state.controller.reload().await {
            Ok(()) => IpcResponse::message(request_id, "Nginx reloaded successfully"),
            Err(e) => IpcResponse::failure(request_id, "Failed to reload nginx", &e),
        },
        Operation::Restart => match state.controller.restart().await {
            Ok(()) => IpcResponse::message(request_id, "Nginx restarted successfully"),
            Err(e) => IpcResponse::failure(request_id, "Failed to restart nginx", &e),
        },
        Operation::GetLogs { lines } => {
            match state.controller.get_logs(lines.unwrap_or(0)).await {
                Ok(logs) => IpcResponse::data(request_id, json!({ "logs": logs })),
                Err(e) => IpcResponse::failure(request_id, "Failed to get logs", &e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_wire_format() {
        let request = IpcRequest {
            request_id: "r1".to_string(),
            operation: Operation::ReadConfig {
                filename: "app.conf".to_string(),
            },
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json,
            json!({ "request_id": "r1", "type": "ReadConfig", "filename": "app.conf" })
        );

        let parsed: IpcRequest = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, request);
    }

    #[test]
    fn test_unit_operation_parses_from_tag_only() {
        let parsed: IpcRequest =
            serde_json::from_str(r#"{"request_id":"r2","type":"Reload"}"#).unwrap();
        assert_eq!(parsed.operation, Operation::Reload);
    }

    #[test]
    fn test_get_logs_lines_optional() {
        let parsed: IpcRequest =
            serde_json::from_str(r#"{"request_id":"r3","type":"GetLogs"}"#).unwrap();
        assert_eq!(parsed.operation, Operation::GetLogs { lines: None });
    }

    #[test]
    fn test_routes_match_endpoint_table() {
        assert_eq!(Operation::GetStatus.route(), "GET /status");
        assert_eq!(Operation::ListConfigs.route(), "GET /configs");
        assert_eq!(
            Operation::WriteConfig {
                filename: "a.conf".into(),
                content: String::new()
            }
            .route(),
            "PUT /config/a.conf"
        );
        assert_eq!(Operation::ValidateConfig.route(), "POST /validate");
        assert_eq!(Operation::GetLogs { lines: Some(10) }.route(), "GET /logs?lines=10");
    }

    #[test]
    fn test_failure_response_uses_error_code() {
        let err = PanelError::NotFound("missing.conf".to_string());
        let response = IpcResponse::failure("r4".to_string(), "Failed to read config file", &err);
        assert_eq!(response.code(), 404);
        assert!(!response.is_success());
        match response {
            IpcResponse::Error { message, .. } => {
                assert_eq!(message, "Failed to read config file: file not found: missing.conf")
            }
            other => panic!("unexpected response: {other:?}"),
        }
    }
}
