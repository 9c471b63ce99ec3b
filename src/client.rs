//! IPC client used by the CLI subcommands

use anyhow::{bail, Context, Result};
use std::path::Path;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;

use crate::daemon::ipc::{generate_request_id, IpcRequest, IpcResponse, Operation};

/// Send one operation to the daemon and wait for its response
pub async fn send_request(socket_path: &Path, operation: Operation) -> Result<IpcResponse> {
    let stream = UnixStream::connect(socket_path).await.with_context(|| {
        format!(
            "Failed to connect to nginx-panel daemon at {} (is it running?)",
            socket_path.display()
        )
    })?;

    let request = IpcRequest {
        request_id: generate_request_id(),
        operation,
    };

    let (reader, mut writer) = stream.into_split();
    let request_json = serde_json::to_string(&request).context("Failed to serialize request")?;
    writer
        .write_all(request_json.as_bytes())
        .await
        .context("Failed to write request")?;
    writer.write_all(b"\n").await.context("Failed to write newline")?;
    writer.shutdown().await.context("Failed to finish request")?;

    let mut reader = BufReader::new(reader);
    let mut line = String::new();
    let read = reader
        .read_line(&mut line)
        .await
        .context("Failed to read response from daemon")?;
    if read == 0 {
        bail!("Daemon closed the connection without responding");
    }

    let response: IpcResponse =
        serde_json::from_str(line.trim()).context("Failed to parse daemon response")?;

    if response.request_id() != request.request_id && !response.request_id().is_empty() {
        bail!(
            "Response id {} does not match request {}",
            response.request_id(),
            request.request_id
        );
    }

    Ok(response)
}
