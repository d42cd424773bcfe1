//! Line-delimited JSON tool server on stdio.
//!
//! Each input line is one request, `{"id"?, "tool", "params"?}`; each response
//! is one line, `{"id"?, "result"}`. A line that is not a request gets an
//! `invalid_request` error response. Requests are handled strictly one at a
//! time. When the input closes, any active session is ended so its audit trail
//! lands on disk.

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, info, warn};

use crate::orchestrator::Orchestrator;
use crate::tools;

#[derive(Debug, Deserialize)]
struct Request {
    #[serde(default)]
    id: Option<Value>,
    tool: String,
    #[serde(default)]
    params: Value,
}

/// Serve on the process's stdin/stdout.
pub async fn serve_stdio(orchestrator: Orchestrator) -> Result<()> {
    let stdin = BufReader::new(tokio::io::stdin());
    let stdout = tokio::io::stdout();
    serve(orchestrator, stdin, stdout).await
}

/// Serve requests from `reader`, writing responses to `writer`, until EOF.
pub async fn serve<R, W>(mut orchestrator: Orchestrator, reader: R, mut writer: W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    info!("Tool server listening on stdio");
    let mut lines = reader.lines();
    let mut handled = 0usize;

    while let Some(line) = lines.next_line().await.context("Failed to read request")? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let response = handle_line(&mut orchestrator, line);
        let mut out = serde_json::to_string(&response).context("Failed to encode response")?;
        out.push('\n');
        writer
            .write_all(out.as_bytes())
            .await
            .context("Failed to write response")?;
        writer.flush().await.context("Failed to flush response")?;
        handled += 1;
    }

    if orchestrator.has_session() {
        match orchestrator.end_session() {
            Ok(summary) => info!(
                session = %summary.session_id,
                completed = summary.completed_phases.len(),
                "Session ended on disconnect"
            ),
            Err(e) => warn!(error = %e, "Failed to end session on disconnect"),
        }
    }
    debug!(requests = handled, "Input closed");
    Ok(())
}

fn handle_line(orchestrator: &mut Orchestrator, line: &str) -> Value {
    match serde_json::from_str::<Request>(line) {
        Ok(request) => {
            let result = tools::dispatch(orchestrator, &request.tool, request.params);
            match request.id {
                Some(id) => json!({ "id": id, "result": result }),
                None => json!({ "result": result }),
            }
        }
        Err(e) => json!({
            "result": {
                "error": "invalid_request",
                "message": format!("Malformed request: {}", e),
                "resolution": "Send one JSON object per line: {\"tool\": ..., \"params\": {...}}",
            }
        }),
    }
}
