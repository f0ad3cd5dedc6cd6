// MCP server for JVM inspection and in-target expression evaluation
//
// Speaks JSON-RPC over stdio: one JSON object per line on stdout, logs on
// stderr. The debug channel itself is a JDWP socket to the multiplexing
// proxy in front of the target JVM.

use anyhow::Result;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, error, info};

mod config;
mod control;
mod error;
mod eval;
mod handlers;
mod inspect;
mod protocol;
mod proxy;
mod session;
mod tools;
mod watchers;

use config::Config;
use handlers::RequestHandler;
use protocol::*;

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr only; stdout carries the JSON-RPC stream
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("inspector_mcp=info".parse().unwrap()),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = Config::from_env();
    info!(
        "Starting inspector-mcp (proxy port {}, target JDWP port {})",
        config.proxy_port, config.jdwp_port
    );

    let handler = RequestHandler::new(config);

    let stdin = tokio::io::stdin();
    let mut stdout = tokio::io::stdout();
    let mut reader = BufReader::new(stdin);

    info!("Server ready, waiting for requests");

    loop {
        let mut line = String::new();
        match reader.read_line(&mut line).await {
            Ok(0) => {
                info!("Client disconnected");
                break;
            }
            Ok(_) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                debug!("Received: {}", line);

                match serde_json::from_str::<Value>(line) {
                    Ok(value) => {
                        // Requests carry an id; notifications do not
                        if value.get("id").is_some() {
                            match serde_json::from_value::<JsonRpcRequest>(value) {
                                Ok(request) => {
                                    let response = handler.handle_request(request).await;
                                    write_response(&mut stdout, &response).await?;
                                }
                                Err(e) => {
                                    error!("Invalid request: {}", e);
                                    let response = error_response(INVALID_REQUEST, "Invalid request");
                                    write_response(&mut stdout, &response).await?;
                                }
                            }
                        } else {
                            match serde_json::from_value::<JsonRpcNotification>(value) {
                                Ok(notification) => {
                                    handler.handle_notification(notification).await;
                                }
                                Err(e) => error!("Invalid notification: {}", e),
                            }
                        }
                    }
                    Err(e) => {
                        error!("Parse error: {}", e);
                        let response = error_response(PARSE_ERROR, "Parse error");
                        write_response(&mut stdout, &response).await?;
                    }
                }
            }
            Err(e) => {
                error!("Read error: {}", e);
                break;
            }
        }
    }

    info!("Server shutting down");
    Ok(())
}

fn error_response(code: i32, message: &str) -> JsonRpcResponse {
    JsonRpcResponse {
        jsonrpc: "2.0".to_string(),
        id: Value::Null,
        result: None,
        error: Some(JsonRpcError {
            code,
            message: message.to_string(),
            data: None,
        }),
    }
}

async fn write_response(
    stdout: &mut tokio::io::Stdout,
    response: &JsonRpcResponse,
) -> Result<()> {
    let text = serde_json::to_string(response)?;
    debug!("Sending: {}", text);
    stdout.write_all(text.as_bytes()).await?;
    stdout.write_all(b"\n").await?;
    stdout.flush().await?;
    Ok(())
}
