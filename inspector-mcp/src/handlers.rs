// Request handlers and the orchestration layer
//
// Dispatches JSON-RPC requests onto the components, and enforces the two
// cross-component contracts:
//   - compiler classpath discovery runs on the suspended thread before the
//     first expression evaluation on a session, never nested inside one
//   - a tool that fails on a transport fault is retried exactly once; the
//     session layer re-attaches to the last endpoint on the way back in
//
// Tool failures are returned as `ERROR: ...` text content with is_error set,
// never as JSON-RPC faults.

use crate::config::Config;
use crate::control::{self, StepDepth};
use crate::error::{DebugError, DebugResult};
use crate::eval::ExpressionEvaluator;
use crate::inspect;
use crate::protocol::*;
use crate::proxy::ProxyClient;
use crate::session::SessionManager;
use crate::tools;
use crate::watchers::WatcherRegistry;
use jdwp_client::types::{Frame, ThreadId};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::fmt::Write as _;
use tracing::{debug, info, warn};

pub struct RequestHandler {
    config: Config,
    session: SessionManager,
    watchers: WatcherRegistry,
    evaluator: ExpressionEvaluator,
    proxy: ProxyClient,
}

impl RequestHandler {
    pub fn new(config: Config) -> Self {
        let proxy = ProxyClient::new(config.proxy_http_port());
        Self {
            config,
            session: SessionManager::new(),
            watchers: WatcherRegistry::new(),
            evaluator: ExpressionEvaluator::new(),
            proxy,
        }
    }

    pub async fn handle_request(&self, request: JsonRpcRequest) -> JsonRpcResponse {
        let result = match request.method.as_str() {
            "initialize" => self.handle_initialize(request.params),
            "tools/list" => self.handle_list_tools(),
            "tools/call" => self.handle_call_tool(request.params).await,
            _ => Err(JsonRpcError {
                code: METHOD_NOT_FOUND,
                message: format!("Method not found: {}", request.method),
                data: None,
            }),
        };

        match result {
            Ok(value) => JsonRpcResponse {
                jsonrpc: "2.0".to_string(),
                id: request.id,
                result: Some(value),
                error: None,
            },
            Err(error) => JsonRpcResponse {
                jsonrpc: "2.0".to_string(),
                id: request.id,
                result: None,
                error: Some(error),
            },
        }
    }

    pub async fn handle_notification(&self, notification: JsonRpcNotification) {
        match notification.method.as_str() {
            "notifications/initialized" => info!("Client initialized"),
            "notifications/cancelled" => debug!("Request cancelled"),
            other => warn!("Unknown notification: {}", other),
        }
    }

    fn handle_initialize(&self, params: Option<Value>) -> Result<Value, JsonRpcError> {
        let _params: InitializeParams =
            serde_json::from_value(params.unwrap_or(json!({}))).map_err(|e| JsonRpcError {
                code: INVALID_PARAMS,
                message: format!("Invalid initialize params: {}", e),
                data: None,
            })?;

        let result = InitializeResult {
            protocol_version: "2024-11-05".to_string(),
            capabilities: ServerCapabilities {
                tools: ToolsCapability {},
            },
            server_info: ServerInfo {
                name: "inspector-mcp".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
            instructions: Some(
                "JVM inspection and in-target expression evaluation over JDWP. \
                 Start with debug.attach, then debug.set_breakpoint, \
                 debug.get_stack, debug.evaluate, and watcher tools."
                    .to_string(),
            ),
        };

        Ok(serde_json::to_value(result).unwrap())
    }

    fn handle_list_tools(&self) -> Result<Value, JsonRpcError> {
        let result = ListToolsResult {
            tools: tools::get_tools(),
        };
        Ok(serde_json::to_value(result).unwrap())
    }

    async fn handle_call_tool(&self, params: Option<Value>) -> Result<Value, JsonRpcError> {
        let call: CallToolParams =
            serde_json::from_value(params.unwrap_or(json!({}))).map_err(|e| JsonRpcError {
                code: INVALID_PARAMS,
                message: format!("Invalid tool call params: {}", e),
                data: None,
            })?;

        let mut result = self.dispatch(&call.name, &call.arguments).await;

        // One transparent retry after a transport fault; the session layer
        // re-attaches to the last endpoint when acquired again.
        if result.as_ref().is_err_and(|e| e.is_transport()) {
            info!("Transport fault during {}; retrying once", call.name);
            result = self.dispatch(&call.name, &call.arguments).await;
        }

        let call_result = match result {
            Ok(text) => CallToolResult {
                content: vec![ContentBlock::Text { text }],
                is_error: None,
            },
            Err(error) => CallToolResult {
                content: vec![ContentBlock::Text {
                    text: error.to_message(),
                }],
                is_error: Some(true),
            },
        };

        Ok(serde_json::to_value(call_result).unwrap())
    }

    async fn dispatch(&self, name: &str, args: &Value) -> DebugResult<String> {
        match name {
            "debug.attach" => self.handle_attach(args).await,
            "debug.detach" => self.handle_detach().await,
            "debug.get_version" => self.handle_get_version().await,
            "debug.list_threads" => self.handle_list_threads().await,
            "debug.get_stack" => self.handle_get_stack(args).await,
            "debug.get_locals" => self.handle_get_locals(args).await,
            "debug.get_fields" => self.handle_get_fields(args).await,
            "debug.resume" => self.handle_resume().await,
            "debug.step_over" => self.handle_step(args, StepDepth::Over).await,
            "debug.step_into" => self.handle_step(args, StepDepth::Into).await,
            "debug.step_out" => self.handle_step(args, StepDepth::Out).await,
            "debug.set_breakpoint" => self.handle_set_breakpoint(args).await,
            "debug.clear_breakpoint" => self.handle_clear_breakpoint(args).await,
            "debug.list_breakpoints" => control::list_breakpoints(&self.proxy).await,
            "debug.clear_breakpoint_by_id" => {
                control::clear_breakpoint_by_id(&self.proxy, required_i32(args, "request_id")?)
                    .await
            }
            "debug.clear_all_breakpoints" => control::clear_all_breakpoints(&self.proxy).await,
            "debug.get_current_thread" => self.handle_get_current_thread().await,
            "debug.get_events" => self.handle_get_events(args).await,
            "debug.clear_events" => {
                self.session.clear_events();
                Ok("Event history cleared".to_string())
            }
            "debug.evaluate" => self.handle_evaluate(args).await,
            "debug.attach_watcher" => self.handle_attach_watcher(args),
            "debug.detach_watcher" => self.handle_detach_watcher(args),
            "debug.list_watchers_for_breakpoint" => {
                self.handle_list_watchers_for_breakpoint(args)
            }
            "debug.list_all_watchers" => self.handle_list_all_watchers(),
            "debug.clear_all_watchers" => self.handle_clear_all_watchers(),
            "debug.evaluate_watchers" => self.handle_evaluate_watchers(args).await,
            "debug.clear_watchers_for_breakpoint" => {
                let breakpoint_id = required_i32(args, "breakpoint_id")?;
                let count = self.watchers.delete_for_breakpoint(breakpoint_id);
                Ok(format!(
                    "Removed {} watcher(s) from breakpoint {}",
                    count, breakpoint_id
                ))
            }
            other => Err(DebugError::UnknownTool(other.to_string())),
        }
    }

    // --- session ---

    async fn handle_attach(&self, args: &Value) -> DebugResult<String> {
        let host = args
            .get("host")
            .and_then(|v| v.as_str())
            .unwrap_or("localhost");
        let port = args
            .get("port")
            .and_then(|v| v.as_u64())
            .map(|p| p as u16)
            .unwrap_or(self.config.proxy_port);

        let outcome = self.session.attach(host, port).await?;
        if outcome.fresh {
            // New session: compiler configuration belongs to the old one
            self.evaluator.reset().await;
        }
        Ok(outcome.message)
    }

    async fn handle_detach(&self) -> DebugResult<String> {
        self.evaluator.reset().await;
        Ok(self.session.detach().await)
    }

    async fn handle_get_version(&self) -> DebugResult<String> {
        let mut guard = self.session.acquire().await?;
        let version = guard
            .connection()
            .get_version()
            .await
            .map_err(DebugError::from)?;
        Ok(format!(
            "VM: {}\nVersion: {}\nDescription: {}",
            version.vm_name, version.vm_version, version.description
        ))
    }

    // --- inspection ---

    async fn handle_list_threads(&self) -> DebugResult<String> {
        let mut guard = self.session.acquire().await?;
        inspect::list_threads(guard.connection(), &self.session).await
    }

    async fn handle_get_stack(&self, args: &Value) -> DebugResult<String> {
        let thread_id = required_u64(args, "thread_id")?;
        let mut guard = self.session.acquire().await?;
        inspect::get_stack(guard.connection(), thread_id).await
    }

    async fn handle_get_locals(&self, args: &Value) -> DebugResult<String> {
        let thread_id = required_u64(args, "thread_id")?;
        let frame_index = optional_usize(args, "frame_index").unwrap_or(0);
        let mut guard = self.session.acquire().await?;
        inspect::get_locals(guard.connection(), &self.session, thread_id, frame_index).await
    }

    async fn handle_get_fields(&self, args: &Value) -> DebugResult<String> {
        let object_id = required_u64(args, "object_id")?;
        let mut guard = self.session.acquire().await?;
        inspect::get_object_fields(guard.connection(), &self.session, object_id).await
    }

    // --- control ---

    async fn handle_resume(&self) -> DebugResult<String> {
        let mut guard = self.session.acquire().await?;
        control::resume_all(guard.connection()).await
    }

    async fn handle_step(&self, args: &Value, depth: StepDepth) -> DebugResult<String> {
        let thread_id = required_u64(args, "thread_id")?;
        let mut guard = self.session.acquire().await?;
        control::step(guard.connection(), thread_id, depth).await
    }

    async fn handle_set_breakpoint(&self, args: &Value) -> DebugResult<String> {
        let class_name = required_str(args, "class_name")?;
        let line = required_i32(args, "line")?;
        let mut guard = self.session.acquire().await?;
        control::set_breakpoint(guard.connection(), class_name, line).await
    }

    async fn handle_clear_breakpoint(&self, args: &Value) -> DebugResult<String> {
        let class_name = required_str(args, "class_name")?;
        let line = required_i32(args, "line")?;
        let mut guard = self.session.acquire().await?;
        control::clear_breakpoint(guard.connection(), &self.proxy, class_name, line).await
    }

    // --- proxy-backed lookups ---

    async fn handle_get_current_thread(&self) -> DebugResult<String> {
        let Some(current) = self.proxy.current_thread().await? else {
            return Ok(
                "No current breakpoint detected. Trigger a breakpoint first.".to_string(),
            );
        };

        let mut guard = self.session.acquire().await?;
        let conn = guard.connection();

        let threads = conn.get_all_threads().await.map_err(DebugError::from)?;
        if !threads.contains(&current.thread_id) {
            return Ok(format!(
                "Thread ID {} found in proxy but not in VM",
                current.thread_id
            ));
        }

        let name = conn
            .get_thread_name(current.thread_id)
            .await
            .map_err(DebugError::from)?;
        let status = conn
            .get_thread_status(current.thread_id)
            .await
            .map_err(DebugError::from)?;
        let frames = if status.is_suspended() {
            conn.get_frame_count(current.thread_id).await.unwrap_or(0)
        } else {
            0
        };

        Ok(format!(
            "Current thread: {} (ID={}, suspended={}, frames={})",
            name,
            current.thread_id,
            status.is_suspended(),
            frames
        ))
    }

    // --- events ---

    async fn handle_get_events(&self, args: &Value) -> DebugResult<String> {
        let count = optional_usize(args, "count").unwrap_or(20).clamp(1, 100);

        // Drain anything pending on the wire into the history first
        if let Ok(mut guard) = self.session.acquire().await {
            self.session.pump_events(&mut guard).await;
        }

        let events = self.session.recent_events(count);
        if events.is_empty() {
            return Ok("No events recorded yet.\n\n\
                       Events are captured while attached: breakpoints, steps, \
                       exceptions, thread starts and deaths, class prepares."
                .to_string());
        }

        let mut out = format!("Recent events ({} most recent):\n\n", events.len());
        for (i, event) in events.iter().enumerate() {
            writeln!(out, "{}. {}", i + 1, event).unwrap();
        }
        Ok(out)
    }

    // --- evaluation ---

    async fn handle_evaluate(&self, args: &Value) -> DebugResult<String> {
        let thread_id = required_u64(args, "thread_id")?;
        let frame_index = optional_usize(args, "frame_index").unwrap_or(0);
        let expression = required_str(args, "expression")?;
        if expression.trim().is_empty() {
            return Err(DebugError::InvalidArgument("expression"));
        }

        let mut guard = self.session.acquire().await?;
        let conn = guard.connection();

        inspect::require_suspended_thread(conn, thread_id).await?;

        // Discovery performs remote invocations of its own, so it must
        // finish before the evaluation starts issuing them.
        self.evaluator.configure(conn, thread_id).await?;

        let frame = frame_at(conn, thread_id, frame_index).await?;
        let value = self
            .evaluator
            .evaluate(conn, thread_id, &frame, expression.trim())
            .await?;

        let rendered = inspect::format_value(conn, &self.session, &value).await?;
        Ok(format!("{} = {}", expression.trim(), rendered))
    }

    // --- watchers ---

    fn handle_attach_watcher(&self, args: &Value) -> DebugResult<String> {
        let breakpoint_id = required_i32(args, "breakpoint_id")?;
        let label = required_str(args, "label")?;
        let expression = required_str(args, "expression")?;
        if expression.trim().is_empty() {
            return Err(DebugError::InvalidArgument("expression"));
        }

        let watcher_id = self
            .watchers
            .create(label, breakpoint_id, expression.trim());

        Ok(format!(
            "Watcher attached\n\n  Watcher ID: {}\n  Label: {}\n  Breakpoint: {}\n  \
             Expression: {}\n\nIt will be evaluated when breakpoint {} is hit. Use \
             debug.detach_watcher to remove it.",
            watcher_id,
            label,
            breakpoint_id,
            expression.trim(),
            breakpoint_id
        ))
    }

    fn handle_detach_watcher(&self, args: &Value) -> DebugResult<String> {
        let watcher_id = required_str(args, "watcher_id")?;
        let watcher = self
            .watchers
            .get(watcher_id)
            .ok_or_else(|| DebugError::WatcherNotFound(watcher_id.to_string()))?;

        if self.watchers.delete(watcher_id) {
            Ok(format!(
                "Watcher detached: '{}' (ID: {}, Breakpoint: {})",
                watcher.label, watcher_id, watcher.breakpoint_id
            ))
        } else {
            Err(DebugError::WatcherNotFound(watcher_id.to_string()))
        }
    }

    fn handle_list_watchers_for_breakpoint(&self, args: &Value) -> DebugResult<String> {
        let breakpoint_id = required_i32(args, "breakpoint_id")?;
        let watchers = self.watchers.for_breakpoint(breakpoint_id);

        if watchers.is_empty() {
            return Ok(format!(
                "No watchers attached to breakpoint {}.",
                breakpoint_id
            ));
        }

        let mut out = format!(
            "Watchers for breakpoint {} ({} total):\n\n",
            breakpoint_id,
            watchers.len()
        );
        for (i, w) in watchers.iter().enumerate() {
            writeln!(out, "{}. [{}] {}", i + 1, short_id(&w.id), w.label).unwrap();
            writeln!(out, "   Expression: {}\n", w.expression).unwrap();
        }
        Ok(out)
    }

    fn handle_list_all_watchers(&self) -> DebugResult<String> {
        let watchers = self.watchers.all();
        if watchers.is_empty() {
            return Ok("No watchers configured.\n\n\
                       Use debug.attach_watcher(breakpoint_id, label, expression) to create one."
                .to_string());
        }

        let stats = self.watchers.stats();
        let mut out = format!(
            "Active watchers: {} across {} breakpoints\n\n",
            stats.total_watchers, stats.breakpoints_with_watchers
        );

        let mut grouped: HashMap<i32, Vec<_>> = HashMap::new();
        for w in watchers {
            grouped.entry(w.breakpoint_id).or_default().push(w);
        }
        let mut breakpoint_ids: Vec<_> = grouped.keys().copied().collect();
        breakpoint_ids.sort_unstable();

        for breakpoint_id in breakpoint_ids {
            let group = &grouped[&breakpoint_id];
            writeln!(out, "Breakpoint {} ({} watchers):", breakpoint_id, group.len()).unwrap();
            for w in group {
                writeln!(out, "  - [{}] {}", short_id(&w.id), w.label).unwrap();
                writeln!(out, "    Expression: {}", w.expression).unwrap();
            }
            out.push('\n');
        }
        Ok(out)
    }

    fn handle_clear_all_watchers(&self) -> DebugResult<String> {
        let count = self.watchers.stats().total_watchers;
        self.watchers.clear();
        Ok(format!("Cleared {} watcher(s)", count))
    }

    async fn handle_evaluate_watchers(&self, args: &Value) -> DebugResult<String> {
        let thread_id = required_u64(args, "thread_id")?;
        let scope = args
            .get("scope")
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
            .unwrap_or("current_frame");
        let breakpoint_id = args
            .get("breakpoint_id")
            .and_then(|v| v.as_i64())
            .map(|v| v as i32);

        let mut guard = self.session.acquire().await?;
        let conn = guard.connection();

        inspect::require_suspended_thread(conn, thread_id).await?;

        // Classpath discovery runs its own remote invocations; do it now so
        // the per-watcher evaluations never nest them.
        self.evaluator.configure(conn, thread_id).await?;

        let thread_name = conn
            .get_thread_name(thread_id)
            .await
            .map_err(DebugError::from)?;
        let frame_count = conn
            .get_frame_count(thread_id)
            .await
            .map_err(DebugError::from)?;

        let mut out = format!(
            "=== Watcher Evaluation for Thread {} (Scope: {}) ===\n\n",
            thread_id, scope
        );
        writeln!(out, "Thread: {} (frames: {})\n", thread_name, frame_count).unwrap();

        let evaluated = if scope.eq_ignore_ascii_case("full_stack") {
            self.evaluate_watchers_full_stack(conn, thread_id, &mut out)
                .await?
        } else {
            self.evaluate_watchers_current_frame(conn, thread_id, breakpoint_id, &mut out)
                .await?
        };

        if evaluated == 0 {
            out.push_str("No watchers found or evaluated for the given scope.\n");
        } else {
            writeln!(out, "Total: Evaluated {} expression(s)", evaluated).unwrap();
        }
        Ok(out)
    }

    /// Evaluate watchers bound to the breakpoint at frame 0. The breakpoint
    /// id is either supplied or resolved from the proxy's table by the
    /// frame's class:line.
    async fn evaluate_watchers_current_frame(
        &self,
        conn: &mut jdwp_client::JdwpConnection,
        thread_id: ThreadId,
        breakpoint_id: Option<i32>,
        out: &mut String,
    ) -> DebugResult<usize> {
        let frames = conn
            .get_frames(thread_id, 0, 1)
            .await
            .map_err(DebugError::from)?;
        let Some(frame) = frames.first().copied() else {
            return Ok(0);
        };

        let (class_name, line) = frame_source_location(conn, &frame).await?;

        let breakpoint_id = match breakpoint_id {
            Some(id) => id,
            None => {
                let map = self.proxy.breakpoint_location_map().await?;
                match line.and_then(|l| map.get(&format!("{}:{}", class_name, l)).copied()) {
                    Some(id) => id,
                    None => {
                        out.push_str(
                            "Could not find a matching breakpoint for the current location.\n",
                        );
                        writeln!(
                            out,
                            "Current location: {}:{}",
                            class_name,
                            line.map_or_else(|| "?".to_string(), |l| l.to_string())
                        )
                        .unwrap();
                        return Ok(0);
                    }
                }
            }
        };

        let watchers = self.watchers.for_breakpoint(breakpoint_id);
        if watchers.is_empty() {
            return Ok(0);
        }

        writeln!(
            out,
            "--- Current Frame #0: {}:{} (Breakpoint ID: {}) ---\n",
            class_name,
            line.map_or_else(|| "?".to_string(), |l| l.to_string()),
            breakpoint_id
        )
        .unwrap();

        self.evaluate_watcher_group(conn, thread_id, &frame, &watchers, out)
            .await
    }

    /// Walk every frame; frames whose class:line appears in the proxy's
    /// breakpoint table get their watchers evaluated in place.
    async fn evaluate_watchers_full_stack(
        &self,
        conn: &mut jdwp_client::JdwpConnection,
        thread_id: ThreadId,
        out: &mut String,
    ) -> DebugResult<usize> {
        let location_map = self.proxy.breakpoint_location_map().await?;
        if location_map.is_empty() {
            out.push_str("No breakpoints found in the proxy. Cannot evaluate watchers.\n");
            return Ok(0);
        }

        let frames = conn
            .get_frames(thread_id, 0, -1)
            .await
            .map_err(DebugError::from)?;

        let mut evaluated = 0;
        for (index, frame) in frames.iter().enumerate() {
            let (class_name, line) = frame_source_location(conn, frame).await?;
            let Some(line) = line else { continue };
            let Some(breakpoint_id) = location_map.get(&format!("{}:{}", class_name, line))
            else {
                continue;
            };

            let watchers = self.watchers.for_breakpoint(*breakpoint_id);
            if watchers.is_empty() {
                continue;
            }

            writeln!(
                out,
                "--- Frame #{}: {}:{} (Breakpoint ID: {}) ---\n",
                index, class_name, line, breakpoint_id
            )
            .unwrap();

            evaluated += self
                .evaluate_watcher_group(conn, thread_id, frame, &watchers, out)
                .await?;
        }
        Ok(evaluated)
    }

    /// Evaluate one breakpoint's watchers against a frame. Per-watcher
    /// failures are captured inline and never abort the batch.
    async fn evaluate_watcher_group(
        &self,
        conn: &mut jdwp_client::JdwpConnection,
        thread_id: ThreadId,
        frame: &Frame,
        watchers: &[crate::watchers::Watcher],
        out: &mut String,
    ) -> DebugResult<usize> {
        let mut evaluated = 0;
        for watcher in watchers {
            writeln!(out, "  - [{}] {}", short_id(&watcher.id), watcher.label).unwrap();
            match self
                .evaluator
                .evaluate(conn, thread_id, frame, &watcher.expression)
                .await
            {
                Ok(value) => {
                    let rendered = inspect::format_value(conn, &self.session, &value)
                        .await
                        .unwrap_or_else(|e| format!("<unrenderable: {}>", e));
                    writeln!(out, "    {} = {}\n", watcher.expression, rendered).unwrap();
                    evaluated += 1;
                }
                Err(e) => {
                    writeln!(out, "    {} = [ERROR: {}]\n", watcher.expression, e).unwrap();
                }
            }
        }
        Ok(evaluated)
    }
}

/// Class name and source line of a frame's location.
async fn frame_source_location(
    conn: &mut jdwp_client::JdwpConnection,
    frame: &Frame,
) -> DebugResult<(String, Option<i32>)> {
    let class_name = conn
        .get_type_name(frame.location.class_id)
        .await
        .map_err(DebugError::from)?;
    let line = match conn
        .get_line_table(frame.location.class_id, frame.location.method_id)
        .await
    {
        Ok(table) => table.line_at(frame.location.index),
        Err(_) => None,
    };
    Ok((class_name, line))
}

async fn frame_at(
    conn: &mut jdwp_client::JdwpConnection,
    thread_id: ThreadId,
    frame_index: usize,
) -> DebugResult<Frame> {
    let frames = conn
        .get_frames(thread_id, frame_index as i32, 1)
        .await
        .map_err(DebugError::from)?;
    frames
        .first()
        .copied()
        .ok_or(DebugError::FrameOutOfRange(frame_index))
}

fn short_id(id: &str) -> &str {
    &id[..id.len().min(8)]
}

fn required_u64(args: &Value, key: &'static str) -> DebugResult<u64> {
    args.get(key)
        .and_then(|v| v.as_u64())
        .ok_or(DebugError::InvalidArgument(key))
}

fn required_i32(args: &Value, key: &'static str) -> DebugResult<i32> {
    args.get(key)
        .and_then(|v| v.as_i64())
        .map(|v| v as i32)
        .ok_or(DebugError::InvalidArgument(key))
}

fn required_str<'a>(args: &'a Value, key: &'static str) -> DebugResult<&'a str> {
    args.get(key)
        .and_then(|v| v.as_str())
        .ok_or(DebugError::InvalidArgument(key))
}

fn optional_usize(args: &Value, key: &str) -> Option<usize> {
    args.get(key).and_then(|v| v.as_u64()).map(|v| v as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn argument_extraction() {
        let args = json!({"thread_id": 42, "line": 10, "class_name": "demo.C"});
        assert_eq!(required_u64(&args, "thread_id").unwrap(), 42);
        assert_eq!(required_i32(&args, "line").unwrap(), 10);
        assert_eq!(required_str(&args, "class_name").unwrap(), "demo.C");
        assert!(required_u64(&args, "missing").is_err());
        assert_eq!(optional_usize(&args, "missing"), None);
    }

    #[test]
    fn short_ids_do_not_panic_on_short_input() {
        assert_eq!(short_id("abcdefghijk"), "abcdefgh");
        assert_eq!(short_id("abc"), "abc");
        assert_eq!(short_id(""), "");
    }

    #[tokio::test]
    async fn tools_before_attach_surface_not_attached() {
        let handler = RequestHandler::new(Config::default());
        let result = handler.dispatch("debug.list_threads", &json!({})).await;
        assert!(matches!(result, Err(DebugError::NotAttached)));

        let result = handler
            .dispatch("debug.get_stack", &json!({"thread_id": 1}))
            .await;
        assert!(matches!(result, Err(DebugError::NotAttached)));
    }

    #[tokio::test]
    async fn watcher_tools_work_without_a_session() {
        let handler = RequestHandler::new(Config::default());

        let created = handler
            .dispatch(
                "debug.attach_watcher",
                &json!({"breakpoint_id": 3, "label": "size", "expression": "items.size()"}),
            )
            .await
            .unwrap();
        assert!(created.contains("Watcher attached"));

        let listed = handler
            .dispatch("debug.list_all_watchers", &json!({}))
            .await
            .unwrap();
        assert!(listed.contains("Breakpoint 3 (1 watchers):"));
        assert!(listed.contains("items.size()"));

        let cleared = handler
            .dispatch("debug.clear_all_watchers", &json!({}))
            .await
            .unwrap();
        assert!(cleared.contains("Cleared 1 watcher(s)"));
    }

    #[tokio::test]
    async fn unknown_tool_is_an_error_result() {
        let handler = RequestHandler::new(Config::default());
        let response = handler
            .handle_call_tool(Some(json!({"name": "debug.nope", "arguments": {}})))
            .await
            .unwrap();
        assert_eq!(response["isError"], true);
        let text = response["content"][0]["text"].as_str().unwrap();
        assert!(text.starts_with("ERROR: "));
    }

    #[tokio::test]
    async fn call_tool_failure_shape_is_error_text() {
        let handler = RequestHandler::new(Config::default());
        let response = handler
            .handle_call_tool(Some(json!({
                "name": "debug.get_locals",
                "arguments": {"thread_id": 9}
            })))
            .await
            .unwrap();
        assert_eq!(response["isError"], true);
        let text = response["content"][0]["text"].as_str().unwrap();
        assert!(text.contains("Not attached"));
        // Environment errors carry their remediation
        assert!(text.contains("debug.attach"));
    }
}
