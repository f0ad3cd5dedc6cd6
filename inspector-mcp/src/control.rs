// Execution control: resume, single-shot steps, breakpoints
//
// Breakpoint state is authoritative in the sidecar proxy (it sees every
// client), so clearing by location resolves request ids through the proxy's
// table and then clears them over the wire.

use crate::error::{jdwp_op_error, DebugError, DebugResult};
use crate::inspect::{require_suspended_thread, resolve_class};
use crate::proxy::ProxyClient;
use jdwp_client::commands::{step_depths, step_sizes};
use jdwp_client::types::ThreadId;
use jdwp_client::{JdwpConnection, SuspendPolicy};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepDepth {
    Into,
    Over,
    Out,
}

impl StepDepth {
    fn wire_value(self) -> i32 {
        match self {
            StepDepth::Into => step_depths::INTO,
            StepDepth::Over => step_depths::OVER,
            StepDepth::Out => step_depths::OUT,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            StepDepth::Into => "Step into",
            StepDepth::Over => "Step over",
            StepDepth::Out => "Step out",
        }
    }
}

/// Resume every thread in the target.
pub async fn resume_all(conn: &mut JdwpConnection) -> DebugResult<String> {
    conn.resume_all().await.map_err(DebugError::from)?;
    Ok("All threads resumed".to_string())
}

/// Install a single-shot line step and resume the thread.
///
/// Request lifecycle: created -> enabled -> fired -> auto-disposed (count
/// filter 1); nothing to clean up afterwards.
pub async fn step(
    conn: &mut JdwpConnection,
    thread_id: ThreadId,
    depth: StepDepth,
) -> DebugResult<String> {
    require_suspended_thread(conn, thread_id).await?;

    let name = conn
        .get_thread_name(thread_id)
        .await
        .map_err(DebugError::from)?;

    conn.set_step_request(
        thread_id,
        step_sizes::LINE,
        depth.wire_value(),
        SuspendPolicy::All,
    )
    .await
    .map_err(jdwp_op_error)?;

    conn.resume_thread(thread_id).await.map_err(jdwp_op_error)?;

    Ok(format!(
        "{} executed on thread {} ({})",
        depth.label(),
        thread_id,
        name
    ))
}

/// Resolve (class, line) to the first executable location and install an
/// enabled breakpoint there.
pub async fn set_breakpoint(
    conn: &mut JdwpConnection,
    class_name: &str,
    line: i32,
) -> DebugResult<String> {
    let type_id = resolve_class(conn, class_name)
        .await?
        .ok_or_else(|| DebugError::ClassNotLoaded(class_name.to_string()))?;

    let methods = conn.get_methods(type_id).await.map_err(DebugError::from)?;

    // First executable location on the line, scanning methods in order
    let mut target = None;
    for method in &methods {
        if let Ok(table) = conn.get_line_table(type_id, method.method_id).await {
            if let Some(code_index) = table.index_of_line(line) {
                target = Some((method.method_id, method.name.clone(), code_index));
                break;
            }
        }
    }

    let (method_id, method_name, code_index) =
        target.ok_or_else(|| DebugError::NoExecutableCode(class_name.to_string(), line))?;

    let request_id = conn
        .set_breakpoint(type_id, method_id, code_index, SuspendPolicy::All)
        .await
        .map_err(DebugError::from)?;

    info!(
        "Breakpoint {} set at {}:{} in {}",
        request_id, class_name, line, method_name
    );

    Ok(format!(
        "Breakpoint set at {}:{}\n  Method: {}\n  Request ID: {}",
        class_name, line, method_name, request_id
    ))
}

/// Clear every breakpoint at (class, line). Request ids are looked up in the
/// proxy's table, then each is cleared over JDWP.
pub async fn clear_breakpoint(
    conn: &mut JdwpConnection,
    proxy: &ProxyClient,
    class_name: &str,
    line: i32,
) -> DebugResult<String> {
    let location = format!("{}:{}", class_name, line);

    let matching: Vec<i32> = proxy
        .breakpoints()
        .await?
        .into_iter()
        .filter(|bp| {
            bp.class_name.as_deref() == Some(class_name) && bp.line_number == Some(line)
        })
        .map(|bp| bp.request_id)
        .collect();

    if matching.is_empty() {
        return Err(DebugError::BreakpointNotFound(location));
    }

    let mut removed = 0;
    for request_id in matching {
        conn.clear_breakpoint(request_id)
            .await
            .map_err(DebugError::from)?;
        removed += 1;
    }

    Ok(format!("Removed {} breakpoint(s) at {}", removed, location))
}

/// Clear one breakpoint through the proxy's HTTP API.
pub async fn clear_breakpoint_by_id(
    proxy: &ProxyClient,
    request_id: i32,
) -> DebugResult<String> {
    if proxy.delete_breakpoint(request_id).await? {
        Ok(format!("Breakpoint {} cleared successfully", request_id))
    } else {
        Err(DebugError::BreakpointNotFound(request_id.to_string()))
    }
}

/// Clear every breakpoint known to the proxy, across all clients.
pub async fn clear_all_breakpoints(proxy: &ProxyClient) -> DebugResult<String> {
    let breakpoints = proxy.breakpoints().await?;
    if breakpoints.is_empty() {
        return Ok("No breakpoints to clear".to_string());
    }

    let mut cleared = 0;
    for bp in &breakpoints {
        if proxy.delete_breakpoint(bp.request_id).await? {
            cleared += 1;
        }
    }

    Ok(format!(
        "Cleared {} breakpoint(s). This affects ALL connected debugger clients.",
        cleared
    ))
}

/// Human-readable listing of the proxy's breakpoint table.
pub async fn list_breakpoints(proxy: &ProxyClient) -> DebugResult<String> {
    let breakpoints = proxy.breakpoints().await?;
    if breakpoints.is_empty() {
        return Ok("No breakpoints set".to_string());
    }

    let mut out = format!("Active breakpoints: {}\n\n", breakpoints.len());
    for (i, bp) in breakpoints.iter().enumerate() {
        out.push_str(&format!(
            "Breakpoint {} (Request ID: {}):\n",
            i + 1,
            bp.request_id
        ));

        match &bp.class_name {
            Some(class_name) if !class_name.is_empty() => {
                out.push_str(&format!("  Class: {}\n", class_name));
                if let Some(method) = bp.method_name.as_deref().filter(|m| !m.is_empty()) {
                    out.push_str(&format!("  Method: {}\n", method));
                }
                if let Some(line) = bp.line_number.filter(|l| *l > 0) {
                    out.push_str(&format!("  Line: {}\n", line));
                }
                out.push_str(&format!("  Code Index: {}\n", bp.code_index));
            }
            _ => {
                // The proxy could not resolve this one; show raw ids
                out.push_str(&format!("  Class ID: {} (unresolved)\n", bp.class_id));
                out.push_str(&format!("  Method ID: {}\n", bp.method_id));
                out.push_str(&format!("  Code Index: {}\n", bp.code_index));
            }
        }
        out.push('\n');
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_depths_map_to_wire_values() {
        assert_eq!(StepDepth::Into.wire_value(), 0);
        assert_eq!(StepDepth::Over.wire_value(), 1);
        assert_eq!(StepDepth::Out.wire_value(), 2);
    }

    #[test]
    fn step_labels() {
        assert_eq!(StepDepth::Over.label(), "Step over");
        assert_eq!(StepDepth::Into.label(), "Step into");
        assert_eq!(StepDepth::Out.label(), "Step out");
    }
}
