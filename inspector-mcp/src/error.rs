// Error taxonomy for the inspection and evaluation engine
//
// Every failure a tool can produce maps to one of these kinds. Transport
// faults are the only recoverable class (one re-attach plus retry); all
// others are surfaced to the caller as a single-line `ERROR: ...`.

use jdwp_client::JdwpError;
use thiserror::Error;

pub type DebugResult<T> = Result<T, DebugError>;

#[derive(Debug, Error)]
pub enum DebugError {
    // Session layer
    #[error("Not attached to a JDWP endpoint")]
    NotAttached,
    #[error("Transport failed: {0}")]
    TransportFailed(String),
    #[error("Protocol mismatch: endpoint did not complete the JDWP handshake")]
    ProtocolMismatch,

    // Inspection layer
    #[error("Thread not found with ID {0}")]
    ThreadNotFound(u64),
    #[error("Thread {0} is not suspended. It must be stopped at a breakpoint.")]
    ThreadNotSuspended(u64),
    #[error("Frame index {0} is out of range")]
    FrameOutOfRange(usize),
    #[error("No debug information available (compile with -g)")]
    NoDebugInfo,

    // Control layer
    #[error("Class '{0}' is not loaded in the target VM")]
    ClassNotLoaded(String),
    #[error("No executable code at line {1} in class {0}")]
    NoExecutableCode(String, i32),
    #[error("No breakpoint found at {0}")]
    BreakpointNotFound(String),

    // Discovery layer
    #[error("Thread {0} must be suspended at a breakpoint for discovery")]
    NotSuspended(u64),
    #[error("Thread has no context class loader")]
    NoContextLoader,
    #[error("{0}")]
    PlatformNotFound(String),
    #[error("Classpath discovery produced no entries")]
    ClasspathEmpty,

    // Compiler
    #[error("Compilation failed:\n{}", format_diagnostics(.0))]
    CompilationFailed(Vec<Diagnostic>),
    #[error("Compiler is not configured; run classpath discovery first")]
    CompilerNotConfigured,

    // Remote execution
    #[error("Failed to define evaluation class in the target VM: {0}")]
    DefineFailed(String),
    #[error("Static initializer threw exception: {0}")]
    InitializerThrew(String),
    #[error("Could not find static method '{0}' in the loaded class")]
    MethodNotFound(String),
    #[error("Target VM threw exception: {0}")]
    InvocationThrew(String),
    #[error("Thread is in an incompatible state for method invocation")]
    IncompatibleThreadState,

    // Registry / cache
    #[error("Object #{0} not found in cache")]
    ObjectNotCached(u64),
    #[error("Watcher '{0}' not found")]
    WatcherNotFound(String),

    // Sidecar proxy HTTP API
    #[error("Proxy request failed: {0}")]
    Proxy(String),

    // Tool argument marshalling
    #[error("Missing or invalid '{0}' parameter")]
    InvalidArgument(&'static str),
    #[error("Unknown tool: {0}")]
    UnknownTool(String),
}

/// One compiler diagnostic: source file, line, message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub file: String,
    pub line: u32,
    pub message: String,
}

fn format_diagnostics(diagnostics: &[Diagnostic]) -> String {
    diagnostics
        .iter()
        .map(|d| format!("Line {} in {}: {}", d.line, d.file, d.message))
        .collect::<Vec<_>>()
        .join("\n")
}

impl DebugError {
    /// Deterministic remediation for the environment errors.
    fn remediation(&self) -> Option<&'static str> {
        match self {
            DebugError::NotAttached => Some(
                "Use debug.attach first. The proxy must be running and the \
                 target JVM must be started with \
                 -agentlib:jdwp=transport=dt_socket,server=y,suspend=n",
            ),
            DebugError::PlatformNotFound(_) => Some(
                "Install a JDK whose major version matches the target JVM, \
                 or make the target's java.home readable from this host.",
            ),
            DebugError::ClasspathEmpty => Some(
                "The target reported no classpath entries. Re-run discovery \
                 with a thread suspended at a breakpoint inside application \
                 code (not a JVM-internal thread).",
            ),
            _ => None,
        }
    }

    /// The single-line user-visible failure shape.
    pub fn to_message(&self) -> String {
        match self.remediation() {
            Some(fix) => format!("ERROR: {}\n\n{}", self, fix),
            None => format!("ERROR: {}", self),
        }
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, DebugError::TransportFailed(_))
    }
}

impl From<JdwpError> for DebugError {
    fn from(err: JdwpError) -> Self {
        match err {
            JdwpError::Io(e) => DebugError::TransportFailed(e.to_string()),
            JdwpError::ConnectionClosed => {
                DebugError::TransportFailed("connection closed".to_string())
            }
            JdwpError::InvalidHandshake => DebugError::ProtocolMismatch,
            other => DebugError::TransportFailed(other.to_string()),
        }
    }
}

/// Map a JDWP-level error while keeping the VM's own error codes readable.
/// Used where a command failure is not a transport problem (e.g. invoking
/// with a bad thread state).
pub fn jdwp_op_error(err: JdwpError) -> DebugError {
    use jdwp_client::protocol::error_codes;
    match err.code() {
        Some(error_codes::THREAD_NOT_SUSPENDED) | Some(error_codes::INVALID_THREAD) => {
            DebugError::IncompatibleThreadState
        }
        Some(error_codes::ABSENT_INFORMATION) => DebugError::NoDebugInfo,
        _ => DebugError::from(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_shape_is_single_line_prefixed() {
        let err = DebugError::ThreadNotFound(42);
        assert_eq!(err.to_message(), "ERROR: Thread not found with ID 42");
    }

    #[test]
    fn environment_errors_carry_remediation() {
        for err in [
            DebugError::NotAttached,
            DebugError::PlatformNotFound("no JDK".into()),
            DebugError::ClasspathEmpty,
        ] {
            let msg = err.to_message();
            assert!(msg.starts_with("ERROR: "));
            assert!(msg.contains("\n\n"), "no remediation in: {msg}");
        }
    }

    #[test]
    fn compilation_failure_lists_diagnostics() {
        let err = DebugError::CompilationFailed(vec![Diagnostic {
            file: "Expr.java".into(),
            line: 4,
            message: "cannot find symbol".into(),
        }]);
        let msg = err.to_string();
        assert!(msg.contains("Line 4 in Expr.java: cannot find symbol"));
    }

    #[test]
    fn transport_errors_are_recoverable() {
        let err: DebugError = JdwpError::ConnectionClosed.into();
        assert!(err.is_transport());
        let err: DebugError = JdwpError::InvalidHandshake.into();
        assert!(!err.is_transport());
        assert!(matches!(err, DebugError::ProtocolMismatch));
    }
}
