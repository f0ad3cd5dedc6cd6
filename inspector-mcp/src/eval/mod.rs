// Expression evaluation
//
// An expression is evaluated by compiling a one-method wrapper class against
// the target's discovered classpath, injecting the bytecode into a live
// class loader, and invoking the static method with the frame's values as
// arguments.
//
// Ordering contract: `configure` performs remote invocations (classpath and
// platform discovery) and therefore must run before any `evaluate` on the
// session: never nested inside one. The orchestration layer enforces this.

pub mod classpath;
pub mod compiler;
pub mod context;
pub mod executor;
pub mod platform;

use crate::error::{DebugError, DebugResult};
use crate::inspect::resolve_class;
use compiler::{BytecodeMap, JavaCompiler};
use context::{build_context, EvaluationContext, THIS_BINDING};
use jdwp_client::types::{Frame, ObjectId, ThreadId, Value};
use jdwp_client::JdwpConnection;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex as StdMutex;
use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

/// Package every generated wrapper lives in.
const EVALUATION_PACKAGE: &str = "mcp.eval.gen";
const CLASS_PREFIX: &str = "Expr_";
const METHOD_NAME: &str = "evaluate";

#[derive(Debug, Clone)]
struct CachedUnit {
    class_name: String,
    bytecode: BytecodeMap,
}

pub struct ExpressionEvaluator {
    compiler: Mutex<Option<JavaCompiler>>,
    cache: StdMutex<HashMap<String, CachedUnit>>,
    compilations: AtomicU64,
}

impl ExpressionEvaluator {
    pub fn new() -> Self {
        Self {
            compiler: Mutex::new(None),
            cache: StdMutex::new(HashMap::new()),
            compilations: AtomicU64::new(0),
        }
    }

    /// Number of actual compiler runs; cache hits do not move it.
    pub fn compilation_count(&self) -> u64 {
        self.compilations.load(Ordering::Relaxed)
    }

    pub async fn is_configured(&self) -> bool {
        self.compiler.lock().await.is_some()
    }

    /// Drop the per-session compiler configuration (attach/detach). The
    /// bytecode cache survives: compiled units are keyed by context shape
    /// and expression text, not by session.
    pub async fn reset(&self) {
        *self.compiler.lock().await = None;
    }

    /// Discover the target's platform and classpath on a thread suspended at
    /// a breakpoint, and configure the compiler. Runs once per session;
    /// later calls are no-ops.
    pub async fn configure(
        &self,
        conn: &mut JdwpConnection,
        thread_id: ThreadId,
    ) -> DebugResult<()> {
        let mut compiler = self.compiler.lock().await;
        if compiler.is_some() {
            return Ok(());
        }

        let status = conn
            .get_thread_status(thread_id)
            .await
            .map_err(DebugError::from)?;
        if !status.is_suspended() {
            return Err(DebugError::NotSuspended(thread_id));
        }

        // Platform first: without a matching local runtime, evaluation
        // cannot proceed at all.
        let platform = platform::discover(conn, thread_id).await?;
        let (entries, separator) = classpath::discover(conn, thread_id).await?;

        if entries.is_empty() {
            return Err(DebugError::ClasspathEmpty);
        }

        info!(
            "Compiler classpath configured: {} entries, platform Java {}",
            entries.len(),
            platform.major_version
        );
        *compiler = Some(JavaCompiler::new(platform, entries.join(separator)));
        Ok(())
    }

    /// Evaluate an expression against a suspended frame.
    pub async fn evaluate(
        &self,
        conn: &mut JdwpConnection,
        thread_id: ThreadId,
        frame: &Frame,
        expression: &str,
    ) -> DebugResult<Value> {
        let ctx = build_context(conn, thread_id, frame).await?;
        let cache_key = format!("{}###{}", ctx.signature(), expression);

        let cached = self.cache.lock().unwrap().get(&cache_key).cloned();
        let unit = match cached {
            Some(unit) => {
                debug!("Compilation cache hit for {:?}", expression);
                unit
            }
            None => {
                let unit = self.compile_unit(&ctx, expression).await?;
                self.cache
                    .lock()
                    .unwrap()
                    .insert(cache_key, unit.clone());
                unit
            }
        };

        let bytecode = unit.bytecode.get(&unit.class_name).ok_or_else(|| {
            DebugError::DefineFailed(format!(
                "no compiled bytecode for class {}",
                unit.class_name
            ))
        })?;

        let class_loader = find_class_loader(conn, thread_id, frame).await?;

        executor::execute(
            conn,
            thread_id,
            class_loader,
            &unit.class_name,
            bytecode,
            METHOD_NAME,
            &ctx.values,
        )
        .await
    }

    async fn compile_unit(
        &self,
        ctx: &EvaluationContext,
        expression: &str,
    ) -> DebugResult<CachedUnit> {
        let compiler = self.compiler.lock().await;
        let compiler = compiler.as_ref().ok_or(DebugError::CompilerNotConfigured)?;

        // Class identity in the target is by name, and earlier generations
        // stay alive in the target until its process exits. A UUID keeps
        // names from colliding across evaluator restarts.
        let class_name = fresh_class_name();
        let source = compose_source(&class_name, ctx, expression);

        let bytecode = compiler.compile(&class_name, &source).await?;
        self.compilations.fetch_add(1, Ordering::Relaxed);

        Ok(CachedUnit {
            class_name,
            bytecode,
        })
    }
}

impl Default for ExpressionEvaluator {
    fn default() -> Self {
        Self::new()
    }
}

fn fresh_class_name() -> String {
    let unique = Uuid::new_v4().simple().to_string();
    format!("{}.{}{}", EVALUATION_PACKAGE, CLASS_PREFIX, unique)
}

/// Wrapper source: one public class, one public static method whose formals
/// are the context variables at their declared types, returning the
/// expression upcast to Object.
fn compose_source(class_name: &str, ctx: &EvaluationContext, expression: &str) -> String {
    let simple_name = class_name
        .rsplit('.')
        .next()
        .expect("class name has a simple part");
    let rewritten = rewrite_this_references(expression);

    format!(
        "package {package};\n\
         \n\
         public class {class} {{\n\
         \x20   public static Object {method}({params}) {{\n\
         \x20       return (Object) ({expr});\n\
         \x20   }}\n\
         }}\n",
        package = EVALUATION_PACKAGE,
        class = simple_name,
        method = METHOD_NAME,
        params = ctx.parameter_list(),
        expr = rewritten,
    )
}

/// Replace every standalone `this` token with the receiver binding. Word
/// boundaries (letters, digits, `_`, `$`) keep identifiers that merely
/// contain the substring intact.
fn rewrite_this_references(expression: &str) -> String {
    const NEEDLE: &[u8] = b"this";
    let bytes = expression.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    let is_word = |b: u8| b.is_ascii_alphanumeric() || b == b'_' || b == b'$';

    while i < bytes.len() {
        if bytes[i..].starts_with(NEEDLE) {
            let before_ok = i == 0 || !is_word(bytes[i - 1]);
            let after = i + NEEDLE.len();
            let after_ok = after >= bytes.len() || !is_word(bytes[after]);
            if before_ok && after_ok {
                out.extend_from_slice(THIS_BINDING.as_bytes());
                i = after;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }

    // Only ASCII was substituted, so the result is valid UTF-8
    String::from_utf8(out).expect("rewrite preserves UTF-8")
}

/// Loader for the generated class: the receiver's defining loader when the
/// frame has one, otherwise the loader of `java.lang.Object`. A zero loader
/// (bootstrap) cannot define classes through the wire, so it is rejected.
async fn find_class_loader(
    conn: &mut JdwpConnection,
    thread_id: ThreadId,
    frame: &Frame,
) -> DebugResult<ObjectId> {
    let this_object = conn
        .get_this_object(thread_id, frame.frame_id)
        .await
        .map_err(DebugError::from)?;

    let loader = if this_object != 0 {
        let type_id = conn
            .get_object_reference_type(this_object)
            .await
            .map_err(DebugError::from)?;
        conn.get_class_loader(type_id).await.map_err(DebugError::from)?
    } else {
        let object_class = resolve_class(conn, "java.lang.Object")
            .await?
            .ok_or_else(|| DebugError::ClassNotLoaded("java.lang.Object".to_string()))?;
        conn.get_class_loader(object_class)
            .await
            .map_err(DebugError::from)?
    };

    if loader == 0 {
        return Err(DebugError::NoContextLoader);
    }
    Ok(loader)
}

#[cfg(test)]
mod tests {
    use super::*;
    use context::ContextVariable;

    fn ctx(pairs: &[(&str, &str)]) -> EvaluationContext {
        EvaluationContext {
            variables: pairs
                .iter()
                .map(|(name, type_name)| ContextVariable {
                    name: name.to_string(),
                    type_name: type_name.to_string(),
                })
                .collect(),
            values: Vec::new(),
        }
    }

    #[test]
    fn this_rewriting_respects_word_boundaries() {
        assert_eq!(rewrite_this_references("this"), "_this");
        assert_eq!(
            rewrite_this_references("this.getClass().getName()"),
            "_this.getClass().getName()"
        );
        assert_eq!(rewrite_this_references("x + this + y"), "x + _this + y");
        // Identifiers containing the substring are untouched
        assert_eq!(rewrite_this_references("thisValue"), "thisValue");
        assert_eq!(rewrite_this_references("isthis"), "isthis");
        assert_eq!(rewrite_this_references("a.thisish()"), "a.thisish()");
        assert_eq!(rewrite_this_references("this$0"), "this$0");
        // Multiple occurrences
        assert_eq!(
            rewrite_this_references("this.f(this)"),
            "_this.f(_this)"
        );
    }

    #[test]
    fn composed_source_shape() {
        let source = compose_source(
            "mcp.eval.gen.Expr_ab12",
            &ctx(&[("_this", "demo.Svc"), ("count", "int")]),
            "this.size() + count",
        );

        assert!(source.starts_with("package mcp.eval.gen;\n"));
        assert!(source.contains("public class Expr_ab12 {"));
        assert!(source.contains(
            "public static Object evaluate(demo.Svc _this, int count) {"
        ));
        assert!(source.contains("return (Object) (_this.size() + count);"));
    }

    #[test]
    fn composed_source_with_empty_context() {
        let source = compose_source("mcp.eval.gen.Expr_x", &ctx(&[]), "42 + 10");
        assert!(source.contains("public static Object evaluate() {"));
        assert!(source.contains("return (Object) (42 + 10);"));
    }

    #[test]
    fn fresh_class_names_never_collide() {
        let a = fresh_class_name();
        let b = fresh_class_name();
        assert_ne!(a, b);
        assert!(a.starts_with("mcp.eval.gen.Expr_"));
        // Rendered without separators
        assert!(!a.rsplit('.').next().unwrap().contains('-'));
    }

    #[tokio::test]
    async fn evaluator_starts_unconfigured() {
        let evaluator = ExpressionEvaluator::new();
        assert!(!evaluator.is_configured().await);
        assert_eq!(evaluator.compilation_count(), 0);
    }
}
