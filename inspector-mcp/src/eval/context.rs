// Evaluation context: the formal parameter list and argument values a
// generated wrapper method receives from a suspended stack frame.

use crate::error::{jdwp_op_error, DebugError, DebugResult};
use jdwp_client::types::{signature_to_name, tags, Frame, ThreadId, Value};
use jdwp_client::JdwpConnection;

/// Prefix the compiler uses for synthesized enclosing-instance captures.
/// Such locals cannot be referenced from source and are excluded.
const CAPTURE_PREFIX: &str = "this$";

/// Name the receiver is bound to inside the generated method. Expressions
/// using `this` are rewritten to it.
pub const THIS_BINDING: &str = "_this";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextVariable {
    pub name: String,
    pub type_name: String,
}

/// Ordered (name, declared type) pairs plus their live values.
#[derive(Debug, Clone)]
pub struct EvaluationContext {
    pub variables: Vec<ContextVariable>,
    pub values: Vec<Value>,
}

impl EvaluationContext {
    /// Textual fingerprint of the parameter list; identical signatures mean
    /// the generated wrapper has the same shape and bytecode can be reused.
    pub fn signature(&self) -> String {
        self.variables
            .iter()
            .map(|v| format!("{} {}", v.type_name, v.name))
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Formal parameter list for the generated method.
    pub fn parameter_list(&self) -> String {
        self.variables
            .iter()
            .map(|v| format!("{} {}", v.type_name, v.name))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Build the context for a frame: an implicit `_this` at the receiver's
/// declared type when present, then every visible local that is either an
/// argument or not a compiler-synthesized capture.
pub async fn build_context(
    conn: &mut JdwpConnection,
    thread_id: ThreadId,
    frame: &Frame,
) -> DebugResult<EvaluationContext> {
    let mut variables = Vec::new();
    let mut values = Vec::new();

    let this_object = conn
        .get_this_object(thread_id, frame.frame_id)
        .await
        .map_err(jdwp_op_error)?;

    if this_object != 0 {
        let runtime_type = conn
            .get_object_reference_type(this_object)
            .await
            .map_err(DebugError::from)?;
        let declared = declared_type_name(conn, runtime_type).await?;
        variables.push(ContextVariable {
            name: THIS_BINDING.to_string(),
            type_name: declared,
        });
        values.push(Value::object(tags::OBJECT, this_object));
    }

    let table = conn
        .get_variable_table(frame.location.class_id, frame.location.method_id)
        .await
        .map_err(jdwp_op_error)?;

    let visible: Vec<_> = table
        .iter()
        .filter(|v| v.visible_at(frame.location.index))
        .filter(|v| v.is_argument() || !v.name.starts_with(CAPTURE_PREFIX))
        .collect();

    if !visible.is_empty() {
        let slots: Vec<jdwp_client::stackframe::VariableSlot> = visible
            .iter()
            .map(|v| jdwp_client::stackframe::VariableSlot {
                slot: v.slot as i32,
                sig_byte: v.signature.as_bytes()[0],
            })
            .collect();

        let frame_values = conn
            .get_frame_values(thread_id, frame.frame_id, &slots)
            .await
            .map_err(jdwp_op_error)?;

        for (var, value) in visible.iter().zip(frame_values) {
            variables.push(ContextVariable {
                name: var.name.clone(),
                type_name: signature_to_name(&var.signature),
            });
            values.push(value);
        }
    }

    Ok(EvaluationContext { variables, values })
}

/// Declared (non-proxy) type of a reference type: walk up the superclass
/// chain past synthetic subclasses whose names carry the `$$` marker.
pub async fn declared_type_name(
    conn: &mut JdwpConnection,
    type_id: u64,
) -> DebugResult<String> {
    let chain = conn
        .collect_type_name_chain(type_id)
        .await
        .map_err(DebugError::from)?;
    Ok(declared_from_chain(&chain))
}

/// Pure derivation over a pre-fetched superclass name chain (runtime type
/// first, `java.lang.Object` excluded). The first non-synthetic name wins;
/// when every name carries the marker, the prefix before the first `$$` of
/// the deepest examined name is used.
pub fn declared_from_chain(chain: &[String]) -> String {
    for name in chain {
        if !name.contains("$$") {
            return name.clone();
        }
    }

    match chain.last() {
        Some(name) => match name.find("$$") {
            Some(idx) => name[..idx].to_string(),
            None => name.clone(),
        },
        None => "java.lang.Object".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

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
    fn signature_encodes_order_names_and_types() {
        let a = ctx(&[("_this", "demo.Svc"), ("count", "int")]);
        let b = ctx(&[("count", "int"), ("_this", "demo.Svc")]);
        assert_eq!(a.signature(), "demo.Svc _this,int count");
        assert_ne!(a.signature(), b.signature());
    }

    #[test]
    fn parameter_list_is_source_level() {
        let c = ctx(&[("_this", "demo.Svc"), ("items", "java.util.List")]);
        assert_eq!(c.parameter_list(), "demo.Svc _this, java.util.List items");
    }

    #[test]
    fn plain_runtime_type_is_its_own_declared_type() {
        let chain = vec!["demo.Svc".to_string()];
        assert_eq!(declared_from_chain(&chain), "demo.Svc");
    }

    #[test]
    fn proxy_walks_to_first_clean_superclass() {
        let chain = vec![
            "demo.Svc$$EnhancerByGuice$$1234".to_string(),
            "demo.Svc".to_string(),
        ];
        assert_eq!(declared_from_chain(&chain), "demo.Svc");
    }

    #[test]
    fn all_proxy_chain_falls_back_to_prefix_of_deepest() {
        let chain = vec![
            "demo.A$$Proxy$$1".to_string(),
            "demo.B$$Generated".to_string(),
        ];
        assert_eq!(declared_from_chain(&chain), "demo.B");
    }

    #[test]
    fn derived_name_never_contains_the_marker() {
        let chains = [
            vec!["demo.Svc$$X".to_string(), "demo.Svc".to_string()],
            vec!["demo.Svc$$X$$Y".to_string()],
            vec!["demo.Svc".to_string()],
        ];
        for chain in &chains {
            assert!(!declared_from_chain(chain).contains("$$"));
        }
    }
}
