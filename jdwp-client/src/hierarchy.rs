// Superclass-chain helpers
//
// JDWP's ReferenceType.Methods and Fields return declared members only;
// anything inherited has to be found by walking ClassType.Superclass. The
// walk is bounded to defend against a cyclic (corrupt) chain.

use crate::connection::JdwpConnection;
use crate::protocol::JdwpResult;
use crate::reftype::{FieldInfo, MethodInfo};
use crate::types::{ClassId, ReferenceTypeId};

const MAX_HIERARCHY_DEPTH: usize = 64;

/// A method resolved somewhere in a type's hierarchy, together with the
/// class that declares it (needed for ObjectReference.InvokeMethod).
#[derive(Debug, Clone)]
pub struct ResolvedMethod {
    pub declaring_class: ClassId,
    pub method: MethodInfo,
}

impl JdwpConnection {
    /// Find a method by name (and optionally exact JNI signature) in the
    /// type itself or any superclass.
    pub async fn find_visible_method(
        &mut self,
        type_id: ReferenceTypeId,
        name: &str,
        signature: Option<&str>,
    ) -> JdwpResult<Option<ResolvedMethod>> {
        let mut current = type_id;
        for _ in 0..MAX_HIERARCHY_DEPTH {
            if current == 0 {
                return Ok(None);
            }

            let methods = self.get_methods(current).await?;
            if let Some(method) = methods.into_iter().find(|m| {
                m.name == name && signature.map_or(true, |sig| m.signature == sig)
            }) {
                return Ok(Some(ResolvedMethod {
                    declaring_class: current,
                    method,
                }));
            }

            current = self.get_superclass(current).await?;
        }
        Ok(None)
    }

    /// Find a field by name in the type itself or any superclass.
    pub async fn find_visible_field(
        &mut self,
        type_id: ReferenceTypeId,
        name: &str,
    ) -> JdwpResult<Option<(ClassId, FieldInfo)>> {
        let mut current = type_id;
        for _ in 0..MAX_HIERARCHY_DEPTH {
            if current == 0 {
                return Ok(None);
            }

            let fields = self.get_fields(current).await?;
            if let Some(field) = fields.into_iter().find(|f| f.name == name) {
                return Ok(Some((current, field)));
            }

            current = self.get_superclass(current).await?;
        }
        Ok(None)
    }

    /// All instance fields, declared and inherited, superclass-last order
    /// reversed so the root class's fields come first.
    pub async fn collect_all_fields(
        &mut self,
        type_id: ReferenceTypeId,
    ) -> JdwpResult<Vec<FieldInfo>> {
        let mut per_class = Vec::new();
        let mut current = type_id;
        for _ in 0..MAX_HIERARCHY_DEPTH {
            if current == 0 {
                break;
            }
            per_class.push(self.get_fields(current).await?);
            current = self.get_superclass(current).await?;
        }

        Ok(per_class.into_iter().flatten().collect())
    }

    /// Whether `type_id` is `target` or has it somewhere up its superclass
    /// chain. Interface checks are not needed by this client: the loader
    /// kinds it probes for are concrete classes.
    pub async fn is_subclass_of(
        &mut self,
        type_id: ReferenceTypeId,
        target: ClassId,
    ) -> JdwpResult<bool> {
        let mut current = type_id;
        for _ in 0..MAX_HIERARCHY_DEPTH {
            if current == 0 {
                return Ok(false);
            }
            if current == target {
                return Ok(true);
            }
            current = self.get_superclass(current).await?;
        }
        Ok(false)
    }

    /// Type names along the superclass chain, starting at `type_id`. The
    /// walk stops before `java.lang.Object` (matching the declared-type
    /// derivation, which never settles on Object).
    pub async fn collect_type_name_chain(
        &mut self,
        type_id: ReferenceTypeId,
    ) -> JdwpResult<Vec<String>> {
        let mut names = Vec::new();
        let mut current = type_id;
        for _ in 0..MAX_HIERARCHY_DEPTH {
            if current == 0 {
                break;
            }
            let name = self.get_type_name(current).await?;
            if name == "java.lang.Object" && !names.is_empty() {
                break;
            }
            names.push(name);
            current = self.get_superclass(current).await?;
        }
        Ok(names)
    }
}
