// Remote executor
//
// Runs generated bytecode inside the target VM. Three remote invocations in
// strict order, each in single-threaded mode on the supplied suspended
// thread:
//
//   1. define:   ClassLoader.defineClass(name, bytes, 0, len)
//   2. prepare:  Class.forName(name, true, loader): REQUIRED; a mirror
//                fresh out of defineClass is not prepared, and method lookup
//                on it fails with CLASS_NOT_PREPARED
//   3. invoke:   the first static method with the configured name
//
// Any failure aborts the sequence; nothing is retried.

use crate::error::{DebugError, DebugResult};
use crate::inspect::resolve_class;
use jdwp_client::commands::invoke_options;
use jdwp_client::protocol::error_codes;
use jdwp_client::types::{tags, ObjectId, ThreadId, Value};
use jdwp_client::{InvokeResult, JdwpConnection, JdwpError};
use tracing::{debug, info};

const DEFINE_CLASS_SIGNATURE: &str = "(Ljava/lang/String;[BII)Ljava/lang/Class;";
const FOR_NAME_SIGNATURE: &str = "(Ljava/lang/String;ZLjava/lang/ClassLoader;)Ljava/lang/Class;";

/// Define, initialize and invoke a generated class in the target VM.
/// Returns the invocation's result value (may be the null reference).
pub async fn execute(
    conn: &mut JdwpConnection,
    thread_id: ThreadId,
    class_loader: ObjectId,
    class_name: &str,
    bytecode: &[u8],
    method_name: &str,
    args: &[Value],
) -> DebugResult<Value> {
    debug!(
        "Remote execution of {}.{}() with {} argument(s)",
        class_name,
        method_name,
        args.len()
    );

    define_class(conn, thread_id, class_loader, class_name, bytecode).await?;
    let class_object = force_initialization(conn, thread_id, class_loader, class_name).await?;

    let new_type = conn
        .get_reflected_type(class_object)
        .await
        .map_err(invoke_state_error)?;

    let method = conn
        .get_methods(new_type)
        .await
        .map_err(invoke_state_error)?
        .into_iter()
        .find(|m| m.name == method_name && m.is_static())
        .ok_or_else(|| DebugError::MethodNotFound(method_name.to_string()))?;

    let result = conn
        .invoke_static(
            new_type,
            thread_id,
            method.method_id,
            args,
            invoke_options::SINGLE_THREADED,
        )
        .await
        .map_err(invoke_state_error)?;

    if result.threw() {
        let exception_type = exception_type_name(conn, &result).await;
        return Err(DebugError::InvocationThrew(exception_type));
    }

    info!("Remote invocation of {} returned", method_name);
    Ok(result.value)
}

/// Step 1: mirror the bytecode into a target-side byte[] and call
/// defineClass on the supplied loader.
///
/// A duplicate-definition LinkageError is tolerated: compilation-cache hits
/// re-define a class that is still alive in the target (defined classes are
/// never unloaded before process exit), and the prepared class is picked up
/// by the forName step regardless.
async fn define_class(
    conn: &mut JdwpConnection,
    thread_id: ThreadId,
    class_loader: ObjectId,
    class_name: &str,
    bytecode: &[u8],
) -> DebugResult<()> {
    let loader_type = conn
        .get_object_reference_type(class_loader)
        .await
        .map_err(invoke_state_error)?;

    let define_method = conn
        .find_visible_method(loader_type, "defineClass", Some(DEFINE_CLASS_SIGNATURE))
        .await
        .map_err(invoke_state_error)?
        .ok_or_else(|| {
            DebugError::DefineFailed(
                "no defineClass(String, byte[], int, int) on the class loader".to_string(),
            )
        })?;

    let remote_bytes = mirror_bytes(conn, bytecode).await?;
    let name_ref = conn
        .create_string(class_name)
        .await
        .map_err(invoke_state_error)?;

    let args = [
        Value::string(name_ref),
        Value::object(tags::ARRAY, remote_bytes),
        Value::int(0),
        Value::int(bytecode.len() as i32),
    ];

    let result = conn
        .invoke_instance(
            class_loader,
            thread_id,
            define_method.declaring_class,
            define_method.method.method_id,
            &args,
            invoke_options::SINGLE_THREADED,
        )
        .await
        .map_err(invoke_state_error)?;

    if result.threw() {
        let exception_type = exception_type_name(conn, &result).await;
        if exception_type.contains("LinkageError") {
            debug!("Class {} already defined in this loader", class_name);
            return Ok(());
        }
        return Err(DebugError::DefineFailed(exception_type));
    }

    if result.value.object_id().filter(|id| *id != 0).is_none() {
        return Err(DebugError::DefineFailed(
            "defineClass did not return a class object".to_string(),
        ));
    }
    Ok(())
}

/// Allocate a byte[] in the target and fill it with the bytecode.
async fn mirror_bytes(conn: &mut JdwpConnection, bytes: &[u8]) -> DebugResult<ObjectId> {
    let byte_array_type = conn
        .classes_by_signature("[B")
        .await
        .map_err(invoke_state_error)?
        .first()
        .map(|c| c.type_id)
        .ok_or_else(|| DebugError::DefineFailed("byte[] type not loaded".to_string()))?;

    let array_id = conn
        .new_array_instance(byte_array_type, bytes.len() as i32)
        .await
        .map_err(invoke_state_error)?;

    conn.set_byte_array_values(array_id, 0, bytes)
        .await
        .map_err(invoke_state_error)?;

    debug!("Mirrored {} bytecode bytes into the target", bytes.len());
    Ok(array_id)
}

/// Step 2: Class.forName(name, true, loader) drives the freshly defined
/// class through preparation and initialization, and returns its class
/// object mirror.
async fn force_initialization(
    conn: &mut JdwpConnection,
    thread_id: ThreadId,
    class_loader: ObjectId,
    class_name: &str,
) -> DebugResult<ObjectId> {
    let class_class = resolve_class(conn, "java.lang.Class")
        .await?
        .ok_or_else(|| DebugError::ClassNotLoaded("java.lang.Class".to_string()))?;

    let for_name = conn
        .find_visible_method(class_class, "forName", Some(FOR_NAME_SIGNATURE))
        .await
        .map_err(invoke_state_error)?
        .ok_or_else(|| DebugError::MethodNotFound("forName".to_string()))?;

    let name_ref = conn
        .create_string(class_name)
        .await
        .map_err(invoke_state_error)?;

    let args = [
        Value::string(name_ref),
        Value::boolean(true),
        Value::object(tags::CLASS_LOADER, class_loader),
    ];

    let result = conn
        .invoke_static(
            class_class,
            thread_id,
            for_name.method.method_id,
            &args,
            invoke_options::SINGLE_THREADED,
        )
        .await
        .map_err(invoke_state_error)?;

    if result.threw() {
        // <clinit> ran and threw inside the target
        let exception_type = exception_type_name(conn, &result).await;
        return Err(DebugError::InitializerThrew(exception_type));
    }

    result
        .value
        .object_id()
        .filter(|id| *id != 0)
        .ok_or_else(|| {
            DebugError::DefineFailed("Class.forName did not return a class object".to_string())
        })
}

/// Best-effort type name of a thrown remote exception.
async fn exception_type_name(conn: &mut JdwpConnection, result: &InvokeResult) -> String {
    match conn.get_object_reference_type(result.exception).await {
        Ok(type_id) => conn
            .get_type_name(type_id)
            .await
            .unwrap_or_else(|_| "unknown".to_string()),
        Err(_) => "unknown".to_string(),
    }
}

fn invoke_state_error(err: JdwpError) -> DebugError {
    match err.code() {
        Some(error_codes::THREAD_NOT_SUSPENDED) | Some(error_codes::INVALID_THREAD) => {
            DebugError::IncompatibleThreadState
        }
        Some(error_codes::CLASS_NOT_PREPARED) => DebugError::DefineFailed(
            "class not prepared; preparation step did not complete".to_string(),
        ),
        _ => DebugError::from(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thread_state_errors_map_to_incompatible_state() {
        let err = invoke_state_error(JdwpError::ErrorCode(13, "THREAD_NOT_SUSPENDED"));
        assert!(matches!(err, DebugError::IncompatibleThreadState));

        let err = invoke_state_error(JdwpError::ErrorCode(10, "INVALID_THREAD"));
        assert!(matches!(err, DebugError::IncompatibleThreadState));
    }

    #[test]
    fn unprepared_class_maps_to_define_failure() {
        let err = invoke_state_error(JdwpError::ErrorCode(22, "CLASS_NOT_PREPARED"));
        assert!(matches!(err, DebugError::DefineFailed(_)));
    }
}
