// Classpath discovery
//
// Container applications load most of their JARs through custom class
// loaders, so `java.class.path` alone is badly incomplete. Discovery walks
// the suspended thread's context-loader chain and asks every URL-based
// loader for its entries, all through remote invocations.
//
// Every call here is a remote invocation on the supplied thread, which must
// already be suspended at a breakpoint. Discovery is never run while another
// invocation is in flight on the same thread.

use crate::error::{jdwp_op_error, DebugError, DebugResult};
use jdwp_client::commands::invoke_options;
use jdwp_client::types::{name_to_signature, ObjectId, ThreadId, Value};
use jdwp_client::JdwpConnection;
use std::collections::HashSet;
use tracing::{debug, info, warn};

const URL_CLASS_LOADER: &str = "java.net.URLClassLoader";
const WEBAPP_CLASS_LOADER: &str = "org.apache.catalina.loader.WebappClassLoaderBase";

/// Insertion-ordered set of classpath entries.
#[derive(Debug, Clone, Default)]
pub struct Classpath {
    entries: Vec<String>,
    seen: HashSet<String>,
}

impl Classpath {
    pub fn insert(&mut self, entry: impl Into<String>) {
        let entry = entry.into();
        let entry = entry.trim().to_string();
        if entry.is_empty() {
            return;
        }
        if self.seen.insert(entry.clone()) {
            self.entries.push(entry);
        }
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Join into a single classpath string. The separator follows the
    /// target OS, detected from the presence of `;` in any entry set that
    /// came from a Windows target.
    pub fn join(&self, separator: &str) -> String {
        self.entries.join(separator)
    }
}

/// Path separator used by the target OS, detected from its raw
/// `java.class.path` value.
pub fn detect_separator(raw_classpath: &str) -> &'static str {
    if raw_classpath.contains(';') {
        ";"
    } else {
        ":"
    }
}

/// Read a system property from the target via `System.getProperty(String)`.
pub async fn get_system_property(
    conn: &mut JdwpConnection,
    thread_id: ThreadId,
    name: &str,
) -> DebugResult<Option<String>> {
    let system_class = crate::inspect::resolve_class(conn, "java.lang.System")
        .await?
        .ok_or_else(|| DebugError::ClassNotLoaded("java.lang.System".to_string()))?;

    let method = conn
        .find_visible_method(
            system_class,
            "getProperty",
            Some("(Ljava/lang/String;)Ljava/lang/String;"),
        )
        .await
        .map_err(DebugError::from)?
        .ok_or_else(|| DebugError::MethodNotFound("getProperty".to_string()))?;

    let name_ref = conn.create_string(name).await.map_err(DebugError::from)?;
    let result = conn
        .invoke_static(
            method.declaring_class,
            thread_id,
            method.method.method_id,
            &[Value::string(name_ref)],
            invoke_options::SINGLE_THREADED,
        )
        .await
        .map_err(jdwp_op_error)?;

    if result.threw() {
        return Ok(None);
    }

    match result.value.object_id() {
        Some(0) | None => Ok(None),
        Some(string_id) => {
            let value = conn
                .get_string_value(string_id)
                .await
                .map_err(DebugError::from)?;
            Ok(Some(value))
        }
    }
}

/// Discover the application classpath of the target VM.
///
/// Returns `(entries, separator)`. `NoContextLoader` is not an error here:
/// discovery falls back to the initial `java.class.path` entries.
pub async fn discover(
    conn: &mut JdwpConnection,
    thread_id: ThreadId,
) -> DebugResult<(Classpath, &'static str)> {
    let mut classpath = Classpath::default();
    let mut separator = ":";

    // 1. Initial java.class.path: incomplete under containers but always
    //    worth including, and it tells us the target's path separator.
    if let Some(raw) = get_system_property(conn, thread_id, "java.class.path").await? {
        separator = detect_separator(&raw);
        for entry in raw.split(separator) {
            classpath.insert(entry);
        }
        debug!(
            "Initial java.class.path contributed {} entries",
            classpath.len()
        );
    }

    // 2. Context class loader of the supplied thread
    let context_loader = match get_context_class_loader(conn, thread_id).await {
        Ok(Some(loader)) => loader,
        Ok(None) | Err(_) => {
            warn!("No context class loader; falling back to initial classpath");
            return Ok((classpath, separator));
        }
    };

    // 3. Reference types of the loader kinds we know how to enumerate
    let url_loader_class = crate::inspect::resolve_class(conn, URL_CLASS_LOADER).await?;
    let webapp_loader_class = resolve_optional_class(conn, WEBAPP_CLASS_LOADER).await;

    // 4. Walk the loader chain; the visited set breaks cycles
    let mut visited: HashSet<ObjectId> = HashSet::new();
    let mut current = context_loader;

    while current != 0 && visited.insert(current) {
        let loader_type = conn
            .get_object_reference_type(current)
            .await
            .map_err(DebugError::from)?;

        let mut enumerable = false;
        if let Some(url_class) = url_loader_class {
            enumerable = conn
                .is_subclass_of(loader_type, url_class)
                .await
                .map_err(DebugError::from)?;
        }
        if !enumerable {
            if let Some(webapp_class) = webapp_loader_class {
                enumerable = conn
                    .is_subclass_of(loader_type, webapp_class)
                    .await
                    .map_err(DebugError::from)?;
            }
        }

        if enumerable {
            extract_loader_urls(conn, thread_id, current, loader_type, &mut classpath).await?;
        } else {
            debug!("Loader type {} is not URL-enumerable", loader_type);
        }

        current = get_parent_loader(conn, thread_id, current, loader_type)
            .await
            .unwrap_or(0);
    }

    info!("Classpath discovery found {} entries", classpath.len());
    Ok((classpath, separator))
}

async fn resolve_optional_class(conn: &mut JdwpConnection, name: &str) -> Option<u64> {
    let signature = name_to_signature(name);
    match conn.classes_by_signature(&signature).await {
        Ok(classes) => classes.first().map(|c| c.type_id),
        Err(_) => None,
    }
}

async fn get_context_class_loader(
    conn: &mut JdwpConnection,
    thread_id: ThreadId,
) -> DebugResult<Option<ObjectId>> {
    let thread_type = conn
        .get_object_reference_type(thread_id)
        .await
        .map_err(DebugError::from)?;

    let Some(method) = conn
        .find_visible_method(
            thread_type,
            "getContextClassLoader",
            Some("()Ljava/lang/ClassLoader;"),
        )
        .await
        .map_err(DebugError::from)?
    else {
        return Ok(None);
    };

    let result = conn
        .invoke_instance(
            thread_id,
            thread_id,
            method.declaring_class,
            method.method.method_id,
            &[],
            invoke_options::SINGLE_THREADED,
        )
        .await
        .map_err(jdwp_op_error)?;

    if result.threw() {
        return Ok(None);
    }
    Ok(result.value.object_id().filter(|id| *id != 0))
}

/// Call `getURLs()` on a loader and add every URL's decoded path.
async fn extract_loader_urls(
    conn: &mut JdwpConnection,
    thread_id: ThreadId,
    loader: ObjectId,
    loader_type: u64,
    classpath: &mut Classpath,
) -> DebugResult<()> {
    let Some(method) = conn
        .find_visible_method(loader_type, "getURLs", Some("()[Ljava/net/URL;"))
        .await
        .map_err(DebugError::from)?
    else {
        return Ok(());
    };

    let result = conn
        .invoke_instance(
            loader,
            thread_id,
            method.declaring_class,
            method.method.method_id,
            &[],
            invoke_options::SINGLE_THREADED,
        )
        .await
        .map_err(jdwp_op_error)?;

    if result.threw() {
        warn!("getURLs() threw inside the target; skipping this loader");
        return Ok(());
    }
    let Some(array_id) = result.value.object_id().filter(|id| *id != 0) else {
        return Ok(());
    };

    let length = conn
        .get_array_length(array_id)
        .await
        .map_err(DebugError::from)?;
    if length <= 0 {
        return Ok(());
    }

    let urls = conn
        .get_array_values(array_id, 0, length)
        .await
        .map_err(DebugError::from)?;

    let mut added = 0usize;
    for url in urls {
        let Some(url_id) = url.object_id().filter(|id| *id != 0) else {
            continue;
        };
        if let Some(path) = get_url_path(conn, thread_id, url_id).await? {
            classpath.insert(decode_url_path(&path));
            added += 1;
        }
    }
    debug!("Loader contributed {} URL entries", added);

    Ok(())
}

async fn get_url_path(
    conn: &mut JdwpConnection,
    thread_id: ThreadId,
    url_id: ObjectId,
) -> DebugResult<Option<String>> {
    let url_type = conn
        .get_object_reference_type(url_id)
        .await
        .map_err(DebugError::from)?;

    let Some(method) = conn
        .find_visible_method(url_type, "getPath", Some("()Ljava/lang/String;"))
        .await
        .map_err(DebugError::from)?
    else {
        return Ok(None);
    };

    let result = conn
        .invoke_instance(
            url_id,
            thread_id,
            method.declaring_class,
            method.method.method_id,
            &[],
            invoke_options::SINGLE_THREADED,
        )
        .await
        .map_err(jdwp_op_error)?;

    if result.threw() {
        return Ok(None);
    }
    match result.value.object_id() {
        Some(string_id) if string_id != 0 => {
            let path = conn
                .get_string_value(string_id)
                .await
                .map_err(DebugError::from)?;
            Ok(Some(path))
        }
        _ => Ok(None),
    }
}

async fn get_parent_loader(
    conn: &mut JdwpConnection,
    thread_id: ThreadId,
    loader: ObjectId,
    loader_type: u64,
) -> DebugResult<ObjectId> {
    let Some(method) = conn
        .find_visible_method(loader_type, "getParent", Some("()Ljava/lang/ClassLoader;"))
        .await
        .map_err(DebugError::from)?
    else {
        return Ok(0);
    };

    let result = conn
        .invoke_instance(
            loader,
            thread_id,
            method.declaring_class,
            method.method.method_id,
            &[],
            invoke_options::SINGLE_THREADED,
        )
        .await
        .map_err(jdwp_op_error)?;

    if result.threw() {
        return Ok(0);
    }
    Ok(result.value.object_id().unwrap_or(0))
}

/// Percent-decode a URL path (`%20` -> space). Invalid escapes are kept
/// verbatim rather than failing the whole entry.
pub fn decode_url_path(path: &str) -> String {
    let bytes = path.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'%' {
            if let Some(hex) = bytes.get(i + 1..i + 3) {
                if let Ok(byte) =
                    u8::from_str_radix(std::str::from_utf8(hex).unwrap_or(""), 16)
                {
                    out.push(byte);
                    i += 3;
                    continue;
                }
            }
        }
        out.push(bytes[i]);
        i += 1;
    }

    String::from_utf8_lossy(&out).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classpath_preserves_insertion_order_and_dedups() {
        let mut cp = Classpath::default();
        cp.insert("/app/lib/a.jar");
        cp.insert("/app/lib/b.jar");
        cp.insert("/app/lib/a.jar");
        cp.insert("  ");
        assert_eq!(cp.entries(), &["/app/lib/a.jar", "/app/lib/b.jar"]);
        assert_eq!(cp.join(":"), "/app/lib/a.jar:/app/lib/b.jar");
    }

    #[test]
    fn separator_detection_from_target_classpath() {
        assert_eq!(detect_separator("C:\\app\\a.jar;C:\\app\\b.jar"), ";");
        assert_eq!(detect_separator("/app/a.jar:/app/b.jar"), ":");
        assert_eq!(detect_separator("/app/only.jar"), ":");
    }

    #[test]
    fn url_paths_are_percent_decoded() {
        assert_eq!(
            decode_url_path("/opt/my%20app/lib.jar"),
            "/opt/my app/lib.jar"
        );
        assert_eq!(decode_url_path("/plain/path.jar"), "/plain/path.jar");
        // Broken escapes pass through unchanged
        assert_eq!(decode_url_path("/bad%2"), "/bad%2");
        assert_eq!(decode_url_path("/bad%zz/x"), "/bad%zz/x");
    }
}
