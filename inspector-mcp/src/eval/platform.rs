// Platform runtime discovery
//
// The compiler needs a local JDK whose major version matches the target VM,
// both to resolve platform classes and to supply the javac binary. The
// target's version and home come from remote property reads on a thread
// suspended at a breakpoint.

use super::classpath::get_system_property;
use crate::error::{DebugError, DebugResult};
use jdwp_client::types::ThreadId;
use jdwp_client::JdwpConnection;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct PlatformHome {
    pub path: PathBuf,
    pub major_version: u16,
}

impl PlatformHome {
    /// Path to the javac launcher inside this home.
    pub fn javac(&self) -> PathBuf {
        let exe = if cfg!(windows) { "javac.exe" } else { "javac" };
        self.path.join("bin").join(exe)
    }
}

/// Locate a local platform installation matching the target's major version.
pub async fn discover(
    conn: &mut JdwpConnection,
    thread_id: ThreadId,
) -> DebugResult<PlatformHome> {
    let version = get_system_property(conn, thread_id, "java.version")
        .await?
        .unwrap_or_default();
    let target_home = get_system_property(conn, thread_id, "java.home")
        .await?
        .unwrap_or_default();

    let major = extract_major_version(&version);
    info!(
        "Target runtime is Java {} (version {:?}) at {:?}",
        major, version, target_home
    );

    let mut probed = Vec::new();

    // 1. The target's own java.home, when it is readable from this host
    if !target_home.is_empty() {
        let candidate = PathBuf::from(&target_home);
        if is_valid_platform_home(&candidate) {
            debug!("Target java.home is locally valid: {}", candidate.display());
            return Ok(PlatformHome {
                path: candidate,
                major_version: major,
            });
        }
        probed.push(candidate);
    }

    // 2. Well-known installation roots for this OS
    for candidate in well_known_homes(major) {
        if is_valid_platform_home(&candidate) {
            debug!("Found platform home at {}", candidate.display());
            return Ok(PlatformHome {
                path: candidate,
                major_version: major,
            });
        }
        probed.push(candidate);
    }

    // 3. Scan common parent directories for a versioned subdirectory
    let parents = search_parents();
    if let Some(found) = scan_for_version(&parents, major) {
        return Ok(PlatformHome {
            path: found,
            major_version: major,
        });
    }
    probed.extend(parents);

    Err(DebugError::PlatformNotFound(not_found_message(
        major, &version, &probed,
    )))
}

/// Major version from a `java.version` string: `1.8.0_392` is 8,
/// `11.0.21` is 11, `17` is 17. Unparseable input yields 0.
pub fn extract_major_version(version: &str) -> u16 {
    if version.starts_with("1.8") {
        return 8;
    }
    version
        .split('.')
        .next()
        .and_then(|part| part.parse().ok())
        .unwrap_or(0)
}

/// A directory is a usable platform home when it carries the modern modules
/// directory, the modern runtime filesystem jar, or the legacy runtime jar
/// (possibly under an inner `jre` directory).
pub fn is_valid_platform_home(path: &Path) -> bool {
    if !path.is_dir() {
        return false;
    }
    path.join("jmods").is_dir()
        || path.join("lib").join("jrt-fs.jar").is_file()
        || path.join("lib").join("rt.jar").is_file()
        || path.join("jre").join("lib").join("rt.jar").is_file()
}

fn well_known_homes(major: u16) -> Vec<PathBuf> {
    if cfg!(windows) {
        vec![
            PathBuf::from(format!(
                "C:\\Program Files\\Eclipse Adoptium\\jdk-{}",
                major
            )),
            PathBuf::from(format!("C:\\Program Files\\Java\\jdk-{}", major)),
            PathBuf::from(format!("C:\\Program Files\\OpenJDK\\jdk-{}", major)),
            PathBuf::from(format!("C:\\Program Files\\Zulu\\zulu-{}", major)),
        ]
    } else {
        vec![
            PathBuf::from(format!("/usr/lib/jvm/java-{}-openjdk", major)),
            PathBuf::from(format!("/usr/lib/jvm/java-{}-openjdk-amd64", major)),
            PathBuf::from(format!("/usr/lib/jvm/jdk-{}", major)),
            PathBuf::from(format!("/opt/jdk-{}", major)),
        ]
    }
}

fn search_parents() -> Vec<PathBuf> {
    if cfg!(windows) {
        vec![
            PathBuf::from("C:\\Program Files\\Eclipse Adoptium"),
            PathBuf::from("C:\\Program Files\\Java"),
            PathBuf::from("C:\\Program Files\\OpenJDK"),
        ]
    } else {
        vec![PathBuf::from("/usr/lib/jvm"), PathBuf::from("/opt")]
    }
}

/// Look inside the given parents for a JDK-ish directory whose name carries
/// the wanted major version and whose layout validates.
fn scan_for_version(parents: &[PathBuf], major: u16) -> Option<PathBuf> {
    for parent in parents {
        let Ok(entries) = std::fs::read_dir(parent) else {
            continue;
        };

        for entry in entries.flatten() {
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().to_lowercase();
            if !(name.contains("jdk") || name.contains("java")) {
                continue;
            }
            if !directory_name_matches_version(&name, major) {
                continue;
            }
            if is_valid_platform_home(&path) {
                debug!("Scan found platform home at {}", path.display());
                return Some(path);
            }
        }
    }
    None
}

fn directory_name_matches_version(name: &str, major: u16) -> bool {
    name.contains(&format!("-{}", major))
        || name.contains(&format!("_{}", major))
        || name.contains(&format!("jdk{}", major))
}

fn not_found_message(major: u16, version: &str, probed: &[PathBuf]) -> String {
    let mut msg = format!(
        "No local platform installation found for Java {}.\n\n\
         The target VM is running Java {}, but no matching JDK is available \
         on this host. Directories probed:\n",
        major, version
    );
    for path in probed {
        msg.push_str(&format!("  - {}\n", path.display()));
    }
    msg.push_str("\nExpression evaluation requires access to platform classes.");
    msg
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn major_version_handles_both_schemes() {
        assert_eq!(extract_major_version("1.8.0_392"), 8);
        assert_eq!(extract_major_version("11.0.21"), 11);
        assert_eq!(extract_major_version("17"), 17);
        assert_eq!(extract_major_version("21.0.1"), 21);
        assert_eq!(extract_major_version("garbage"), 0);
        assert_eq!(extract_major_version(""), 0);
    }

    #[test]
    fn directory_name_version_matching() {
        assert!(directory_name_matches_version("jdk-17.0.10", 17));
        assert!(directory_name_matches_version("java_17_hotspot", 17));
        assert!(directory_name_matches_version("openjdk17", 17));
        assert!(!directory_name_matches_version("jdk-8u392", 17));
    }

    #[test]
    fn validity_predicate_on_synthetic_layouts() {
        let base = std::env::temp_dir().join(format!(
            "platform-probe-{}-{}",
            std::process::id(),
            line!()
        ));

        // Modern layout: jmods/
        let modern = base.join("modern");
        std::fs::create_dir_all(modern.join("jmods")).unwrap();
        assert!(is_valid_platform_home(&modern));

        // Modern layout: lib/jrt-fs.jar
        let jrt = base.join("jrt");
        std::fs::create_dir_all(jrt.join("lib")).unwrap();
        std::fs::write(jrt.join("lib").join("jrt-fs.jar"), b"").unwrap();
        assert!(is_valid_platform_home(&jrt));

        // Legacy layout: lib/rt.jar
        let legacy = base.join("legacy");
        std::fs::create_dir_all(legacy.join("lib")).unwrap();
        std::fs::write(legacy.join("lib").join("rt.jar"), b"").unwrap();
        assert!(is_valid_platform_home(&legacy));

        // Legacy layout under an inner jre directory
        let nested = base.join("nested");
        std::fs::create_dir_all(nested.join("jre").join("lib")).unwrap();
        std::fs::write(nested.join("jre").join("lib").join("rt.jar"), b"").unwrap();
        assert!(is_valid_platform_home(&nested));

        // Empty directory is not a platform home
        let empty = base.join("empty");
        std::fs::create_dir_all(&empty).unwrap();
        assert!(!is_valid_platform_home(&empty));
        assert!(!is_valid_platform_home(&base.join("missing")));

        std::fs::remove_dir_all(&base).ok();
    }

    #[test]
    fn not_found_message_lists_probed_directories() {
        let msg = not_found_message(
            17,
            "17.0.2",
            &[PathBuf::from("/usr/lib/jvm/jdk-17"), PathBuf::from("/opt")],
        );
        assert!(msg.contains("Java 17"));
        assert!(msg.contains("/usr/lib/jvm/jdk-17"));
        assert!(msg.contains("/opt"));
    }
}
