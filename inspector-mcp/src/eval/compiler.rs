// Source compiler
//
// Drives the discovered platform's javac over a scratch directory and reads
// the emitted class files back into memory. Configured once per session with
// the platform home and the discovered classpath.
//
// The generated unit targets the legacy 8 bytecode level so it loads on any
// target from that era forward, and keeps local variable debug info (-g).

use super::platform::PlatformHome;
use crate::error::{DebugError, DebugResult, Diagnostic};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::process::Command;
use tracing::{debug, info};

static SCRATCH_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Compiled unit: binary class name -> bytecode.
pub type BytecodeMap = HashMap<String, Vec<u8>>;

#[derive(Debug, Clone)]
pub struct JavaCompiler {
    platform: PlatformHome,
    classpath: String,
}

impl JavaCompiler {
    pub fn new(platform: PlatformHome, classpath: String) -> Self {
        info!(
            "Compiler configured: platform {} (Java {}), {} classpath bytes",
            platform.path.display(),
            platform.major_version,
            classpath.len()
        );
        Self {
            platform,
            classpath,
        }
    }

    /// Compile a single generated source unit.
    ///
    /// The scratch directory is removed on success and failure alike.
    pub async fn compile(&self, class_name: &str, source: &str) -> DebugResult<BytecodeMap> {
        let scratch = scratch_dir()?;
        let result = self.compile_in(&scratch, class_name, source).await;
        let _ = std::fs::remove_dir_all(&scratch);
        result
    }

    async fn compile_in(
        &self,
        scratch: &Path,
        class_name: &str,
        source: &str,
    ) -> DebugResult<BytecodeMap> {
        let (package, simple_name) = split_class_name(class_name);

        let mut source_dir = scratch.to_path_buf();
        if let Some(package) = package {
            for segment in package.split('.') {
                source_dir.push(segment);
            }
        }
        std::fs::create_dir_all(&source_dir).map_err(compile_io_error)?;

        let source_file = source_dir.join(format!("{}.java", simple_name));
        std::fs::write(&source_file, source).map_err(compile_io_error)?;

        let out_dir = scratch.join("classes");
        std::fs::create_dir_all(&out_dir).map_err(compile_io_error)?;

        let mut cmd = Command::new(self.platform.javac());
        cmd.arg("-g"); // keep local variable names
        cmd.arg("-encoding").arg("UTF-8");
        cmd.arg("-d").arg(&out_dir);
        for flag in language_level_flags(self.platform.major_version) {
            cmd.arg(flag);
        }
        if !self.classpath.is_empty() {
            cmd.arg("-classpath").arg(&self.classpath);
        }
        cmd.arg(&source_file);
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        debug!("Running javac for {}", class_name);
        let output = cmd.output().await.map_err(|e| {
            DebugError::CompilationFailed(vec![Diagnostic {
                file: source_file.display().to_string(),
                line: 0,
                message: format!("failed to run javac: {}", e),
            }])
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let diagnostics = parse_javac_diagnostics(&stderr);
            return Err(DebugError::CompilationFailed(if diagnostics.is_empty() {
                vec![Diagnostic {
                    file: source_file.display().to_string(),
                    line: 0,
                    message: stderr.trim().to_string(),
                }]
            } else {
                diagnostics
            }));
        }

        let bytecode = collect_class_files(&out_dir)?;
        if bytecode.is_empty() {
            return Err(DebugError::CompilationFailed(vec![Diagnostic {
                file: source_file.display().to_string(),
                line: 0,
                message: "javac produced no class files".to_string(),
            }]));
        }

        info!(
            "Compiled {} ({} class file(s), {} bytes)",
            class_name,
            bytecode.len(),
            bytecode.values().map(|b| b.len()).sum::<usize>()
        );
        Ok(bytecode)
    }
}

/// Language-level flags for the 8/8 target. An 8 toolchain emits 8 by
/// default via -source/-target; newer toolchains use --release so platform
/// class resolution matches the level.
fn language_level_flags(major: u16) -> Vec<String> {
    if major <= 8 {
        vec![
            "-source".into(),
            "1.8".into(),
            "-target".into(),
            "1.8".into(),
        ]
    } else {
        vec!["--release".into(), "8".into()]
    }
}

fn split_class_name(class_name: &str) -> (Option<&str>, &str) {
    match class_name.rfind('.') {
        Some(idx) => (Some(&class_name[..idx]), &class_name[idx + 1..]),
        None => (None, class_name),
    }
}

fn scratch_dir() -> DebugResult<PathBuf> {
    let base = std::env::temp_dir().join("inspector-mcp-eval");
    std::fs::create_dir_all(&base).map_err(compile_io_error)?;
    let id = SCRATCH_COUNTER.fetch_add(1, Ordering::Relaxed);
    let dir = base.join(format!("compile-{}-{}", id, std::process::id()));
    std::fs::create_dir(&dir).map_err(compile_io_error)?;
    Ok(dir)
}

fn compile_io_error(err: std::io::Error) -> DebugError {
    DebugError::CompilationFailed(vec![Diagnostic {
        file: String::new(),
        line: 0,
        message: format!("scratch directory error: {}", err),
    }])
}

/// Walk the output directory and map each `.class` file back to its binary
/// class name.
fn collect_class_files(out_dir: &Path) -> DebugResult<BytecodeMap> {
    let mut map = BytecodeMap::new();
    collect_class_files_inner(out_dir, out_dir, &mut map)?;
    Ok(map)
}

fn collect_class_files_inner(
    root: &Path,
    dir: &Path,
    map: &mut BytecodeMap,
) -> DebugResult<()> {
    let entries = std::fs::read_dir(dir).map_err(compile_io_error)?;
    for entry in entries {
        let entry = entry.map_err(compile_io_error)?;
        let path = entry.path();
        if path.is_dir() {
            collect_class_files_inner(root, &path, map)?;
        } else if path.extension().and_then(|s| s.to_str()) == Some("class") {
            if let Some(name) = class_name_from_path(root, &path) {
                let bytes = std::fs::read(&path).map_err(compile_io_error)?;
                map.insert(name, bytes);
            }
        }
    }
    Ok(())
}

fn class_name_from_path(root: &Path, class_file: &Path) -> Option<String> {
    let rel = class_file.strip_prefix(root).ok()?;
    let mut segments: Vec<String> = rel
        .components()
        .filter_map(|c| match c {
            std::path::Component::Normal(os) => Some(os.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();
    let last = segments.pop()?;
    segments.push(last.strip_suffix(".class")?.to_string());
    Some(segments.join("."))
}

/// Parse `path:line: error: message` diagnostics out of javac stderr.
pub fn parse_javac_diagnostics(stderr: &str) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();

    for line in stderr.lines() {
        // Windows drive letters contain ':'; find the line-number colon by
        // scanning for a ":<digits>:" group instead of splitting blindly.
        let Some((file, rest)) = split_file_and_rest(line) else {
            continue;
        };
        let Some((line_no, message)) = rest.split_once(':') else {
            continue;
        };
        let Ok(line_no) = line_no.trim().parse::<u32>() else {
            continue;
        };

        let message = message.trim();
        let message = message.strip_prefix("error:").unwrap_or(message).trim();
        diagnostics.push(Diagnostic {
            file: file.to_string(),
            line: line_no,
            message: message.to_string(),
        });
    }

    diagnostics
}

fn split_file_and_rest(line: &str) -> Option<(&str, &str)> {
    // Find the first ':' that is followed by a digit; everything before it
    // is the path.
    let bytes = line.as_bytes();
    for (i, b) in bytes.iter().enumerate() {
        if *b == b':' {
            if let Some(next) = bytes.get(i + 1) {
                if next.is_ascii_digit() {
                    return Some((&line[..i], &line[i + 1..]));
                }
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn class_name_splitting() {
        assert_eq!(
            split_class_name("mcp.eval.gen.Expr_abc"),
            (Some("mcp.eval.gen"), "Expr_abc")
        );
        assert_eq!(split_class_name("TopLevel"), (None, "TopLevel"));
    }

    #[test]
    fn legacy_toolchain_uses_source_target_flags() {
        assert_eq!(
            language_level_flags(8),
            vec!["-source", "1.8", "-target", "1.8"]
        );
        assert_eq!(language_level_flags(17), vec!["--release", "8"]);
    }

    #[test]
    fn class_file_paths_map_to_binary_names() {
        let root = Path::new("/tmp/out");
        assert_eq!(
            class_name_from_path(root, Path::new("/tmp/out/mcp/eval/gen/Expr.class")),
            Some("mcp.eval.gen.Expr".to_string())
        );
        assert_eq!(
            class_name_from_path(root, Path::new("/tmp/out/Top.class")),
            Some("Top".to_string())
        );
        assert_eq!(
            class_name_from_path(root, Path::new("/elsewhere/Top.class")),
            None
        );
    }

    #[test]
    fn javac_diagnostics_are_parsed() {
        let stderr = "\
/tmp/eval/Expr.java:5: error: cannot find symbol\n\
        return (Object)(bogus);\n\
                        ^\n\
  symbol:   variable bogus\n\
1 error\n";
        let diagnostics = parse_javac_diagnostics(stderr);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].file, "/tmp/eval/Expr.java");
        assert_eq!(diagnostics[0].line, 5);
        assert_eq!(diagnostics[0].message, "cannot find symbol");
    }

    #[test]
    fn windows_paths_keep_their_drive_letter() {
        let stderr = "C:\\eval\\Expr.java:12: error: ';' expected\n";
        let diagnostics = parse_javac_diagnostics(stderr);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].file, "C:\\eval\\Expr.java");
        assert_eq!(diagnostics[0].line, 12);
    }

    #[test]
    fn scratch_dirs_are_unique() {
        let a = scratch_dir().unwrap();
        let b = scratch_dir().unwrap();
        assert_ne!(a, b);
        std::fs::remove_dir_all(&a).ok();
        std::fs::remove_dir_all(&b).ok();
    }
}
