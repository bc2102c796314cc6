//! Architectural Enforcement Integration Tests
//!
//! Source-level checks over the client crates:
//! - No sleep() calls in production code outside the reconnect timer
//! - No unwrap()/expect() in production code
//!
//! Helpers here are shared by the tests in `tests/`.

use std::fs;
use std::path::{Path, PathBuf};

/// Production source roots checked by every rule
pub const SOURCE_ROOTS: &[&str] = &["client/core/src", "client/cli/src"];

/// Workspace root, two levels above this package
#[must_use]
pub fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("..").join("..")
}

/// A production source file split into lines
pub struct SourceFile {
    /// Path relative to the workspace root
    pub relative: PathBuf,
    /// Lines before the first `#[cfg(test)]`
    pub production_lines: Vec<String>,
}

/// Every `.rs` file under the source roots
#[must_use]
pub fn production_sources() -> Vec<SourceFile> {
    let root = workspace_root();
    let mut files = Vec::new();

    for dir in SOURCE_ROOTS {
        let path = root.join(dir);
        if !path.exists() {
            continue;
        }
        for entry in walkdir::WalkDir::new(&path)
            .into_iter()
            .filter_map(Result::ok)
        {
            if entry.path().extension().and_then(|s| s.to_str()) != Some("rs") {
                continue;
            }
            let Ok(content) = fs::read_to_string(entry.path()) else {
                continue;
            };
            let relative = entry
                .path()
                .strip_prefix(&root)
                .unwrap_or(entry.path())
                .to_path_buf();
            files.push(SourceFile {
                relative,
                production_lines: production_part(&content),
            });
        }
    }

    files
}

/// Lines up to the test module; tests sit at the end of each file
fn production_part(content: &str) -> Vec<String> {
    content
        .lines()
        .take_while(|line| !line.trim_start().starts_with("#[cfg(test)]"))
        .map(str::to_string)
        .collect()
}

/// Code portion of a line, without a trailing `//` comment
#[must_use]
pub fn code_part(line: &str) -> &str {
    line.split("//").next().unwrap_or(line)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_production_part_stops_at_tests() {
        let src = "fn a() {}\n#[cfg(test)]\nmod tests { fn b() { x.unwrap(); } }\n";
        assert_eq!(production_part(src), vec!["fn a() {}".to_string()]);
    }

    #[test]
    fn test_code_part_strips_comment() {
        assert_eq!(code_part("let x = 1; // sleep(1)"), "let x = 1; ");
    }

    #[test]
    fn test_sources_found() {
        assert!(!production_sources().is_empty());
    }
}
