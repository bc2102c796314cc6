//! Integration Test: Sleep Prohibition
//!
//! **Policy**: Production code MUST NOT call sleep to wait for something.
//! Waiting happens on I/O, channels and timeouts.
//! **Exception**: the connection manager's reconnect timer, which is the
//! only place a fixed pause is part of the behavior. It must be the async
//! `tokio::time::sleep`; `std::thread::sleep` is never allowed.

use architectural_enforcement::{code_part, production_sources};

/// Files allowed to sleep, with the word that must appear nearby
const ALLOWED: &[(&str, &str)] = &[("transport/manager.rs", "reconnect")];

#[test]
fn test_no_sleep_in_production_code() {
    let mut violations = Vec::new();

    for file in production_sources() {
        let lines = &file.production_lines;
        for (idx, line) in lines.iter().enumerate() {
            let code = code_part(line);
            if !(code.contains("::sleep(") || code.contains(".sleep(")) {
                continue;
            }
            // Blocking sleep stalls the runtime thread; never allowed
            let blocking = code.contains("thread::sleep(");
            if !blocking && is_allowed(&file.relative.to_string_lossy(), lines, idx) {
                continue;
            }
            violations.push(format!(
                "{}:{} - {}",
                file.relative.display(),
                idx + 1,
                line.trim()
            ));
        }
    }

    assert!(
        violations.is_empty(),
        "Sleep calls found in production code:\n  {}",
        violations.join("\n  ")
    );
}

fn is_allowed(path: &str, lines: &[String], idx: usize) -> bool {
    ALLOWED.iter().any(|(file, marker)| {
        path.ends_with(file) && {
            let start = idx.saturating_sub(15);
            let end = (idx + 3).min(lines.len());
            lines[start..end]
                .iter()
                .any(|l| l.to_lowercase().contains(marker))
        }
    })
}
