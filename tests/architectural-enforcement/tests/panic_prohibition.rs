//! Integration Test: No unwrap/expect in production code
//!
//! Errors propagate as `Result`; a malformed frame or a dead connection must
//! never take the client down.

use architectural_enforcement::{code_part, production_sources};

#[test]
fn test_no_unwrap_or_expect_in_production_code() {
    let mut violations = Vec::new();

    for file in production_sources() {
        for (idx, line) in file.production_lines.iter().enumerate() {
            let code = code_part(line);
            if code.contains(".unwrap()") || code.contains(".expect(") {
                violations.push(format!(
                    "{}:{} - {}",
                    file.relative.display(),
                    idx + 1,
                    line.trim()
                ));
            }
        }
    }

    assert!(
        violations.is_empty(),
        "unwrap()/expect() found in production code:\n  {}",
        violations.join("\n  ")
    );
}
