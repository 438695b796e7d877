//! A compact, dependency-free summary of two editor-text snapshots.
//!
//! Not a real patch: just enough to tell a reviewer (or a prompt) how
//! much changed without shipping the whole file twice.

pub fn compact_diff(before: &str, after: &str) -> String {
    let before_lines: Vec<&str> = before.lines().collect();
    let after_lines: Vec<&str> = after.lines().collect();

    let common_prefix =
        before_lines.iter().zip(after_lines.iter()).take_while(|(a, b)| a == b).count();
    let common_suffix = before_lines
        .iter()
        .rev()
        .zip(after_lines.iter().rev())
        .take_while(|(a, b)| a == b)
        .count()
        .min(before_lines.len() - common_prefix)
        .min(after_lines.len() - common_prefix);

    let removed = before_lines.len() - common_prefix - common_suffix;
    let added = after_lines.len() - common_prefix - common_suffix;

    format!(
        "+{added}/-{removed} lines ({} -> {} chars)",
        before.len(),
        after.len()
    )
}
