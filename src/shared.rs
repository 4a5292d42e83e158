//! Shared utilities for frontend, bytecode and runtime.

pub mod typed_ids;

/// Compute 1-based line/column number from an absolute byte offset in the input.
pub fn compute_loc(input: &str, offset: usize) -> (u32, u32) {
    let parsed = &input[..offset.min(input.len())];
    let line = parsed.matches('\n').count() + 1;
    let line_start = parsed.rfind('\n').map_or(0, |nl| nl + 1);
    (line as u32, (parsed.len() - line_start + 1) as u32)
}

#[test]
fn test_compute_loc() {
    let input = "one\ntwo\nthree";
    assert_eq!(compute_loc(input, 0), (1, 1));
    assert_eq!(compute_loc(input, 2), (1, 3));
    assert_eq!(compute_loc(input, 4), (2, 1));
    assert_eq!(compute_loc(input, 9), (3, 2));
}
