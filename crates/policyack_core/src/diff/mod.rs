//! Word-level text diff used for policy change previews.
//!
//! # Responsibility
//! - Split text into word, whitespace and punctuation tokens.
//! - Produce an ordered sequence of unchanged/added/removed parts.
//!
//! # Invariants
//! - Concatenating unchanged + removed parts yields the old text.
//! - Concatenating unchanged + added parts yields the new text.
//! - Adjacent parts never share the same kind.

use once_cell::sync::Lazy;
use regex::Regex;
use similar::{capture_diff_slices_deadline, Algorithm, ChangeTag};
use std::time::{Duration, Instant};

static TOKEN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\w+|\s+|[^\w\s]").expect("valid token regex"));

/// Past this budget Myers returns a coarser but still valid diff.
const DIFF_TIMEOUT: Duration = Duration::from_millis(200);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffKind {
    Unchanged,
    Added,
    Removed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffPart {
    pub text: String,
    pub kind: DiffKind,
}

/// Diffs `old_text` against `new_text` word by word.
///
/// Total: every input pair yields a result. Within a replaced region,
/// removed parts come before added parts.
pub fn diff_words(old_text: &str, new_text: &str) -> Vec<DiffPart> {
    let old_tokens = tokenize(old_text);
    let new_tokens = tokenize(new_text);
    let deadline = Instant::now() + DIFF_TIMEOUT;
    let ops = capture_diff_slices_deadline(
        Algorithm::Myers,
        &old_tokens[..],
        &new_tokens[..],
        Some(deadline),
    );

    let mut parts = Vec::new();
    for op in &ops {
        for change in op.iter_changes(&old_tokens[..], &new_tokens[..]) {
            let kind = match change.tag() {
                ChangeTag::Equal => DiffKind::Unchanged,
                ChangeTag::Insert => DiffKind::Added,
                ChangeTag::Delete => DiffKind::Removed,
            };
            push_part(&mut parts, change.value(), kind);
        }
    }
    parts
}

/// Returns whether any part is an addition or removal.
pub fn has_changes(parts: &[DiffPart]) -> bool {
    parts.iter().any(|part| part.kind != DiffKind::Unchanged)
}

fn tokenize(text: &str) -> Vec<&str> {
    TOKEN_RE.find_iter(text).map(|m| m.as_str()).collect()
}

fn push_part(parts: &mut Vec<DiffPart>, text: &str, kind: DiffKind) {
    if text.is_empty() {
        return;
    }
    match parts.last_mut() {
        Some(last) if last.kind == kind => last.text.push_str(text),
        _ => parts.push(DiffPart {
            text: text.to_string(),
            kind,
        }),
    }
}
