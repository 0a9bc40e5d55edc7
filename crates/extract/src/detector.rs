//! PII detection boundary.
//!
//! The detection engine is an external collaborator; the core only relies on
//! entity-type + text-span annotations. A pattern-based detector ships as
//! the default for demos and tests.

use serde::{Deserialize, Serialize};

/// One detected entity: type plus byte span into the analyzed text.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct PiiAnnotation {
    pub entity_type: String,
    pub start: usize,
    pub end: usize,
}

pub trait PiiDetector: Send + Sync {
    fn analyze(&self, text: &str) -> Vec<PiiAnnotation>;
}

/// Minimal built-in detector covering email addresses and US social security
/// numbers.
pub struct PatternDetector;

impl PiiDetector for PatternDetector {
    fn analyze(&self, text: &str) -> Vec<PiiAnnotation> {
        let mut annotations = Vec::new();
        annotations.extend(find_emails(text));
        annotations.extend(find_ssns(text));
        annotations.sort_by_key(|a| a.start);
        annotations
    }
}

fn is_local_part_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '%' | '+' | '-')
}

fn is_domain_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '.' | '-')
}

fn find_emails(text: &str) -> Vec<PiiAnnotation> {
    let bytes = text.as_bytes();
    let mut annotations = Vec::new();
    for (i, _) in text.match_indices('@') {
        let mut start = i;
        while start > 0 && is_local_part_char(bytes[start - 1] as char) {
            start -= 1;
        }
        let mut end = i + 1;
        while end < bytes.len() && is_domain_char(bytes[end] as char) {
            end += 1;
        }
        // Trim trailing punctuation and require a dot in the domain.
        while end > i + 1 && matches!(bytes[end - 1] as char, '.' | '-') {
            end -= 1;
        }
        let domain = &text[i + 1..end];
        if start < i && domain.contains('.') {
            annotations.push(PiiAnnotation {
                entity_type: "email".to_string(),
                start,
                end,
            });
        }
    }
    annotations
}

fn find_ssns(text: &str) -> Vec<PiiAnnotation> {
    let bytes = text.as_bytes();
    let mut annotations = Vec::new();
    // ddd-dd-dddd with no adjacent digits.
    let pattern_len = 11;
    if bytes.len() < pattern_len {
        return annotations;
    }
    for start in 0..=bytes.len() - pattern_len {
        let window = &bytes[start..start + pattern_len];
        let shaped = window.iter().enumerate().all(|(i, b)| match i {
            3 | 6 => *b == b'-',
            _ => b.is_ascii_digit(),
        });
        if !shaped {
            continue;
        }
        let digit_before = start > 0 && bytes[start - 1].is_ascii_digit();
        let after = start + pattern_len;
        let digit_after = after < bytes.len() && bytes[after].is_ascii_digit();
        if !digit_before && !digit_after {
            annotations.push(PiiAnnotation {
                entity_type: "ssn".to_string(),
                start,
                end: after,
            });
        }
    }
    annotations
}
