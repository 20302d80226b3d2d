//! Classifies raw DOM nodes as sensitive form fields.
//!
//! CDP hands us a node name plus a flat attribute token list rather than a
//! live element, so detection is a regex search over the space-joined tokens
//! (`type password name login_password value hunter2`) instead of real
//! selector matching. Patterns are matched case-insensitively.

use domtrace_protocol::NodeSnapshot;
use regex::Regex;
use regex::RegexBuilder;

use crate::error::RecorderError;
use crate::error::Result;

/// `type=password`, then `name`/`id` containing password, passwd, secret or
/// token, written against the joined `name value` token form.
pub const DEFAULT_SENSITIVE_SELECTORS: &[&str] = &[
    r"(^| )type password( |$)",
    r"(^| )name [^ ]*(password|passwd)",
    r"(^| )id [^ ]*(password|passwd)",
    r"(^| )name [^ ]*secret",
    r"(^| )name [^ ]*token",
    r"(^| )autocomplete (current|new)-password( |$)",
];

#[derive(Debug, Clone)]
pub struct SensitiveFieldDetector {
    patterns: Vec<Regex>,
}

impl SensitiveFieldDetector {
    /// Built-in patterns plus `extra`. An invalid extra pattern is a
    /// validation error; extras never replace the defaults.
    pub fn new<S: AsRef<str>>(extra: &[S]) -> Result<Self> {
        let mut patterns = Vec::with_capacity(DEFAULT_SENSITIVE_SELECTORS.len() + extra.len());
        for pattern in DEFAULT_SENSITIVE_SELECTORS
            .iter()
            .copied()
            .chain(extra.iter().map(AsRef::<str>::as_ref))
        {
            patterns.push(compile(pattern)?);
        }
        Ok(Self { patterns })
    }

    pub fn pattern_count(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_sensitive(&self, node: &NodeSnapshot) -> bool {
        if !node.node_name.eq_ignore_ascii_case("input") {
            return false;
        }
        let Some(attributes) = node.attributes.as_ref().filter(|list| !list.is_empty()) else {
            return false;
        };
        let haystack = attributes.tokens().collect::<Vec<_>>().join(" ").to_lowercase();
        self.patterns.iter().any(|pattern| pattern.is_match(&haystack))
    }
}

impl Default for SensitiveFieldDetector {
    fn default() -> Self {
        let patterns = DEFAULT_SENSITIVE_SELECTORS
            .iter()
            .filter_map(|pattern| compile(pattern).ok())
            .collect();
        Self { patterns }
    }
}

fn compile(pattern: &str) -> Result<Regex> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .map_err(|e| RecorderError::Validation(format!("invalid sensitive selector {pattern:?}: {e}")))
}
