//! User-authored highlight rules.
//!
//! Rules are regular expressions written by users, so some of them will not
//! compile. Those are reported and skipped; the remaining rules still apply.

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::ops::Range;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HighlightRule {
    pub name: String,
    pub pattern: String,
    #[serde(default)]
    pub ignore_case: bool,
}

impl HighlightRule {
    pub fn new(name: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            pattern: pattern.into(),
            ignore_case: false,
        }
    }
}

#[derive(Debug, Error)]
pub enum RuleError {
    #[error("highlight rule `{name}` has an invalid pattern: {source}")]
    InvalidPattern {
        name: String,
        #[source]
        source: regex::Error,
    },
}

/// A matched range (byte offsets) and the index of the rule that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HighlightRange {
    pub range: Range<usize>,
    pub rule: usize,
}

#[derive(Debug, Clone, Default)]
pub struct Highlighter {
    rules: Vec<(String, Regex)>,
}

impl Highlighter {
    /// Compiles every rule it can; invalid ones come back as errors.
    pub fn compile(rules: &[HighlightRule]) -> (Self, Vec<RuleError>) {
        let mut compiled = Vec::with_capacity(rules.len());
        let mut errors = Vec::new();
        for rule in rules {
            match RegexBuilder::new(&rule.pattern)
                .case_insensitive(rule.ignore_case)
                .build()
            {
                Ok(regex) => compiled.push((rule.name.clone(), regex)),
                Err(source) => {
                    warn!(rule = %rule.name, %source, "skipping highlight rule");
                    errors.push(RuleError::InvalidPattern {
                        name: rule.name.clone(),
                        source,
                    });
                }
            }
        }
        (Self { rules: compiled }, errors)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn rule_name(&self, rule: usize) -> Option<&str> {
        self.rules.get(rule).map(|(name, _)| name.as_str())
    }

    /// Non-overlapping matches of all rules.
    ///
    /// Conflicts resolve to the earliest start, then the longest match, then
    /// the rule listed first.
    pub fn ranges(&self, text: &str) -> Vec<HighlightRange> {
        let mut candidates: Vec<HighlightRange> = self
            .rules
            .iter()
            .enumerate()
            .flat_map(|(rule, (_, regex))| {
                regex
                    .find_iter(text)
                    .filter(|m| !m.is_empty())
                    .map(move |m| HighlightRange {
                        range: m.range(),
                        rule,
                    })
            })
            .collect();
        candidates.sort_by(|a, b| {
            a.range
                .start
                .cmp(&b.range.start)
                .then(b.range.len().cmp(&a.range.len()))
                .then(a.rule.cmp(&b.rule))
        });

        let mut kept: Vec<HighlightRange> = Vec::new();
        for candidate in candidates {
            if kept.last().map_or(true, |last| candidate.range.start >= last.range.end) {
                kept.push(candidate);
            }
        }
        kept
    }

    /// Wraps every kept range in `open` / `close`.
    pub fn mark(&self, text: &str, open: &str, close: &str) -> String {
        let mut out = String::with_capacity(text.len());
        let mut last = 0;
        for HighlightRange { range, .. } in self.ranges(text) {
            out.push_str(&text[last..range.start]);
            out.push_str(open);
            out.push_str(&text[range.clone()]);
            out.push_str(close);
            last = range.end;
        }
        out.push_str(&text[last..]);
        out
    }
}
