use std::fmt;

use regex::{Captures, Regex};

/// A split or strip rule.
#[derive(Debug, Clone)]
pub enum Rule {
    /// Matches by exact prefix comparison at the cursor.
    Literal(String),
    /// Matches only when the pattern matches at the cursor.
    Pattern(AnchoredPattern),
}

/// A regular expression that only matches at the start of its haystack.
///
/// Built by the resolution pass; the scan engine relies on the anchor and
/// never adds one itself.
#[derive(Clone)]
pub struct AnchoredPattern {
    source: String,
    regex: Regex,
}

impl AnchoredPattern {
    pub(crate) fn anchor(source: &str) -> Result<Self, regex::Error> {
        // Wrapping also anchors sources like `^a|b`, whose second branch is free.
        let regex = Regex::new(&format!("^(?:{source})"))?;
        Ok(Self {
            source: source.to_string(),
            regex,
        })
    }

    /// The pattern as written in the grammar definition.
    pub fn source(&self) -> &str {
        &self.source
    }
}

impl fmt::Debug for AnchoredPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}/", self.source)
    }
}

/// A successful rule match at the cursor.
pub struct RuleMatch<'t> {
    whole: &'t str,
    captures: Option<Captures<'t>>,
}

impl<'t> RuleMatch<'t> {
    /// Bytes consumed by the match.
    pub fn len(&self) -> usize {
        self.whole.len()
    }

    pub fn is_empty(&self) -> bool {
        self.whole.is_empty()
    }

    pub fn as_str(&self) -> &'t str {
        self.whole
    }

    /// Capture group `n`, or the whole match if that group is absent.
    pub fn group(&self, n: usize) -> &'t str {
        self.captures
            .as_ref()
            .and_then(|c| c.get(n))
            .map(|m| m.as_str())
            .unwrap_or(self.whole)
    }
}

impl Rule {
    /// Matches this rule against the remaining input.
    ///
    /// Zero-length matches are rejected; they would never advance the cursor.
    pub fn match_prefix<'t>(&self, rest: &'t str) -> Option<RuleMatch<'t>> {
        let found = match self {
            Rule::Literal(lit) => rest.starts_with(lit.as_str()).then(|| RuleMatch {
                whole: &rest[..lit.len()],
                captures: None,
            }),
            Rule::Pattern(p) => p.regex.captures(rest).and_then(|c| {
                let whole = c.get(0)?;
                Some(RuleMatch {
                    whole: &rest[..whole.end()],
                    captures: Some(c),
                })
            }),
        };
        found.filter(|m| !m.is_empty())
    }
}
