//! Rendering of requests into Links Notation queries.
//!
//! clink queries are substitutions `(matches) (replacements)`. A wildcard
//! position is rendered as a variable so the matched value flows through.

use crate::types::{ANY, Restriction, Substitution, ValidationError};
use std::fmt;

/// Flags passed to clink alongside the query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueryFlags {
    pub before: bool,
    pub changes: bool,
    pub after: bool,
    pub trace: bool,
}

impl QueryFlags {
    /// Report the mutations the query performed.
    pub const CHANGES: Self = Self {
        before: false,
        changes: true,
        after: false,
        trace: false,
    };

    /// Report the full store state after the query.
    pub const AFTER: Self = Self {
        before: false,
        changes: false,
        after: true,
        trace: false,
    };

    /// Command-line arguments for these flags.
    pub fn args(&self) -> Vec<&'static str> {
        let mut args = Vec::new();
        if self.before {
            args.push("--before");
        }
        if self.changes {
            args.push("--changes");
        }
        if self.after {
            args.push("--after");
        }
        if self.trace {
            args.push("--trace");
        }
        args
    }
}

/// One position of a pattern: a literal or a named variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Term {
    Value(u64),
    Var(&'static str),
}

impl Term {
    fn or_var(value: u64, var: &'static str) -> Self {
        if value == ANY { Term::Var(var) } else { Term::Value(value) }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Value(v) => write!(f, "{}", v),
            Term::Var(name) => write!(f, "${}", name),
        }
    }
}

/// A `(id: source target)` pattern.
#[derive(Debug, Clone, Copy)]
struct Pattern {
    id: Term,
    source: Term,
    target: Term,
}

impl Pattern {
    fn matching(restriction: &Restriction) -> Self {
        Self {
            id: Term::or_var(restriction.id, "i"),
            source: Term::or_var(restriction.source, "s"),
            target: Term::or_var(restriction.target, "t"),
        }
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}: {} {})", self.id, self.source, self.target)
    }
}

/// `() ((source target))`
pub fn create(source: u64, target: u64) -> String {
    format!("() (({} {}))", source, target)
}

/// Identity substitution; with `--after` it lists the store.
pub fn read(restriction: &Restriction) -> String {
    let pattern = Pattern::matching(restriction);
    format!("(({}) ({}))", pattern, pattern)
}

/// Rewrite every link matching `restriction`; `ANY` in the substitution
/// keeps the matched value.
pub fn update(restriction: &Restriction, substitution: &Substitution) -> Result<String, ValidationError> {
    if substitution.id != ANY && substitution.id != restriction.id {
        return Err(ValidationError::IdChange {
            from: restriction.id,
            to: substitution.id,
        });
    }
    let matching = Pattern::matching(restriction);
    let replacement = Pattern {
        id: matching.id,
        source: if substitution.source == ANY {
            matching.source
        } else {
            Term::Value(substitution.source)
        },
        target: if substitution.target == ANY {
            matching.target
        } else {
            Term::Value(substitution.target)
        },
    };
    Ok(format!("(({}) ({}))", matching, replacement))
}

/// Replace every link matching `restriction` with nothing.
pub fn delete(restriction: &Restriction) -> String {
    format!("(({}) ())", Pattern::matching(restriction))
}

/// Delete every link in the store.
pub fn delete_all() -> String {
    "((* *)) ()".to_string()
}
