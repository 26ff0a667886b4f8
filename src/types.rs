//! Core data types shared by every links-client service.

use serde::{Deserialize, Serialize};

/// Wildcard value for any position of a restriction.
pub const ANY: u64 = 0;

/// The atomic unit of the external graph store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Link {
    /// Identifier assigned by the store on creation, never changes
    pub id: u64,

    /// Opaque reference to another link or a raw value
    pub source: u64,

    /// Opaque reference to another link or a raw value
    pub target: u64,
}

impl Link {
    pub fn new(id: u64, source: u64, target: u64) -> Self {
        Self { id, source, target }
    }
}

impl std::fmt::Display for Link {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}: {} {})", self.id, self.source, self.target)
    }
}

/// A single mutation reported by the store.
///
/// `before` is `None` for a creation, `after` is `None` for a deletion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Change {
    pub before: Option<Link>,
    pub after: Option<Link>,
}

impl Change {
    pub fn created(link: Link) -> Self {
        Self {
            before: None,
            after: Some(link),
        }
    }

    pub fn updated(before: Link, after: Link) -> Self {
        Self {
            before: Some(before),
            after: Some(after),
        }
    }

    pub fn deleted(link: Link) -> Self {
        Self {
            before: Some(link),
            after: None,
        }
    }

    /// Id of the link this change touched.
    pub fn id(&self) -> Option<u64> {
        self.after.or(self.before).map(|l| l.id)
    }
}

/// Control-flow result returned by `each` callbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Break,
}

/// Observer for changes made by create/update/delete.
pub trait ChangeHandler {
    fn handle(&mut self, change: &Change);
}

impl<F> ChangeHandler for F
where
    F: FnMut(&Change),
{
    fn handle(&mut self, change: &Change) {
        self(change)
    }
}

/// Match pattern over `(id, source, target)`, `ANY` matches anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Restriction {
    pub id: u64,
    pub source: u64,
    pub target: u64,
}

impl Restriction {
    pub fn new(id: u64, source: u64, target: u64) -> Self {
        Self { id, source, target }
    }

    /// Restriction matching every link.
    pub fn any() -> Self {
        Self::default()
    }

    pub fn by_id(id: u64) -> Self {
        Self {
            id,
            ..Self::default()
        }
    }

    /// Build from a positional `[id, source, target]` slice; missing
    /// trailing positions are `ANY`.
    pub fn from_slice(values: &[u64]) -> Result<Self, ValidationError> {
        if values.len() > 3 {
            return Err(ValidationError::RestrictionTooLong(values.len()));
        }
        let at = |i: usize| values.get(i).copied().unwrap_or(ANY);
        Ok(Self::new(at(0), at(1), at(2)))
    }

    pub fn is_any(&self) -> bool {
        self.id == ANY && self.source == ANY && self.target == ANY
    }

    pub fn matches(&self, link: &Link) -> bool {
        (self.id == ANY || self.id == link.id)
            && (self.source == ANY || self.source == link.source)
            && (self.target == ANY || self.target == link.target)
    }
}

/// Replacement values for create/update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Substitution {
    pub id: u64,
    pub source: u64,
    pub target: u64,
}

impl Substitution {
    /// Accepts `[source, target]` or `[id, source, target]`.
    pub fn from_slice(values: &[u64]) -> Result<Self, ValidationError> {
        match *values {
            [source, target] => Ok(Self {
                id: ANY,
                source,
                target,
            }),
            [id, source, target] => Ok(Self { id, source, target }),
            _ if values.len() < 2 => Err(ValidationError::SubstitutionTooShort(values.len())),
            _ => Err(ValidationError::SubstitutionTooLong(values.len())),
        }
    }
}

/// Validation errors for caller-supplied restrictions and substitutions.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    SubstitutionTooShort(usize),
    SubstitutionTooLong(usize),
    RestrictionTooLong(usize),
    RestrictionRequired(&'static str),
    IdChange { from: u64, to: u64 },
    InvalidKey(String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::SubstitutionTooShort(len) => {
                write!(f, "substitution needs at least [source, target], got {} value(s)", len)
            }
            ValidationError::SubstitutionTooLong(len) => {
                write!(f, "substitution takes at most [id, source, target], got {} values", len)
            }
            ValidationError::RestrictionTooLong(len) => {
                write!(f, "restriction takes at most [id, source, target], got {} values", len)
            }
            ValidationError::RestrictionRequired(op) => write!(f, "Restriction required for {}", op),
            ValidationError::IdChange { from, to } => {
                write!(f, "link id cannot change (from {} to {})", from, to)
            }
            ValidationError::InvalidKey(key) => write!(f, "invalid record id {:?}", key),
        }
    }
}

impl std::error::Error for ValidationError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_link_display() {
        assert_eq!(Link::new(3, 100, 200).to_string(), "(3: 100 200)");
    }

    #[test]
    fn test_restriction_from_slice_positional() {
        assert_eq!(Restriction::from_slice(&[]).unwrap(), Restriction::any());
        assert_eq!(Restriction::from_slice(&[7]).unwrap(), Restriction::by_id(7));
        assert_eq!(Restriction::from_slice(&[0, 5]).unwrap(), Restriction::new(0, 5, 0));
        assert_eq!(Restriction::from_slice(&[1, 2, 3]).unwrap(), Restriction::new(1, 2, 3));
    }

    #[test]
    fn test_restriction_too_long() {
        assert_eq!(
            Restriction::from_slice(&[1, 2, 3, 4]),
            Err(ValidationError::RestrictionTooLong(4))
        );
    }

    #[test]
    fn test_restriction_matches() {
        let link = Link::new(4, 10, 20);
        assert!(Restriction::any().matches(&link));
        assert!(Restriction::by_id(4).matches(&link));
        assert!(!Restriction::by_id(5).matches(&link));
        assert!(Restriction::new(ANY, 10, ANY).matches(&link));
        assert!(!Restriction::new(ANY, 10, 21).matches(&link));
    }

    #[test]
    fn test_substitution_lengths() {
        assert_eq!(
            Substitution::from_slice(&[1]),
            Err(ValidationError::SubstitutionTooShort(1))
        );
        assert_eq!(
            Substitution::from_slice(&[]),
            Err(ValidationError::SubstitutionTooShort(0))
        );
        assert_eq!(
            Substitution::from_slice(&[1, 2, 3, 4]),
            Err(ValidationError::SubstitutionTooLong(4))
        );

        let sub = Substitution::from_slice(&[8, 9]).unwrap();
        assert_eq!((sub.id, sub.source, sub.target), (ANY, 8, 9));

        let sub = Substitution::from_slice(&[1, 8, 9]).unwrap();
        assert_eq!((sub.id, sub.source, sub.target), (1, 8, 9));
    }

    #[test]
    fn test_change_id() {
        let link = Link::new(2, 1, 1);
        assert_eq!(Change::created(link).id(), Some(2));
        assert_eq!(Change::deleted(link).id(), Some(2));
        assert_eq!(Change::updated(link, Link::new(2, 5, 5)).id(), Some(2));
    }

    #[test]
    fn test_closure_is_change_handler() {
        let mut seen = Vec::new();
        {
            let mut handler = |c: &Change| seen.push(*c);
            let observer: &mut dyn ChangeHandler = &mut handler;
            observer.handle(&Change::created(Link::new(1, 2, 3)));
        }
        assert_eq!(seen.len(), 1);
    }

    #[test]
    fn test_validation_messages() {
        assert_eq!(
            ValidationError::RestrictionRequired("update").to_string(),
            "Restriction required for update"
        );
    }
}
