//! Patron records and class tags.

use std::fmt;

use serde::Serialize;

/// Identifier as written in the roster. Not required to be unique.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct PatronId(pub i64);

impl fmt::Display for PatronId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// The two patron classes.
///
/// Constrained-class occupancy is bounded by `ratio * primary`; Primary-class
/// patrons are never held back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PatronClass {
    Primary,
    Constrained,
}

impl PatronClass {
    /// Parse a roster tag. `F`/`P` are Primary, `M`/`C` are Constrained.
    pub fn from_tag(tag: char) -> Option<Self> {
        match tag {
            'F' | 'P' => Some(PatronClass::Primary),
            'M' | 'C' => Some(PatronClass::Constrained),
            _ => None,
        }
    }

    /// Canonical roster tag, also used in the event stream.
    pub fn tag(&self) -> char {
        match self {
            PatronClass::Primary => 'F',
            PatronClass::Constrained => 'M',
        }
    }
}

impl fmt::Display for PatronClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tag())
    }
}

/// One roster record. `delay` and `residency` are in ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Patron {
    pub id: PatronId,
    pub class: PatronClass,
    /// Ticks to wait after the previous spawn before this patron arrives.
    pub delay: u64,
    /// Ticks spent inside the venue.
    pub residency: u64,
}

impl Patron {
    pub fn new(id: i64, class: PatronClass, delay: u64, residency: u64) -> Self {
        Self {
            id: PatronId(id),
            class,
            delay,
            residency,
        }
    }

    pub fn primary(id: i64, delay: u64, residency: u64) -> Self {
        Self::new(id, PatronClass::Primary, delay, residency)
    }

    pub fn constrained(id: i64, delay: u64, residency: u64) -> Self {
        Self::new(id, PatronClass::Constrained, delay, residency)
    }
}

impl fmt::Display for Patron {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:>3} {:>3} {:>3} {:>3}",
            self.id,
            self.class.tag(),
            self.delay,
            self.residency
        )
    }
}
