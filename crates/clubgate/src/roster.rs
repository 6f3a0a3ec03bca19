//! Roster loader.
//!
//! # Format
//!
//! Whitespace-separated records of four fields:
//!
//! ```text
//! 1 M 0 3
//! 2 F 1 5
//! 3 M 0 2
//! ```
//!
//! | Field | Meaning |
//! |-------|---------|
//! | id | integer identifier |
//! | tag | `F`/`P` Primary, `M`/`C` Constrained |
//! | delay | ticks after the previous arrival |
//! | residency | ticks spent inside |
//!
//! Line breaks carry no meaning. Reading stops at the first incomplete or
//! malformed record, or at invalid UTF-8, and keeps everything before it.
//! Records past the cap are dropped.

use std::path::Path;

use crate::error::{Result, VenueError};
use crate::patron::{Patron, PatronClass};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Roster {
    patrons: Vec<Patron>,
    dropped: usize,
    truncated: bool,
}

impl Roster {
    pub fn parse(input: &str, max_patrons: usize) -> Self {
        let mut roster = Roster::default();
        let mut tokens = input.split_whitespace();

        loop {
            let fields: Vec<&str> = tokens.by_ref().take(4).collect();
            if fields.is_empty() {
                break;
            }
            let Some(patron) = parse_record(&fields) else {
                tracing::warn!(
                    record = roster.patrons.len() + roster.dropped + 1,
                    fields = ?fields,
                    "Malformed roster record - ignoring the rest of the input"
                );
                roster.truncated = true;
                break;
            };

            if roster.patrons.len() < max_patrons {
                roster.patrons.push(patron);
            } else {
                roster.dropped += 1;
            }
        }

        if roster.dropped > 0 {
            tracing::warn!(
                max_patrons,
                dropped = roster.dropped,
                "Roster cap reached - dropping remaining records"
            );
        }

        roster
    }

    pub fn load(path: impl AsRef<Path>, max_patrons: usize) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|source| VenueError::Input {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::parse_bytes(&bytes, max_patrons))
    }

    /// Parse raw roster bytes. Input past the first invalid UTF-8 sequence is
    /// treated like a malformed record.
    pub fn parse_bytes(bytes: &[u8], max_patrons: usize) -> Self {
        match std::str::from_utf8(bytes) {
            Ok(input) => Self::parse(input, max_patrons),
            Err(e) => {
                let valid = &bytes[..e.valid_up_to()];
                // `valid_up_to` ends on a char boundary.
                let input = std::str::from_utf8(valid).unwrap_or_default();
                let mut roster = Self::parse(input, max_patrons);
                if !roster.truncated {
                    tracing::warn!(
                        offset = e.valid_up_to(),
                        "Invalid UTF-8 in roster - ignoring the rest of the input"
                    );
                    roster.truncated = true;
                }
                roster
            }
        }
    }

    pub fn patrons(&self) -> &[Patron] {
        &self.patrons
    }

    pub fn into_patrons(self) -> Vec<Patron> {
        self.patrons
    }

    pub fn len(&self) -> usize {
        self.patrons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patrons.is_empty()
    }

    /// Well-formed records past the cap.
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    /// Log the roster: a summary at info, one row per patron at debug.
    pub fn log(&self) {
        tracing::info!(
            patrons = self.patrons.len(),
            dropped = self.dropped,
            truncated = self.truncated,
            "Roster loaded"
        );
        for patron in &self.patrons {
            tracing::debug!("{patron}");
        }
    }
}

fn parse_record(fields: &[&str]) -> Option<Patron> {
    let [id, tag, delay, residency] = fields else {
        return None;
    };

    let id = id.parse::<i64>().ok()?;
    let mut chars = tag.chars();
    let class = match (chars.next(), chars.next()) {
        (Some(c), None) => PatronClass::from_tag(c)?,
        _ => return None,
    };
    let delay = delay.parse::<u64>().ok()?;
    let residency = residency.parse::<u64>().ok()?;

    Some(Patron::new(id, class, delay, residency))
}
