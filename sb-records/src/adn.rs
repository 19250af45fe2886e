//! Abbreviated-dialing record model.

use serde::{Deserialize, Serialize};

use crate::ef::EfId;

/// A phonebook entry stored in an ADN-like elementary file.
///
/// Records are identified by their owning file and 1-based index. A record
/// whose content is entirely empty represents a free (or deleted) slot; the
/// slot itself is never removed from the file. The `anrs` and `emails`
/// lists keep their slot shape: unused sub-slots are empty strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdnRecord {
    /// Owning elementary file. `EfId::UNSET` until the record is bound.
    #[serde(default = "EfId::unset")]
    pub ef: EfId,
    /// 1-based record index within the file. 0 until the record is bound.
    #[serde(default)]
    pub index: usize,
    /// Display name (alpha tag).
    #[serde(default)]
    pub tag: String,
    /// Primary phone number.
    #[serde(default)]
    pub number: String,
    /// Secondary phone numbers ("anr"), one per sub-slot.
    #[serde(default)]
    pub anrs: Vec<String>,
    /// Email addresses, one per sub-slot.
    #[serde(default)]
    pub emails: Vec<String>,
}

impl AdnRecord {
    /// Create an unbound record with a tag and number only.
    pub fn new(tag: impl Into<String>, number: impl Into<String>) -> Self {
        Self {
            ef: EfId::unset(),
            index: 0,
            tag: tag.into(),
            number: number.into(),
            anrs: Vec::new(),
            emails: Vec::new(),
        }
    }

    /// Create an unbound record with secondary numbers and emails.
    pub fn with_slots(
        tag: impl Into<String>,
        number: impl Into<String>,
        anrs: Vec<String>,
        emails: Vec<String>,
    ) -> Self {
        Self {
            ef: EfId::unset(),
            index: 0,
            tag: tag.into(),
            number: number.into(),
            anrs,
            emails,
        }
    }

    /// An entirely empty record, i.e. a free slot.
    pub fn empty() -> Self {
        Self::new("", "")
    }

    /// Bind this record to a file and 1-based index.
    pub fn bound_to(mut self, ef: EfId, index: usize) -> Self {
        self.ef = ef;
        self.index = index;
        self
    }

    /// Whether this record carries no content at all.
    ///
    /// An empty record written to an occupied slot deletes the entry there;
    /// an empty record passed as the "old" side of a search update means
    /// "insert into the first free slot".
    pub fn is_empty(&self) -> bool {
        self.tag.is_empty()
            && self.number.is_empty()
            && self.anrs.iter().all(|a| a.is_empty())
            && self.emails.iter().all(|e| e.is_empty())
    }

    /// Whether this record's content matches another's.
    ///
    /// Used to locate the target of an update-by-search. Slot padding is
    /// ignored: only non-empty secondary numbers and emails participate,
    /// so a caller-built record matches a cached one regardless of how
    /// many unused sub-slots the file carries.
    pub fn content_matches(&self, other: &AdnRecord) -> bool {
        self.tag == other.tag
            && self.number == other.number
            && occupied(&self.anrs) == occupied(&other.anrs)
            && occupied(&self.emails) == occupied(&other.emails)
    }

    /// Count of occupied secondary-number sub-slots.
    pub fn used_anr_slots(&self) -> usize {
        occupied(&self.anrs).len()
    }

    /// Count of occupied email sub-slots.
    pub fn used_email_slots(&self) -> usize {
        occupied(&self.emails).len()
    }
}

fn occupied(slots: &[String]) -> Vec<&str> {
    slots.iter().filter(|s| !s.is_empty()).map(String::as_str).collect()
}

impl std::fmt::Display for AdnRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_empty() {
            return write!(f, "#{} <free>", self.index);
        }
        write!(f, "#{} '{}' {}", self.index, self.tag, self.number)?;
        for anr in occupied(&self.anrs) {
            write!(f, " anr:{anr}")?;
        }
        for email in occupied(&self.emails) {
            write!(f, " email:{email}")?;
        }
        Ok(())
    }
}

/// Capacity metadata for one record file.
///
/// Mirrors the triple reported by the card: single record length in bytes,
/// total file length, and the number of record slots.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordFileInfo {
    /// Encoded length of a single record in bytes.
    pub record_len: usize,
    /// Total length of the file in bytes.
    pub file_len: usize,
    /// Number of record slots in the file.
    pub record_count: usize,
}

impl std::fmt::Display for RecordFileInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} records x {} bytes ({} bytes total)",
            self.record_count, self.record_len, self.file_len
        )
    }
}
