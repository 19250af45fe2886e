//! The record-file access seam.
//!
//! `CardStore` is the lower-level collaborator that actually talks to the
//! card: it accepts issued requests, eventually resolves their completion
//! tokens from its own dispatch context, and keeps its per-application
//! record cache fresh before signaling update completions. This layer never
//! sees file bytes; the store hands it structured records.

use sb_records::{AdnRecord, EfId, RecordFileInfo};

use crate::bridge::Completion;

/// Cached phonebook slot metadata, readable without an async round-trip.
///
/// Populated by the store once it has loaded the phonebook file; absent
/// until then.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SlotCounts {
    /// Total abbreviated-dialing record slots.
    pub adn_slots: usize,
    /// Occupied abbreviated-dialing record slots.
    pub used_adn_slots: usize,
    /// Total secondary-number sub-slots across all records.
    pub anr_slots: usize,
    /// Occupied secondary-number sub-slots.
    pub used_anr_slots: usize,
    /// Total email sub-slots across all records.
    pub email_slots: usize,
    /// Occupied email sub-slots.
    pub used_email_slots: usize,
}

/// Which phonebook quantity a count query asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountKind {
    /// Total record slots.
    Records,
    /// Total secondary-number sub-slots.
    SecondaryNumbers,
    /// Total email sub-slots.
    Emails,
    /// Unoccupied secondary-number sub-slots.
    SpareSecondaryNumbers,
    /// Unoccupied email sub-slots.
    SpareEmails,
}

impl SlotCounts {
    /// Resolve one count kind against this metadata.
    pub fn get(&self, kind: CountKind) -> usize {
        match kind {
            CountKind::Records => self.adn_slots,
            CountKind::SecondaryNumbers => self.anr_slots,
            CountKind::Emails => self.email_slots,
            CountKind::SpareSecondaryNumbers => {
                self.anr_slots.saturating_sub(self.used_anr_slots)
            }
            CountKind::SpareEmails => self.email_slots.saturating_sub(self.used_email_slots),
        }
    }
}

/// Asynchronous record-file access owned by a card application.
///
/// Every `request_*` method returns immediately; the outcome arrives
/// through the handed-in completion token, delivered on the store's
/// dispatch context. A store accepting an update must refresh its own
/// cached contents before resolving the token.
pub trait CardStore: Send + Sync {
    /// Load every record in `ef`, plus its continuation file if `ext` is
    /// given.
    fn request_load_all(&self, ef: EfId, ext: Option<EfId>, done: Completion<Vec<AdnRecord>>);

    /// Replace the record content-matching `old` with `new`. An all-empty
    /// `old` inserts `new` into the first free slot; an all-empty `new`
    /// deletes the matched record.
    fn request_update_by_search(
        &self,
        ef: EfId,
        old: AdnRecord,
        new: AdnRecord,
        auth: Option<String>,
        done: Completion<()>,
    );

    /// Replace the record at the 1-based `index` unconditionally.
    fn request_update_by_index(
        &self,
        ef: EfId,
        new: AdnRecord,
        index: usize,
        auth: Option<String>,
        done: Completion<()>,
    );

    /// Query the capacity triple of `ef`.
    fn request_capacity(&self, ef: EfId, done: Completion<RecordFileInfo>);

    /// Cached phonebook metadata, or None until a load has populated it.
    fn cached_counts(&self) -> Option<SlotCounts>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_counts_get() {
        let counts = SlotCounts {
            adn_slots: 20,
            used_adn_slots: 3,
            anr_slots: 40,
            used_anr_slots: 5,
            email_slots: 40,
            used_email_slots: 2,
        };
        assert_eq!(counts.get(CountKind::Records), 20);
        assert_eq!(counts.get(CountKind::SecondaryNumbers), 40);
        assert_eq!(counts.get(CountKind::Emails), 40);
        assert_eq!(counts.get(CountKind::SpareSecondaryNumbers), 35);
        assert_eq!(counts.get(CountKind::SpareEmails), 38);
    }

    #[test]
    fn test_spare_counts_saturate() {
        let counts = SlotCounts {
            anr_slots: 2,
            used_anr_slots: 5,
            ..SlotCounts::default()
        };
        assert_eq!(counts.get(CountKind::SpareSecondaryNumbers), 0);
    }
}
