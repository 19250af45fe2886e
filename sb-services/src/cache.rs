//! Typed facade over the selected application's record cache.
//!
//! Bound to the current application's `CardStore` by the card tracker
//! path. Issue methods hand the request to the store together with a
//! completion token; count queries answer synchronously from the store's
//! cached metadata.

use std::sync::Arc;

use tracing::warn;

use sb_core::error::{SbError, SbResult};
use sb_records::{AdnRecord, EfId, RecordFileInfo};

use crate::bridge::Completion;
use crate::store::{CardStore, CountKind};

/// Facade over the live per-application record cache.
#[derive(Default)]
pub struct RecordCacheFacade {
    store: Option<Arc<dyn CardStore>>,
}

impl RecordCacheFacade {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind to the selected application's store.
    pub fn bind(&mut self, store: Arc<dyn CardStore>) {
        self.store = Some(store);
    }

    /// Drop the binding (card removed or no eligible application).
    pub fn unbind(&mut self) {
        self.store = None;
    }

    /// Whether a store is currently bound.
    pub fn is_bound(&self) -> bool {
        self.store.is_some()
    }

    /// Validate the auth-code rule for an update on `ef`.
    ///
    /// An auth code is required exactly when the target is the
    /// fixed-dialing file; for every other file it must be absent.
    pub fn check_auth(&self, ef: EfId, auth: Option<&str>) -> SbResult<()> {
        match (ef == EfId::FDN, auth) {
            (true, None) => Err(SbError::Argument(format!("{ef} update requires an auth code"))),
            (false, Some(_)) => {
                Err(SbError::Argument(format!("auth code must be absent for {ef}")))
            }
            _ => Ok(()),
        }
    }

    /// Request every record in `ef` plus its continuation file.
    pub fn load_all(&self, ef: EfId, done: Completion<Vec<AdnRecord>>) {
        match &self.store {
            Some(store) => store.request_load_all(ef, ef.extension(), done),
            None => warn!("load of {ef} issued with no bound cache"),
        }
    }

    /// Request a content-matched record replacement.
    pub fn update_by_search(
        &self,
        ef: EfId,
        old: AdnRecord,
        new: AdnRecord,
        auth: Option<String>,
        done: Completion<()>,
    ) {
        match &self.store {
            Some(store) => store.request_update_by_search(ef, old, new, auth, done),
            None => warn!("update-by-search on {ef} issued with no bound cache"),
        }
    }

    /// Request a record replacement at a 1-based index.
    pub fn update_by_index(
        &self,
        ef: EfId,
        new: AdnRecord,
        index: usize,
        auth: Option<String>,
        done: Completion<()>,
    ) {
        match &self.store {
            Some(store) => store.request_update_by_index(ef, new, index, auth, done),
            None => warn!("update-by-index on {ef} issued with no bound cache"),
        }
    }

    /// Request the capacity triple of `ef`.
    pub fn capacity(&self, ef: EfId, done: Completion<RecordFileInfo>) {
        match &self.store {
            Some(store) => store.request_capacity(ef, done),
            None => warn!("capacity query on {ef} issued with no bound cache"),
        }
    }

    /// Resolve a count query from cached metadata.
    ///
    /// Answers zero with a logged failure when no store is bound or the
    /// store's cache has not been populated by a load yet.
    pub fn count(&self, kind: CountKind) -> usize {
        let Some(store) = &self.store else {
            warn!("count query {kind:?} with no bound cache");
            return 0;
        };
        match store.cached_counts() {
            Some(counts) => counts.get(kind),
            None => {
                warn!("count query {kind:?} before the phonebook cache was populated");
                0
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SlotCounts;

    struct CountsOnlyStore {
        counts: Option<SlotCounts>,
    }

    impl CardStore for CountsOnlyStore {
        fn request_load_all(&self, _: EfId, _: Option<EfId>, done: Completion<Vec<AdnRecord>>) {
            done.succeed(Vec::new());
        }
        fn request_update_by_search(
            &self,
            _: EfId,
            _: AdnRecord,
            _: AdnRecord,
            _: Option<String>,
            done: Completion<()>,
        ) {
            done.succeed(());
        }
        fn request_update_by_index(
            &self,
            _: EfId,
            _: AdnRecord,
            _: usize,
            _: Option<String>,
            done: Completion<()>,
        ) {
            done.succeed(());
        }
        fn request_capacity(&self, _: EfId, done: Completion<RecordFileInfo>) {
            done.succeed(RecordFileInfo::default());
        }
        fn cached_counts(&self) -> Option<SlotCounts> {
            self.counts
        }
    }

    #[test]
    fn test_auth_rule() {
        let facade = RecordCacheFacade::new();
        assert!(facade.check_auth(EfId::FDN, Some("1234")).is_ok());
        assert!(facade.check_auth(EfId::ADN, None).is_ok());
        assert!(matches!(
            facade.check_auth(EfId::FDN, None),
            Err(SbError::Argument(_))
        ));
        assert!(matches!(
            facade.check_auth(EfId::ADN, Some("1234")),
            Err(SbError::Argument(_))
        ));
    }

    #[test]
    fn test_counts_unbound_report_zero() {
        let facade = RecordCacheFacade::new();
        assert!(!facade.is_bound());
        assert_eq!(facade.count(CountKind::Records), 0);
        assert_eq!(facade.count(CountKind::SpareEmails), 0);
    }

    #[test]
    fn test_counts_before_population_report_zero() {
        let mut facade = RecordCacheFacade::new();
        facade.bind(Arc::new(CountsOnlyStore { counts: None }));
        assert!(facade.is_bound());
        assert_eq!(facade.count(CountKind::Records), 0);
    }

    #[test]
    fn test_counts_from_cached_metadata() {
        let mut facade = RecordCacheFacade::new();
        facade.bind(Arc::new(CountsOnlyStore {
            counts: Some(SlotCounts {
                adn_slots: 10,
                used_adn_slots: 4,
                anr_slots: 20,
                used_anr_slots: 6,
                email_slots: 20,
                used_email_slots: 1,
            }),
        }));
        assert_eq!(facade.count(CountKind::Records), 10);
        assert_eq!(facade.count(CountKind::SecondaryNumbers), 20);
        assert_eq!(facade.count(CountKind::SpareSecondaryNumbers), 14);
        assert_eq!(facade.count(CountKind::Emails), 20);
        assert_eq!(facade.count(CountKind::SpareEmails), 19);
    }

    #[test]
    fn test_unbind() {
        let mut facade = RecordCacheFacade::new();
        facade.bind(Arc::new(CountsOnlyStore { counts: Some(SlotCounts::default()) }));
        facade.unbind();
        assert!(!facade.is_bound());
    }
}
