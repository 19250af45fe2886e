//! Card application tracking.
//!
//! Keeps the manager pointed at a valid application on the active card.
//! Every card-change notification re-enumerates the card's applications,
//! reclassifies the card generation, and either retains the previous
//! selection (when still present) or picks a fresh eligible application.

use std::sync::Arc;

use tracing::{debug, info, warn};

use sb_records::{AppType, CardGeneration};

use crate::store::CardStore;

/// One logical application hosted on the active card.
#[derive(Clone)]
pub struct UiccCardApplication {
    /// Opaque application identifier, stable across re-enumerations.
    pub aid: String,
    /// Application type.
    pub app_type: AppType,
    /// Record-file access handle owned by this application.
    pub store: Arc<dyn CardStore>,
}

impl std::fmt::Debug for UiccCardApplication {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UiccCardApplication")
            .field("aid", &self.aid)
            .field("app_type", &self.app_type)
            .finish()
    }
}

/// The active card: an ordered list of applications.
#[derive(Debug, Clone)]
pub struct UiccCard {
    pub applications: Vec<UiccCardApplication>,
}

impl UiccCard {
    pub fn new(applications: Vec<UiccCardApplication>) -> Self {
        Self { applications }
    }
}

/// Outcome of applying the selection policy to one application list.
#[derive(Debug, Clone)]
pub struct Selection {
    /// The application to use, or None when no eligible one exists.
    pub app: Option<UiccCardApplication>,
    /// Generation of the card as a whole.
    pub generation: CardGeneration,
    /// Whether the previous selection survived the refresh.
    pub retained: bool,
}

/// Selection policy: keep the previous application if it is still present,
/// otherwise pick the first application with a recognized type.
///
/// Generation always reflects the full fresh enumeration, so it can change
/// even when the selected application does not.
pub fn select_application(
    apps: &[UiccCardApplication],
    previous_aid: Option<&str>,
) -> Selection {
    let generation = CardGeneration::classify(apps.iter().map(|a| a.app_type));

    if let Some(prev) = previous_aid {
        if let Some(app) = apps.iter().find(|a| a.aid == prev) {
            return Selection { app: Some(app.clone()), generation, retained: true };
        }
    }

    let app = apps.iter().find(|a| a.app_type != AppType::Unknown).cloned();
    Selection { app, generation, retained: false }
}

/// Tracks the currently selected application and card generation.
#[derive(Debug, Default)]
pub struct CardTracker {
    current: Option<UiccCardApplication>,
    generation: CardGeneration,
}

impl CardTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a card-change notification.
    ///
    /// Idempotent: repeating the same notification leaves the selection
    /// unchanged. The selection never references an application absent
    /// from the latest enumeration.
    pub fn on_card_changed(&mut self, card: Option<&UiccCard>) {
        let Some(card) = card else {
            if self.current.is_some() {
                info!("card removed, clearing application selection");
            }
            self.current = None;
            self.generation = CardGeneration::Legacy;
            return;
        };

        let selection = select_application(
            &card.applications,
            self.current.as_ref().map(|a| a.aid.as_str()),
        );
        self.generation = selection.generation;
        match (&selection.app, selection.retained) {
            (Some(app), true) => debug!("existing application {} retained", app.aid),
            (Some(app), false) => {
                info!("selected application {} ({}, {} card)", app.aid, app.app_type, self.generation);
            }
            (None, _) => warn!("no eligible application on card"),
        }
        self.current = selection.app;
    }

    /// The selected application's record store, if any.
    pub fn current_store(&self) -> Option<Arc<dyn CardStore>> {
        self.current.as_ref().map(|a| a.store.clone())
    }

    /// The selected application's identifier, if any.
    pub fn current_aid(&self) -> Option<&str> {
        self.current.as_ref().map(|a| a.aid.as_str())
    }

    /// Generation of the active card. Legacy when no card is present.
    pub fn generation(&self) -> CardGeneration {
        self.generation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sb_records::{AdnRecord, EfId, RecordFileInfo};
    use crate::bridge::Completion;
    use crate::store::SlotCounts;

    struct StubStore;

    impl CardStore for StubStore {
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
            None
        }
    }

    fn app(aid: &str, app_type: AppType) -> UiccCardApplication {
        UiccCardApplication {
            aid: aid.to_string(),
            app_type,
            store: Arc::new(StubStore),
        }
    }

    #[test]
    fn test_selects_first_recognized_application() {
        let apps = [app("a1", AppType::Unknown), app("a2", AppType::Sim), app("a3", AppType::Usim)];
        let selection = select_application(&apps, None);
        assert_eq!(selection.app.unwrap().aid, "a2");
        assert_eq!(selection.generation, CardGeneration::Modern);
        assert!(!selection.retained);
    }

    #[test]
    fn test_retains_previous_application() {
        let apps = [app("a1", AppType::Sim), app("a2", AppType::Usim)];
        let selection = select_application(&apps, Some("a2"));
        assert_eq!(selection.app.unwrap().aid, "a2");
        assert!(selection.retained);
    }

    #[test]
    fn test_vanished_previous_falls_back_to_first_valid() {
        let apps = [app("a3", AppType::Sim)];
        let selection = select_application(&apps, Some("a2"));
        assert_eq!(selection.app.unwrap().aid, "a3");
        assert!(!selection.retained);
    }

    #[test]
    fn test_no_eligible_application() {
        let apps = [app("a1", AppType::Unknown)];
        let selection = select_application(&apps, Some("a2"));
        assert!(selection.app.is_none());
        assert_eq!(selection.generation, CardGeneration::Legacy);
    }

    #[test]
    fn test_usim_isim_card_is_modern() {
        let apps = [app("u1", AppType::Usim), app("i1", AppType::Isim)];
        let selection = select_application(&apps, None);
        assert_eq!(selection.generation, CardGeneration::Modern);
        assert_eq!(selection.app.unwrap().aid, "u1");
    }

    #[test]
    fn test_tracker_card_removed() {
        let mut tracker = CardTracker::new();
        let card = UiccCard::new(vec![app("a1", AppType::Usim)]);
        tracker.on_card_changed(Some(&card));
        assert_eq!(tracker.current_aid(), Some("a1"));
        assert_eq!(tracker.generation(), CardGeneration::Modern);

        tracker.on_card_changed(None);
        assert!(tracker.current_aid().is_none());
        assert!(tracker.current_store().is_none());
        assert_eq!(tracker.generation(), CardGeneration::Legacy);
    }

    #[test]
    fn test_tracker_idempotent_notifications() {
        let mut tracker = CardTracker::new();
        let card = UiccCard::new(vec![app("a1", AppType::Sim), app("a2", AppType::Usim)]);
        tracker.on_card_changed(Some(&card));
        let selected = tracker.current_aid().map(str::to_owned);

        tracker.on_card_changed(Some(&card));
        assert_eq!(tracker.current_aid().map(str::to_owned), selected);
    }

    #[test]
    fn test_generation_changes_while_selection_survives() {
        let mut tracker = CardTracker::new();
        let legacy = UiccCard::new(vec![app("a1", AppType::Sim)]);
        tracker.on_card_changed(Some(&legacy));
        assert_eq!(tracker.generation(), CardGeneration::Legacy);

        // Same application, but an ISIM appeared alongside it.
        let upgraded = UiccCard::new(vec![app("a1", AppType::Sim), app("a2", AppType::Isim)]);
        tracker.on_card_changed(Some(&upgraded));
        assert_eq!(tracker.current_aid(), Some("a1"));
        assert_eq!(tracker.generation(), CardGeneration::Modern);
    }

    #[test]
    fn test_tracker_clears_when_no_eligible_app_remains() {
        let mut tracker = CardTracker::new();
        let card = UiccCard::new(vec![app("a1", AppType::Usim)]);
        tracker.on_card_changed(Some(&card));

        let unknown_only = UiccCard::new(vec![app("x1", AppType::Unknown)]);
        tracker.on_card_changed(Some(&unknown_only));
        assert!(tracker.current_aid().is_none());
        assert!(tracker.current_store().is_none());
    }
}
