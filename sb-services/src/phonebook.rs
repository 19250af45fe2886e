//! Phonebook manager: the synchronous public API.
//!
//! Each operation runs: capability check, dispatch-context guard, domain
//! lock, EF translation against the tracked card generation, issue through
//! the record-cache facade, then a blocking wait for the completion. Card
//! and store failures degrade to default results with a logged warning;
//! permission and threading misuse are hard errors.

use std::sync::Arc;

use tracing::{debug, warn};

use sb_core::config::PhonebookConfig;
use sb_core::constants::capabilities;
use sb_core::error::{SbError, SbResult};
use sb_records::{translate_for_generation, AdnRecord, EfId, RecordFileInfo};

use crate::bridge::Bridge;
use crate::cache::RecordCacheFacade;
use crate::card::{CardTracker, UiccCard};
use crate::store::CountKind;

/// Operation categories the environment's capability check distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    /// Reading phonebook records, capacities, and counts.
    ReadPhonebook,
    /// Writing phonebook records.
    WritePhonebook,
}

impl Permission {
    /// Capability name reported in failures.
    pub fn capability(self) -> &'static str {
        match self {
            Permission::ReadPhonebook => capabilities::READ_PHONEBOOK,
            Permission::WritePhonebook => capabilities::WRITE_PHONEBOOK,
        }
    }
}

/// Environment-supplied capability check.
pub trait PermissionChecker: Send + Sync {
    /// Whether the current caller holds the given capability.
    fn check(&self, permission: Permission) -> bool;
}

/// Checker granting everything; used by the CLI and tests.
pub struct AllowAll;

impl PermissionChecker for AllowAll {
    fn check(&self, _: Permission) -> bool {
        true
    }
}

/// State protected by the manager's shared domain.
struct PhonebookState {
    tracker: CardTracker,
    cache: RecordCacheFacade,
}

/// Synchronous phonebook access over asynchronous card completions.
pub struct PhonebookManager {
    bridge: Bridge<PhonebookState>,
    permissions: Arc<dyn PermissionChecker>,
}

impl PhonebookManager {
    /// Create a manager with default options.
    pub fn new(permissions: Arc<dyn PermissionChecker>) -> Self {
        Self::with_config(permissions, &PhonebookConfig::default())
    }

    /// Create a manager honoring the given configuration.
    pub fn with_config(permissions: Arc<dyn PermissionChecker>, config: &PhonebookConfig) -> Self {
        let state = PhonebookState {
            tracker: CardTracker::new(),
            cache: RecordCacheFacade::new(),
        };
        Self {
            bridge: Bridge::with_options(state, config.allow_ops_on_dispatch_context),
            permissions,
        }
    }

    /// Register the calling thread as the completion-dispatch context.
    pub fn bind_dispatch_thread(&self) {
        self.bridge.bind_dispatch_thread();
    }

    /// Apply a card-change notification.
    ///
    /// Delivered on the dispatch context. Re-selects the application,
    /// reclassifies the generation, and rebinds or clears the record-cache
    /// facade, all under the shared domain. In-flight waits are untouched;
    /// their completions still resolve through the issued requests.
    pub fn on_card_changed(&self, card: Option<&UiccCard>) {
        let mut state = self.bridge.lock();
        state.tracker.on_card_changed(card);
        match state.tracker.current_store() {
            Some(store) => state.cache.bind(store),
            None => state.cache.unbind(),
        }
    }

    /// Load every record in the given file.
    ///
    /// Returns an empty list when no application is selected or the load
    /// fails on the card.
    pub fn records(&self, ef: EfId) -> SbResult<Vec<AdnRecord>> {
        self.require(Permission::ReadPhonebook)?;
        self.bridge.ensure_callable()?;

        let mut state = self.bridge.lock();
        let physical = translate(&state, ef);
        if !state.cache.is_bound() {
            warn!("cannot load {physical}: no application selected");
            return Ok(Vec::new());
        }

        let (pending, completion) = self.bridge.pending();
        state.cache.load_all(physical, completion);
        match self.bridge.wait(&mut state, pending) {
            Ok(records) => Ok(records),
            Err(e) => {
                warn!("loading {physical} failed: {e}");
                Ok(Vec::new())
            }
        }
    }

    /// Replace the record content-matching `old` with `new`.
    ///
    /// An all-empty `old` inserts `new` into the first free slot; an
    /// all-empty `new` deletes the matched record. `auth` is the code
    /// required for fixed-dialing updates and must be None otherwise.
    pub fn update_by_search(
        &self,
        ef: EfId,
        old: AdnRecord,
        new: AdnRecord,
        auth: Option<&str>,
    ) -> SbResult<bool> {
        self.require(Permission::WritePhonebook)?;
        self.bridge.ensure_callable()?;
        debug!("update_by_search: {ef} ({old}) ==> ({new})");

        let mut state = self.bridge.lock();
        let physical = translate(&state, ef);
        if !state.cache.is_bound() {
            warn!("cannot update {physical} by search: no application selected");
            return Ok(false);
        }
        if let Err(e) = state.cache.check_auth(physical, auth) {
            warn!("rejected update on {physical}: {e}");
            return Ok(false);
        }

        let (pending, completion) = self.bridge.pending();
        state.cache.update_by_search(physical, old, new, auth.map(str::to_owned), completion);
        self.finish_update(&mut state, pending, physical, "search")
    }

    /// Replace the record at the 1-based `index` unconditionally.
    pub fn update_by_index(
        &self,
        ef: EfId,
        new: AdnRecord,
        index: usize,
        auth: Option<&str>,
    ) -> SbResult<bool> {
        self.require(Permission::WritePhonebook)?;
        self.bridge.ensure_callable()?;
        debug!("update_by_index: {ef} #{index} ==> ({new})");

        let mut state = self.bridge.lock();
        let physical = translate(&state, ef);
        if !state.cache.is_bound() {
            warn!("cannot update {physical} by index: no application selected");
            return Ok(false);
        }
        if let Err(e) = state.cache.check_auth(physical, auth) {
            warn!("rejected update on {physical}: {e}");
            return Ok(false);
        }

        let (pending, completion) = self.bridge.pending();
        state.cache.update_by_index(physical, new, index, auth.map(str::to_owned), completion);
        self.finish_update(&mut state, pending, physical, "index")
    }

    /// Query the capacity triple of the given file.
    ///
    /// Returns a zeroed triple when no application is selected or the
    /// query fails on the card.
    pub fn capacity(&self, ef: EfId) -> SbResult<RecordFileInfo> {
        self.require(Permission::ReadPhonebook)?;
        self.bridge.ensure_callable()?;

        let mut state = self.bridge.lock();
        let physical = translate(&state, ef);
        if !state.cache.is_bound() {
            warn!("cannot query capacity of {physical}: no application selected");
            return Ok(RecordFileInfo::default());
        }

        let (pending, completion) = self.bridge.pending();
        state.cache.capacity(physical, completion);
        match self.bridge.wait(&mut state, pending) {
            Ok(info) => {
                debug!("{physical}: {info}");
                Ok(info)
            }
            Err(e) => {
                warn!("capacity query on {physical} failed: {e}");
                Ok(RecordFileInfo::default())
            }
        }
    }

    /// Resolve a count query from cached metadata, without blocking.
    pub fn count(&self, kind: CountKind) -> SbResult<usize> {
        self.require(Permission::ReadPhonebook)?;
        let state = self.bridge.lock();
        Ok(state.cache.count(kind))
    }

    fn require(&self, permission: Permission) -> SbResult<()> {
        if self.permissions.check(permission) {
            Ok(())
        } else {
            Err(SbError::Permission(format!(
                "{} capability required",
                permission.capability()
            )))
        }
    }

    fn finish_update(
        &self,
        state: &mut crate::bridge::DomainGuard<'_, PhonebookState>,
        pending: crate::bridge::Pending<()>,
        physical: EfId,
        how: &str,
    ) -> SbResult<bool> {
        match self.bridge.wait(state, pending) {
            Ok(()) => Ok(true),
            Err(e) => {
                warn!("update by {how} on {physical} failed: {e}");
                Ok(false)
            }
        }
    }
}

/// Map the logical file to the physical one for the tracked generation.
fn translate(state: &PhonebookState, ef: EfId) -> EfId {
    let physical = translate_for_generation(ef, state.tracker.generation());
    if physical != ef {
        debug!("translated {ef} to {physical} for a modern card");
    }
    physical
}
