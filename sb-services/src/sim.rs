//! In-memory card simulation.
//!
//! Stands in for the modem/radio stack: a single worker thread owns request
//! processing and is the completion-dispatch context for the manager it is
//! attached to. Requests arrive over a channel, mutate the card's record
//! files, and resolve their completion tokens from the worker thread, the
//! same way real card completions arrive on a radio callback context.

use std::collections::HashMap;
use std::sync::mpsc;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use sb_core::config::CardConfig;
use sb_core::error::{SbError, SbResult};
use sb_records::{AdnRecord, AppType, EfId, RecordFileInfo};

use crate::bridge::Completion;
use crate::card::{UiccCard, UiccCardApplication};
use crate::phonebook::PhonebookManager;
use crate::store::{CardStore, SlotCounts};

/// Shape of the simulated card.
#[derive(Debug, Clone)]
pub struct SimCardProfile {
    /// Application types hosted on the card, in enumeration order.
    pub applications: Vec<AppType>,
    /// Abbreviated-dialing record slots.
    pub adn_slots: usize,
    /// Fixed-dialing record slots.
    pub fdn_slots: usize,
    /// Secondary-number sub-slots per phonebook record.
    pub anr_slots: usize,
    /// Email sub-slots per phonebook record.
    pub email_slots: usize,
    /// Encoded record length reported by capacity queries.
    pub record_len: usize,
    /// PIN2 required for fixed-dialing updates.
    pub pin2: String,
    /// Artificial completion latency.
    pub latency_ms: u64,
    /// Records pre-loaded into the phonebook, starting at slot 1.
    pub seed_records: Vec<AdnRecord>,
}

impl SimCardProfile {
    /// A modern card hosting USIM and ISIM applications.
    pub fn usim() -> Self {
        Self {
            applications: vec![AppType::Usim, AppType::Isim],
            adn_slots: 20,
            fdn_slots: 10,
            anr_slots: 2,
            email_slots: 2,
            record_len: 34,
            pin2: "1234".to_string(),
            latency_ms: 0,
            seed_records: Vec::new(),
        }
    }

    /// A legacy card hosting a single SIM application.
    pub fn sim() -> Self {
        Self {
            applications: vec![AppType::Sim],
            ..Self::usim()
        }
    }

    /// Build a profile from the card section of the configuration file.
    pub fn from_config(config: &CardConfig) -> Self {
        Self {
            applications: vec![AppType::from_name(&config.flavor)],
            adn_slots: config.adn_slots,
            fdn_slots: config.fdn_slots,
            anr_slots: config.anr_slots,
            email_slots: config.email_slots,
            record_len: config.record_len,
            pin2: config.pin2.clone(),
            latency_ms: config.latency_ms,
            seed_records: Vec::new(),
        }
    }

    /// Where this card keeps its phonebook records.
    fn phonebook_ef(&self) -> EfId {
        if self.applications.iter().any(|t| t.is_3g()) {
            EfId::PBR
        } else {
            EfId::ADN
        }
    }
}

/// One simulated record file.
struct SimFile {
    records: Vec<AdnRecord>,
    record_len: usize,
    anr_slots: usize,
    email_slots: usize,
}

impl SimFile {
    fn new(ef: EfId, slots: usize, record_len: usize, anr_slots: usize, email_slots: usize) -> Self {
        let records = (1..=slots)
            .map(|index| shape_record(AdnRecord::empty(), ef, index, anr_slots, email_slots))
            .collect();
        Self { records, record_len, anr_slots, email_slots }
    }

    fn capacity(&self) -> RecordFileInfo {
        RecordFileInfo {
            record_len: self.record_len,
            file_len: self.record_len * self.records.len(),
            record_count: self.records.len(),
        }
    }
}

/// The card's files plus cache metadata, shared between the worker thread
/// and synchronous count queries.
struct FileSet {
    phonebook_ef: EfId,
    files: HashMap<EfId, SimFile>,
    /// Set once the phonebook file has been loaded; gates count queries.
    loaded: bool,
    pin2: String,
}

/// Pad or truncate a record's sub-slot lists to the file's shape and bind
/// its identity.
fn shape_record(
    mut record: AdnRecord,
    ef: EfId,
    index: usize,
    anr_slots: usize,
    email_slots: usize,
) -> AdnRecord {
    record.anrs.resize(anr_slots, String::new());
    record.emails.resize(email_slots, String::new());
    record.bound_to(ef, index)
}

enum Request {
    LoadAll {
        ef: EfId,
        done: Completion<Vec<AdnRecord>>,
    },
    UpdateBySearch {
        ef: EfId,
        old: AdnRecord,
        new: AdnRecord,
        auth: Option<String>,
        done: Completion<()>,
    },
    UpdateByIndex {
        ef: EfId,
        new: AdnRecord,
        index: usize,
        auth: Option<String>,
        done: Completion<()>,
    },
    Capacity {
        ef: EfId,
        done: Completion<RecordFileInfo>,
    },
    Attach {
        manager: Arc<PhonebookManager>,
        ack: mpsc::Sender<()>,
    },
    CardChanged {
        present: bool,
        ack: mpsc::Sender<()>,
    },
    Exec {
        task: Box<dyn FnOnce() + Send>,
    },
    Shutdown,
}

/// Record-file access handle shared by all applications on the card.
///
/// The phonebook files are card-level, not application-specific, so every
/// application hands out the same store.
pub struct SimCardStore {
    tx: mpsc::Sender<Request>,
    files: Arc<Mutex<FileSet>>,
}

impl SimCardStore {
    fn issue(&self, request: Request) {
        if self.tx.send(request).is_err() {
            // Worker gone; the completion inside the request resolves with
            // a failure as it drops.
            warn!("sim card worker is not running, failing request");
        }
    }
}

impl CardStore for SimCardStore {
    fn request_load_all(&self, ef: EfId, ext: Option<EfId>, done: Completion<Vec<AdnRecord>>) {
        // Continuation records are already folded into the structured
        // records this simulation serves.
        debug!("load {ef} (ext {ext:?}) issued");
        self.issue(Request::LoadAll { ef, done });
    }

    fn request_update_by_search(
        &self,
        ef: EfId,
        old: AdnRecord,
        new: AdnRecord,
        auth: Option<String>,
        done: Completion<()>,
    ) {
        self.issue(Request::UpdateBySearch { ef, old, new, auth, done });
    }

    fn request_update_by_index(
        &self,
        ef: EfId,
        new: AdnRecord,
        index: usize,
        auth: Option<String>,
        done: Completion<()>,
    ) {
        self.issue(Request::UpdateByIndex { ef, new, index, auth, done });
    }

    fn request_capacity(&self, ef: EfId, done: Completion<RecordFileInfo>) {
        self.issue(Request::Capacity { ef, done });
    }

    fn cached_counts(&self) -> Option<SlotCounts> {
        let fs = self.files.lock();
        if !fs.loaded {
            return None;
        }
        let file = fs.files.get(&fs.phonebook_ef)?;
        let mut counts = SlotCounts {
            adn_slots: file.records.len(),
            anr_slots: file.records.len() * file.anr_slots,
            email_slots: file.records.len() * file.email_slots,
            ..SlotCounts::default()
        };
        for record in &file.records {
            if !record.is_empty() {
                counts.used_adn_slots += 1;
            }
            counts.used_anr_slots += record.used_anr_slots();
            counts.used_email_slots += record.used_email_slots();
        }
        Some(counts)
    }
}

/// The simulated modem: spawns the worker thread, builds the card, and
/// delivers card-change notifications.
pub struct SimModem {
    tx: mpsc::Sender<Request>,
    card: UiccCard,
    worker: Option<JoinHandle<()>>,
}

impl SimModem {
    /// Spawn the worker and assemble the card described by `profile`.
    pub fn start(profile: SimCardProfile) -> Self {
        let phonebook_ef = profile.phonebook_ef();
        let mut files = HashMap::new();

        let mut phonebook = SimFile::new(
            phonebook_ef,
            profile.adn_slots,
            profile.record_len,
            profile.anr_slots,
            profile.email_slots,
        );
        for (i, seed) in profile.seed_records.iter().take(profile.adn_slots).enumerate() {
            phonebook.records[i] = shape_record(
                seed.clone(),
                phonebook_ef,
                i + 1,
                profile.anr_slots,
                profile.email_slots,
            );
        }
        files.insert(phonebook_ef, phonebook);
        files.insert(
            EfId::FDN,
            SimFile::new(EfId::FDN, profile.fdn_slots, profile.record_len, 0, 0),
        );

        let files = Arc::new(Mutex::new(FileSet {
            phonebook_ef,
            files,
            loaded: false,
            pin2: profile.pin2.clone(),
        }));

        let (tx, rx) = mpsc::channel();
        let store = Arc::new(SimCardStore { tx: tx.clone(), files: files.clone() });

        let applications = profile
            .applications
            .iter()
            .enumerate()
            .map(|(i, &app_type)| UiccCardApplication {
                aid: format!("{}-{i:02}", app_type.name()),
                app_type,
                store: store.clone() as Arc<dyn CardStore>,
            })
            .collect();
        let card = UiccCard::new(applications);

        let worker_card = card.clone();
        let latency = Duration::from_millis(profile.latency_ms);
        let worker = thread::spawn(move || run_worker(rx, files, worker_card, latency));

        info!(
            "sim modem started: {} application(s), phonebook in {}",
            card.applications.len(),
            phonebook_ef
        );
        Self { tx, card, worker: Some(worker) }
    }

    /// The card currently inserted in this modem.
    pub fn card(&self) -> &UiccCard {
        &self.card
    }

    /// Attach a manager: the worker registers itself as the manager's
    /// dispatch context and delivers the initial card notification.
    /// Returns once the manager is bound.
    pub fn attach(&self, manager: &Arc<PhonebookManager>) -> SbResult<()> {
        let (ack, done) = mpsc::channel();
        self.send(Request::Attach { manager: manager.clone(), ack })?;
        done.recv()
            .map_err(|_| SbError::Internal("sim worker exited during attach".into()))
    }

    /// Deliver a card-removed notification and wait for it to land.
    pub fn remove_card(&self) -> SbResult<()> {
        self.notify_card(false)
    }

    /// Deliver a card-inserted notification and wait for it to land.
    pub fn insert_card(&self) -> SbResult<()> {
        self.notify_card(true)
    }

    /// Run a closure on the dispatch thread and return its result.
    ///
    /// This is how tests and diagnostics exercise "called from the
    /// completion-dispatch context" behavior.
    pub fn run_on_dispatch_thread<R, F>(&self, task: F) -> SbResult<R>
    where
        R: Send + 'static,
        F: FnOnce() -> R + Send + 'static,
    {
        let (tx, rx) = mpsc::channel();
        self.send(Request::Exec {
            task: Box::new(move || {
                let _ = tx.send(task());
            }),
        })?;
        rx.recv()
            .map_err(|_| SbError::Internal("sim worker dropped the task".into()))
    }

    fn notify_card(&self, present: bool) -> SbResult<()> {
        let (ack, done) = mpsc::channel();
        self.send(Request::CardChanged { present, ack })?;
        done.recv()
            .map_err(|_| SbError::Internal("sim worker exited during card change".into()))
    }

    fn send(&self, request: Request) -> SbResult<()> {
        self.tx
            .send(request)
            .map_err(|_| SbError::Internal("sim worker is not running".into()))
    }
}

impl Drop for SimModem {
    fn drop(&mut self) {
        let _ = self.tx.send(Request::Shutdown);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

fn run_worker(
    rx: mpsc::Receiver<Request>,
    files: Arc<Mutex<FileSet>>,
    card: UiccCard,
    latency: Duration,
) {
    let mut manager: Option<Arc<PhonebookManager>> = None;

    while let Ok(request) = rx.recv() {
        let is_card_op = matches!(
            request,
            Request::LoadAll { .. }
                | Request::UpdateBySearch { .. }
                | Request::UpdateByIndex { .. }
                | Request::Capacity { .. }
        );
        if is_card_op && !latency.is_zero() {
            thread::sleep(latency);
        }
        match request {
            Request::LoadAll { ef, done } => {
                done.resolve(load_all(&files, ef));
            }
            Request::UpdateBySearch { ef, old, new, auth, done } => {
                done.resolve(update_by_search(&files, ef, &old, new, auth.as_deref()));
            }
            Request::UpdateByIndex { ef, new, index, auth, done } => {
                done.resolve(update_by_index(&files, ef, new, index, auth.as_deref()));
            }
            Request::Capacity { ef, done } => {
                done.resolve(capacity(&files, ef));
            }
            Request::Attach { manager: attached, ack } => {
                attached.bind_dispatch_thread();
                attached.on_card_changed(Some(&card));
                manager = Some(attached);
                let _ = ack.send(());
            }
            Request::CardChanged { present, ack } => {
                if let Some(manager) = &manager {
                    manager.on_card_changed(present.then_some(&card));
                } else {
                    warn!("card change delivered with no attached manager");
                }
                let _ = ack.send(());
            }
            Request::Exec { task } => task(),
            Request::Shutdown => break,
        }
    }
    debug!("sim card worker exiting");
}

fn load_all(files: &Mutex<FileSet>, ef: EfId) -> SbResult<Vec<AdnRecord>> {
    let mut fs = files.lock();
    let phonebook_ef = fs.phonebook_ef;
    let file = fs
        .files
        .get(&ef)
        .ok_or_else(|| SbError::Store(format!("{ef} not present on card")))?;
    let records = file.records.clone();
    if ef == phonebook_ef {
        fs.loaded = true;
    }
    Ok(records)
}

fn update_by_search(
    files: &Mutex<FileSet>,
    ef: EfId,
    old: &AdnRecord,
    new: AdnRecord,
    auth: Option<&str>,
) -> SbResult<()> {
    let mut fs = files.lock();
    check_pin2(&fs, ef, auth)?;
    let file = fs
        .files
        .get_mut(&ef)
        .ok_or_else(|| SbError::Store(format!("{ef} not present on card")))?;

    let slot = if old.is_empty() {
        file.records
            .iter()
            .position(|r| r.is_empty())
            .ok_or_else(|| SbError::Store(format!("{ef} is full, no free slot")))?
    } else {
        file.records
            .iter()
            .position(|r| r.content_matches(old))
            .ok_or_else(|| SbError::Store(format!("record ({old}) not found in {ef}")))?
    };

    let (anr_slots, email_slots) = (file.anr_slots, file.email_slots);
    file.records[slot] = shape_record(new, ef, slot + 1, anr_slots, email_slots);
    debug!("{ef} slot {} updated by search", slot + 1);
    Ok(())
}

fn update_by_index(
    files: &Mutex<FileSet>,
    ef: EfId,
    new: AdnRecord,
    index: usize,
    auth: Option<&str>,
) -> SbResult<()> {
    let mut fs = files.lock();
    check_pin2(&fs, ef, auth)?;
    let file = fs
        .files
        .get_mut(&ef)
        .ok_or_else(|| SbError::Store(format!("{ef} not present on card")))?;

    if index == 0 || index > file.records.len() {
        return Err(SbError::Argument(format!(
            "index {index} out of range for {ef} (1..={})",
            file.records.len()
        )));
    }

    let (anr_slots, email_slots) = (file.anr_slots, file.email_slots);
    file.records[index - 1] = shape_record(new, ef, index, anr_slots, email_slots);
    debug!("{ef} slot {index} updated by index");
    Ok(())
}

fn capacity(files: &Mutex<FileSet>, ef: EfId) -> SbResult<RecordFileInfo> {
    let fs = files.lock();
    fs.files
        .get(&ef)
        .map(SimFile::capacity)
        .ok_or_else(|| SbError::Store(format!("{ef} not present on card")))
}

fn check_pin2(fs: &FileSet, ef: EfId, auth: Option<&str>) -> SbResult<()> {
    if ef != EfId::FDN {
        return Ok(());
    }
    match auth {
        Some(pin2) if pin2 == fs.pin2 => Ok(()),
        Some(_) => Err(SbError::Store(format!("auth code rejected for {ef}"))),
        None => Err(SbError::Store(format!("{ef} update requires an auth code"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::Bridge;

    fn store_with(profile: SimCardProfile) -> (SimModem, Arc<dyn CardStore>) {
        let modem = SimModem::start(profile);
        let store = modem.card().applications[0].store.clone();
        (modem, store)
    }

    fn wait<T: Send + 'static>(
        bridge: &Bridge<()>,
        issue: impl FnOnce(Completion<T>),
    ) -> SbResult<T> {
        let (pending, completion) = bridge.pending::<T>();
        issue(completion);
        let mut guard = bridge.lock();
        bridge.wait(&mut guard, pending)
    }

    #[test]
    fn test_load_unknown_file_fails() {
        let (_modem, store) = store_with(SimCardProfile::usim());
        let bridge: Bridge<()> = Bridge::new(());
        let err = wait(&bridge, |done| {
            store.request_load_all(EfId::SDN, EfId::SDN.extension(), done)
        })
        .unwrap_err();
        assert!(matches!(err, SbError::Store(_)));
    }

    #[test]
    fn test_legacy_card_serves_phonebook_from_adn() {
        let mut profile = SimCardProfile::sim();
        profile.seed_records = vec![AdnRecord::new("Ann", "+15550001")];
        let (_modem, store) = store_with(profile);
        let bridge: Bridge<()> = Bridge::new(());

        let records = wait(&bridge, |done| {
            store.request_load_all(EfId::ADN, EfId::ADN.extension(), done)
        })
        .unwrap();
        assert_eq!(records[0].ef, EfId::ADN);
        assert_eq!(records[0].tag, "Ann");
    }

    #[test]
    fn test_counts_unavailable_until_phonebook_load() {
        let (_modem, store) = store_with(SimCardProfile::usim());
        let bridge: Bridge<()> = Bridge::new(());

        assert!(store.cached_counts().is_none());

        // Loading a non-phonebook file does not populate the cache.
        wait(&bridge, |done| {
            store.request_load_all(EfId::FDN, EfId::FDN.extension(), done)
        })
        .unwrap();
        assert!(store.cached_counts().is_none());

        wait(&bridge, |done| {
            store.request_load_all(EfId::PBR, None, done)
        })
        .unwrap();
        let counts = store.cached_counts().unwrap();
        assert_eq!(counts.adn_slots, 20);
        assert_eq!(counts.used_adn_slots, 0);
    }

    #[test]
    fn test_update_empty_old_and_empty_new_is_a_noop_write() {
        let (_modem, store) = store_with(SimCardProfile::usim());
        let bridge: Bridge<()> = Bridge::new(());

        // Replacing an empty slot with another empty record succeeds and
        // leaves the file unchanged.
        wait(&bridge, |done| {
            store.request_update_by_search(
                EfId::PBR,
                AdnRecord::empty(),
                AdnRecord::empty(),
                None,
                done,
            )
        })
        .unwrap();

        let records = wait(&bridge, |done| store.request_load_all(EfId::PBR, None, done)).unwrap();
        assert!(records.iter().all(AdnRecord::is_empty));
    }

    #[test]
    fn test_update_by_index_out_of_range() {
        let (_modem, store) = store_with(SimCardProfile::usim());
        let bridge: Bridge<()> = Bridge::new(());

        for bad_index in [0, 21] {
            let err = wait(&bridge, |done| {
                store.request_update_by_index(
                    EfId::PBR,
                    AdnRecord::new("X", "+15550000"),
                    bad_index,
                    None,
                    done,
                )
            })
            .unwrap_err();
            assert!(matches!(err, SbError::Argument(_)), "index {bad_index}");
        }
    }

    #[test]
    fn test_written_record_is_shaped_to_file_slots() {
        let (_modem, store) = store_with(SimCardProfile::usim());
        let bridge: Bridge<()> = Bridge::new(());

        let oversized = AdnRecord::with_slots(
            "Ann",
            "+15550001",
            vec!["1".into(), "2".into(), "3".into()],
            vec!["a@example.com".into()],
        );
        wait(&bridge, |done| {
            store.request_update_by_index(EfId::PBR, oversized, 1, None, done)
        })
        .unwrap();

        let records = wait(&bridge, |done| store.request_load_all(EfId::PBR, None, done)).unwrap();
        assert_eq!(records[0].anrs.len(), 2);
        assert_eq!(records[0].emails.len(), 2);
        assert_eq!(records[0].emails[0], "a@example.com");
        assert_eq!(records[0].emails[1], "");
    }

    #[test]
    fn test_profile_from_config() {
        let config = CardConfig::default();
        let profile = SimCardProfile::from_config(&config);
        assert_eq!(profile.applications, vec![AppType::Usim]);
        assert_eq!(profile.phonebook_ef(), EfId::PBR);
        assert_eq!(profile.adn_slots, config.adn_slots);

        let mut legacy = config;
        legacy.flavor = "sim".to_string();
        assert_eq!(SimCardProfile::from_config(&legacy).phonebook_ef(), EfId::ADN);
    }
}
