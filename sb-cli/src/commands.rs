//! CLI command implementations.
//!
//! Each command opens a session (manager + simulated modem, card shape
//! from the configuration file), runs one phonebook operation, and prints
//! the result in text or JSON.

use std::sync::Arc;

use sb_core::config::AppConfig;
use sb_core::error::SbResult;
use sb_records::{AdnRecord, CardGeneration, EfId};
use sb_services::{AllowAll, CountKind, PhonebookManager, SimCardProfile, SimModem};

use crate::OutputFormat;

/// Record files addressable from the command line.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum FileArg {
    /// Abbreviated dialing numbers.
    Adn,
    /// Fixed dialing numbers (PIN2-protected).
    Fdn,
    /// Service dialing numbers.
    Sdn,
}

impl FileArg {
    fn ef(self) -> EfId {
        match self {
            FileArg::Adn => EfId::ADN,
            FileArg::Fdn => EfId::FDN,
            FileArg::Sdn => EfId::SDN,
        }
    }
}

/// A live manager attached to a freshly started simulated modem.
struct Session {
    manager: Arc<PhonebookManager>,
    modem: SimModem,
}

fn open_session(config: &AppConfig) -> SbResult<Session> {
    let manager = Arc::new(PhonebookManager::with_config(
        Arc::new(AllowAll),
        &config.phonebook,
    ));
    let mut profile = SimCardProfile::from_config(&config.card);
    profile.seed_records = demo_seed();
    let modem = SimModem::start(profile);
    modem.attach(&manager)?;
    Ok(Session { manager, modem })
}

/// Demo entries pre-loaded into the simulated phonebook.
fn demo_seed() -> Vec<AdnRecord> {
    vec![
        AdnRecord::with_slots(
            "Alice Chen",
            "+15550100",
            vec!["+15550101".into()],
            vec!["alice@example.com".into()],
        ),
        AdnRecord::new("Bob Osei", "+15550200"),
        AdnRecord::with_slots(
            "Cara Diaz",
            "+15550300",
            vec![],
            vec!["cara@example.com".into()],
        ),
    ]
}

pub fn records(config: &AppConfig, file: FileArg, all: bool, format: OutputFormat) -> SbResult<()> {
    let session = open_session(config)?;
    let records = session.manager.records(file.ef())?;
    let shown: Vec<&AdnRecord> = records.iter().filter(|r| all || !r.is_empty()).collect();

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&shown)?),
        OutputFormat::Text => {
            if shown.is_empty() {
                println!("(no records)");
            }
            for record in shown {
                println!("{record}");
            }
        }
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
pub fn add(
    config: &AppConfig,
    file: FileArg,
    tag: String,
    number: String,
    anrs: Vec<String>,
    emails: Vec<String>,
    pin2: Option<String>,
    format: OutputFormat,
) -> SbResult<()> {
    let session = open_session(config)?;
    let record = AdnRecord::with_slots(tag, number, anrs, emails);
    let success = session.manager.update_by_search(
        file.ef(),
        AdnRecord::empty(),
        record,
        pin2.as_deref(),
    )?;
    report_outcome("add", success, format)
}

pub fn delete(
    config: &AppConfig,
    file: FileArg,
    index: Option<usize>,
    tag: Option<String>,
    number: Option<String>,
    pin2: Option<String>,
    format: OutputFormat,
) -> SbResult<()> {
    let session = open_session(config)?;
    let success = match (index, tag, number) {
        (Some(index), _, _) => session.manager.update_by_index(
            file.ef(),
            AdnRecord::empty(),
            index,
            pin2.as_deref(),
        )?,
        (None, Some(tag), Some(number)) => session.manager.update_by_search(
            file.ef(),
            AdnRecord::new(tag, number),
            AdnRecord::empty(),
            pin2.as_deref(),
        )?,
        _ => {
            eprintln!("delete needs either --index or --tag with --number");
            false
        }
    };
    report_outcome("delete", success, format)
}

#[allow(clippy::too_many_arguments)]
pub fn update(
    config: &AppConfig,
    file: FileArg,
    index: usize,
    tag: String,
    number: String,
    anrs: Vec<String>,
    emails: Vec<String>,
    pin2: Option<String>,
    format: OutputFormat,
) -> SbResult<()> {
    let session = open_session(config)?;
    let record = AdnRecord::with_slots(tag, number, anrs, emails);
    let success = session
        .manager
        .update_by_index(file.ef(), record, index, pin2.as_deref())?;
    report_outcome("update", success, format)
}

pub fn capacity(config: &AppConfig, file: FileArg, format: OutputFormat) -> SbResult<()> {
    let session = open_session(config)?;
    let info = session.manager.capacity(file.ef())?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&info)?),
        OutputFormat::Text => println!("{}: {info}", file.ef()),
    }
    Ok(())
}

pub fn counts(config: &AppConfig, format: OutputFormat) -> SbResult<()> {
    let session = open_session(config)?;
    // Counts answer from cached metadata, so populate the cache first.
    session.manager.records(EfId::ADN)?;

    let kinds = [
        ("records", CountKind::Records),
        ("secondary_numbers", CountKind::SecondaryNumbers),
        ("emails", CountKind::Emails),
        ("spare_secondary_numbers", CountKind::SpareSecondaryNumbers),
        ("spare_emails", CountKind::SpareEmails),
    ];

    match format {
        OutputFormat::Json => {
            let mut map = serde_json::Map::new();
            for (name, kind) in kinds {
                map.insert(name.to_string(), session.manager.count(kind)?.into());
            }
            println!("{}", serde_json::to_string_pretty(&map)?);
        }
        OutputFormat::Text => {
            for (name, kind) in kinds {
                println!("{name}: {}", session.manager.count(kind)?);
            }
        }
    }
    Ok(())
}

pub fn card(config: &AppConfig, format: OutputFormat) -> SbResult<()> {
    let session = open_session(config)?;
    let card = session.modem.card();
    let generation = CardGeneration::classify(card.applications.iter().map(|a| a.app_type));

    match format {
        OutputFormat::Json => {
            let apps: Vec<serde_json::Value> = card
                .applications
                .iter()
                .map(|a| {
                    serde_json::json!({
                        "aid": a.aid,
                        "type": a.app_type.name(),
                    })
                })
                .collect();
            let out = serde_json::json!({
                "generation": generation.to_string(),
                "applications": apps,
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        OutputFormat::Text => {
            println!("generation: {generation}");
            for app in &card.applications {
                println!("application: {} ({})", app.aid, app.app_type);
            }
        }
    }
    Ok(())
}

fn report_outcome(op: &str, success: bool, format: OutputFormat) -> SbResult<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::json!({ "op": op, "success": success }));
        }
        OutputFormat::Text => {
            if success {
                println!("{op}: ok");
            } else {
                println!("{op}: failed (see log for the cause)");
            }
        }
    }
    Ok(())
}
