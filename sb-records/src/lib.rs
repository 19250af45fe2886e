//! simbook records - Phonebook data model.
//!
//! This crate defines the record and card types shared across the
//! workspace:
//! - `AdnRecord`: an abbreviated-dialing phonebook entry
//! - `EfId`: elementary-file identifiers and the logical-to-physical
//!   translation rule
//! - `AppType` / `CardGeneration`: card application classification
//! - `RecordFileInfo`: record-file capacity metadata

pub mod adn;
pub mod card;
pub mod ef;

pub use adn::{AdnRecord, RecordFileInfo};
pub use card::{AppType, CardGeneration};
pub use ef::{translate_for_generation, EfId};
