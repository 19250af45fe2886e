//! Elementary-file identifiers and logical-to-physical translation.

use serde::{Deserialize, Serialize};

use crate::card::CardGeneration;

/// Identifier of an elementary file on the card.
///
/// This layer only routes by id; file contents are the codec's concern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EfId(pub u16);

impl EfId {
    /// Placeholder for records not yet bound to a file.
    pub const UNSET: EfId = EfId(0);
    /// Abbreviated dialing numbers.
    pub const ADN: EfId = EfId(0x6F3A);
    /// Fixed dialing numbers. Updates require an auth code.
    pub const FDN: EfId = EfId(0x6F3B);
    /// Subscriber's own numbers.
    pub const MSISDN: EfId = EfId(0x6F40);
    /// Service dialing numbers.
    pub const SDN: EfId = EfId(0x6F49);
    /// Extension file for ADN/MSISDN overflow digits.
    pub const EXT1: EfId = EfId(0x6F4A);
    /// Extension file for FDN overflow digits.
    pub const EXT2: EfId = EfId(0x6F4B);
    /// Extension file for SDN overflow digits.
    pub const EXT3: EfId = EfId(0x6F4C);
    /// Phonebook reference file, the ADN container on modern cards.
    pub const PBR: EfId = EfId(0x4F30);

    /// Used by serde defaults.
    pub fn unset() -> Self {
        Self::UNSET
    }

    /// The companion continuation file for this file, if one exists.
    pub fn extension(self) -> Option<EfId> {
        match self {
            EfId::ADN | EfId::MSISDN => Some(EfId::EXT1),
            EfId::FDN => Some(EfId::EXT2),
            EfId::SDN => Some(EfId::EXT3),
            _ => None,
        }
    }

    /// Short name for known files.
    pub fn name(self) -> Option<&'static str> {
        match self {
            EfId::ADN => Some("EF_ADN"),
            EfId::FDN => Some("EF_FDN"),
            EfId::MSISDN => Some("EF_MSISDN"),
            EfId::SDN => Some("EF_SDN"),
            EfId::EXT1 => Some("EF_EXT1"),
            EfId::EXT2 => Some("EF_EXT2"),
            EfId::EXT3 => Some("EF_EXT3"),
            EfId::PBR => Some("EF_PBR"),
            _ => None,
        }
    }
}

impl std::fmt::Display for EfId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{name}"),
            None => write!(f, "EF_0x{:04X}", self.0),
        }
    }
}

/// Map a logical file id to the physical file to address on the card.
///
/// Modern cards keep abbreviated-dialing data in the phonebook reference
/// file rather than EF_ADN itself; every other id, and EF_ADN on legacy
/// cards, passes through unchanged.
pub fn translate_for_generation(ef: EfId, generation: CardGeneration) -> EfId {
    if ef == EfId::ADN && generation == CardGeneration::Modern {
        EfId::PBR
    } else {
        ef
    }
}
