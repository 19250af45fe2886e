//! Card application classification.

use serde::{Deserialize, Serialize};

/// Type of a logical application hosted on a UICC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AppType {
    /// Legacy GSM SIM application.
    Sim,
    /// Legacy CDMA application.
    Ruim,
    /// CDMA application on a modern card.
    Csim,
    /// UMTS/LTE application.
    Usim,
    /// IMS identity application.
    Isim,
    /// Unrecognized application type.
    Unknown,
}

impl AppType {
    /// Whether this application type marks the card as 3G-capable.
    pub fn is_3g(self) -> bool {
        matches!(self, AppType::Csim | AppType::Usim | AppType::Isim)
    }

    /// Parse a flavor name as used in configuration files.
    pub fn from_name(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "sim" => AppType::Sim,
            "ruim" => AppType::Ruim,
            "csim" => AppType::Csim,
            "usim" => AppType::Usim,
            "isim" => AppType::Isim,
            _ => AppType::Unknown,
        }
    }

    /// Short lowercase name.
    pub fn name(self) -> &'static str {
        match self {
            AppType::Sim => "sim",
            AppType::Ruim => "ruim",
            AppType::Csim => "csim",
            AppType::Usim => "usim",
            AppType::Isim => "isim",
            AppType::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for AppType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Generation of the active card, derived from its application set.
///
/// Drives the logical-to-physical file translation: modern cards keep
/// abbreviated-dialing data behind the phonebook reference file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CardGeneration {
    /// 2G-only card.
    #[default]
    Legacy,
    /// Card hosting at least one 3G-capable application.
    Modern,
}

impl CardGeneration {
    /// Classify a card from the types of its applications.
    pub fn classify<I: IntoIterator<Item = AppType>>(types: I) -> Self {
        if types.into_iter().any(AppType::is_3g) {
            CardGeneration::Modern
        } else {
            CardGeneration::Legacy
        }
    }
}

impl std::fmt::Display for CardGeneration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CardGeneration::Legacy => write!(f, "legacy"),
            CardGeneration::Modern => write!(f, "modern"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_3g_types() {
        assert!(AppType::Csim.is_3g());
        assert!(AppType::Usim.is_3g());
        assert!(AppType::Isim.is_3g());
        assert!(!AppType::Sim.is_3g());
        assert!(!AppType::Ruim.is_3g());
        assert!(!AppType::Unknown.is_3g());
    }

    #[test]
    fn test_classify_generation() {
        use AppType::*;
        assert_eq!(CardGeneration::classify([Sim]), CardGeneration::Legacy);
        assert_eq!(CardGeneration::classify([Sim, Usim]), CardGeneration::Modern);
        assert_eq!(CardGeneration::classify([Usim, Isim]), CardGeneration::Modern);
        assert_eq!(CardGeneration::classify([Ruim]), CardGeneration::Legacy);
        assert_eq!(CardGeneration::classify([]), CardGeneration::Legacy);
    }

    #[test]
    fn test_from_name() {
        assert_eq!(AppType::from_name("usim"), AppType::Usim);
        assert_eq!(AppType::from_name("USIM"), AppType::Usim);
        assert_eq!(AppType::from_name("bogus"), AppType::Unknown);
    }
}
