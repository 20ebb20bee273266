use phf::{Map, phf_map};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A piece of lab equipment or reagent that must be placed during setup.
///
/// The variants are listed in the order the experiment requires them to be placed;
/// [`SETUP_SEQUENCE`] is the authoritative ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ApparatusItem {
    /// Burette stand.
    Stand,
    /// 50 mL burette mounted on the stand.
    Burette,
    /// Collection beaker under the burette tip.
    Beaker,
    /// pH meter probe dipped into the beaker.
    PhMeter,
    /// 25 mL glycine sample poured into the beaker.
    Glycine,
    /// 0.1 M NaOH titrant loaded into the burette.
    Naoh,
}

/// The fixed placement order. Setup stage `n` (1-based) requires `SETUP_SEQUENCE[n - 1]`.
pub const SETUP_SEQUENCE: [ApparatusItem; 6] = [
    ApparatusItem::Stand,
    ApparatusItem::Burette,
    ApparatusItem::Beaker,
    ApparatusItem::PhMeter,
    ApparatusItem::Glycine,
    ApparatusItem::Naoh,
];

static ITEM_ALIASES: Map<&'static str, ApparatusItem> = phf_map! {
    // --- Stand ---
    "stand" => ApparatusItem::Stand, "burette_stand" => ApparatusItem::Stand,
    "burette-stand" => ApparatusItem::Stand, "retort_stand" => ApparatusItem::Stand,

    // --- Glassware ---
    "burette" => ApparatusItem::Burette, "buret" => ApparatusItem::Burette,
    "beaker" => ApparatusItem::Beaker,

    // --- Instruments ---
    "ph_meter" => ApparatusItem::PhMeter, "ph-meter" => ApparatusItem::PhMeter,
    "phmeter" => ApparatusItem::PhMeter, "ph_probe" => ApparatusItem::PhMeter,
    "ph-probe" => ApparatusItem::PhMeter,

    // --- Reagents ---
    "glycine" => ApparatusItem::Glycine, "gly" => ApparatusItem::Glycine,
    "naoh" => ApparatusItem::Naoh, "sodium_hydroxide" => ApparatusItem::Naoh,
    "sodium-hydroxide" => ApparatusItem::Naoh,
};

impl ApparatusItem {
    /// Canonical snake_case key, matching the names used in configuration and CSV output.
    pub fn key(self) -> &'static str {
        match self {
            ApparatusItem::Stand => "stand",
            ApparatusItem::Burette => "burette",
            ApparatusItem::Beaker => "beaker",
            ApparatusItem::PhMeter => "ph_meter",
            ApparatusItem::Glycine => "glycine",
            ApparatusItem::Naoh => "naoh",
        }
    }

    /// Human-readable name used in instructions and rejection messages.
    pub fn label(self) -> &'static str {
        match self {
            ApparatusItem::Stand => "Burette stand",
            ApparatusItem::Burette => "Burette",
            ApparatusItem::Beaker => "Beaker",
            ApparatusItem::PhMeter => "pH meter",
            ApparatusItem::Glycine => "Glycine solution",
            ApparatusItem::Naoh => "0.1 M NaOH",
        }
    }

    /// Short confirmation shown on the drop zone once the item is in place.
    pub fn placed_label(self) -> &'static str {
        match self {
            ApparatusItem::Stand => "Stand Positioned",
            ApparatusItem::Burette => "Burette Mounted",
            ApparatusItem::Beaker => "Beaker Placed",
            ApparatusItem::PhMeter => "Probe Attached",
            ApparatusItem::Glycine => "Glycine Added",
            ApparatusItem::Naoh => "NaOH Loaded",
        }
    }

    /// Zero-based position of the item in [`SETUP_SEQUENCE`].
    pub fn sequence_index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for ApparatusItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Returned when a name matches no apparatus item or alias.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
#[error("Unknown apparatus item: '{0}'")]
pub struct UnknownItemError(pub String);

impl FromStr for ApparatusItem {
    type Err = UnknownItemError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace(' ', "_");
        ITEM_ALIASES
            .get(normalized.as_str())
            .copied()
            .ok_or_else(|| UnknownItemError(s.to_string()))
    }
}
