use serde::{Deserialize, Serialize};
use std::fmt;

// ── District ──────────────────────────────────────────────────────────────────

/// The six administrative districts of Belize.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum District {
    #[default]
    Belize,
    Cayo,
    #[serde(rename = "Orange Walk")]
    OrangeWalk,
    Corozal,
    #[serde(rename = "Stann Creek")]
    StannCreek,
    Toledo,
}

impl District {
    pub fn as_str(self) -> &'static str {
        match self {
            District::Belize => "Belize",
            District::Cayo => "Cayo",
            District::OrangeWalk => "Orange Walk",
            District::Corozal => "Corozal",
            District::StannCreek => "Stann Creek",
            District::Toledo => "Toledo",
        }
    }
}

impl fmt::Display for District {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Category ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    Diving,
    #[serde(rename = "Mayan Tours")]
    MayanTours,
    Adventure,
    Fishing,
    Resort,
    Rentals,
    General,
}

impl Category {
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Diving => "Diving",
            Category::MayanTours => "Mayan Tours",
            Category::Adventure => "Adventure",
            Category::Fishing => "Fishing",
            Category::Resort => "Resort",
            Category::Rentals => "Rentals",
            Category::General => "General",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Price tier ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PriceTier {
    #[serde(rename = "$")]
    Budget,
    #[serde(rename = "$$")]
    Moderate,
    #[serde(rename = "$$$")]
    Luxury,
}

impl PriceTier {
    pub fn as_str(self) -> &'static str {
        match self {
            PriceTier::Budget => "$",
            PriceTier::Moderate => "$$",
            PriceTier::Luxury => "$$$",
        }
    }
}

// ── Operator record ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Address {
    pub full: String,
    pub district: District,
}

/// One licensed tour operator as served to clients.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OperatorRecord {
    pub id: String,
    pub name: String,
    pub phone: String,
    pub email: String,
    pub website: String,
    pub address: Address,
    pub district: District,
    pub location: String,
    pub category: Category,
    pub price_range: PriceTier,
    pub rating: String, // synthetic, see cleaner::derive_rating
}

// ── Raw table row ─────────────────────────────────────────────────────────────

/// Positional columns of the operator listing: Name | Phone | Address | Email | Website
#[derive(Debug, Clone, Default)]
pub struct RawOperatorRow {
    pub name: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub email: Option<String>,
    pub website: Option<String>,
}
