use crate::models::{Address, Category, District, OperatorRecord, PriceTier, RawOperatorRow};
use rand::Rng;
use sha2::{Digest, Sha256};

// ── Keyword tables ────────────────────────────────────────────────────────────

/// Checked in order, first hit wins. The bare country name sits last so that
/// "San Ignacio, Belize" lands in Cayo rather than Belize District.
const DISTRICT_KEYWORDS: &[(&str, District)] = &[
    ("cayo", District::Cayo),
    ("san ignacio", District::Cayo),
    ("santa elena", District::Cayo),
    ("benque", District::Cayo),
    ("bullet tree", District::Cayo),
    ("orange walk", District::OrangeWalk),
    ("corozal", District::Corozal),
    ("stann creek", District::StannCreek),
    ("placencia", District::StannCreek),
    ("dangriga", District::StannCreek),
    ("hopkins", District::StannCreek),
    ("toledo", District::Toledo),
    ("punta gorda", District::Toledo),
    ("belize city", District::Belize),
    ("san pedro", District::Belize),
    ("ambergris", District::Belize),
    ("caye caulker", District::Belize),
    ("ladyville", District::Belize),
    ("belize", District::Belize),
];

/// Settlement gazetteer: (lower-case needle, display name).
const GAZETTEER: &[(&str, &str)] = &[
    ("san pedro", "San Pedro"),
    ("caye caulker", "Caye Caulker"),
    ("belize city", "Belize City"),
    ("ladyville", "Ladyville"),
    ("san ignacio", "San Ignacio"),
    ("santa elena", "Santa Elena"),
    ("benque", "Benque Viejo"),
    ("bullet tree", "Bullet Tree"),
    ("belmopan", "Belmopan"),
    ("placencia", "Placencia"),
    ("hopkins", "Hopkins"),
    ("dangriga", "Dangriga"),
    ("punta gorda", "Punta Gorda"),
    ("orange walk", "Orange Walk"),
    ("corozal", "Corozal"),
    ("sarteneja", "Sarteneja"),
];

const CATEGORY_KEYWORDS: &[(&[&str], Category)] = &[
    (&["dive", "scuba", "sea", "snork"], Category::Diving),
    (&["maya", "ruin", "archaeolog"], Category::MayanTours),
    (&["adventure", "cave", "zip", "jungle"], Category::Adventure),
    (&["fish"], Category::Fishing),
    (&["resort", "hotel", "lodge"], Category::Resort),
    (&["rent", "golf cart"], Category::Rentals),
];

const LUXURY_KEYWORDS: &[&str] = &["luxury", "resort", "heli", "private"];
const MODERATE_KEYWORDS: &[&str] = &["dive", "adventure"];

const ID_SLUG_LEN: usize = 24;

// ── Derivations ───────────────────────────────────────────────────────────────

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| haystack.contains(n))
}

pub fn derive_district(address: &str) -> District {
    let address = address.to_lowercase();
    DISTRICT_KEYWORDS
        .iter()
        .find(|(kw, _)| address.contains(kw))
        .map(|(_, d)| *d)
        .unwrap_or_default()
}

/// Finest gazetteer match, or the district name when nothing matches.
pub fn derive_location(address: &str) -> String {
    let lower = address.to_lowercase();
    GAZETTEER
        .iter()
        .find(|(kw, _)| lower.contains(kw))
        .map(|(_, place)| place.to_string())
        .unwrap_or_else(|| derive_district(address).to_string())
}

pub fn derive_category(name: &str) -> Category {
    let name = name.to_lowercase();
    CATEGORY_KEYWORDS
        .iter()
        .find(|(kws, _)| contains_any(&name, kws))
        .map(|(_, c)| *c)
        .unwrap_or(Category::General)
}

pub fn derive_price_range(name: &str) -> PriceTier {
    let name = name.to_lowercase();
    if contains_any(&name, LUXURY_KEYWORDS) {
        PriceTier::Luxury
    } else if contains_any(&name, MODERATE_KEYWORDS) {
        PriceTier::Moderate
    } else {
        PriceTier::Budget
    }
}

/// Placeholder rating: the listing carries no review data, so this is drawn
/// uniformly from 4.2..=5.0 in steps of 0.1. Not stable across scrapes.
pub fn derive_rating<R: Rng>(rng: &mut R) -> String {
    let tenths: u32 = rng.random_range(42..=50);
    format!("{}.{}", tenths / 10, tenths % 10)
}

/// Slug of the name plus a short SHA-256 prefix.
/// "Belize Dive Haven" → "belizedivehaven-3f9a0c1e"
pub fn derive_id(name: &str) -> String {
    let slug: String = name
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .take(ID_SLUG_LEN)
        .collect();

    let digest = Sha256::digest(name.trim().as_bytes());
    let suffix: String = digest[..4].iter().map(|b| format!("{b:02x}")).collect();

    format!("{slug}-{suffix}")
}

// ── Raw row → OperatorRecord ──────────────────────────────────────────────────

fn trimmed(s: Option<String>) -> String {
    s.map(|s| s.trim().to_string()).unwrap_or_default()
}

pub fn row_to_record<R: Rng>(row: RawOperatorRow, rng: &mut R) -> OperatorRecord {
    let name = row.name.trim().to_string();
    let full_address = trimmed(row.address);
    let district = derive_district(&full_address);

    OperatorRecord {
        id: derive_id(&name),
        phone: trimmed(row.phone),
        email: trimmed(row.email),
        website: trimmed(row.website),
        location: derive_location(&full_address),
        category: derive_category(&name),
        price_range: derive_price_range(&name),
        rating: derive_rating(rng),
        address: Address {
            full: full_address,
            district,
        },
        district,
        name,
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
