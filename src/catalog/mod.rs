//! # Static Game-Data Catalog
//!
//! Loads the reference data the admin console works against: items,
//! status effects, and enchantments. Each kind lives in its own JSON
//! seed file (`items.json`, `effects.json`, `enchantments.json`) and is
//! parsed once at startup into an immutable, load-order-preserving
//! in-memory catalog. Nothing mutates a [`Catalog`] after construction;
//! every other component borrows it read-only.
//!
//! ## Seed File Format
//!
//! Seed records mirror the community game-data dumps: a stable machine
//! `name`, a human `displayName`, and optional per-kind extras
//! (`maxLevel` for enchantments, `stackSize` for items).
//!
//! ```json
//! [
//!   { "name": "DIAMOND_SWORD", "displayName": "Diamond Sword", "stackSize": 1 },
//!   { "name": "Cobblestone", "displayName": "Cobblestone", "stackSize": 64 }
//! ]
//! ```
//!
//! Machine names are lowercased and namespaced (`minecraft:diamond_sword`)
//! at load time so the rest of the system only ever sees server-ready ids.

use log::warn;
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use crate::errors::AdminError;

/// The three kinds of reference data the console can resolve against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CatalogKind {
    Item,
    Effect,
    Enchantment,
}

impl CatalogKind {
    /// All kinds in their canonical load order.
    pub const ALL: [CatalogKind; 3] = [
        CatalogKind::Item,
        CatalogKind::Effect,
        CatalogKind::Enchantment,
    ];

    /// Seed file name for this kind inside the data directory.
    pub fn file_name(&self) -> &'static str {
        match self {
            CatalogKind::Item => "items.json",
            CatalogKind::Effect => "effects.json",
            CatalogKind::Enchantment => "enchantments.json",
        }
    }
}

impl fmt::Display for CatalogKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CatalogKind::Item => "item",
            CatalogKind::Effect => "effect",
            CatalogKind::Enchantment => "enchantment",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for CatalogKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "item" | "items" => Ok(CatalogKind::Item),
            "effect" | "effects" => Ok(CatalogKind::Effect),
            "enchantment" | "enchantments" | "ench" => Ok(CatalogKind::Enchantment),
            other => Err(format!("unknown catalog kind: {}", other)),
        }
    }
}

/// One immutable reference-data record.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogEntry {
    /// Server-ready namespaced id, e.g. `minecraft:diamond_sword`.
    pub id: String,
    /// Human-readable name used for fuzzy lookup and display.
    pub display_name: String,
    pub kind: CatalogKind,
    /// Highest legal enchantment level; `None` for items and effects.
    pub max_level: Option<u32>,
    /// Whether more than one of this entry fits in an inventory slot.
    pub stackable: bool,
}

/// Seed record as it appears on disk. `name` and `displayName` are
/// required; anything missing fails the whole load.
#[derive(Debug, Deserialize)]
struct CatalogSeed {
    name: String,
    #[serde(rename = "displayName")]
    display_name: String,
    #[serde(rename = "maxLevel", default)]
    max_level: Option<u32>,
    #[serde(rename = "stackSize", default)]
    stack_size: Option<u32>,
}

impl CatalogSeed {
    fn into_entry(self, kind: CatalogKind) -> CatalogEntry {
        CatalogEntry {
            id: format!("minecraft:{}", self.name.to_lowercase()),
            display_name: self.display_name,
            kind,
            max_level: self.max_level,
            stackable: self.stack_size.map(|n| n > 1).unwrap_or(false),
        }
    }
}

/// Read-only, load-once reference data for every [`CatalogKind`].
///
/// Entry order within a kind is the seed file order; fuzzy ranking relies
/// on it as the final tie-break, so it is never re-sorted.
#[derive(Debug, Default)]
pub struct Catalog {
    entries: HashMap<CatalogKind, Vec<CatalogEntry>>,
}

impl Catalog {
    /// Load all three seed files from `data_dir`.
    ///
    /// A kind whose file is absent loads as empty with a warning (a
    /// stripped-down install may only ship `items.json`). A file that is
    /// present but malformed, or a record missing `name`/`displayName`,
    /// fails the load.
    pub fn load<P: AsRef<Path>>(data_dir: P) -> Result<Self, AdminError> {
        let dir = data_dir.as_ref();
        let mut entries = HashMap::new();
        for kind in CatalogKind::ALL {
            let path = dir.join(kind.file_name());
            if !path.exists() {
                warn!("catalog: {} not found, {}s unavailable", path.display(), kind);
                entries.insert(kind, Vec::new());
                continue;
            }
            entries.insert(kind, load_kind_from_json(&path, kind)?);
        }
        Ok(Catalog { entries })
    }

    /// Build a catalog directly from records, preserving their order.
    /// Used by tests and by callers that source data elsewhere.
    pub fn from_entries(records: Vec<CatalogEntry>) -> Result<Self, AdminError> {
        let mut entries: HashMap<CatalogKind, Vec<CatalogEntry>> = HashMap::new();
        for kind in CatalogKind::ALL {
            entries.insert(kind, Vec::new());
        }
        for record in records {
            let bucket = entries.entry(record.kind).or_default();
            if bucket.iter().any(|e| e.id == record.id) {
                return Err(AdminError::CatalogLoad(format!(
                    "duplicate {} id: {}",
                    record.kind, record.id
                )));
            }
            bucket.push(record);
        }
        Ok(Catalog { entries })
    }

    /// Every entry of `kind`, in stable seed-file order.
    pub fn all_of_kind(&self, kind: CatalogKind) -> &[CatalogEntry] {
        self.entries.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Exact id lookup within one kind.
    pub fn get(&self, kind: CatalogKind, id: &str) -> Option<&CatalogEntry> {
        self.all_of_kind(kind).iter().find(|e| e.id == id)
    }

    /// Total number of entries across all kinds.
    pub fn len(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Parse one seed file into catalog entries, rejecting duplicate ids.
fn load_kind_from_json(path: &Path, kind: CatalogKind) -> Result<Vec<CatalogEntry>, AdminError> {
    let contents = fs::read_to_string(path).map_err(|e| {
        AdminError::CatalogLoad(format!("failed to read {}: {}", path.display(), e))
    })?;

    let seeds: Vec<CatalogSeed> = serde_json::from_str(&contents).map_err(|e| {
        AdminError::CatalogLoad(format!("failed to parse {}: {}", path.display(), e))
    })?;

    let mut entries = Vec::with_capacity(seeds.len());
    for seed in seeds {
        let entry = seed.into_entry(kind);
        if entries.iter().any(|e: &CatalogEntry| e.id == entry.id) {
            return Err(AdminError::CatalogLoad(format!(
                "duplicate {} id {} in {}",
                kind,
                entry.id,
                path.display()
            )));
        }
        entries.push(entry);
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(kind: CatalogKind, name: &str, display: &str) -> CatalogEntry {
        CatalogEntry {
            id: format!("minecraft:{}", name),
            display_name: display.to_string(),
            kind,
            max_level: None,
            stackable: false,
        }
    }

    #[test]
    fn test_load_nonexistent_dir_yields_empty_catalog() {
        // Missing seed files are tolerated per kind.
        let catalog = Catalog::load("no-such-dir").unwrap();
        assert!(catalog.is_empty());
    }

    #[test]
    fn test_seed_conversion_namespaces_and_lowercases() {
        let seed = CatalogSeed {
            name: "DIAMOND_SWORD".to_string(),
            display_name: "Diamond Sword".to_string(),
            max_level: None,
            stack_size: Some(1),
        };
        let entry = seed.into_entry(CatalogKind::Item);
        assert_eq!(entry.id, "minecraft:diamond_sword");
        assert!(!entry.stackable);
    }

    #[test]
    fn test_stackable_derived_from_stack_size() {
        let seed = CatalogSeed {
            name: "cobblestone".to_string(),
            display_name: "Cobblestone".to_string(),
            max_level: None,
            stack_size: Some(64),
        };
        assert!(seed.into_entry(CatalogKind::Item).stackable);
    }

    #[test]
    fn test_from_entries_rejects_duplicate_ids_within_kind() {
        let records = vec![
            entry(CatalogKind::Effect, "speed", "Speed"),
            entry(CatalogKind::Effect, "speed", "Speed II"),
        ];
        let err = Catalog::from_entries(records).unwrap_err();
        assert!(matches!(err, AdminError::CatalogLoad(_)));
    }

    #[test]
    fn test_same_id_allowed_across_kinds() {
        // Ids are only unique within a kind.
        let records = vec![
            entry(CatalogKind::Item, "luck", "Luck Item"),
            entry(CatalogKind::Effect, "luck", "Luck"),
        ];
        let catalog = Catalog::from_entries(records).unwrap();
        assert_eq!(catalog.all_of_kind(CatalogKind::Item).len(), 1);
        assert_eq!(catalog.all_of_kind(CatalogKind::Effect).len(), 1);
    }

    #[test]
    fn test_all_of_kind_preserves_order() {
        let records = vec![
            entry(CatalogKind::Item, "stone", "Stone"),
            entry(CatalogKind::Item, "stick", "Stick"),
            entry(CatalogKind::Item, "string", "String"),
        ];
        let catalog = Catalog::from_entries(records).unwrap();
        let names: Vec<_> = catalog
            .all_of_kind(CatalogKind::Item)
            .iter()
            .map(|e| e.display_name.as_str())
            .collect();
        assert_eq!(names, vec!["Stone", "Stick", "String"]);
    }

    #[test]
    fn test_get_by_id() {
        let records = vec![entry(CatalogKind::Enchantment, "sharpness", "Sharpness")];
        let catalog = Catalog::from_entries(records).unwrap();
        assert!(catalog
            .get(CatalogKind::Enchantment, "minecraft:sharpness")
            .is_some());
        assert!(catalog.get(CatalogKind::Item, "minecraft:sharpness").is_none());
    }
}
