//! Item catalog loaded from a JSON dump on disk.

use std::{
    collections::HashMap,
    fs, io,
    path::{Path, PathBuf},
};

use log::{info, warn};
use thiserror::Error;

use crate::domain::{ItemCatalog, ItemId, ItemMetadata};

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read item catalog {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse item catalog {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// In-memory index over a JSON array of [`ItemMetadata`].
#[derive(Debug, Default, Clone)]
pub struct JsonItemCatalog {
    items: HashMap<ItemId, ItemMetadata>,
}

impl JsonItemCatalog {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let catalog = Self::from_json(&content).map_err(|source| CatalogError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        info!(
            "[catalog] Loaded {} items from {}",
            catalog.len(),
            path.display()
        );
        Ok(catalog)
    }

    pub fn from_json(content: &str) -> Result<Self, serde_json::Error> {
        let items: Vec<ItemMetadata> = serde_json::from_str(content)?;
        Ok(Self::from_items(items))
    }

    /// Later duplicates replace earlier ones.
    pub fn from_items(items: impl IntoIterator<Item = ItemMetadata>) -> Self {
        let mut index = HashMap::new();
        for item in items {
            if let Some(previous) = index.insert(item.unique_name.clone(), item) {
                warn!("[catalog] Duplicate entry for {}", previous.unique_name);
            }
        }
        Self { items: index }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl ItemCatalog for JsonItemCatalog {
    fn lookup(&self, item_id: &str) -> Option<ItemMetadata> {
        self.items.get(item_id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;
    use crate::domain::ItemKind;

    const CATALOG: &str = r#"[
        {
            "unique_name": "T4_METALBAR",
            "localized_name": "Steel Bar",
            "tier": 4,
            "kind": { "type": "simple", "shop": { "weight": 0.8 } }
        },
        {
            "unique_name": "T4_MAIN_SWORD",
            "localized_name": "Adept's Broadsword",
            "tier": 4,
            "kind": {
                "type": "weapon",
                "shop": { "shop_category": "melee", "shop_sub_category": "sword", "weight": 3.0 },
                "durability": 1000.0,
                "crafting_requirements": [
                    { "resources": [ { "unique_name": "T4_METALBAR", "count": 16 } ], "amount_crafted": 1 }
                ],
                "crafting_journal_type": "WARRIOR"
            }
        }
    ]"#;

    #[test]
    fn loads_items_from_file() {
        let mut file = NamedTempFile::new().expect("temp file");
        file.write_all(CATALOG.as_bytes()).expect("write catalog");

        let catalog = JsonItemCatalog::load(file.path()).expect("catalog loads");
        assert_eq!(catalog.len(), 2);

        let sword = catalog.lookup("T4_MAIN_SWORD").expect("sword present");
        assert!(matches!(sword.kind, ItemKind::Weapon(_)));
        assert_eq!(sword.level, 0);
        assert_eq!(sword.attributes().crafting_requirements().len(), 1);
        assert!(catalog.lookup("T4_MAIN_AXE").is_none());
    }

    #[test]
    fn missing_file_reports_path() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("items.json");

        let error = JsonItemCatalog::load(&path).expect_err("missing file");
        assert!(matches!(error, CatalogError::Io { .. }));
        assert!(error.to_string().contains("items.json"));
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        let mut file = NamedTempFile::new().expect("temp file");
        file.write_all(b"{ not json").expect("write catalog");

        let error = JsonItemCatalog::load(file.path()).expect_err("bad json");
        assert!(matches!(error, CatalogError::Parse { .. }));
    }
}
