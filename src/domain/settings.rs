use std::{
    collections::{BTreeMap, BTreeSet},
    time::Duration,
};

use serde::{Deserialize, Serialize};

use super::aggregation::PriceFilter;
use super::entities::{ItemId, MarketLocation, Quality};

pub const DEFAULT_REFRESH_INTERVAL_MS: u64 = 10_000;

/// Lower bound so a zero interval cannot spin the refresh loop.
pub const MIN_REFRESH_INTERVAL_MS: u64 = 250;

/// Per-user settings consumed by an item session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    pub refresh_interval_ms: u64,
    pub selected_quality: Quality,
    pub enabled_locations: BTreeSet<MarketLocation>,
    pub crafting_notes: BTreeMap<ItemId, String>,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            refresh_interval_ms: DEFAULT_REFRESH_INTERVAL_MS,
            selected_quality: Quality::Normal,
            enabled_locations: MarketLocation::ALL.into_iter().collect(),
            crafting_notes: BTreeMap::new(),
        }
    }
}

impl SessionSettings {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms.max(MIN_REFRESH_INTERVAL_MS))
    }

    pub fn price_filter(&self) -> PriceFilter {
        PriceFilter {
            enabled_locations: self.enabled_locations.clone(),
            quality: self.selected_quality,
        }
    }

    pub fn set_location_enabled(&mut self, location: MarketLocation, enabled: bool) {
        if enabled {
            self.enabled_locations.insert(location);
        } else {
            self.enabled_locations.remove(&location);
        }
    }

    pub fn note(&self, item_id: &str) -> Option<&str> {
        self.crafting_notes.get(item_id).map(String::as_str)
    }

    /// Stores a note; blank text removes it.
    pub fn set_note(&mut self, item_id: &str, note: &str) {
        if note.trim().is_empty() {
            self.crafting_notes.remove(item_id);
        } else {
            self.crafting_notes
                .insert(item_id.to_string(), note.to_string());
        }
    }
}
