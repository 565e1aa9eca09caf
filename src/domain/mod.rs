//! Market aggregation and crafting logic lives here.

pub mod aggregation;
pub mod crafting;
pub mod entities;
pub mod item;
pub mod rules;
pub mod settings;
pub mod sources;

pub use aggregation::{AggregatedEntry, AggregatedTable, AveragePrices, MergeStats, PriceFilter};
pub use crafting::{
    build_required_journal, build_required_resources, recalculate, resolve_resource,
    select_requirements, CraftingCalculation, CraftingOutcome, CraftingPlan,
    CraftingRequirementSet, EconomicInputs, RequiredJournal, RequiredResource,
    RequirementEntry, RequirementSource, ResourceClass,
};
pub use entities::{ItemId, MarketLocation, Observation, PriceKey, PriceQuote, Quality};
pub use item::{ExtraItemInformation, ItemAttributes, ItemKind, ItemMetadata, JournalType};
pub use settings::SessionSettings;
pub use sources::{ItemCatalog, PriceSource, PriceSourceError};
