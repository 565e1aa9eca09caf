//! Crafting cost breakdown for a single item.
//!
//! A [`CraftingPlan`] is prepared once per item from the catalog (requirements,
//! resource lines, optional journal). Every change of the economic inputs or of
//! the market then runs [`CraftingPlan::recalculate`], which rebuilds the whole
//! [`CraftingCalculation`] from scratch.

use std::collections::{BTreeMap, HashSet};

use log::warn;

use super::aggregation::AggregatedTable;
use super::entities::{ItemId, MarketLocation, Observation, PriceKey, Quality};
use super::item::{CraftingRequirement, ItemMetadata};
use super::rules;
use super::sources::ItemCatalog;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ResourceClass {
    Normal,
    Artifact,
    TomeOfInsight,
    AvalonianEnergy,
}

impl ResourceClass {
    /// Classifies a resolved resource name by case-insensitive substring.
    pub fn classify(resource_id: &str) -> Self {
        let upper = resource_id.to_ascii_uppercase();
        if upper.contains("ARTEFACT") {
            Self::Artifact
        } else if upper.contains("SKILLBOOK_STANDARD") {
            Self::TomeOfInsight
        } else if upper.contains("QUESTITEM_TOKEN_AVALON") {
            Self::AvalonianEnergy
        } else {
            Self::Normal
        }
    }

    /// Special resources are needed once per crafted item, not per input unit.
    pub fn is_special(&self) -> bool {
        !matches!(self, Self::Normal)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RequirementSource {
    Base,
    Enchantment(i32),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequirementEntry {
    pub resource_id: ItemId,
    pub count_per_craft: u32,
    pub crafted_amount_per_action: u32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CraftingRequirementSet {
    pub source: RequirementSource,
    pub entries: Vec<RequirementEntry>,
}

impl CraftingRequirementSet {
    fn from_requirements(source: RequirementSource, requirements: &[CraftingRequirement]) -> Self {
        let entries = requirements
            .iter()
            .flat_map(|requirement| {
                let crafted = requirement.amount_crafted.unwrap_or(1).max(1);
                requirement.resources.iter().map(move |resource| RequirementEntry {
                    resource_id: resource.unique_name.clone(),
                    count_per_craft: resource.count,
                    crafted_amount_per_action: crafted,
                })
            })
            .collect();
        Self { source, entries }
    }

    /// Resources consumed by one craft of this set.
    pub fn resources_per_craft(&self) -> u32 {
        self.entries
            .iter()
            .fold(0_u32, |sum, entry| sum.saturating_add(entry.count_per_craft))
    }

    /// Items produced per crafting action, taken from the first requirement.
    pub fn amount_crafted(&self) -> u32 {
        self.entries
            .first()
            .map(|entry| entry.crafted_amount_per_action)
            .unwrap_or(1)
    }
}

/// Picks the enchantment override matching the item's level, falling back to
/// the base requirements. `None` means the item cannot be crafted.
pub fn select_requirements(item: &ItemMetadata) -> Option<CraftingRequirementSet> {
    let attributes = item.attributes();

    let overridden = attributes
        .enchantments()
        .iter()
        .find(|enchantment| enchantment.enchantment_level == item.level)
        .filter(|enchantment| !enchantment.crafting_requirements.is_empty())
        .map(|enchantment| {
            CraftingRequirementSet::from_requirements(
                RequirementSource::Enchantment(enchantment.enchantment_level),
                &enchantment.crafting_requirements,
            )
        });

    let set = overridden.unwrap_or_else(|| {
        CraftingRequirementSet::from_requirements(
            RequirementSource::Base,
            attributes.crafting_requirements(),
        )
    });

    if set.entries.is_empty() {
        None
    } else {
        Some(set)
    }
}

/// Looks up `{id}_LEVEL{n}@{n}` first, then the bare id.
pub fn resolve_resource(
    catalog: &dyn ItemCatalog,
    resource_id: &str,
    item_level: i32,
) -> Option<ItemMetadata> {
    let leveled = format!("{resource_id}_LEVEL{item_level}@{item_level}");
    catalog
        .lookup(&leveled)
        .or_else(|| catalog.lookup(resource_id))
}

/// User-editable economic inputs of the crafting calculation.
#[derive(Clone, Debug, PartialEq)]
pub struct EconomicInputs {
    pub crafting_item_quantity: u32,
    pub crafting_bonus_percent: f64,
    pub is_using_focus: bool,
    pub usage_fee_per_hundred_food: u32,
    pub setup_fee_percent: f64,
    pub auction_house_tax_percent: f64,
    pub sell_price_per_item: u64,
    /// When set, the sell price is read from this market at the selected quality.
    pub sell_price_location: Option<MarketLocation>,
    pub amount_crafted: u32,
    pub other_costs: u64,
    pub resource_costs: BTreeMap<ItemId, u64>,
    pub journal_cost: u64,
    pub journal_sell_price: u64,
}

impl Default for EconomicInputs {
    fn default() -> Self {
        Self {
            crafting_item_quantity: 1,
            crafting_bonus_percent: 100.0,
            is_using_focus: false,
            usage_fee_per_hundred_food: 0,
            setup_fee_percent: 1.5,
            auction_house_tax_percent: 4.0,
            sell_price_per_item: 0,
            sell_price_location: None,
            amount_crafted: 1,
            other_costs: 0,
            resource_costs: BTreeMap::new(),
            journal_cost: 0,
            journal_sell_price: 0,
        }
    }
}

impl EconomicInputs {
    /// Unrounded number of items the configured craft can produce.
    pub fn possible_item_crafting(&self) -> f64 {
        let focus = if self.is_using_focus {
            rules::FOCUS_MULTIPLIER
        } else {
            1.0
        };
        (self.crafting_item_quantity as f64 / 100.0 * self.crafting_bonus_percent * focus).max(0.0)
    }

    pub fn resource_cost(&self, resource_id: &str) -> u64 {
        self.resource_costs.get(resource_id).copied().unwrap_or(0)
    }

    /// Inputs with the sell price replaced by the market's minimum sell price,
    /// when a sell-price location is configured and has reported one.
    pub fn with_market_sell_price(&self, table: &AggregatedTable, quality: Quality) -> Self {
        let mut inputs = self.clone();
        let market_price = self.sell_price_location.and_then(|location| {
            table
                .get(PriceKey { location, quality })
                .map(|entry| entry.quote.sell_price_min)
                .filter(Observation::is_known)
                .map(|observation| observation.price)
        });
        if let Some(price) = market_price {
            inputs.sell_price_per_item = price;
        }
        inputs
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct RequiredResource {
    pub resource_id: ItemId,
    pub display_name: String,
    pub class: ResourceClass,
    pub unit_weight: f64,
    pub per_craft_count: u32,
    pub crafting_quantity: u64,
    pub unit_cost: u64,
    pub total_cost: u64,
    pub total_weight: f64,
}

impl RequiredResource {
    pub fn total_quantity(&self) -> u64 {
        u64::from(self.per_craft_count).saturating_mul(self.crafting_quantity)
    }

    fn refresh_totals(&mut self) {
        let quantity = self.total_quantity();
        self.total_cost = self.unit_cost.saturating_mul(quantity);
        self.total_weight = quantity as f64 * self.unit_weight;
    }
}

/// Resource lines for a requirement set, one per resolved resource.
///
/// Special resources are seeded with the possible output rounded *up*;
/// [`CraftingPlan::recalculate`] later syncs them rounded *down*.
pub fn build_required_resources(
    catalog: &dyn ItemCatalog,
    requirements: &CraftingRequirementSet,
    item_level: i32,
    inputs: &EconomicInputs,
) -> Vec<RequiredResource> {
    let seeded_possible = inputs.possible_item_crafting().ceil() as u64;
    let mut seen = HashSet::new();
    let mut resources = Vec::new();

    for entry in &requirements.entries {
        let (resource_id, display_name, unit_weight) =
            match resolve_resource(catalog, &entry.resource_id, item_level) {
                Some(resolved) => (
                    resolved.unique_name.clone(),
                    resolved.display_name().to_string(),
                    resolved.weight(),
                ),
                None => {
                    warn!(
                        "[crafting] Resource {} not found in catalog; weight unknown",
                        entry.resource_id
                    );
                    (entry.resource_id.clone(), entry.resource_id.clone(), 0.0)
                }
            };

        if !seen.insert(resource_id.clone()) {
            continue;
        }

        let class = ResourceClass::classify(&resource_id);
        let crafting_quantity = if class.is_special() {
            seeded_possible
        } else {
            u64::from(inputs.crafting_item_quantity)
        };

        let mut resource = RequiredResource {
            unit_cost: inputs.resource_cost(&resource_id),
            resource_id,
            display_name,
            class,
            unit_weight,
            per_craft_count: entry.count_per_craft,
            crafting_quantity,
            total_cost: 0,
            total_weight: 0.0,
        };
        resource.refresh_totals();
        resources.push(resource);
    }

    resources
}

#[derive(Clone, Debug, PartialEq)]
pub struct RequiredJournal {
    pub journal_id: ItemId,
    pub unit_cost: u64,
    pub unit_sell_price: u64,
    pub required_amount: f64,
    pub unit_weight: f64,
}

impl RequiredJournal {
    pub fn total_weight(&self) -> f64 {
        self.required_amount * self.unit_weight
    }
}

/// Journal line for items whose category fills a crafting journal.
pub fn build_required_journal(
    catalog: &dyn ItemCatalog,
    item: &ItemMetadata,
    requirements: &CraftingRequirementSet,
    inputs: &EconomicInputs,
) -> Option<RequiredJournal> {
    let journal_id = rules::crafting_journal_id(item)?;
    let unit_weight = catalog
        .lookup(rules::general_journal_name(&journal_id))
        .or_else(|| catalog.lookup(&journal_id))
        .map(|journal| journal.weight())
        .unwrap_or(0.0);

    Some(RequiredJournal {
        required_amount: rules::required_journal_amount(
            item,
            requirements.resources_per_craft(),
            inputs.possible_item_crafting().floor(),
        ),
        journal_id,
        unit_cost: inputs.journal_cost,
        unit_sell_price: inputs.journal_sell_price,
        unit_weight,
    })
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct CraftingCalculation {
    pub possible_item_crafting: f64,
    pub crafting_tax: f64,
    pub setup_fee: f64,
    pub auction_house_tax: f64,
    pub total_resource_costs: f64,
    pub other_costs: f64,
    pub total_item_sells: f64,
    pub total_journal_costs: f64,
    pub total_journal_sells: f64,
    pub amount_crafted: u32,
    pub total_resources_weight: f64,
    pub total_required_journal_weight: f64,
    pub total_unfinished_crafting_weight: f64,
    pub total_crafted_item_weight: f64,
    pub total_finished_crafting_weight: f64,
    pub total_costs: f64,
    /// Sales minus costs; negative when the craft loses money.
    pub grand_total: f64,
}

/// Result of one recalculation pass.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CraftingOutcome {
    pub calculation: CraftingCalculation,
    pub resources: Vec<RequiredResource>,
    pub journal: Option<RequiredJournal>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CraftingPlan {
    pub requirements: CraftingRequirementSet,
    pub resources: Vec<RequiredResource>,
    pub journal: Option<RequiredJournal>,
}

impl CraftingPlan {
    /// `None` when the item has no crafting requirements.
    pub fn prepare(
        catalog: &dyn ItemCatalog,
        item: &ItemMetadata,
        inputs: &EconomicInputs,
    ) -> Option<Self> {
        let requirements = select_requirements(item)?;
        let resources = build_required_resources(catalog, &requirements, item.level, inputs);
        let journal = build_required_journal(catalog, item, &requirements, inputs);
        Some(Self {
            requirements,
            resources,
            journal,
        })
    }

    pub fn recalculate(&self, item: &ItemMetadata, inputs: &EconomicInputs) -> CraftingOutcome {
        recalculate(
            item,
            self.requirements.resources_per_craft(),
            &self.resources,
            self.journal.as_ref(),
            inputs,
        )
    }
}

/// Rebuilds the full calculation from the given inputs; nothing from a
/// previous pass is reused. `resources_per_craft` belongs to the selected
/// requirement set.
pub fn recalculate(
    item: &ItemMetadata,
    resources_per_craft: u32,
    resources: &[RequiredResource],
    journal: Option<&RequiredJournal>,
    inputs: &EconomicInputs,
) -> CraftingOutcome {
    let possible_item_crafting = inputs.possible_item_crafting().floor();

    let resources: Vec<RequiredResource> = resources
        .iter()
        .map(|resource| {
            let mut resource = resource.clone();
            resource.crafting_quantity = if resource.class.is_special() {
                possible_item_crafting as u64
            } else {
                u64::from(inputs.crafting_item_quantity)
            };
            resource.unit_cost = inputs.resource_cost(&resource.resource_id);
            resource.refresh_totals();
            resource
        })
        .collect();

    let crafting_tax = rules::crafting_tax(
        inputs.usage_fee_per_hundred_food,
        item,
        resources_per_craft,
        possible_item_crafting,
    );
    let setup_fee = rules::setup_fee(
        inputs.crafting_item_quantity,
        inputs.setup_fee_percent,
        inputs.sell_price_per_item,
    );
    let auction_house_tax = rules::auction_house_tax(
        inputs.sell_price_per_item,
        inputs.crafting_item_quantity,
        inputs.auction_house_tax_percent,
    );
    let total_resource_costs = resources
        .iter()
        .map(|resource| resource.total_cost as f64)
        .sum::<f64>();
    let other_costs = inputs.other_costs as f64;
    let total_item_sells = inputs.sell_price_per_item as f64
        * (possible_item_crafting * f64::from(inputs.amount_crafted));

    let journal = journal.map(|journal| RequiredJournal {
        required_amount: rules::required_journal_amount(
            item,
            resources_per_craft,
            possible_item_crafting,
        ),
        unit_cost: inputs.journal_cost,
        unit_sell_price: inputs.journal_sell_price,
        ..journal.clone()
    });
    let (total_journal_costs, total_journal_sells, total_required_journal_weight) = journal
        .as_ref()
        .map(|journal| {
            (
                journal.unit_cost as f64 * journal.required_amount,
                journal.required_amount * journal.unit_sell_price as f64,
                journal.total_weight(),
            )
        })
        .unwrap_or((0.0, 0.0, 0.0));

    let total_resources_weight = resources
        .iter()
        .map(|resource| resource.total_weight)
        .sum::<f64>();
    let total_crafted_item_weight = possible_item_crafting * item.weight().max(0.0);

    let total_costs = crafting_tax
        + setup_fee
        + auction_house_tax
        + total_resource_costs
        + total_journal_costs
        + other_costs;

    let calculation = CraftingCalculation {
        possible_item_crafting,
        crafting_tax,
        setup_fee,
        auction_house_tax,
        total_resource_costs,
        other_costs,
        total_item_sells,
        total_journal_costs,
        total_journal_sells,
        amount_crafted: inputs.amount_crafted,
        total_resources_weight,
        total_required_journal_weight,
        total_unfinished_crafting_weight: total_resources_weight + total_required_journal_weight,
        total_crafted_item_weight,
        total_finished_crafting_weight: total_crafted_item_weight,
        total_costs,
        grand_total: total_item_sells + total_journal_sells - total_costs,
    };

    CraftingOutcome {
        calculation,
        resources,
        journal,
    }
}
