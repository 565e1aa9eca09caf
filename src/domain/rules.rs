//! Game economy formulas used by the crafting calculation.
//!
//! All functions are pure and only depend on their arguments.

use super::entities::ItemId;
use super::item::{ItemMetadata, JournalType};

/// Nutrition consumed per point of item value.
const NUTRITION_PER_ITEM_VALUE: f64 = 0.1125;

/// Crafting fame granted per resource, indexed by tier (T0..=T8).
const FAME_PER_RESOURCE: [f64; 9] = [0.0, 0.0, 1.5, 7.5, 22.5, 90.0, 270.0, 645.0, 1395.0];

/// Fame needed to fill one crafting journal, indexed by tier (T0..=T8).
const JOURNAL_CAPACITY: [f64; 9] = [
    0.0, 0.0, 3_600.0, 7_200.0, 14_400.0, 28_800.0, 57_600.0, 115_200.0, 230_400.0,
];

/// Focus raises the possible output by 23.1 %.
pub const FOCUS_MULTIPLIER: f64 = 23.1 / 100.0 + 1.0;

/// `resources_per_craft` comes from the requirement set actually crafted.
pub fn item_value(item: &ItemMetadata, resources_per_craft: u32) -> f64 {
    if item.tier < 0 {
        return 0.0;
    }
    let level = item.level.max(0);
    resources_per_craft as f64 * 2f64.powi(item.tier + level)
}

/// Station usage fee for crafting `possible_item_crafting` items.
pub fn crafting_tax(
    usage_fee_per_hundred: u32,
    item: &ItemMetadata,
    resources_per_craft: u32,
    possible_item_crafting: f64,
) -> f64 {
    let nutrition = item_value(item, resources_per_craft) * NUTRITION_PER_ITEM_VALUE;
    (nutrition * usage_fee_per_hundred as f64 / 100.0 * possible_item_crafting).max(0.0)
}

/// Market setup fee for listing the crafted items.
pub fn setup_fee(
    crafting_item_quantity: u32,
    setup_fee_percent: f64,
    sell_price_per_item: u64,
) -> f64 {
    if crafting_item_quantity == 0 || setup_fee_percent <= 0.0 || sell_price_per_item == 0 {
        return 0.0;
    }
    crafting_item_quantity as f64 * sell_price_per_item as f64 / 100.0 * setup_fee_percent
}

/// Auction house tax with whole-number truncation at every step.
pub fn auction_house_tax(
    sell_price_per_item: u64,
    crafting_item_quantity: u32,
    tax_percent: f64,
) -> f64 {
    let percent = tax_percent.max(0.0).trunc() as u64;
    let gross = sell_price_per_item.saturating_mul(u64::from(crafting_item_quantity));
    (gross / 100).saturating_mul(percent) as f64
}

/// Number of journals filled by crafting `possible_item_crafting` items.
pub fn required_journal_amount(
    item: &ItemMetadata,
    resources_per_craft: u32,
    possible_item_crafting: f64,
) -> f64 {
    if possible_item_crafting < 1.0 || !(2..=8).contains(&item.tier) {
        return 0.0;
    }

    let tier = item.tier as usize;
    let enchantment_factor = 2f64.powi(item.level.max(0));
    let fame_per_item =
        FAME_PER_RESOURCE[tier] * enchantment_factor * resources_per_craft as f64;
    let total_fame = fame_per_item * possible_item_crafting;

    (total_fame / JOURNAL_CAPACITY[tier]).ceil()
}

/// Empty journal that collects the crafting fame of `item`, if any.
pub fn crafting_journal_id(item: &ItemMetadata) -> Option<ItemId> {
    let journal_type: JournalType = item.attributes().crafting_journal_type()?;
    if !(2..=8).contains(&item.tier) {
        return None;
    }
    Some(format!("T{}_JOURNAL_{}_EMPTY", item.tier, journal_type.code()))
}

/// Journal name without the fill state suffix.
pub fn general_journal_name(journal_id: &str) -> &str {
    journal_id
        .strip_suffix("_EMPTY")
        .or_else(|| journal_id.strip_suffix("_FULL"))
        .unwrap_or(journal_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::item::{
        CraftResource, CraftingRequirement, ItemKind, ShopInfo, WeaponItem, UNKNOWN_TIER,
    };

    fn sword(tier: i32, level: i32) -> ItemMetadata {
        ItemMetadata {
            unique_name: format!("T{tier}_MAIN_SWORD"),
            localized_name: None,
            tier,
            level,
            kind: ItemKind::Weapon(WeaponItem {
                shop: ShopInfo::default(),
                crafting_requirements: vec![CraftingRequirement {
                    resources: vec![
                        CraftResource {
                            unique_name: format!("T{tier}_METALBAR"),
                            count: 16,
                        },
                        CraftResource {
                            unique_name: format!("T{tier}_LEATHER"),
                            count: 8,
                        },
                    ],
                    amount_crafted: Some(1),
                }],
                crafting_journal_type: Some(JournalType::Warrior),
                ..WeaponItem::default()
            }),
        }
    }

    #[test]
    fn crafting_tax_scales_with_fee_quantity_and_tier() {
        let t4 = sword(4, 0);
        let base = crafting_tax(100, &t4, 24, 10.0);
        assert!(base > 0.0);
        assert!((crafting_tax(200, &t4, 24, 10.0) - 2.0 * base).abs() < 1e-9);
        assert!((crafting_tax(100, &t4, 24, 20.0) - 2.0 * base).abs() < 1e-9);
        assert!((crafting_tax(100, &t4, 48, 10.0) - 2.0 * base).abs() < 1e-9);
        assert!(crafting_tax(100, &sword(5, 0), 24, 10.0) > base);
        assert_eq!(crafting_tax(0, &t4, 24, 10.0), 0.0);
    }

    #[test]
    fn setup_fee_needs_all_operands() {
        assert_eq!(setup_fee(10, 1.5, 1000), 150.0);
        assert_eq!(setup_fee(0, 1.5, 1000), 0.0);
        assert_eq!(setup_fee(10, 0.0, 1000), 0.0);
        assert_eq!(setup_fee(10, 1.5, 0), 0.0);
    }

    #[test]
    fn auction_house_tax_truncates() {
        // 199 * 1 / 100 = 1, * 4 = 4
        assert_eq!(auction_house_tax(199, 1, 4.0), 4.0);
        // percent cast truncates 3.9 -> 3
        assert_eq!(auction_house_tax(1000, 10, 3.9), 300.0);
        assert_eq!(auction_house_tax(1000, 10, -2.0), 0.0);
    }

    #[test]
    fn journal_amount_rounds_up_and_needs_output() {
        let t4 = sword(4, 0);
        // 22.5 fame * 24 resources = 540 per item; 30 items = 16200 fame / 14400
        assert_eq!(required_journal_amount(&t4, 24, 30.0), 2.0);
        assert_eq!(required_journal_amount(&t4, 24, 0.5), 0.0);
        assert_eq!(required_journal_amount(&sword(UNKNOWN_TIER, 0), 24, 30.0), 0.0);
    }

    #[test]
    fn journal_ids_follow_tier_and_type() {
        assert_eq!(
            crafting_journal_id(&sword(6, 2)).as_deref(),
            Some("T6_JOURNAL_WARRIOR_EMPTY")
        );
        assert_eq!(general_journal_name("T6_JOURNAL_WARRIOR_EMPTY"), "T6_JOURNAL_WARRIOR");
        assert_eq!(general_journal_name("T6_JOURNAL_WARRIOR_FULL"), "T6_JOURNAL_WARRIOR");
        assert_eq!(general_journal_name("T6_JOURNAL_WARRIOR"), "T6_JOURNAL_WARRIOR");
    }
}
