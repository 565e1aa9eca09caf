//! Static item metadata as delivered by the item catalog.
//!
//! Every concrete item variant implements [`ItemAttributes`]; callers go through
//! [`ItemKind::attributes`] and never match on the variant themselves.

use serde::{Deserialize, Serialize};

use super::entities::ItemId;

/// Tier/level value used by the catalog when an item has no tier.
pub const UNKNOWN_TIER: i32 = -1;

fn unknown_tier() -> i32 {
    UNKNOWN_TIER
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ItemMetadata {
    pub unique_name: ItemId,
    #[serde(default)]
    pub localized_name: Option<String>,
    #[serde(default = "unknown_tier")]
    pub tier: i32,
    /// Enchantment level (`@n` suffix in the unique name).
    #[serde(default)]
    pub level: i32,
    pub kind: ItemKind,
}

impl ItemMetadata {
    pub fn attributes(&self) -> &dyn ItemAttributes {
        self.kind.attributes()
    }

    pub fn weight(&self) -> f64 {
        self.attributes().shop().weight
    }

    /// Display name, falling back to the unique name.
    pub fn display_name(&self) -> &str {
        self.localized_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(&self.unique_name)
    }

    /// Header label like `T4.1`; empty when tier or level is unknown.
    pub fn tier_level_label(&self) -> String {
        if self.tier == UNKNOWN_TIER || self.level == UNKNOWN_TIER {
            String::new()
        } else {
            format!("T{}.{}", self.tier, self.level)
        }
    }

    pub fn extra_information(&self) -> ExtraItemInformation {
        let attributes = self.attributes();
        let shop = attributes.shop();
        ExtraItemInformation {
            shop_category: shop.shop_category.clone(),
            shop_sub_category: shop.shop_sub_category.clone(),
            weight: shop.weight,
            durability: attributes.durability(),
            show_in_marketplace: attributes.show_in_marketplace(),
            can_be_overcharged: attributes.can_be_overcharged(),
        }
    }
}

/// Flattened shop attributes for display next to the price table.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ExtraItemInformation {
    pub shop_category: String,
    pub shop_sub_category: String,
    pub weight: f64,
    pub durability: Option<f64>,
    pub show_in_marketplace: Option<bool>,
    pub can_be_overcharged: Option<bool>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ShopInfo {
    #[serde(default)]
    pub shop_category: String,
    #[serde(default)]
    pub shop_sub_category: String,
    #[serde(default)]
    pub weight: f64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CraftResource {
    pub unique_name: ItemId,
    pub count: u32,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CraftingRequirement {
    #[serde(default)]
    pub resources: Vec<CraftResource>,
    /// Items produced per crafting action.
    #[serde(default)]
    pub amount_crafted: Option<u32>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enchantment {
    pub enchantment_level: i32,
    #[serde(default)]
    pub crafting_requirements: Vec<CraftingRequirement>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JournalType {
    Warrior,
    Hunter,
    Mage,
    Toolmaker,
}

impl JournalType {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Warrior => "WARRIOR",
            Self::Hunter => "HUNTER",
            Self::Mage => "MAGE",
            Self::Toolmaker => "TOOLMAKER",
        }
    }
}

/// Capability interface shared by all item variants.
pub trait ItemAttributes {
    fn shop(&self) -> &ShopInfo;

    fn durability(&self) -> Option<f64> {
        None
    }

    fn show_in_marketplace(&self) -> Option<bool> {
        None
    }

    fn can_be_overcharged(&self) -> Option<bool> {
        None
    }

    fn crafting_requirements(&self) -> &[CraftingRequirement] {
        &[]
    }

    fn enchantments(&self) -> &[Enchantment] {
        &[]
    }

    fn crafting_journal_type(&self) -> Option<JournalType> {
        None
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ItemKind {
    Weapon(WeaponItem),
    Equipment(EquipmentItem),
    Mount(MountItem),
    Consumable(ConsumableItem),
    Farmable(FarmableItem),
    Furniture(FurnitureItem),
    ConsumableFromInventory(BasicItem),
    Hideout(BasicItem),
    Journal(BasicItem),
    LabourerContract(BasicItem),
    CrystalLeague(BasicItem),
    Simple(BasicItem),
}

impl ItemKind {
    pub fn attributes(&self) -> &dyn ItemAttributes {
        match self {
            Self::Weapon(item) => item,
            Self::Equipment(item) => item,
            Self::Mount(item) => item,
            Self::Consumable(item) => item,
            Self::Farmable(item) => item,
            Self::Furniture(item) => item,
            Self::ConsumableFromInventory(item)
            | Self::Hideout(item)
            | Self::Journal(item)
            | Self::LabourerContract(item)
            | Self::CrystalLeague(item)
            | Self::Simple(item) => item,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct WeaponItem {
    pub shop: ShopInfo,
    #[serde(default)]
    pub durability: f64,
    #[serde(default)]
    pub can_be_overcharged: bool,
    #[serde(default)]
    pub show_in_marketplace: bool,
    #[serde(default)]
    pub crafting_requirements: Vec<CraftingRequirement>,
    #[serde(default)]
    pub crafting_journal_type: Option<JournalType>,
}

impl ItemAttributes for WeaponItem {
    fn shop(&self) -> &ShopInfo {
        &self.shop
    }

    fn durability(&self) -> Option<f64> {
        Some(self.durability)
    }

    fn show_in_marketplace(&self) -> Option<bool> {
        Some(self.show_in_marketplace)
    }

    fn can_be_overcharged(&self) -> Option<bool> {
        Some(self.can_be_overcharged)
    }

    fn crafting_requirements(&self) -> &[CraftingRequirement] {
        &self.crafting_requirements
    }

    fn crafting_journal_type(&self) -> Option<JournalType> {
        self.crafting_journal_type
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EquipmentItem {
    pub shop: ShopInfo,
    #[serde(default)]
    pub durability: f64,
    #[serde(default)]
    pub can_be_overcharged: bool,
    #[serde(default)]
    pub show_in_marketplace: bool,
    #[serde(default)]
    pub crafting_requirements: Vec<CraftingRequirement>,
    #[serde(default)]
    pub enchantments: Vec<Enchantment>,
    #[serde(default)]
    pub crafting_journal_type: Option<JournalType>,
}

impl ItemAttributes for EquipmentItem {
    fn shop(&self) -> &ShopInfo {
        &self.shop
    }

    fn durability(&self) -> Option<f64> {
        Some(self.durability)
    }

    fn show_in_marketplace(&self) -> Option<bool> {
        Some(self.show_in_marketplace)
    }

    fn can_be_overcharged(&self) -> Option<bool> {
        Some(self.can_be_overcharged)
    }

    fn crafting_requirements(&self) -> &[CraftingRequirement] {
        &self.crafting_requirements
    }

    fn enchantments(&self) -> &[Enchantment] {
        &self.enchantments
    }

    fn crafting_journal_type(&self) -> Option<JournalType> {
        self.crafting_journal_type
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MountItem {
    pub shop: ShopInfo,
    #[serde(default)]
    pub durability: f64,
    #[serde(default)]
    pub show_in_marketplace: bool,
    #[serde(default)]
    pub crafting_requirements: Vec<CraftingRequirement>,
}

impl ItemAttributes for MountItem {
    fn shop(&self) -> &ShopInfo {
        &self.shop
    }

    fn durability(&self) -> Option<f64> {
        Some(self.durability)
    }

    fn show_in_marketplace(&self) -> Option<bool> {
        Some(self.show_in_marketplace)
    }

    fn crafting_requirements(&self) -> &[CraftingRequirement] {
        &self.crafting_requirements
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ConsumableItem {
    pub shop: ShopInfo,
    #[serde(default)]
    pub crafting_requirements: Vec<CraftingRequirement>,
    #[serde(default)]
    pub enchantments: Vec<Enchantment>,
}

impl ItemAttributes for ConsumableItem {
    fn shop(&self) -> &ShopInfo {
        &self.shop
    }

    fn crafting_requirements(&self) -> &[CraftingRequirement] {
        &self.crafting_requirements
    }

    fn enchantments(&self) -> &[Enchantment] {
        &self.enchantments
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FarmableItem {
    pub shop: ShopInfo,
    #[serde(default)]
    pub show_in_marketplace: bool,
}

impl ItemAttributes for FarmableItem {
    fn shop(&self) -> &ShopInfo {
        &self.shop
    }

    fn show_in_marketplace(&self) -> Option<bool> {
        Some(self.show_in_marketplace)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FurnitureItem {
    pub shop: ShopInfo,
    #[serde(default)]
    pub durability: f64,
    #[serde(default)]
    pub show_in_marketplace: bool,
}

impl ItemAttributes for FurnitureItem {
    fn shop(&self) -> &ShopInfo {
        &self.shop
    }

    fn durability(&self) -> Option<f64> {
        Some(self.durability)
    }

    fn show_in_marketplace(&self) -> Option<bool> {
        Some(self.show_in_marketplace)
    }
}

/// Items that only carry shop attributes.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BasicItem {
    pub shop: ShopInfo,
}

impl ItemAttributes for BasicItem {
    fn shop(&self) -> &ShopInfo {
        &self.shop
    }
}
