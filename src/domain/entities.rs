use std::fmt;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Unique item name as used by the game and the market API (`T4_BAG@1`).
pub type ItemId = String;

/// Market locations that report item prices.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MarketLocation {
    Caerleon,
    Thetford,
    FortSterling,
    Lymhurst,
    Bridgewatch,
    Martlock,
    Brecilien,
    ArthursRest,
    MerlynsRest,
    MorganasRest,
    BlackMarket,
    ForestCross,
    SwampCross,
    SteppeCross,
    HighlandCross,
    MountainCross,
}

impl MarketLocation {
    pub const ALL: [MarketLocation; 16] = [
        Self::Caerleon,
        Self::Thetford,
        Self::FortSterling,
        Self::Lymhurst,
        Self::Bridgewatch,
        Self::Martlock,
        Self::Brecilien,
        Self::ArthursRest,
        Self::MerlynsRest,
        Self::MorganasRest,
        Self::BlackMarket,
        Self::ForestCross,
        Self::SwampCross,
        Self::SteppeCross,
        Self::HighlandCross,
        Self::MountainCross,
    ];

    /// Location name as used by the market data API.
    pub fn api_name(&self) -> &'static str {
        match self {
            Self::Caerleon => "Caerleon",
            Self::Thetford => "Thetford",
            Self::FortSterling => "Fort Sterling",
            Self::Lymhurst => "Lymhurst",
            Self::Bridgewatch => "Bridgewatch",
            Self::Martlock => "Martlock",
            Self::Brecilien => "Brecilien",
            Self::ArthursRest => "Arthurs Rest",
            Self::MerlynsRest => "Merlyns Rest",
            Self::MorganasRest => "Morganas Rest",
            Self::BlackMarket => "Black Market",
            Self::ForestCross => "Forest Cross",
            Self::SwampCross => "Swamp Cross",
            Self::SteppeCross => "Steppe Cross",
            Self::HighlandCross => "Highland Cross",
            Self::MountainCross => "Mountain Cross",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::ArthursRest => "Arthur's Rest",
            Self::MerlynsRest => "Merlyn's Rest",
            Self::MorganasRest => "Morgana's Rest",
            other => other.api_name(),
        }
    }

    /// Parses an API location name, ignoring case, spaces and apostrophes.
    pub fn from_api_name(raw: &str) -> Option<Self> {
        let wanted = normalize_location(raw);
        Self::ALL
            .into_iter()
            .find(|location| normalize_location(location.api_name()) == wanted)
    }
}

fn normalize_location(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

impl fmt::Display for MarketLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Craft quality of an item, ranked 1 (Normal) to 5 (Masterpiece).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Quality {
    #[default]
    Normal = 1,
    Good = 2,
    Outstanding = 3,
    Excellent = 4,
    Masterpiece = 5,
}

impl Quality {
    pub const ALL: [Quality; 5] = [
        Self::Normal,
        Self::Good,
        Self::Outstanding,
        Self::Excellent,
        Self::Masterpiece,
    ];

    pub fn from_level(level: u8) -> Option<Self> {
        match level {
            1 => Some(Self::Normal),
            2 => Some(Self::Good),
            3 => Some(Self::Outstanding),
            4 => Some(Self::Excellent),
            5 => Some(Self::Masterpiece),
            _ => None,
        }
    }

    pub fn level(&self) -> u8 {
        *self as u8
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Normal => "Normal",
            Self::Good => "Good",
            Self::Outstanding => "Outstanding",
            Self::Excellent => "Excellent",
            Self::Masterpiece => "Masterpiece",
        }
    }
}

impl TryFrom<u8> for Quality {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::from_level(value).ok_or_else(|| format!("quality level {value} out of range 1-5"))
    }
}

impl From<Quality> for u8 {
    fn from(value: Quality) -> Self {
        value.level()
    }
}

/// One observed price together with the time it was observed.
/// A price of `0` means the market has not reported a value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Observation {
    pub price: u64,
    pub observed_at: OffsetDateTime,
}

impl Observation {
    pub fn new(price: u64, observed_at: OffsetDateTime) -> Self {
        Self { price, observed_at }
    }

    pub fn unknown() -> Self {
        Self {
            price: 0,
            observed_at: OffsetDateTime::UNIX_EPOCH,
        }
    }

    pub fn is_known(&self) -> bool {
        self.price > 0
    }
}

/// Key of the aggregated price table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PriceKey {
    pub location: MarketLocation,
    pub quality: Quality,
}

/// A single location/quality price report. Never mutated after it arrives;
/// the aggregated table keeps its own copy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PriceQuote {
    pub location: MarketLocation,
    pub quality: Quality,
    pub sell_price_min: Observation,
    pub sell_price_max: Observation,
    pub buy_price_min: Observation,
    pub buy_price_max: Observation,
}

impl PriceQuote {
    pub fn key(&self) -> PriceKey {
        PriceKey {
            location: self.location,
            quality: self.quality,
        }
    }
}
