//! Per-location, per-quality price table fed by successive market batches.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::entities::{MarketLocation, Observation, PriceKey, PriceQuote, Quality};

/// Table row for one `(location, quality)` pair.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AggregatedEntry {
    pub quote: PriceQuote,
    pub is_best_buy: bool,
    pub is_best_sell: bool,
    pub visible: bool,
}

impl AggregatedEntry {
    fn new(quote: PriceQuote) -> Self {
        Self {
            quote,
            is_best_buy: false,
            is_best_sell: false,
            visible: false,
        }
    }

    pub fn key(&self) -> PriceKey {
        self.quote.key()
    }
}

/// User-selected locations and quality deciding which rows are visible.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceFilter {
    pub enabled_locations: BTreeSet<MarketLocation>,
    pub quality: Quality,
}

impl Default for PriceFilter {
    fn default() -> Self {
        Self {
            enabled_locations: MarketLocation::ALL.into_iter().collect(),
            quality: Quality::Normal,
        }
    }
}

impl PriceFilter {
    pub fn matches(&self, quote: &PriceQuote) -> bool {
        self.enabled_locations.contains(&quote.location) && quote.quality == self.quality
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MergeStats {
    pub inserted: usize,
    pub updated_fields: usize,
}

/// Per-field averages over visible rows, ignoring unreported (zero) prices.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AveragePrices {
    pub sell_price_min: u64,
    pub sell_price_max: u64,
    pub buy_price_min: u64,
    pub buy_price_max: u64,
}

/// Keys are unique; rows keep their first-insertion order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AggregatedTable {
    entries: Vec<AggregatedEntry>,
}

impl AggregatedTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[AggregatedEntry] {
        &self.entries
    }

    pub fn get(&self, key: PriceKey) -> Option<&AggregatedEntry> {
        self.entries.iter().find(|entry| entry.key() == key)
    }

    pub fn iter_quality(&self, quality: Quality) -> impl Iterator<Item = &AggregatedEntry> {
        self.entries
            .iter()
            .filter(move |entry| entry.quote.quality == quality)
    }

    pub fn visible(&self) -> impl Iterator<Item = &AggregatedEntry> {
        self.entries.iter().filter(|entry| entry.visible)
    }

    /// Merges a batch into the table.
    ///
    /// Unknown keys are inserted as-is. For known keys each of the four
    /// price/timestamp pairs is replaced on its own, and only when the incoming
    /// observation is strictly *earlier* than the stored one.
    pub fn merge(&mut self, batch: &[PriceQuote]) -> MergeStats {
        let mut stats = MergeStats::default();

        for incoming in batch {
            let key = incoming.key();
            let Some(existing) = self.entries.iter_mut().find(|entry| entry.key() == key) else {
                self.entries.push(AggregatedEntry::new(*incoming));
                stats.inserted += 1;
                continue;
            };

            let stored = &mut existing.quote;
            stats.updated_fields += [
                take_if_earlier(&mut stored.sell_price_min, incoming.sell_price_min),
                take_if_earlier(&mut stored.sell_price_max, incoming.sell_price_max),
                take_if_earlier(&mut stored.buy_price_min, incoming.buy_price_min),
                take_if_earlier(&mut stored.buy_price_max, incoming.buy_price_max),
            ]
            .into_iter()
            .filter(|updated| *updated)
            .count();
        }

        stats
    }

    pub fn apply_filter(&mut self, filter: &PriceFilter) {
        for entry in &mut self.entries {
            entry.visible = filter.matches(&entry.quote);
        }
    }

    /// Clears every best flag, then flags the highest non-zero `buy_price_max`
    /// and the lowest non-zero `sell_price_min` per quality tier among rows
    /// accepted by `predicate`. Ties go to the first row in table order.
    pub fn recompute_best_prices<P>(&mut self, predicate: P)
    where
        P: Fn(&AggregatedEntry) -> bool,
    {
        for entry in &mut self.entries {
            entry.is_best_buy = false;
            entry.is_best_sell = false;
        }

        for quality in Quality::ALL {
            let candidates: Vec<usize> = self
                .entries
                .iter()
                .enumerate()
                .filter(|(_, entry)| entry.quote.quality == quality && predicate(entry))
                .map(|(idx, _)| idx)
                .collect();

            let mut best_buy: Option<(usize, u64)> = None;
            let mut best_sell: Option<(usize, u64)> = None;

            for idx in candidates {
                let quote = &self.entries[idx].quote;

                let buy = quote.buy_price_max.price;
                if buy > 0 && best_buy.map_or(true, |(_, max)| buy > max) {
                    best_buy = Some((idx, buy));
                }

                let sell = quote.sell_price_min.price;
                if sell > 0 && best_sell.map_or(true, |(_, min)| sell < min) {
                    best_sell = Some((idx, sell));
                }
            }

            if let Some((idx, _)) = best_buy {
                self.entries[idx].is_best_buy = true;
            }
            if let Some((idx, _)) = best_sell {
                self.entries[idx].is_best_sell = true;
            }
        }
    }

    /// Recomputes best flags over the currently visible rows.
    pub fn recompute_visible_best_prices(&mut self) {
        self.recompute_best_prices(|entry| entry.visible);
    }

    pub fn best_buy(&self, quality: Quality) -> Option<&AggregatedEntry> {
        self.iter_quality(quality).find(|entry| entry.is_best_buy)
    }

    pub fn best_sell(&self, quality: Quality) -> Option<&AggregatedEntry> {
        self.iter_quality(quality).find(|entry| entry.is_best_sell)
    }

    pub fn average_prices(&self) -> AveragePrices {
        let visible: Vec<&PriceQuote> = self.visible().map(|entry| &entry.quote).collect();
        AveragePrices {
            sell_price_min: average(visible.iter().map(|q| q.sell_price_min)),
            sell_price_max: average(visible.iter().map(|q| q.sell_price_max)),
            buy_price_min: average(visible.iter().map(|q| q.buy_price_min)),
            buy_price_max: average(visible.iter().map(|q| q.buy_price_max)),
        }
    }
}

fn take_if_earlier(stored: &mut Observation, incoming: Observation) -> bool {
    if incoming.observed_at < stored.observed_at {
        *stored = incoming;
        true
    } else {
        false
    }
}

fn average(observations: impl Iterator<Item = Observation>) -> u64 {
    let (sum, count) = observations
        .filter(Observation::is_known)
        .fold((0_u64, 0_u64), |(sum, count), observation| {
            (sum.saturating_add(observation.price), count + 1)
        });
    if count == 0 {
        0
    } else {
        sum / count
    }
}

#[cfg(test)]
mod tests {
    use time::OffsetDateTime;

    use super::*;

    fn at(secs: i64) -> OffsetDateTime {
        OffsetDateTime::from_unix_timestamp(secs).expect("valid timestamp")
    }

    fn quote(location: MarketLocation, quality: Quality) -> PriceQuote {
        PriceQuote {
            location,
            quality,
            sell_price_min: Observation::unknown(),
            sell_price_max: Observation::unknown(),
            buy_price_min: Observation::unknown(),
            buy_price_max: Observation::unknown(),
        }
    }

    fn with_sell_min(mut quote: PriceQuote, price: u64, secs: i64) -> PriceQuote {
        quote.sell_price_min = Observation::new(price, at(secs));
        quote
    }

    fn with_buy_max(mut quote: PriceQuote, price: u64, secs: i64) -> PriceQuote {
        quote.buy_price_max = Observation::new(price, at(secs));
        quote
    }

    fn caerleon_t3() -> PriceKey {
        PriceKey {
            location: MarketLocation::Caerleon,
            quality: Quality::Outstanding,
        }
    }

    #[test]
    fn earlier_observation_wins_per_field() {
        let base = quote(MarketLocation::Caerleon, Quality::Outstanding);
        let mut table = AggregatedTable::new();

        table.merge(&[with_sell_min(base, 100, 10)]);
        let stats = table.merge(&[with_sell_min(base, 90, 5)]);
        assert_eq!(stats.updated_fields, 1);
        assert_eq!(
            table.get(caerleon_t3()).map(|e| e.quote.sell_price_min.price),
            Some(90)
        );

        table.merge(&[with_sell_min(base, 80, 20)]);
        let stored = table.get(caerleon_t3()).expect("entry exists");
        assert_eq!(stored.quote.sell_price_min.price, 90);
        assert_eq!(stored.quote.sell_price_min.observed_at, at(5));
    }

    #[test]
    fn fields_merge_independently() {
        let base = quote(MarketLocation::Martlock, Quality::Normal);
        let mut table = AggregatedTable::new();
        table.merge(&[with_buy_max(with_sell_min(base, 100, 10), 40, 10)]);

        // Earlier sell observation, later buy observation.
        table.merge(&[with_buy_max(with_sell_min(base, 95, 3), 60, 30)]);

        let entry = &table.entries()[0];
        assert_eq!(entry.quote.sell_price_min.price, 95);
        assert_eq!(entry.quote.buy_price_max.price, 40);
    }

    #[test]
    fn keys_stay_unique_across_merges() {
        let mut table = AggregatedTable::new();
        for round in 0..4_i64 {
            let batch: Vec<PriceQuote> = MarketLocation::ALL
                .into_iter()
                .flat_map(|location| {
                    Quality::ALL
                        .into_iter()
                        .map(move |quality| with_sell_min(quote(location, quality), 10, 100 - round))
                })
                .collect();
            table.merge(&batch);
            // Duplicates inside one batch are merged too.
            table.merge(&batch[..3]);
        }

        assert_eq!(table.len(), MarketLocation::ALL.len() * Quality::ALL.len());
        let keys: BTreeSet<PriceKey> = table.entries().iter().map(|e| e.key()).collect();
        assert_eq!(keys.len(), table.len());
    }

    #[test]
    fn highest_non_zero_buy_is_best() {
        let mut table = AggregatedTable::new();
        table.merge(&[
            with_buy_max(quote(MarketLocation::Thetford, Quality::Good), 0, 1),
            with_buy_max(quote(MarketLocation::Lymhurst, Quality::Good), 50, 1),
            with_buy_max(quote(MarketLocation::Martlock, Quality::Good), 75, 1),
        ]);
        table.apply_filter(&PriceFilter {
            quality: Quality::Good,
            ..PriceFilter::default()
        });
        table.recompute_visible_best_prices();

        let best = table.best_buy(Quality::Good).expect("best buy flagged");
        assert_eq!(best.quote.location, MarketLocation::Martlock);
        assert_eq!(table.iter_quality(Quality::Good).filter(|e| e.is_best_buy).count(), 1);
        assert!(!table.entries()[0].is_best_buy);
    }

    #[test]
    fn lowest_non_zero_sell_is_best_and_ties_go_first() {
        let mut table = AggregatedTable::new();
        table.merge(&[
            with_sell_min(quote(MarketLocation::Thetford, Quality::Normal), 0, 1),
            with_sell_min(quote(MarketLocation::Lymhurst, Quality::Normal), 30, 1),
            with_sell_min(quote(MarketLocation::Bridgewatch, Quality::Normal), 30, 1),
            with_sell_min(quote(MarketLocation::Martlock, Quality::Normal), 45, 1),
        ]);
        table.apply_filter(&PriceFilter::default());
        table.recompute_visible_best_prices();

        let best = table.best_sell(Quality::Normal).expect("best sell flagged");
        assert_eq!(best.quote.location, MarketLocation::Lymhurst);
        assert_eq!(table.entries().iter().filter(|e| e.is_best_sell).count(), 1);
    }

    #[test]
    fn hidden_rows_and_zero_prices_never_qualify() {
        let mut table = AggregatedTable::new();
        table.merge(&[
            with_buy_max(quote(MarketLocation::Caerleon, Quality::Normal), 500, 1),
            with_buy_max(quote(MarketLocation::Thetford, Quality::Normal), 20, 1),
            quote(MarketLocation::Lymhurst, Quality::Excellent),
        ]);

        let mut filter = PriceFilter::default();
        filter.enabled_locations.remove(&MarketLocation::Caerleon);
        table.apply_filter(&filter);
        table.recompute_visible_best_prices();

        let best = table.best_buy(Quality::Normal).expect("visible candidate");
        assert_eq!(best.quote.location, MarketLocation::Thetford);
        assert!(table.best_buy(Quality::Excellent).is_none());
        assert!(table.best_sell(Quality::Excellent).is_none());
        for entry in table.entries() {
            if entry.is_best_buy {
                assert!(entry.visible && entry.quote.buy_price_max.price > 0);
            }
        }
    }

    #[test]
    fn recompute_clears_stale_flags() {
        let mut table = AggregatedTable::new();
        table.merge(&[
            with_buy_max(quote(MarketLocation::Caerleon, Quality::Normal), 500, 1),
            with_buy_max(quote(MarketLocation::Thetford, Quality::Normal), 20, 1),
        ]);
        table.apply_filter(&PriceFilter::default());
        table.recompute_visible_best_prices();
        assert!(table.entries()[0].is_best_buy);

        table.apply_filter(&PriceFilter {
            quality: Quality::Good,
            ..PriceFilter::default()
        });
        table.recompute_visible_best_prices();
        assert!(table.entries().iter().all(|e| !e.is_best_buy && !e.is_best_sell));
    }

    #[test]
    fn averages_skip_unknown_prices() {
        let mut table = AggregatedTable::new();
        table.merge(&[
            with_sell_min(quote(MarketLocation::Caerleon, Quality::Normal), 100, 1),
            with_sell_min(quote(MarketLocation::Thetford, Quality::Normal), 51, 1),
            with_sell_min(quote(MarketLocation::Lymhurst, Quality::Normal), 0, 1),
        ]);
        table.apply_filter(&PriceFilter::default());

        let averages = table.average_prices();
        assert_eq!(averages.sell_price_min, 75);
        assert_eq!(averages.buy_price_max, 0);
    }
}
