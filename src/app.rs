//! Live session for one item: price table, crafting breakdown and the
//! auto-update loop that keeps both fresh.

use std::{
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use async_trait::async_trait;
use log::{debug, info, warn};
use thiserror::Error;
use tokio::{runtime::Handle, sync::watch};
use uuid::Uuid;

use crate::{
    domain::{
        AggregatedTable, CraftingOutcome, CraftingPlan, CraftingRequirementSet, EconomicInputs,
        ItemCatalog, ItemId, ItemMetadata, MarketLocation, PriceQuote, PriceSource,
        PriceSourceError, Quality, SessionSettings,
    },
    scheduler::{RefreshScheduler, Refreshable},
};

/// The single error state a session shows. Latched until the next fully
/// successful refresh.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("no item information found for {0}")]
    NoItemInfo(ItemId),
    #[error("no market prices available")]
    NoPrices,
    #[error("too many requests to the market data service, please wait")]
    RateLimited,
    #[error("{0}")]
    GeneralError(String),
}

/// Steps of one refresh, run in this order after a batch arrives.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RefreshStep {
    MergePrices,
    RecomputeBestPrices,
    Recalculate,
}

pub const REFRESH_PIPELINE: [RefreshStep; 3] = [
    RefreshStep::MergePrices,
    RefreshStep::RecomputeBestPrices,
    RefreshStep::Recalculate,
];

/// Everything the crafting view needs, published as one consistent value.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CraftingSnapshot {
    /// `None` when the item cannot be crafted.
    pub requirements: Option<CraftingRequirementSet>,
    pub outcome: CraftingOutcome,
    /// Inputs the outcome was computed from, market sell price applied.
    pub inputs: EconomicInputs,
    pub note: Option<String>,
}

impl CraftingSnapshot {
    pub fn is_craftable(&self) -> bool {
        self.requirements.is_some()
    }
}

struct SessionState {
    table: AggregatedTable,
    settings: SessionSettings,
    inputs: EconomicInputs,
    plan: Option<CraftingPlan>,
    error: Option<SessionError>,
}

impl SessionState {
    fn run_step(
        &mut self,
        step: RefreshStep,
        item: &ItemMetadata,
        batch: &[PriceQuote],
    ) -> Option<CraftingSnapshot> {
        match step {
            RefreshStep::MergePrices => {
                let stats = self.table.merge(batch);
                self.table.apply_filter(&self.settings.price_filter());
                debug!(
                    "[prices] Merged {} quotes ({} new rows, {} updated fields)",
                    batch.len(),
                    stats.inserted,
                    stats.updated_fields
                );
                None
            }
            RefreshStep::RecomputeBestPrices => {
                self.table.recompute_visible_best_prices();
                None
            }
            RefreshStep::Recalculate => Some(self.crafting_snapshot(item)),
        }
    }

    fn refilter(&mut self) {
        self.table.apply_filter(&self.settings.price_filter());
        self.table.recompute_visible_best_prices();
    }

    fn crafting_snapshot(&self, item: &ItemMetadata) -> CraftingSnapshot {
        let inputs = self
            .inputs
            .with_market_sell_price(&self.table, self.settings.selected_quality);
        let outcome = self
            .plan
            .as_ref()
            .map(|plan| plan.recalculate(item, &inputs))
            .unwrap_or_default();

        CraftingSnapshot {
            requirements: self.plan.as_ref().map(|plan| plan.requirements.clone()),
            outcome,
            inputs,
            note: self.settings.note(&item.unique_name).map(str::to_string),
        }
    }
}

/// One open item. All mutation goes through the state mutex, which is never
/// held across an `.await`; readers follow the `watch` channels.
pub struct ItemSession {
    id: Uuid,
    item: ItemMetadata,
    source: Arc<dyn PriceSource>,
    state: Mutex<SessionState>,
    table_tx: watch::Sender<Arc<AggregatedTable>>,
    crafting_tx: watch::Sender<Arc<CraftingSnapshot>>,
    error_tx: watch::Sender<Option<SessionError>>,
}

impl ItemSession {
    /// Looks the item up and prepares its crafting plan. Prices stay empty
    /// until the first refresh.
    pub fn open(
        item_id: &str,
        catalog: &dyn ItemCatalog,
        source: Arc<dyn PriceSource>,
        settings: SessionSettings,
    ) -> Result<Self, SessionError> {
        let item = catalog
            .lookup(item_id)
            .ok_or_else(|| SessionError::NoItemInfo(item_id.to_string()))?;

        let mut inputs = EconomicInputs::default();
        let plan = CraftingPlan::prepare(catalog, &item, &inputs);
        match &plan {
            Some(plan) => inputs.amount_crafted = plan.requirements.amount_crafted(),
            None => debug!("[crafting] {} has no crafting requirements", item.unique_name),
        }

        let mut table = AggregatedTable::new();
        table.apply_filter(&settings.price_filter());

        let state = SessionState {
            table,
            settings,
            inputs,
            plan,
            error: None,
        };
        let snapshot = state.crafting_snapshot(&item);
        let (table_tx, _) = watch::channel(Arc::new(state.table.clone()));
        let (crafting_tx, _) = watch::channel(Arc::new(snapshot));
        let (error_tx, _) = watch::channel(None);

        let id = Uuid::new_v4();
        info!(
            "[session] Opened {} ({}) as {id}",
            item.unique_name,
            item.display_name()
        );

        Ok(Self {
            id,
            item,
            source,
            state: Mutex::new(state),
            table_tx,
            crafting_tx,
            error_tx,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn item(&self) -> &ItemMetadata {
        &self.item
    }

    /// Fetches one batch and runs the refresh pipeline on it.
    ///
    /// A rate-limited fetch keeps the current table; a failed or empty fetch
    /// latches [`SessionError::NoPrices`]. Overlapping calls are applied in the
    /// order their fetches complete.
    pub async fn refresh_now(&self) {
        let fetched = self.source.fetch_quotes(&self.item.unique_name).await;

        let mut state = self.lock_state();
        let batch = match fetched {
            Ok(batch) if !batch.is_empty() => batch,
            Ok(_) => {
                debug!(
                    "[prices] {} received no quotes for {}",
                    self.id, self.item.unique_name
                );
                self.latch_error(&mut state, SessionError::NoPrices);
                return;
            }
            Err(PriceSourceError::RateLimited) => {
                warn!("[prices] {} rate limited; keeping current table", self.id);
                self.latch_error(&mut state, SessionError::RateLimited);
                return;
            }
            Err(PriceSourceError::Transient(reason)) => {
                warn!("[prices] {} fetch failed: {reason}", self.id);
                self.latch_error(&mut state, SessionError::NoPrices);
                return;
            }
        };

        let mut snapshot = None;
        for step in REFRESH_PIPELINE {
            if let Some(updated) = state.run_step(step, &self.item, &batch) {
                snapshot = Some(updated);
            }
        }

        state.error = None;
        self.table_tx.send_replace(Arc::new(state.table.clone()));
        if let Some(snapshot) = snapshot {
            self.crafting_tx.send_replace(Arc::new(snapshot));
        }
        self.error_tx.send_replace(None);
    }

    /// Applies an edit to the economic inputs and recalculates right away.
    pub fn update_inputs<F>(&self, edit: F)
    where
        F: FnOnce(&mut EconomicInputs),
    {
        let mut state = self.lock_state();
        edit(&mut state.inputs);
        self.publish_crafting(&state);
    }

    pub fn set_quality(&self, quality: Quality) {
        let mut state = self.lock_state();
        if state.settings.selected_quality == quality {
            return;
        }
        state.settings.selected_quality = quality;
        debug!("[settings] Quality set to {}", quality.name());
        self.publish_refiltered(&mut state);
    }

    pub fn set_location_enabled(&self, location: MarketLocation, enabled: bool) {
        let mut state = self.lock_state();
        state.settings.set_location_enabled(location, enabled);
        debug!(
            "[settings] {location} {}",
            if enabled { "enabled" } else { "disabled" }
        );
        self.publish_refiltered(&mut state);
    }

    /// Takes effect from the next scheduled tick.
    pub fn set_refresh_interval(&self, interval: Duration) {
        let millis = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX);
        self.lock_state().settings.refresh_interval_ms = millis;
    }

    pub fn crafting_note(&self) -> Option<String> {
        self.lock_state()
            .settings
            .note(&self.item.unique_name)
            .map(str::to_string)
    }

    pub fn set_crafting_note(&self, note: &str) {
        let mut state = self.lock_state();
        state.settings.set_note(&self.item.unique_name, note);
        self.publish_crafting(&state);
    }

    pub fn settings(&self) -> SessionSettings {
        self.lock_state().settings.clone()
    }

    pub fn table(&self) -> Arc<AggregatedTable> {
        self.table_tx.borrow().clone()
    }

    pub fn crafting(&self) -> Arc<CraftingSnapshot> {
        self.crafting_tx.borrow().clone()
    }

    pub fn error(&self) -> Option<SessionError> {
        self.error_tx.borrow().clone()
    }

    pub fn subscribe_table(&self) -> watch::Receiver<Arc<AggregatedTable>> {
        self.table_tx.subscribe()
    }

    pub fn subscribe_crafting(&self) -> watch::Receiver<Arc<CraftingSnapshot>> {
        self.crafting_tx.subscribe()
    }

    pub fn subscribe_errors(&self) -> watch::Receiver<Option<SessionError>> {
        self.error_tx.subscribe()
    }

    /// Starts the refresh loop on the current tokio runtime.
    pub fn start_auto_update(self: &Arc<Self>) -> Result<RefreshScheduler, SessionError> {
        Handle::try_current().map_err(|err| {
            let error = SessionError::GeneralError(format!("auto update unavailable: {err}"));
            self.latch_error(&mut self.lock_state(), error.clone());
            error
        })?;
        Ok(RefreshScheduler::spawn(Arc::clone(self)))
    }

    fn lock_state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn latch_error(&self, state: &mut SessionState, error: SessionError) {
        state.error = Some(error.clone());
        self.error_tx.send_replace(Some(error));
    }

    fn publish_refiltered(&self, state: &mut SessionState) {
        state.refilter();
        self.table_tx.send_replace(Arc::new(state.table.clone()));
        self.publish_crafting(state);
    }

    fn publish_crafting(&self, state: &SessionState) {
        self.crafting_tx
            .send_replace(Arc::new(state.crafting_snapshot(&self.item)));
    }
}

#[async_trait]
impl Refreshable for ItemSession {
    async fn refresh(&self) {
        self.refresh_now().await;
    }

    fn refresh_interval(&self) -> Duration {
        self.lock_state().settings.refresh_interval()
    }
}

/// An open session together with its auto-update loop.
pub struct ItemWindow {
    session: Arc<ItemSession>,
    scheduler: RefreshScheduler,
}

impl ItemWindow {
    /// Opens the session and starts auto update; the first fetch runs right away.
    pub fn open(
        item_id: &str,
        catalog: &dyn ItemCatalog,
        source: Arc<dyn PriceSource>,
        settings: SessionSettings,
    ) -> Result<Self, SessionError> {
        let session = Arc::new(ItemSession::open(item_id, catalog, source, settings)?);
        let scheduler = session.start_auto_update()?;
        Ok(Self { session, scheduler })
    }

    pub fn session(&self) -> &Arc<ItemSession> {
        &self.session
    }

    pub fn is_auto_updating(&self) -> bool {
        self.scheduler.is_active()
    }

    pub fn subscribe_auto_update(&self) -> watch::Receiver<bool> {
        self.scheduler.subscribe_active()
    }

    /// Flips between paused and running; returns the new state.
    pub fn toggle_auto_update(&self) -> bool {
        let active = self.scheduler.toggle();
        info!(
            "[session] {} auto update {}",
            self.session.id(),
            if active { "resumed" } else { "paused" }
        );
        active
    }

    /// Stops the loop and hands back the settings to persist.
    pub async fn close(self) -> SessionSettings {
        let Self { session, scheduler } = self;
        scheduler.shutdown().await;
        info!("[session] Closed {}", session.id());
        session.settings()
    }
}
