//! Tariff cache engine
//!
//! One writer, many readers. Refreshes run one at a time behind a
//! `try_lock` guard that also owns the scraped-credentials cache; an overlapping
//! tick is dropped instead of queued. Each successful cycle publishes a new
//! immutable [`TariffState`] through a watch channel, so readers never wait
//! on a refresh and always see products and hourly view from one swap.

use crate::config::SourceConfig;
use crate::error::Result;
use crate::http::HttpTransport;
use crate::logging::{StructuredLogger, get_logger};
use crate::scrape::{CredentialResolver, Credentials};
use crate::settings::SettingsStore;
use crate::tariff::{
    HourlyPrice, TariffProduct, derive_hourly, fetch_tariff_body, lookup,
    parse_tariffs,
};
use chrono::{DateTime, Local, NaiveDateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior};

/// Published pair plus refresh metadata
#[derive(Debug, Clone, Default)]
pub struct TariffState {
    pub products: Arc<Vec<TariffProduct>>,
    pub hourly: Arc<Vec<HourlyPrice>>,
    /// When `products` was last replaced
    pub products_refreshed_at: Option<DateTime<Utc>>,
    /// When `hourly` was last replaced; lags `products_refreshed_at` after a failed derivation
    pub hourly_refreshed_at: Option<DateTime<Utc>>,
    /// Number of publications so far
    pub cycle: u64,
}

/// Where the current (or last) refresh cycle is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum RefreshPhase {
    Idle,
    Fetching,
    Parsing,
    Deriving,
    Published,
    Failed,
}

impl RefreshPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Fetching => "fetching",
            Self::Parsing => "parsing",
            Self::Deriving => "deriving",
            Self::Published => "published",
            Self::Failed => "failed",
        }
    }
}

/// Result of one refresh attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(tag = "outcome", content = "reason", rename_all = "snake_case")]
pub enum RefreshOutcome {
    /// Products and hourly view replaced
    Published,
    /// Products replaced, hourly view kept (no electricity product)
    SnapshotOnly,
    /// Nothing replaced
    Failed(String),
    /// Another refresh was in flight
    Skipped,
}

pub struct TariffEngine {
    settings: SettingsStore,
    transport: Arc<dyn HttpTransport>,
    resolver: CredentialResolver,
    guard: Mutex<Credentials>,
    attempts: AtomicU64,
    state_tx: watch::Sender<Arc<TariffState>>,
    phase_tx: watch::Sender<RefreshPhase>,
    logger: StructuredLogger,
}

impl TariffEngine {
    /// Engine with empty state and no scraped credentials yet
    pub fn new(settings: SettingsStore, transport: Arc<dyn HttpTransport>) -> Result<Self> {
        let (state_tx, _) = watch::channel(Arc::new(TariffState::default()));
        let (phase_tx, _) = watch::channel(RefreshPhase::Idle);
        Ok(Self {
            resolver: CredentialResolver::new(Arc::clone(&transport))?,
            settings,
            transport,
            guard: Mutex::new(Credentials::default()),
            attempts: AtomicU64::new(0),
            state_tx,
            phase_tx,
            logger: get_logger("engine"),
        })
    }

    /// Validate settings, refresh once, then start the timer
    ///
    /// A failed first refresh is not an error: the service starts with empty
    /// data and the timer tries again.
    pub async fn initialize(
        self: &Arc<Self>,
        shutdown: watch::Receiver<bool>,
    ) -> Result<JoinHandle<()>> {
        let settings = self.settings.current();
        settings.validate()?;

        self.logger.info(&format!(
            "Refreshing tariffs every {}s",
            settings.source.refresh_interval().as_secs()
        ));

        if let RefreshOutcome::Failed(reason) = self.refresh().await {
            self.logger.warn(&format!(
                "Initial refresh failed, serving empty data until the next cycle: {}",
                reason
            ));
        }

        Ok(self.spawn_refresh_loop(shutdown))
    }

    /// Run one refresh cycle unless another is in flight
    pub async fn refresh(&self) -> RefreshOutcome {
        let Ok(mut credentials) = self.guard.try_lock() else {
            self.logger
                .debug("Refresh already in progress, skipping this tick");
            return RefreshOutcome::Skipped;
        };

        let attempt = self.attempts.fetch_add(1, Ordering::Relaxed) + 1;
        let logger = self.logger.with_field("cycle", attempt);
        let settings = self.settings.current();
        match self
            .run_cycle(&settings.source, &mut credentials, &logger)
            .await
        {
            Ok(outcome) => {
                self.enter(&logger, RefreshPhase::Idle);
                outcome
            }
            Err(e) => {
                self.enter(&logger, RefreshPhase::Failed);
                logger.error(&format!("Tariff refresh failed: {}", e));
                RefreshOutcome::Failed(e.to_string())
            }
        }
    }

    async fn run_cycle(
        &self,
        source: &SourceConfig,
        credentials: &mut Credentials,
        logger: &StructuredLogger,
    ) -> Result<RefreshOutcome> {
        self.enter(logger, RefreshPhase::Fetching);
        let resolved = self.resolver.resolve(source, credentials).await;
        let body =
            fetch_tariff_body(self.transport.as_ref(), &resolved, source.api_timeout()).await?;

        self.enter(logger, RefreshPhase::Parsing);
        let products = parse_tariffs(&body)?;

        self.enter(logger, RefreshPhase::Deriving);
        let hourly = derive_hourly(&products, source.evcc_unit);
        if hourly.is_none() {
            logger.error("No electricity product in tariff data, keeping the previous EVCC view");
        }

        let previous = self.state();
        let now = Utc::now();
        let derived = hourly.is_some();
        let next = TariffState {
            products: Arc::new(products),
            hourly: hourly.map_or_else(|| Arc::clone(&previous.hourly), Arc::new),
            products_refreshed_at: Some(now),
            hourly_refreshed_at: if derived {
                Some(now)
            } else {
                previous.hourly_refreshed_at
            },
            cycle: previous.cycle + 1,
        };
        logger.info(&format!(
            "Published {} products, {} hourly prices",
            next.products.len(),
            next.hourly.len()
        ));
        self.state_tx.send_replace(Arc::new(next));
        self.enter(logger, RefreshPhase::Published);

        Ok(if derived {
            RefreshOutcome::Published
        } else {
            RefreshOutcome::SnapshotOnly
        })
    }

    fn enter(&self, logger: &StructuredLogger, phase: RefreshPhase) {
        self.phase_tx.send_replace(phase);
        logger
            .with_field("phase", phase.as_str())
            .debug("Refresh phase changed");
    }

    /// Timer task; re-arms when the configured interval changes
    pub fn spawn_refresh_loop(self: &Arc<Self>, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        let engine = Arc::clone(self);
        tokio::spawn(async move {
            let mut period = engine.refresh_interval();
            let mut ticker = delayed_ticker(period);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                        continue;
                    }
                }

                // The tick never waits on the refresh; overlaps hit the guard
                let worker = Arc::clone(&engine);
                tokio::spawn(async move {
                    worker.refresh().await;
                });

                let next = engine.refresh_interval();
                if next != period {
                    engine.logger.info(&format!(
                        "Refresh interval changed from {}s to {}s",
                        period.as_secs(),
                        next.as_secs()
                    ));
                    period = next;
                    ticker = delayed_ticker(period);
                }
            }
            engine.logger.info("Refresh timer stopped");
        })
    }

    fn refresh_interval(&self) -> Duration {
        self.settings.current().source.refresh_interval()
    }

    /// Wait for an in-flight refresh; `false` if it outlived `timeout`
    pub async fn drain(&self, timeout: Duration) -> bool {
        tokio::time::timeout(timeout, self.guard.lock()).await.is_ok()
    }

    pub fn state(&self) -> Arc<TariffState> {
        self.state_tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<TariffState>> {
        self.state_tx.subscribe()
    }

    pub fn snapshot(&self) -> Arc<Vec<TariffProduct>> {
        Arc::clone(&self.state_tx.borrow().products)
    }

    pub fn derived_view(&self) -> Arc<Vec<HourlyPrice>> {
        Arc::clone(&self.state_tx.borrow().hourly)
    }

    pub fn phase(&self) -> RefreshPhase {
        *self.phase_tx.borrow()
    }

    pub fn subscribe_phase(&self) -> watch::Receiver<RefreshPhase> {
        self.phase_tx.subscribe()
    }

    pub fn settings(&self) -> &SettingsStore {
        &self.settings
    }

    /// Current local wall-clock time in the configured timezone
    pub fn local_now(&self) -> NaiveDateTime {
        match self.settings.current().source.tz() {
            Ok(Some(tz)) => Utc::now().with_timezone(&tz).naive_local(),
            _ => Local::now().naive_local(),
        }
    }

    /// Price of product `code` right now; see [`Self::current_value_at`]
    pub fn current_value(&self, code: &str) -> f64 {
        self.current_value_at(code, self.local_now())
    }

    /// Price of product `code` at local time `at`
    ///
    /// Unknown product or a product without periods gives `999`. A product
    /// whose periods all miss `at` gives its highest price. Both are logged.
    pub fn current_value_at(&self, code: &str, at: NaiveDateTime) -> f64 {
        let products = self.snapshot();
        let result = lookup(&products, code, at);
        if let Some(note) = result.explain(code, at) {
            self.logger.error(&note);
        }
        result.value()
    }
}

fn delayed_ticker(period: Duration) -> Interval {
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    ticker
}
