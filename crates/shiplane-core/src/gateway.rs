//! Carrier registry, rate fan-out, and single-carrier dispatch.
//!
//! The gateway owns one adapter per configured carrier and applies the
//! cross-cutting call policy: nearest-warehouse origin rewrite, a
//! whole-slot deadline per carrier, retries for transient failures, and
//! per-carrier failure isolation so one broken integration never hides
//! another carrier's prices.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use serde_json::Value;

use crate::adapter::{CarrierAdapter, CarrierError, RateRequest, ShipmentRequest};
use crate::adapters::{DhlAdapter, FedexAdapter, UpsAdapter};
use crate::carrier::{CarrierSelection, RatePreference};
use crate::config::CarrierSettings;
use crate::http_client::{HttpClient, ReqwestHttpClient};
use crate::retry::RetryConfig;
use crate::warehouse::WarehouseSelector;
use crate::{Address, CarrierId, Dimensions, RateQuote, ShipmentResult};

type InvokeFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, CarrierError>> + Send + 'a>>;

/// Tuning knobs for carrier calls.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Wall-clock budget for one carrier slot, retries included.
    pub call_timeout: Duration,
    pub retry: RetryConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            call_timeout: Duration::from_secs(10),
            retry: RetryConfig::default(),
        }
    }
}

/// Rate lookup across one or all carriers.
#[derive(Debug, Clone)]
pub struct RateLookup {
    pub selection: CarrierSelection,
    pub origin: Address,
    pub destination: Address,
    pub weight_kg: f64,
    pub dimensions: Dimensions,
    /// Replace `origin` with the warehouse closest to the destination.
    pub use_nearest_warehouse: bool,
    pub prefer: Option<RatePreference>,
}

impl RateLookup {
    pub fn new(origin: Address, destination: Address, weight_kg: f64, dimensions: Dimensions) -> Self {
        Self {
            selection: CarrierSelection::default(),
            origin,
            destination,
            weight_kg,
            dimensions,
            use_nearest_warehouse: true,
            prefer: None,
        }
    }

    pub fn with_selection(mut self, selection: CarrierSelection) -> Self {
        self.selection = selection;
        self
    }

    pub fn with_use_nearest_warehouse(mut self, use_nearest_warehouse: bool) -> Self {
        self.use_nearest_warehouse = use_nearest_warehouse;
        self
    }

    pub fn with_preference(mut self, preference: RatePreference) -> Self {
        self.prefer = Some(preference);
        self
    }
}

/// One carrier's slot in an aggregated lookup.
#[derive(Debug, Clone)]
pub struct CarrierRateOutcome {
    pub carrier: CarrierId,
    pub outcome: Result<Vec<RateQuote>, CarrierError>,
}

/// Aggregated rate lookup result.
///
/// `options` always lists slots in [`CarrierId::ALL`] order. An empty rate
/// vec is a carrier with nothing to offer for the lane, not a failure.
#[derive(Debug, Clone)]
pub struct RateAggregate {
    /// Origin the carriers were actually asked about, after any rewrite.
    pub origin: Address,
    pub options: Vec<CarrierRateOutcome>,
}

/// Adapter registry and dispatch engine.
pub struct CarrierGateway {
    adapters: HashMap<CarrierId, Arc<dyn CarrierAdapter>>,
    selector: WarehouseSelector,
    config: GatewayConfig,
}

impl CarrierGateway {
    pub fn new(
        adapters: Vec<Arc<dyn CarrierAdapter>>,
        selector: WarehouseSelector,
        config: GatewayConfig,
    ) -> Self {
        let adapters = adapters
            .into_iter()
            .map(|adapter| (adapter.id(), adapter))
            .collect();
        Self {
            adapters,
            selector,
            config,
        }
    }

    /// Carriers with a registered adapter, in aggregation order.
    pub fn registered(&self) -> Vec<CarrierId> {
        CarrierId::ALL
            .into_iter()
            .filter(|carrier| self.adapters.contains_key(carrier))
            .collect()
    }

    pub fn selector(&self) -> &WarehouseSelector {
        &self.selector
    }

    fn adapter(&self, carrier: CarrierId) -> Result<Arc<dyn CarrierAdapter>, CarrierError> {
        self.adapters
            .get(&carrier)
            .cloned()
            .ok_or_else(|| CarrierError::unconfigured(carrier))
    }

    /// Fetches rates from the selected carriers concurrently.
    ///
    /// Each carrier resolves to its own `Result`; a failing, slow, or
    /// unconfigured carrier occupies its slot with an error while the others
    /// return normally.
    ///
    /// # Errors
    ///
    /// Returns an error only when the lookup itself is invalid (for example
    /// a non-positive weight). Per-carrier failures land in
    /// [`CarrierRateOutcome::outcome`] instead.
    pub async fn aggregated_rates(&self, lookup: RateLookup) -> Result<RateAggregate, CarrierError> {
        let origin = if lookup.use_nearest_warehouse {
            self.selector
                .pick_best(Some(&lookup.destination))
                .dispatch_address()
        } else {
            lookup.origin
        };

        let request = RateRequest::new(
            origin.clone(),
            lookup.destination,
            lookup.weight_kg,
            lookup.dimensions,
        )?;

        let slots = lookup.selection.targets().into_iter().map(|carrier| {
            let request = request.clone();
            async move {
                let outcome = self.carrier_rates(carrier, request).await;
                CarrierRateOutcome { carrier, outcome }
            }
        });
        let mut options = join_all(slots).await;

        if let Some(preference) = lookup.prefer {
            for option in &mut options {
                if let Ok(quotes) = &mut option.outcome {
                    sort_quotes(quotes, preference);
                }
            }
        }

        Ok(RateAggregate { origin, options })
    }

    async fn carrier_rates(
        &self,
        carrier: CarrierId,
        request: RateRequest,
    ) -> Result<Vec<RateQuote>, CarrierError> {
        let adapter = self.adapter(carrier)?;
        self.call_with_policy(carrier, adapter, true, move |adapter| {
            adapter.rates(request.clone())
        })
        .await
    }

    /// Books a shipment with one carrier.
    ///
    /// Creation is not idempotent at the carrier, so the call is retried
    /// only when the request carries an idempotency key the carrier can
    /// deduplicate on.
    pub async fn create_shipment(
        &self,
        carrier: CarrierId,
        request: ShipmentRequest,
    ) -> Result<ShipmentResult, CarrierError> {
        let adapter = self.adapter(carrier)?;
        let allow_retry = request.idempotency_key.is_some();
        self.call_with_policy(carrier, adapter, allow_retry, move |adapter| {
            adapter.create_shipment(request.clone())
        })
        .await
    }

    /// Fetches one carrier's raw tracking payload.
    pub async fn track(
        &self,
        carrier: CarrierId,
        tracking_number: &str,
    ) -> Result<Value, CarrierError> {
        let adapter = self.adapter(carrier)?;
        self.with_deadline(carrier, adapter.track(tracking_number))
            .await
    }

    /// Books a pickup with one carrier, passing the details through as-is.
    pub async fn schedule_pickup(
        &self,
        carrier: CarrierId,
        details: Value,
    ) -> Result<Value, CarrierError> {
        let adapter = self.adapter(carrier)?;
        self.with_deadline(carrier, adapter.schedule_pickup(details))
            .await
    }

    /// Runs a retry loop under the whole-slot deadline. The deadline covers
    /// every attempt and backoff sleep, so a timeout is terminal.
    async fn call_with_policy<T, Op>(
        &self,
        carrier: CarrierId,
        adapter: Arc<dyn CarrierAdapter>,
        allow_retry: bool,
        op: Op,
    ) -> Result<T, CarrierError>
    where
        Op: for<'a> Fn(&'a dyn CarrierAdapter) -> InvokeFuture<'a, T>,
    {
        let retry = &self.config.retry;
        let attempts = async {
            let mut attempt: u32 = 0;
            loop {
                match op(adapter.as_ref()).await {
                    Ok(value) => return Ok(value),
                    Err(error) => {
                        let exhausted = attempt >= retry.max_retries;
                        if !allow_retry || !retry.enabled || exhausted || !error.retryable() {
                            return Err(error);
                        }
                        tokio::time::sleep(retry.delay_for_attempt(attempt)).await;
                        attempt += 1;
                    }
                }
            }
        };

        self.with_deadline(carrier, attempts).await
    }

    async fn with_deadline<T>(
        &self,
        carrier: CarrierId,
        call: impl Future<Output = Result<T, CarrierError>>,
    ) -> Result<T, CarrierError> {
        let budget = self.config.call_timeout;
        match tokio::time::timeout(budget, call).await {
            Ok(result) => result,
            Err(_) => Err(CarrierError::timeout(format!(
                "carrier '{carrier}' did not answer within {}ms",
                budget.as_millis()
            ))),
        }
    }
}

fn sort_quotes(quotes: &mut [RateQuote], preference: RatePreference) {
    match preference {
        RatePreference::Cheapest => {
            quotes.sort_by(|a, b| compare_optional(a.amount, b.amount));
        }
        RatePreference::Fastest => {
            quotes.sort_by(|a, b| {
                compare_optional(a.transit_days.map(f64::from), b.transit_days.map(f64::from))
            });
        }
    }
}

/// Quotes without the sort key go last; the sort is stable so peers keep
/// their carrier-reported order.
fn compare_optional(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Builder wiring carrier adapters from credentials.
///
/// Registers an adapter only for carriers whose credentials are present, so
/// a missing integration surfaces as `carrier.unconfigured` at call time
/// rather than failing startup.
///
/// # Example
///
/// ```rust,ignore
/// use shiplane_core::GatewayBuilder;
///
/// // Reads SHIPLANE_FEDEX_CLIENT_ID and friends from the environment.
/// let gateway = GatewayBuilder::from_env().build();
/// ```
pub struct GatewayBuilder {
    settings: CarrierSettings,
    selector: WarehouseSelector,
    config: GatewayConfig,
    http_client: Option<Arc<dyn HttpClient>>,
}

impl GatewayBuilder {
    pub fn new(settings: CarrierSettings) -> Self {
        Self {
            settings,
            selector: WarehouseSelector::default(),
            config: GatewayConfig::default(),
            http_client: None,
        }
    }

    /// Builder seeded from environment variables.
    pub fn from_env() -> Self {
        Self::new(CarrierSettings::from_env())
    }

    pub fn with_selector(mut self, selector: WarehouseSelector) -> Self {
        self.selector = selector;
        self
    }

    pub fn with_config(mut self, config: GatewayConfig) -> Self {
        self.config = config;
        self
    }

    /// Override the transport shared by every adapter.
    pub fn with_http_client(mut self, http_client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(http_client);
        self
    }

    pub fn build(self) -> CarrierGateway {
        let http_client = self
            .http_client
            .unwrap_or_else(|| Arc::new(ReqwestHttpClient::new()));

        let mut adapters: Vec<Arc<dyn CarrierAdapter>> = Vec::new();
        if let Some(fedex) = self.settings.fedex {
            adapters.push(Arc::new(FedexAdapter::new(fedex, http_client.clone())));
        }
        if let Some(ups) = self.settings.ups {
            adapters.push(Arc::new(UpsAdapter::new(ups, http_client.clone())));
        }
        if let Some(dhl) = self.settings.dhl {
            adapters.push(Arc::new(DhlAdapter::new(dhl, http_client.clone())));
        }

        CarrierGateway::new(adapters, self.selector, self.config)
    }
}
