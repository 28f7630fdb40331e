//! Shared application state.

use std::sync::Arc;

use shiplane_core::{CarrierGateway, CarrierSettings, HttpClient};

use crate::oauth::OAuthExchanger;
use crate::token_store::{InMemoryTokenStore, TokenStore};

/// State handed to every route handler.
#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<CarrierGateway>,
    pub token_store: Arc<dyn TokenStore>,
    pub oauth: Arc<OAuthExchanger>,
    pub settings: Arc<CarrierSettings>,
}

impl AppState {
    /// State with an in-memory token store. `http_client` is the transport
    /// the OAuth exchanger uses; pass the client the gateway was built with
    /// so both share one connection pool.
    pub fn new(
        gateway: CarrierGateway,
        settings: CarrierSettings,
        http_client: Arc<dyn HttpClient>,
    ) -> Self {
        Self {
            gateway: Arc::new(gateway),
            token_store: Arc::new(InMemoryTokenStore::new()),
            oauth: Arc::new(OAuthExchanger::new(http_client)),
            settings: Arc::new(settings),
        }
    }

    /// Swaps in a different token store backend.
    pub fn with_token_store(mut self, token_store: Arc<dyn TokenStore>) -> Self {
        self.token_store = token_store;
        self
    }
}
