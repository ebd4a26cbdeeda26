//! Cart item count reconciliation.

use crate::core::session::SessionModel;
use crate::error::Result;
use crate::http::HttpClient;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// Polls the same-origin cart endpoint.
pub struct CartObserver {
    url: String,
    http: Arc<dyn HttpClient>,
}

impl CartObserver {
    /// Observe the cart at `url`.
    #[must_use]
    pub fn new(url: &str, http: Arc<dyn HttpClient>) -> Self {
        Self {
            url: url.to_string(),
            http,
        }
    }

    /// Fetch the current item count.
    ///
    /// A JSON body without a numeric `item_count` counts as an empty cart.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, non-2xx status, or a body
    /// that is not JSON.
    pub async fn fetch(&self) -> Result<u64> {
        let body = self.http.get_json(&self.url).await?.json()?;
        Ok(body.get("item_count").and_then(Value::as_u64).unwrap_or(0))
    }

    /// Fetch and store the item count.
    ///
    /// On any failure the stored count is left as it was and `None` is
    /// returned.
    pub async fn refresh(&self, model: &mut SessionModel) -> Option<u64> {
        match self.fetch().await {
            Ok(count) => {
                model.set_items_in_cart(count);
                Some(count)
            }
            Err(e) => {
                debug!(url = %self.url, error = %e, "cart refresh failed");
                None
            }
        }
    }
}
