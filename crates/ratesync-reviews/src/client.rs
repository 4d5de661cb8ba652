//! HTTP client for the product-review service.
//!
//! The service exposes one endpoint this workspace needs:
//! `GET {base}/vendor/{vendorId}` returning every product of that vendor with
//! its `averageRating` and `reviewCount`.

use std::time::Duration;

use ratesync_core::ProductRatingSample;
use reqwest::{Client, Url};

use crate::error::ReviewsError;
use crate::types::VendorProductsResponse;

/// Client for the product-review service.
///
/// Every request is bounded by the configured timeout so that one unresponsive
/// vendor cannot stall a whole batch.
#[derive(Debug, Clone)]
pub struct ReviewsClient {
    client: Client,
    base_url: Url,
}

impl ReviewsClient {
    /// Creates a client rooted at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`ReviewsError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed, or [`ReviewsError::InvalidBaseUrl`] if
    /// `base_url` is not an absolute http(s) URL.
    pub fn new(base_url: &str, timeout_secs: u64, user_agent: &str) -> Result<Self, ReviewsError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(timeout_secs.min(5)))
            .user_agent(user_agent)
            .build()?;

        let invalid = |reason: String| ReviewsError::InvalidBaseUrl {
            url: base_url.to_string(),
            reason,
        };

        let parsed = Url::parse(base_url).map_err(|e| invalid(e.to_string()))?;
        if !matches!(parsed.scheme(), "http" | "https") || parsed.cannot_be_a_base() {
            return Err(invalid("expected an absolute http(s) URL".to_string()));
        }

        Ok(Self {
            client,
            base_url: parsed,
        })
    }

    /// Fetches every product of `vendor_id` with its review statistics.
    ///
    /// # Errors
    ///
    /// - [`ReviewsError::EmptyVendorId`] if `vendor_id` is blank.
    /// - [`ReviewsError::Http`] on network failure or timeout.
    /// - [`ReviewsError::UnexpectedStatus`] on a non-2xx response.
    /// - [`ReviewsError::Deserialize`] if the body does not match the contract.
    pub async fn vendor_products(
        &self,
        vendor_id: &str,
    ) -> Result<Vec<ProductRatingSample>, ReviewsError> {
        let url = self.vendor_url(vendor_id)?;

        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ReviewsError::UnexpectedStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = response.text().await?;
        let parsed: VendorProductsResponse =
            serde_json::from_str(&body).map_err(|e| ReviewsError::Deserialize {
                context: format!("vendor products for {vendor_id}"),
                source: e,
            })?;

        tracing::debug!(
            vendor_id,
            products = parsed.products.len(),
            "reviews: fetched vendor products"
        );

        Ok(parsed.products.into_iter().map(Into::into).collect())
    }

    /// Builds `{base}/vendor/{vendor_id}` with the id percent-encoded as a
    /// single path segment. The id is used exactly as given so the fetch and
    /// the later rating write address the same vendor.
    fn vendor_url(&self, vendor_id: &str) -> Result<Url, ReviewsError> {
        if vendor_id.trim().is_empty() {
            return Err(ReviewsError::EmptyVendorId);
        }

        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| ReviewsError::InvalidBaseUrl {
                url: self.base_url.to_string(),
                reason: "URL cannot carry path segments".to_string(),
            })?
            .pop_if_empty()
            .push("vendor")
            .push(vendor_id);
        Ok(url)
    }
}
