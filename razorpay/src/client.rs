//! Razorpay Orders API client

use crate::error::RazorpayError;
use crate::signature::verify_signature;
use boxoffice_core::error::GatewayError;
use boxoffice_core::payment::{GatewayOrder, PaymentGateway, PaymentProof};
use boxoffice_core::types::OrderId;
use futures::future::BoxFuture;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Production API base URL
pub const DEFAULT_API_URL: &str = "https://api.razorpay.com/v1";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Razorpay credentials and endpoint
#[derive(Clone)]
pub struct RazorpayConfig {
    /// Public key id, also handed to the checkout page
    pub key_id: String,
    /// Key secret used for basic auth and signatures
    pub key_secret: String,
    /// API base URL without trailing slash
    pub api_url: String,
}

impl RazorpayConfig {
    /// Config for the production API
    #[must_use]
    pub fn new(key_id: impl Into<String>, key_secret: impl Into<String>) -> Self {
        Self {
            key_id: key_id.into(),
            key_secret: key_secret.into(),
            api_url: DEFAULT_API_URL.to_string(),
        }
    }

    /// Overrides the API base URL
    #[must_use]
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Reads `RAZORPAY_KEY_ID`, `RAZORPAY_KEY_SECRET` and optionally `RAZORPAY_API_URL`
    ///
    /// # Errors
    ///
    /// Returns `RazorpayError::MissingCredentials` if a key is not set
    pub fn from_env() -> Result<Self, RazorpayError> {
        let key_id = std::env::var("RAZORPAY_KEY_ID")
            .map_err(|_| RazorpayError::MissingCredentials("RAZORPAY_KEY_ID"))?;
        let key_secret = std::env::var("RAZORPAY_KEY_SECRET")
            .map_err(|_| RazorpayError::MissingCredentials("RAZORPAY_KEY_SECRET"))?;
        let config = Self::new(key_id, key_secret);

        Ok(match std::env::var("RAZORPAY_API_URL") {
            Ok(url) => config.with_api_url(url),
            Err(_) => config,
        })
    }
}

impl std::fmt::Debug for RazorpayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RazorpayConfig")
            .field("key_id", &self.key_id)
            .field("key_secret", &"<redacted>")
            .field("api_url", &self.api_url)
            .finish()
    }
}

#[derive(Debug, Serialize)]
struct CreateOrderRequest<'a> {
    amount: u64,
    currency: &'a str,
    payment_capture: u8,
}

#[derive(Debug, Deserialize)]
struct OrderResponse {
    id: String,
    amount: u64,
    currency: String,
}

/// Razorpay payment gateway
#[derive(Clone, Debug)]
pub struct RazorpayGateway {
    client: Client,
    config: RazorpayConfig,
}

impl RazorpayGateway {
    /// Create a gateway with the given credentials
    ///
    /// # Errors
    ///
    /// Returns `RazorpayError::ClientSetup` if the HTTP client cannot be built
    pub fn new(config: RazorpayConfig) -> Result<Self, RazorpayError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| RazorpayError::ClientSetup(e.to_string()))?;
        Ok(Self { client, config })
    }

    /// Public key id for the checkout page
    #[must_use]
    pub fn key_id(&self) -> &str {
        &self.config.key_id
    }

    /// Create an order for `amount` minor units
    ///
    /// # Errors
    ///
    /// Returns errors for network failures, API errors, or parsing failures
    pub async fn create(&self, amount: u64, currency: &str) -> Result<GatewayOrder, RazorpayError> {
        let response = self
            .client
            .post(format!("{}/orders", self.config.api_url))
            .basic_auth(&self.config.key_id, Some(&self.config.key_secret))
            .json(&CreateOrderRequest {
                amount,
                currency,
                payment_capture: 1,
            })
            .send()
            .await
            .map_err(|e| RazorpayError::RequestFailed(e.to_string()))?;

        match response.status() {
            StatusCode::OK => {
                let order = response
                    .json::<OrderResponse>()
                    .await
                    .map_err(|e| RazorpayError::ResponseParseFailed(e.to_string()))?;
                tracing::debug!(order_id = %order.id, amount = order.amount, "Razorpay order created");
                Ok(GatewayOrder {
                    order_id: OrderId::new(order.id),
                    amount_minor_units: order.amount,
                    currency: order.currency,
                })
            }
            StatusCode::TOO_MANY_REQUESTS => Err(RazorpayError::RateLimited),
            StatusCode::UNAUTHORIZED => Err(RazorpayError::Unauthorized),
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(RazorpayError::ApiError {
                    status: status.as_u16(),
                    message: body,
                })
            }
        }
    }
}

impl PaymentGateway for RazorpayGateway {
    fn create_order<'a>(
        &'a self,
        amount_minor_units: u64,
        currency: &'a str,
    ) -> BoxFuture<'a, Result<GatewayOrder, GatewayError>> {
        Box::pin(async move {
            self.create(amount_minor_units, currency)
                .await
                .map_err(|e| {
                    tracing::warn!(error = %e, "Razorpay order creation failed");
                    GatewayError::from(e)
                })
        })
    }

    fn verify<'a>(&'a self, proof: &'a PaymentProof) -> BoxFuture<'a, Result<(), GatewayError>> {
        let result = verify_signature(
            self.config.key_secret.as_bytes(),
            proof.order_id.as_str(),
            proof.payment_id.as_str(),
            &proof.signature,
        );
        Box::pin(futures::future::ready(result))
    }
}
