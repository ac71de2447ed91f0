//! Payment gateway adapter contract.
//!
//! The gateway is untrusted: a booking is only written after
//! [`PaymentGateway::verify`] accepts the proof the client submits.

use crate::error::GatewayError;
use crate::types::{GatewayPaymentId, OrderId};
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};

/// Order created at the gateway for one hold
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayOrder {
    /// Gateway order id
    pub order_id: OrderId,
    /// Amount in minor units (paise)
    pub amount_minor_units: u64,
    /// ISO currency code
    pub currency: String,
}

/// What the client sends back after paying
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentProof {
    /// Order paid against
    pub order_id: OrderId,
    /// Gateway payment id
    pub payment_id: GatewayPaymentId,
    /// Gateway signature over order and payment ids
    pub signature: String,
}

/// Payment gateway trait
pub trait PaymentGateway: Send + Sync {
    /// Creates an order the customer can pay.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError`] if the gateway refuses or cannot be reached.
    fn create_order<'a>(
        &'a self,
        amount_minor_units: u64,
        currency: &'a str,
    ) -> BoxFuture<'a, Result<GatewayOrder, GatewayError>>;

    /// Verifies a payment proof.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::SignatureInvalid`] if the proof does not verify.
    fn verify<'a>(&'a self, proof: &'a PaymentProof) -> BoxFuture<'a, Result<(), GatewayError>>;
}
