//! Scripted payment gateway.

use crate::mocks::ManualClock;
use boxoffice_core::error::GatewayError;
use boxoffice_core::payment::{GatewayOrder, PaymentGateway, PaymentProof};
use boxoffice_core::types::{GatewayPaymentId, OrderId};
use futures::future::BoxFuture;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// Gateway whose signatures are `sig:{order_id}:{payment_id}`.
#[derive(Debug, Default)]
pub struct StubGateway {
    next_order: AtomicU32,
    verifications: AtomicU32,
    reject_orders: AtomicBool,
    verify_delay: Option<Duration>,
    clock_jump: Mutex<Option<(Arc<ManualClock>, chrono::Duration)>>,
}

impl StubGateway {
    /// Gateway that answers immediately
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Gateway whose verification takes `delay`
    #[must_use]
    pub fn with_verify_delay(delay: Duration) -> Self {
        Self {
            verify_delay: Some(delay),
            ..Self::default()
        }
    }

    /// Signature the stub accepts for an order and payment
    #[must_use]
    pub fn sign(order_id: &OrderId, payment_id: &GatewayPaymentId) -> String {
        format!("sig:{order_id}:{payment_id}")
    }

    /// A valid proof for `order`
    #[must_use]
    pub fn proof_for(order: &GatewayOrder, payment_id: &str) -> PaymentProof {
        let payment_id = GatewayPaymentId::new(payment_id);
        PaymentProof {
            signature: Self::sign(&order.order_id, &payment_id),
            order_id: order.order_id.clone(),
            payment_id,
        }
    }

    /// A proof with a forged signature
    #[must_use]
    pub fn forged_proof_for(order: &GatewayOrder, payment_id: &str) -> PaymentProof {
        PaymentProof {
            signature: "forged".to_string(),
            order_id: order.order_id.clone(),
            payment_id: GatewayPaymentId::new(payment_id),
        }
    }

    /// Makes order creation fail
    pub fn set_reject_orders(&self, reject: bool) {
        self.reject_orders.store(reject, Ordering::SeqCst);
    }

    /// Moves `clock` forward by `by` while the next verification is in flight
    pub fn advance_clock_on_verify(&self, clock: Arc<ManualClock>, by: chrono::Duration) {
        *self.clock_jump.lock().unwrap_or_else(PoisonError::into_inner) = Some((clock, by));
    }

    /// Orders created so far
    #[must_use]
    pub fn orders_created(&self) -> u32 {
        self.next_order.load(Ordering::SeqCst)
    }

    /// Verifications attempted so far
    #[must_use]
    pub fn verifications(&self) -> u32 {
        self.verifications.load(Ordering::SeqCst)
    }
}

impl PaymentGateway for StubGateway {
    fn create_order<'a>(
        &'a self,
        amount_minor_units: u64,
        currency: &'a str,
    ) -> BoxFuture<'a, Result<GatewayOrder, GatewayError>> {
        Box::pin(async move {
            if self.reject_orders.load(Ordering::SeqCst) {
                return Err(GatewayError::Rejected {
                    status: 400,
                    message: "order creation disabled".to_string(),
                });
            }
            let n = self.next_order.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(GatewayOrder {
                order_id: OrderId::new(format!("order_{n}")),
                amount_minor_units,
                currency: currency.to_string(),
            })
        })
    }

    fn verify<'a>(&'a self, proof: &'a PaymentProof) -> BoxFuture<'a, Result<(), GatewayError>> {
        Box::pin(async move {
            self.verifications.fetch_add(1, Ordering::SeqCst);
            let jump = self
                .clock_jump
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .take();
            if let Some((clock, by)) = jump {
                clock.advance(by);
            }
            if let Some(delay) = self.verify_delay {
                tokio::time::sleep(delay).await;
            }
            if proof.signature == Self::sign(&proof.order_id, &proof.payment_id) {
                Ok(())
            } else {
                Err(GatewayError::SignatureInvalid)
            }
        })
    }
}
