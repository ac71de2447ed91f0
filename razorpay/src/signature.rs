//! Checkout signature verification.
//!
//! Razorpay signs `"{order_id}|{payment_id}"` with the key secret using
//! HMAC-SHA256 and sends the hex digest as `razorpay_signature`.

use boxoffice_core::error::GatewayError;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

fn mac_for(secret: &[u8], order_id: &str, payment_id: &str) -> Result<HmacSha256, GatewayError> {
    let mut mac = HmacSha256::new_from_slice(secret)
        .map_err(|e| GatewayError::Misconfigured(format!("Failed to create HMAC: {e}")))?;
    mac.update(order_id.as_bytes());
    mac.update(b"|");
    mac.update(payment_id.as_bytes());
    Ok(mac)
}

/// Hex signature for an order and payment.
///
/// # Errors
///
/// Returns [`GatewayError::Misconfigured`] if the key cannot seed the MAC.
pub fn sign(secret: &[u8], order_id: &str, payment_id: &str) -> Result<String, GatewayError> {
    let mac = mac_for(secret, order_id, payment_id)?;
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Checks `signature` in constant time.
///
/// # Errors
///
/// Returns [`GatewayError::SignatureInvalid`] if the signature is not valid
/// hex or does not match.
pub fn verify_signature(
    secret: &[u8],
    order_id: &str,
    payment_id: &str,
    signature: &str,
) -> Result<(), GatewayError> {
    let provided = hex::decode(signature.trim()).map_err(|_| GatewayError::SignatureInvalid)?;
    mac_for(secret, order_id, payment_id)?
        .verify_slice(&provided)
        .map_err(|_| GatewayError::SignatureInvalid)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"test_secret";
    const ORDER: &str = "order_IEIaMR65cu6nz3";
    const PAYMENT: &str = "pay_IH4NVgf4Dreq1l";
    const EXPECTED: &str = "2d67c3fceac8e3487e54e2d6ea7815a350a8562ed56d521a80eb43a393e9ab52";

    #[test]
    fn signs_order_and_payment_ids() {
        assert_eq!(sign(SECRET, ORDER, PAYMENT), Ok(EXPECTED.to_string()));
    }

    #[test]
    fn accepts_matching_signature() {
        assert_eq!(verify_signature(SECRET, ORDER, PAYMENT, EXPECTED), Ok(()));
    }

    #[test]
    fn rejects_tampered_ids() {
        assert_eq!(
            verify_signature(SECRET, ORDER, "pay_other", EXPECTED),
            Err(GatewayError::SignatureInvalid)
        );
        assert_eq!(
            verify_signature(b"other_secret", ORDER, PAYMENT, EXPECTED),
            Err(GatewayError::SignatureInvalid)
        );
    }

    #[test]
    fn rejects_malformed_signatures() {
        assert_eq!(
            verify_signature(SECRET, ORDER, PAYMENT, "not-hex"),
            Err(GatewayError::SignatureInvalid)
        );
        assert_eq!(
            verify_signature(SECRET, ORDER, PAYMENT, &EXPECTED[..32]),
            Err(GatewayError::SignatureInvalid)
        );
        assert_eq!(
            verify_signature(SECRET, ORDER, PAYMENT, ""),
            Err(GatewayError::SignatureInvalid)
        );
    }
}
