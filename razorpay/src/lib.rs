//! # Razorpay payment gateway adapter
//!
//! Implements [`PaymentGateway`](boxoffice_core::payment::PaymentGateway)
//! against the Razorpay Orders API.
//!
//! - `create_order` posts to `{api_url}/orders` with HTTP basic auth
//! - `verify` checks the checkout signature locally with HMAC-SHA256 and
//!   never touches the network
//!
//! ## Example
//!
//! ```no_run
//! use boxoffice_razorpay::{RazorpayConfig, RazorpayGateway};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = RazorpayConfig::new("rzp_test_key", "rzp_test_secret");
//! let gateway = RazorpayGateway::new(config)?;
//! println!("checkout key: {}", gateway.key_id());
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod error;
pub mod signature;

pub use client::{DEFAULT_API_URL, RazorpayConfig, RazorpayGateway};
pub use error::RazorpayError;
pub use signature::{sign, verify_signature};
