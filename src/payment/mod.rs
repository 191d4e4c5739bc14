//! Payment gateway seam. The application never sees card data: the browser
//! tokenizes it with the gateway's hosted fields and sends back a nonce.

mod braintree;

use std::{ops::Deref, sync::Arc};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub use braintree::BraintreeGateway;

#[derive(Debug, thiserror::Error)]
pub enum PaymentError {
    #[error("Payment gateway is not configured")]
    NotConfigured,

    #[error("payment gateway request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("payment gateway returned an unexpected response: {0}")]
    Protocol(String),
}

/// Result of a charge attempt that reached the gateway.
#[derive(Debug, Clone, PartialEq)]
pub enum ChargeOutcome {
    Approved(Transaction),
    Declined { message: String },
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Transaction {
    pub id: String,
    pub status: String,
}

#[async_trait::async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn client_token(&self) -> Result<String, PaymentError>;

    async fn charge(&self, nonce: &str, amount: Decimal) -> Result<ChargeOutcome, PaymentError>;
}

#[derive(Clone)]
pub struct Gateway(pub Arc<dyn PaymentGateway>);

impl Deref for Gateway {
    type Target = dyn PaymentGateway;

    fn deref(&self) -> &Self::Target {
        self.0.as_ref()
    }
}

/// Stand-in used when no gateway credentials are configured.
pub struct DisabledGateway;

#[async_trait::async_trait]
impl PaymentGateway for DisabledGateway {
    async fn client_token(&self) -> Result<String, PaymentError> {
        Err(PaymentError::NotConfigured)
    }

    async fn charge(&self, _nonce: &str, _amount: Decimal) -> Result<ChargeOutcome, PaymentError> {
        Err(PaymentError::NotConfigured)
    }
}
