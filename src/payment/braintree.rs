use std::sync::Arc;

use base64::{engine::general_purpose, Engine as _};
use rust_decimal::Decimal;
use secrecy::ExposeSecret;
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::json;

use crate::config::BraintreeConfig;

use super::{ChargeOutcome, PaymentError, PaymentGateway, Transaction};

const BRAINTREE_VERSION: &str = "2019-01-01";

const CREATE_CLIENT_TOKEN: &str = r#"
mutation CreateClientToken($input: CreateClientTokenInput) {
  createClientToken(input: $input) {
    clientToken
  }
}"#;

const CHARGE_PAYMENT_METHOD: &str = r#"
mutation ChargePaymentMethod($input: ChargePaymentMethodInput!) {
  chargePaymentMethod(input: $input) {
    transaction {
      id
      status
    }
  }
}"#;

const DECLINED_STATUSES: &[&str] = &[
    "PROCESSOR_DECLINED",
    "GATEWAY_REJECTED",
    "SETTLEMENT_DECLINED",
    "FAILED",
];

/// Braintree client over its GraphQL API.
#[derive(Clone)]
pub struct BraintreeGateway {
    inner: Arc<BraintreeGatewayInner>,
}

struct BraintreeGatewayInner {
    client: reqwest::Client,
    endpoint: String,
    authorization: String,
}

impl BraintreeGateway {
    pub fn new(config: &BraintreeConfig) -> Self {
        let credentials = format!(
            "{}:{}",
            config.public_key,
            config.private_key.expose_secret()
        );

        Self {
            inner: Arc::new(BraintreeGatewayInner {
                client: reqwest::Client::new(),
                endpoint: config.environment.graphql_endpoint().to_string(),
                authorization: format!("Basic {}", general_purpose::STANDARD.encode(credentials)),
            }),
        }
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        query: &str,
        variables: serde_json::Value,
    ) -> Result<GraphQlResponse<T>, PaymentError> {
        let response = self
            .inner
            .client
            .post(&self.inner.endpoint)
            .header("Authorization", &self.inner.authorization)
            .header("Braintree-Version", BRAINTREE_VERSION)
            .json(&json!({ "query": query, "variables": variables }))
            .send()
            .await?;

        let status = response.status();
        if status.is_server_error() || status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(PaymentError::Protocol(format!("HTTP {}", status)));
        }

        response.json().await.map_err(Into::into)
    }
}

#[derive(Deserialize, Debug)]
struct GraphQlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Deserialize, Debug)]
struct GraphQlError {
    message: String,
    #[serde(default)]
    extensions: Option<GraphQlErrorExtensions>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct GraphQlErrorExtensions {
    error_class: Option<String>,
}

impl GraphQlError {
    fn is_validation(&self) -> bool {
        self.extensions
            .as_ref()
            .and_then(|it| it.error_class.as_deref())
            == Some("VALIDATION")
    }
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct ClientTokenData {
    create_client_token: Option<ClientTokenPayload>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct ClientTokenPayload {
    client_token: String,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct ChargeData {
    charge_payment_method: Option<ChargePayload>,
}

#[derive(Deserialize, Debug)]
struct ChargePayload {
    transaction: Option<Transaction>,
}

fn interpret_client_token(
    response: GraphQlResponse<ClientTokenData>,
) -> Result<String, PaymentError> {
    if let Some(error) = response.errors.into_iter().next() {
        return Err(PaymentError::Protocol(error.message));
    }

    response
        .data
        .and_then(|it| it.create_client_token)
        .map(|it| it.client_token)
        .ok_or_else(|| PaymentError::Protocol("missing clientToken".into()))
}

fn interpret_charge(response: GraphQlResponse<ChargeData>) -> Result<ChargeOutcome, PaymentError> {
    let transaction = response
        .data
        .and_then(|it| it.charge_payment_method)
        .and_then(|it| it.transaction);

    if let Some(error) = response.errors.into_iter().next() {
        return if error.is_validation() || transaction.is_some() {
            Ok(ChargeOutcome::Declined {
                message: error.message,
            })
        } else {
            Err(PaymentError::Protocol(error.message))
        };
    }

    match transaction {
        Some(transaction) if DECLINED_STATUSES.contains(&transaction.status.as_str()) => {
            Ok(ChargeOutcome::Declined {
                message: format!("Transaction {}", transaction.status.to_lowercase()),
            })
        }
        Some(transaction) => Ok(ChargeOutcome::Approved(transaction)),
        None => Err(PaymentError::Protocol("missing transaction".into())),
    }
}

#[async_trait::async_trait]
impl PaymentGateway for BraintreeGateway {
    #[tracing::instrument(skip_all)]
    async fn client_token(&self) -> Result<String, PaymentError> {
        let response = self
            .execute::<ClientTokenData>(CREATE_CLIENT_TOKEN, json!({ "input": {} }))
            .await?;

        interpret_client_token(response)
    }

    #[tracing::instrument(skip(self, nonce))]
    async fn charge(&self, nonce: &str, amount: Decimal) -> Result<ChargeOutcome, PaymentError> {
        let response = self
            .execute::<ChargeData>(
                CHARGE_PAYMENT_METHOD,
                json!({
                    "input": {
                        "paymentMethodId": nonce,
                        "transaction": { "amount": format!("{:.2}", amount) }
                    }
                }),
            )
            .await?;

        let outcome = interpret_charge(response)?;
        tracing::debug!("charge outcome {:?}", outcome);

        Ok(outcome)
    }
}
