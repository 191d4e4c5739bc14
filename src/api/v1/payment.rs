use std::collections::HashMap;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use bson::oid::ObjectId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{
    error::Error,
    payment::{ChargeOutcome, Gateway},
    store::{OrderCollection, ProductCollection},
    util::{parse_object_id, required, JsonBody},
};

use super::{
    auth::{AuthCheckResponse, MessageResponse, UserModel},
    order::{OrderModel, OrderStatus, PaymentRecord},
};

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ClientTokenResponse {
    pub success: bool,
    pub client_token: String,
}

pub async fn braintree_token(
    State(gateway): State<Gateway>,
) -> Result<Json<ClientTokenResponse>, Error> {
    let client_token = gateway.client_token().await?;

    Ok(Json(ClientTokenResponse {
        success: true,
        client_token,
    }))
}

/// Cart line as the storefront sends it. Only the id is trusted; everything
/// else is re-read from the catalog.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct CartItem {
    #[serde(rename = "_id")]
    pub id: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct PaymentRequest {
    pub nonce: Option<String>,
    #[serde(default)]
    pub cart: Vec<CartItem>,
}

#[tracing::instrument(skip_all, fields(user = %user.id, items = request.cart.len()))]
pub async fn braintree_payment(
    State(gateway): State<Gateway>,
    State(products): State<ProductCollection>,
    State(orders): State<OrderCollection>,
    user: UserModel,
    JsonBody(request): JsonBody<PaymentRequest>,
) -> Result<Response, Error> {
    let nonce = required(&request.nonce, "Payment nonce is required")?;

    if request.cart.is_empty() {
        return Err(Error::BadRequest("Cart is empty".into()));
    }

    let ids = request
        .cart
        .iter()
        .map(|it| parse_object_id(&it.id))
        .collect::<Result<Vec<ObjectId>, _>>()
        .map_err(|_| Error::BadRequest("Cart contains an invalid product ID".into()))?;

    let prices: HashMap<ObjectId, Decimal> = products
        .find_many(&ids)
        .await?
        .into_iter()
        .map(|it| (it.id, it.price))
        .collect();

    let mut total = Decimal::ZERO;
    for id in &ids {
        let price = prices
            .get(id)
            .ok_or_else(|| Error::BadRequest("Cart contains an unknown product".into()))?;
        total = total
            .checked_add(*price)
            .ok_or_else(|| Error::BadRequest("Cart total is too large".into()))?;
    }

    let outcome = gateway.charge(nonce, total).await?;

    let payment = match &outcome {
        ChargeOutcome::Approved(transaction) => PaymentRecord {
            success: true,
            transaction: Some(transaction.clone()),
            message: None,
            amount: total,
        },
        ChargeOutcome::Declined { message } => PaymentRecord {
            success: false,
            transaction: None,
            message: Some(message.clone()),
            amount: total,
        },
    };

    let now = OffsetDateTime::now_utc();
    let order = OrderModel {
        id: ObjectId::new(),
        products: ids,
        payment,
        buyer: user.id,
        status: OrderStatus::NotProcess,
        created_at: now.into(),
        updated_at: now.into(),
    };

    orders.insert(&order).await?;
    tracing::debug!("recorded order {} for {}", order.id, total);

    Ok(match outcome {
        ChargeOutcome::Approved(_) => Json(AuthCheckResponse { ok: true }).into_response(),
        ChargeOutcome::Declined { message } => (
            StatusCode::PAYMENT_REQUIRED,
            Json(MessageResponse::new(false, message)),
        )
            .into_response(),
    })
}
