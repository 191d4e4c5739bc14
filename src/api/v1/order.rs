use std::collections::HashMap;

use axum::{extract::State, Json};
use bson::oid::ObjectId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tap::TapFallible;

use crate::{
    error::Error,
    payment::Transaction,
    store::{OrderCollection, ProductCollection, UserCollection},
    util::{FormattedDateTime, JsonBody, ObjectIdString, PathObjectId},
};

use super::{
    auth::{Admin, UserModel},
    product::{Product, ProductModel},
};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OrderStatus {
    #[default]
    #[serde(rename = "Not Process")]
    NotProcess,
    Processing,
    Shipped,
    #[serde(alias = "deliverd")]
    Delivered,
    #[serde(alias = "cancel")]
    Cancelled,
}

/// Gateway result stored alongside the order.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PaymentRecord {
    pub success: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction: Option<Transaction>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrderModel {
    #[serde(rename = "_id")]
    pub id: ObjectId,

    pub products: Vec<ObjectId>,
    pub payment: PaymentRecord,
    pub buyer: ObjectId,
    #[serde(default)]
    pub status: OrderStatus,

    pub created_at: bson::DateTime,
    pub updated_at: bson::DateTime,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Buyer {
    #[serde(rename = "_id")]
    pub id: ObjectIdString,
    pub name: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    #[serde(rename = "_id")]
    pub id: ObjectIdString,

    pub products: Vec<Product>,
    pub payment: PaymentRecord,
    pub buyer: Option<Buyer>,
    pub status: OrderStatus,

    pub created_at: FormattedDateTime,
    pub updated_at: FormattedDateTime,
}

/// Resolves product and buyer references. Products that no longer exist are
/// dropped from the listing; a deleted buyer renders as `null`.
async fn populate(
    products: &ProductCollection,
    users: &UserCollection,
    orders: Vec<OrderModel>,
) -> Result<Vec<Order>, Error> {
    let mut ids: Vec<ObjectId> = orders
        .iter()
        .flat_map(|it| it.products.iter().copied())
        .collect();
    ids.sort();
    ids.dedup();

    let found: HashMap<ObjectId, ProductModel> = if ids.is_empty() {
        HashMap::new()
    } else {
        products
            .find_many(&ids)
            .await?
            .into_iter()
            .map(|it| (it.id, it))
            .collect()
    };

    let mut buyers: HashMap<ObjectId, Option<Buyer>> = HashMap::new();
    let mut populated = Vec::with_capacity(orders.len());

    for order in orders {
        if !buyers.contains_key(&order.buyer) {
            let buyer = users.find_by_id(order.buyer).await?.map(|it| Buyer {
                id: it.id.into(),
                name: it.name,
            });
            buyers.insert(order.buyer, buyer);
        }

        populated.push(Order {
            id: order.id.into(),
            products: order
                .products
                .iter()
                .filter_map(|id| found.get(id).cloned().map(Into::into))
                .collect(),
            payment: order.payment,
            buyer: buyers.get(&order.buyer).cloned().flatten(),
            status: order.status,
            created_at: order.created_at.into(),
            updated_at: order.updated_at.into(),
        });
    }

    Ok(populated)
}

#[tracing::instrument(skip_all, fields(user = %user.id))]
pub async fn orders(
    State(orders): State<OrderCollection>,
    State(products): State<ProductCollection>,
    State(users): State<UserCollection>,
    user: UserModel,
) -> Result<Json<Vec<Order>>, Error> {
    let found = orders.find_by_buyer(user.id).await?;

    Ok(Json(populate(&products, &users, found).await?))
}

pub async fn all_orders(
    _admin: Admin,
    State(orders): State<OrderCollection>,
    State(products): State<ProductCollection>,
    State(users): State<UserCollection>,
) -> Result<Json<Vec<Order>>, Error> {
    let found = orders.list().await?;

    Ok(Json(populate(&products, &users, found).await?))
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct OrderStatusRequest {
    pub status: Option<OrderStatus>,
}

#[tracing::instrument(skip_all, fields(id = %id, status = ?request.status))]
pub async fn order_status(
    _admin: Admin,
    State(orders): State<OrderCollection>,
    State(products): State<ProductCollection>,
    State(users): State<UserCollection>,
    PathObjectId(id): PathObjectId,
    JsonBody(request): JsonBody<OrderStatusRequest>,
) -> Result<Json<Order>, Error> {
    let status = request
        .status
        .ok_or_else(|| Error::BadRequest("Status is required".into()))?;

    let order = orders
        .update_status(id, status)
        .await?
        .ok_or(Error::NotFound("Order not found"))
        .tap_err(|_| tracing::debug!("tried updating non existing order"))?;

    populate(&products, &users, vec![order])
        .await?
        .pop()
        .map(Json)
        .ok_or(Error::NotFound("Order not found"))
}
