//! Persistence seam. Handlers talk to these traits; [`mongo::MongoStore`] backs
//! them with MongoDB and [`memory::MemoryStore`] keeps everything in process.

pub mod memory;
pub mod mongo;

use std::{ops::Deref, sync::Arc};

use async_trait::async_trait;
use bson::oid::ObjectId;
use rust_decimal::Decimal;

use crate::{
    api::v1::{
        auth::UserModel,
        category::CategoryModel,
        order::{OrderModel, OrderStatus},
        product::ProductModel,
    },
    error::Error,
};

pub use memory::MemoryStore;
pub use mongo::MongoStore;

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn insert(&self, user: &UserModel) -> Result<(), Error>;

    async fn find_by_id(&self, id: ObjectId) -> Result<Option<UserModel>, Error>;

    async fn find_by_email(&self, email: &str) -> Result<Option<UserModel>, Error>;

    /// Replaces the stored document; `false` when no user has that id.
    async fn update(&self, user: &UserModel) -> Result<bool, Error>;
}

#[async_trait]
pub trait CategoryStore: Send + Sync {
    async fn insert(&self, category: &CategoryModel) -> Result<(), Error>;

    async fn find_by_id(&self, id: ObjectId) -> Result<Option<CategoryModel>, Error>;

    async fn find_by_name(&self, name: &str) -> Result<Option<CategoryModel>, Error>;

    async fn find_by_slug(&self, slug: &str) -> Result<Option<CategoryModel>, Error>;

    async fn list(&self) -> Result<Vec<CategoryModel>, Error>;

    async fn update(&self, category: &CategoryModel) -> Result<bool, Error>;

    async fn delete(&self, id: ObjectId) -> Result<bool, Error>;
}

#[async_trait]
pub trait ProductStore: Send + Sync {
    async fn insert(&self, product: &ProductModel) -> Result<(), Error>;

    /// Full document, photo included.
    async fn find_by_id(&self, id: ObjectId) -> Result<Option<ProductModel>, Error>;

    /// Photo stripped.
    async fn find_by_slug(&self, slug: &str) -> Result<Option<ProductModel>, Error>;

    /// Newest first, photos stripped.
    async fn find(&self, query: &ProductQuery) -> Result<Vec<ProductModel>, Error>;

    /// Photos stripped, in no particular order.
    async fn find_many(&self, ids: &[ObjectId]) -> Result<Vec<ProductModel>, Error>;

    async fn count(&self) -> Result<u64, Error>;

    async fn update(&self, product: &ProductModel) -> Result<bool, Error>;

    async fn delete(&self, id: ObjectId) -> Result<bool, Error>;
}

#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn insert(&self, order: &OrderModel) -> Result<(), Error>;

    /// Newest first.
    async fn find_by_buyer(&self, buyer: ObjectId) -> Result<Vec<OrderModel>, Error>;

    /// Newest first.
    async fn list(&self) -> Result<Vec<OrderModel>, Error>;

    async fn update_status(
        &self,
        id: ObjectId,
        status: OrderStatus,
    ) -> Result<Option<OrderModel>, Error>;
}

/// Catalog query shared by the listing, filter, search and related endpoints.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductQuery {
    /// Match products in any of these categories; empty means all.
    pub categories: Vec<ObjectId>,
    /// Inclusive price range.
    pub price: Option<(Decimal, Decimal)>,
    /// Case-insensitive literal match against name or description.
    pub keyword: Option<String>,
    pub exclude: Option<ObjectId>,
    pub skip: u64,
    pub limit: Option<i64>,
}

impl ProductQuery {
    pub fn matches(&self, product: &ProductModel) -> bool {
        if !self.categories.is_empty() && !self.categories.contains(&product.category) {
            return false;
        }

        if let Some((min, max)) = self.price {
            if product.price < min || product.price > max {
                return false;
            }
        }

        if let Some(keyword) = &self.keyword {
            let keyword = keyword.to_lowercase();
            if !product.name.to_lowercase().contains(&keyword)
                && !product.description.to_lowercase().contains(&keyword)
            {
                return false;
            }
        }

        self.exclude != Some(product.id)
    }
}

macro_rules! store_handle {
    ($name:ident, $store:ident) => {
        #[derive(Clone)]
        pub struct $name(pub Arc<dyn $store>);

        impl Deref for $name {
            type Target = dyn $store;

            fn deref(&self) -> &Self::Target {
                self.0.as_ref()
            }
        }
    };
}

store_handle!(UserCollection, UserStore);
store_handle!(CategoryCollection, CategoryStore);
store_handle!(ProductCollection, ProductStore);
store_handle!(OrderCollection, OrderStore);
