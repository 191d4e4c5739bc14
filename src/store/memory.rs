use std::cmp::Ordering;

use async_trait::async_trait;
use bson::oid::ObjectId;
use tokio::sync::RwLock;

use crate::{
    api::v1::{
        auth::UserModel,
        category::CategoryModel,
        order::{OrderModel, OrderStatus},
        product::ProductModel,
    },
    error::Error,
};

use super::{CategoryStore, OrderStore, ProductQuery, ProductStore, UserStore};

/// Process-local store. Backs the test suite and `DATABASE_BACKEND=memory`.
#[derive(Default)]
pub struct MemoryStore {
    users: RwLock<Vec<UserModel>>,
    categories: RwLock<Vec<CategoryModel>>,
    products: RwLock<Vec<ProductModel>>,
    orders: RwLock<Vec<OrderModel>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn newest_first(
    (a_created, a_id): (bson::DateTime, ObjectId),
    (b_created, b_id): (bson::DateTime, ObjectId),
) -> Ordering {
    b_created.cmp(&a_created).then_with(|| b_id.cmp(&a_id))
}

fn without_photo(product: &ProductModel) -> ProductModel {
    ProductModel {
        photo: None,
        ..product.clone()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn insert(&self, user: &UserModel) -> Result<(), Error> {
        let mut users = self.users.write().await;

        if users.iter().any(|it| it.email == user.email) {
            return Err(anyhow::anyhow!("duplicate key: email {}", user.email).into());
        }

        users.push(user.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: ObjectId) -> Result<Option<UserModel>, Error> {
        Ok(self.users.read().await.iter().find(|it| it.id == id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserModel>, Error> {
        Ok(self
            .users
            .read()
            .await
            .iter()
            .find(|it| it.email == email)
            .cloned())
    }

    async fn update(&self, user: &UserModel) -> Result<bool, Error> {
        let mut users = self.users.write().await;

        match users.iter_mut().find(|it| it.id == user.id) {
            Some(stored) => {
                *stored = user.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl CategoryStore for MemoryStore {
    async fn insert(&self, category: &CategoryModel) -> Result<(), Error> {
        self.categories.write().await.push(category.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: ObjectId) -> Result<Option<CategoryModel>, Error> {
        Ok(self
            .categories
            .read()
            .await
            .iter()
            .find(|it| it.id == id)
            .cloned())
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<CategoryModel>, Error> {
        Ok(self
            .categories
            .read()
            .await
            .iter()
            .find(|it| it.name == name)
            .cloned())
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<CategoryModel>, Error> {
        Ok(self
            .categories
            .read()
            .await
            .iter()
            .find(|it| it.slug == slug)
            .cloned())
    }

    async fn list(&self) -> Result<Vec<CategoryModel>, Error> {
        Ok(self.categories.read().await.clone())
    }

    async fn update(&self, category: &CategoryModel) -> Result<bool, Error> {
        let mut categories = self.categories.write().await;

        match categories.iter_mut().find(|it| it.id == category.id) {
            Some(stored) => {
                *stored = category.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, id: ObjectId) -> Result<bool, Error> {
        let mut categories = self.categories.write().await;
        let before = categories.len();

        categories.retain(|it| it.id != id);

        Ok(categories.len() != before)
    }
}

#[async_trait]
impl ProductStore for MemoryStore {
    async fn insert(&self, product: &ProductModel) -> Result<(), Error> {
        self.products.write().await.push(product.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: ObjectId) -> Result<Option<ProductModel>, Error> {
        Ok(self
            .products
            .read()
            .await
            .iter()
            .find(|it| it.id == id)
            .cloned())
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<ProductModel>, Error> {
        Ok(self
            .products
            .read()
            .await
            .iter()
            .find(|it| it.slug == slug)
            .map(without_photo))
    }

    async fn find(&self, query: &ProductQuery) -> Result<Vec<ProductModel>, Error> {
        let mut products: Vec<ProductModel> = self
            .products
            .read()
            .await
            .iter()
            .filter(|it| query.matches(it))
            .map(without_photo)
            .collect();

        products.sort_by(|a, b| newest_first((a.created_at, a.id), (b.created_at, b.id)));

        let limit = match query.limit {
            Some(limit) if limit > 0 => limit as usize,
            _ => usize::MAX,
        };

        Ok(products
            .into_iter()
            .skip(usize::try_from(query.skip).unwrap_or(usize::MAX))
            .take(limit)
            .collect())
    }

    async fn find_many(&self, ids: &[ObjectId]) -> Result<Vec<ProductModel>, Error> {
        Ok(self
            .products
            .read()
            .await
            .iter()
            .filter(|it| ids.contains(&it.id))
            .map(without_photo)
            .collect())
    }

    async fn count(&self) -> Result<u64, Error> {
        Ok(self.products.read().await.len() as u64)
    }

    async fn update(&self, product: &ProductModel) -> Result<bool, Error> {
        let mut products = self.products.write().await;

        match products.iter_mut().find(|it| it.id == product.id) {
            Some(stored) => {
                *stored = product.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, id: ObjectId) -> Result<bool, Error> {
        let mut products = self.products.write().await;
        let before = products.len();

        products.retain(|it| it.id != id);

        Ok(products.len() != before)
    }
}

#[async_trait]
impl OrderStore for MemoryStore {
    async fn insert(&self, order: &OrderModel) -> Result<(), Error> {
        self.orders.write().await.push(order.clone());
        Ok(())
    }

    async fn find_by_buyer(&self, buyer: ObjectId) -> Result<Vec<OrderModel>, Error> {
        let mut orders: Vec<OrderModel> = self
            .orders
            .read()
            .await
            .iter()
            .filter(|it| it.buyer == buyer)
            .cloned()
            .collect();

        orders.sort_by(|a, b| newest_first((a.created_at, a.id), (b.created_at, b.id)));
        Ok(orders)
    }

    async fn list(&self) -> Result<Vec<OrderModel>, Error> {
        let mut orders = self.orders.read().await.clone();

        orders.sort_by(|a, b| newest_first((a.created_at, a.id), (b.created_at, b.id)));
        Ok(orders)
    }

    async fn update_status(
        &self,
        id: ObjectId,
        status: OrderStatus,
    ) -> Result<Option<OrderModel>, Error> {
        let mut orders = self.orders.write().await;

        Ok(orders.iter_mut().find(|it| it.id == id).map(|order| {
            order.status = status;
            order.updated_at = bson::DateTime::now();
            order.clone()
        }))
    }
}
