use async_trait::async_trait;
use bson::{doc, oid::ObjectId, Document};
use mongodb::options::{
    ClientOptions, FindOneAndUpdateOptions, FindOneOptions, FindOptions, ReturnDocument,
};
use rust_decimal::prelude::ToPrimitive;
use tap::TapFallible;

use crate::{
    api::v1::{
        auth::UserModel,
        category::CategoryModel,
        order::{OrderModel, OrderStatus},
        product::ProductModel,
    },
    error::Error,
    mongo_ext::Collection,
};

use super::{CategoryStore, OrderStore, ProductQuery, ProductStore, UserStore};

#[derive(Clone)]
pub struct MongoStore {
    pub(crate) database: mongodb::Database,

    pub(crate) users: Collection<UserModel>,
    pub(crate) categories: Collection<CategoryModel>,
    pub(crate) products: Collection<ProductModel>,
    pub(crate) orders: Collection<OrderModel>,
}

impl MongoStore {
    pub async fn connect(uri: &str, database_name: &str) -> Result<Self, Error> {
        let options = ClientOptions::parse(uri).await?;
        let client = mongodb::Client::with_options(options)?;

        Ok(Self::new(client, database_name))
    }

    pub fn new(client: mongodb::Client, database_name: &str) -> Self {
        let database = client.database(database_name);

        Self {
            users: database.collection("users").into(),
            categories: database.collection("categories").into(),
            products: database.collection("products").into(),
            orders: database.collection("orders").into(),

            database,
        }
    }
}

fn newest_first() -> Document {
    doc! { "createdAt": -1, "_id": -1 }
}

fn without_photo() -> Document {
    doc! { "photo": 0 }
}

pub(crate) fn product_filter(query: &ProductQuery) -> Document {
    let mut filter = Document::new();

    if !query.categories.is_empty() {
        filter.insert("category", doc! { "$in": query.categories.clone() });
    }

    if let Some((min, max)) = query.price {
        filter.insert(
            "price",
            doc! {
                "$gte": min.to_f64().unwrap_or_default(),
                "$lte": max.to_f64().unwrap_or_default(),
            },
        );
    }

    if let Some(keyword) = &query.keyword {
        let pattern = regex::escape(keyword);
        filter.insert(
            "$or",
            vec![
                doc! { "name": { "$regex": pattern.clone(), "$options": "i" } },
                doc! { "description": { "$regex": pattern, "$options": "i" } },
            ],
        );
    }

    if let Some(exclude) = query.exclude {
        filter.insert("_id", doc! { "$ne": exclude });
    }

    filter
}

#[async_trait]
impl UserStore for MongoStore {
    async fn insert(&self, user: &UserModel) -> Result<(), Error> {
        self.users
            .insert_one(user, None)
            .await
            .map(|_| ())
            .tap_err(|err| tracing::debug!("failed inserting user: {}", err))
            .map_err(Into::into)
    }

    async fn find_by_id(&self, id: ObjectId) -> Result<Option<UserModel>, Error> {
        self.users.get_one_by_id(id).await
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserModel>, Error> {
        self.users.find_one_by(doc! { "email": email }).await
    }

    async fn update(&self, user: &UserModel) -> Result<bool, Error> {
        self.users.replace_one_by_id(user.id, user).await
    }
}

#[async_trait]
impl CategoryStore for MongoStore {
    async fn insert(&self, category: &CategoryModel) -> Result<(), Error> {
        self.categories.insert_one(category, None).await?;
        Ok(())
    }

    async fn find_by_id(&self, id: ObjectId) -> Result<Option<CategoryModel>, Error> {
        self.categories.get_one_by_id(id).await
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<CategoryModel>, Error> {
        self.categories.find_one_by(doc! { "name": name }).await
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<CategoryModel>, Error> {
        self.categories.find_one_by(doc! { "slug": slug }).await
    }

    async fn list(&self) -> Result<Vec<CategoryModel>, Error> {
        self.categories.find_all(None, None).await
    }

    async fn update(&self, category: &CategoryModel) -> Result<bool, Error> {
        self.categories
            .replace_one_by_id(category.id, category)
            .await
    }

    async fn delete(&self, id: ObjectId) -> Result<bool, Error> {
        self.categories.delete_one_by_id(id).await
    }
}

#[async_trait]
impl ProductStore for MongoStore {
    async fn insert(&self, product: &ProductModel) -> Result<(), Error> {
        self.products.insert_one(product, None).await?;
        Ok(())
    }

    async fn find_by_id(&self, id: ObjectId) -> Result<Option<ProductModel>, Error> {
        self.products.get_one_by_id(id).await
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<ProductModel>, Error> {
        self.products
            .find_one(
                doc! { "slug": slug },
                FindOneOptions::builder().projection(without_photo()).build(),
            )
            .await
            .map_err(Into::into)
    }

    async fn find(&self, query: &ProductQuery) -> Result<Vec<ProductModel>, Error> {
        let options = FindOptions::builder()
            .sort(newest_first())
            .projection(without_photo())
            .skip(query.skip)
            .limit(query.limit)
            .build();

        self.products
            .find_all(product_filter(query), options)
            .await
    }

    async fn find_many(&self, ids: &[ObjectId]) -> Result<Vec<ProductModel>, Error> {
        let options = FindOptions::builder().projection(without_photo()).build();

        self.products
            .find_all(doc! { "_id": { "$in": ids.to_vec() } }, options)
            .await
    }

    async fn count(&self) -> Result<u64, Error> {
        self.products
            .count_documents(None, None)
            .await
            .map_err(Into::into)
    }

    async fn update(&self, product: &ProductModel) -> Result<bool, Error> {
        self.products.replace_one_by_id(product.id, product).await
    }

    async fn delete(&self, id: ObjectId) -> Result<bool, Error> {
        self.products.delete_one_by_id(id).await
    }
}

#[async_trait]
impl OrderStore for MongoStore {
    async fn insert(&self, order: &OrderModel) -> Result<(), Error> {
        self.orders.insert_one(order, None).await?;
        Ok(())
    }

    async fn find_by_buyer(&self, buyer: ObjectId) -> Result<Vec<OrderModel>, Error> {
        let options = FindOptions::builder().sort(newest_first()).build();

        self.orders.find_all(doc! { "buyer": buyer }, options).await
    }

    async fn list(&self) -> Result<Vec<OrderModel>, Error> {
        let options = FindOptions::builder().sort(newest_first()).build();

        self.orders.find_all(None, options).await
    }

    async fn update_status(
        &self,
        id: ObjectId,
        status: OrderStatus,
    ) -> Result<Option<OrderModel>, Error> {
        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();

        self.orders
            .find_one_and_update(
                doc! { "_id": id },
                doc! {
                    "$set": {
                        "status": bson::to_bson(&status)?,
                        "updatedAt": bson::DateTime::now(),
                    }
                },
                options,
            )
            .await
            .map_err(Into::into)
    }
}
