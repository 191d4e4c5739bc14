use std::{collections::HashMap, str::FromStr};

use axum::{
    extract::{Multipart, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use bson::oid::ObjectId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tap::TapFallible;
use time::OffsetDateTime;

use crate::{
    error::Error,
    store::{CategoryCollection, ProductCollection, ProductQuery},
    util::{
        parse_object_id, required, slugify, FormattedDateTime, JsonBody, ObjectIdString,
        PathObjectId,
    },
};

use super::{
    auth::{Admin, MessageResponse},
    category::Category,
};

pub const MAX_PHOTO_BYTES: usize = 1_000_000;
/// Prices are stored as doubles, keep them well inside the exact range.
pub const MAX_PRICE: i64 = 1_000_000_000;
const HOME_PAGE_SIZE: i64 = 12;
const PAGE_SIZE: u64 = 6;
const RELATED_LIMIT: i64 = 3;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProductModel {
    #[serde(rename = "_id")]
    pub id: ObjectId,

    pub name: String,
    pub slug: String,
    pub description: String,

    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    pub category: ObjectId,
    pub quantity: i64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shipping: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo: Option<Photo>,

    pub created_at: bson::DateTime,
    pub updated_at: bson::DateTime,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Photo {
    pub data: bson::Binary,
    pub content_type: String,
}

impl Photo {
    pub fn new(bytes: Vec<u8>, content_type: impl Into<String>) -> Self {
        Self {
            data: bson::Binary {
                subtype: bson::spec::BinarySubtype::Generic,
                bytes,
            },
            content_type: content_type.into(),
        }
    }
}

/// Category reference as it leaves the API: populated when the listing
/// resolves it, the bare id otherwise.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum CategoryField {
    Populated(Category),
    Id(ObjectIdString),
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    #[serde(rename = "_id")]
    pub id: ObjectIdString,

    pub name: String,
    pub slug: String,
    pub description: String,

    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    pub category: CategoryField,
    pub quantity: i64,
    pub shipping: Option<bool>,

    pub created_at: FormattedDateTime,
    pub updated_at: FormattedDateTime,
}

impl Product {
    pub fn with_category(product: ProductModel, category: CategoryField) -> Self {
        Self {
            id: product.id.into(),
            name: product.name,
            slug: product.slug,
            description: product.description,

            price: product.price,
            category,
            quantity: product.quantity,
            shipping: product.shipping,

            created_at: product.created_at.into(),
            updated_at: product.updated_at.into(),
        }
    }
}

impl From<ProductModel> for Product {
    fn from(product: ProductModel) -> Self {
        let category = CategoryField::Id(product.category.into());

        Self::with_category(product, category)
    }
}

async fn populate(
    categories: &CategoryCollection,
    products: Vec<ProductModel>,
) -> Result<Vec<Product>, Error> {
    let mut resolved: HashMap<ObjectId, Option<Category>> = HashMap::new();
    let mut populated = Vec::with_capacity(products.len());

    for product in products {
        if !resolved.contains_key(&product.category) {
            let category = categories.find_by_id(product.category).await?;
            resolved.insert(product.category, category.map(Into::into));
        }

        let category = match resolved.get(&product.category).cloned().flatten() {
            Some(category) => CategoryField::Populated(category),
            None => CategoryField::Id(product.category.into()),
        };

        populated.push(Product::with_category(product, category));
    }

    Ok(populated)
}

/// Raw multipart fields of the create and update forms.
#[derive(Debug, Default)]
pub struct ProductForm {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<String>,
    pub category: Option<String>,
    pub quantity: Option<String>,
    pub shipping: Option<String>,
    pub photo: Option<(Vec<u8>, String)>,
}

/// Validated form.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductInput {
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub category: ObjectId,
    pub quantity: i64,
    pub shipping: Option<bool>,
    pub photo: Option<Photo>,
}

impl ProductForm {
    pub async fn from_multipart(mut multipart: Multipart) -> Result<Self, Error> {
        let mut form = Self::default();

        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_string();

            match name.as_str() {
                "photo" => {
                    let content_type = field
                        .content_type()
                        .unwrap_or("application/octet-stream")
                        .to_string();
                    let bytes = field.bytes().await?;

                    if !bytes.is_empty() {
                        form.photo = Some((bytes.to_vec(), content_type));
                    }
                }
                "name" => form.name = Some(field.text().await?),
                "description" => form.description = Some(field.text().await?),
                "price" => form.price = Some(field.text().await?),
                "category" => form.category = Some(field.text().await?),
                "quantity" => form.quantity = Some(field.text().await?),
                "shipping" => form.shipping = Some(field.text().await?),
                _ => tracing::debug!("ignoring form field {}", name),
            }
        }

        Ok(form)
    }

    pub fn validate(self) -> Result<ProductInput, Error> {
        let name = required(&self.name, "Name is Required")?;
        let description = required(&self.description, "Description is Required")?;
        let price = required(&self.price, "Price is Required")?;
        let category = required(&self.category, "Category is Required")?;
        let quantity = required(&self.quantity, "Quantity is Required")?;

        if let Some((bytes, _)) = &self.photo {
            if bytes.len() > MAX_PHOTO_BYTES {
                return Err(Error::BadRequest(
                    "Photo is Required and should be less then 1mb".into(),
                ));
            }
        }

        let price = Decimal::from_str(price.trim())
            .map_err(|_| Error::BadRequest("Price must be a number".into()))?;
        if price.is_sign_negative() {
            return Err(Error::BadRequest("Price must not be negative".into()));
        }
        if price > Decimal::from(MAX_PRICE) {
            return Err(Error::BadRequest("Price is too large".into()));
        }

        let quantity = quantity
            .trim()
            .parse::<i64>()
            .map_err(|_| Error::BadRequest("Quantity must be a whole number".into()))?;
        if quantity < 0 {
            return Err(Error::BadRequest("Quantity must not be negative".into()));
        }

        let category = parse_object_id(category.trim())
            .map_err(|_| Error::BadRequest("Invalid category ID".into()))?;

        let shipping = match self.shipping.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(value) => Some(matches!(value, "true" | "1" | "yes")),
        };

        Ok(ProductInput {
            name: name.to_string(),
            description: description.to_string(),
            price,
            category,
            quantity,
            shipping,
            photo: self
                .photo
                .map(|(bytes, content_type)| Photo::new(bytes, content_type)),
        })
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ProductMutationResponse {
    pub success: bool,
    pub message: String,
    pub products: Product,
}

#[tracing::instrument(skip_all, fields(admin = %admin.id))]
pub async fn create_product(
    Admin(admin): Admin,
    State(products): State<ProductCollection>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<ProductMutationResponse>), Error> {
    let input = ProductForm::from_multipart(multipart).await?.validate()?;
    let now = OffsetDateTime::now_utc();

    let product = ProductModel {
        id: ObjectId::new(),
        slug: slugify(&input.name),
        name: input.name,
        description: input.description,
        price: input.price,
        category: input.category,
        quantity: input.quantity,
        shipping: input.shipping,
        photo: input.photo,
        created_at: now.into(),
        updated_at: now.into(),
    };

    products.insert(&product).await?;
    tracing::debug!("created product {}", product.id);

    Ok((
        StatusCode::CREATED,
        Json(ProductMutationResponse {
            success: true,
            message: "Product Created Successfully".into(),
            products: product.into(),
        }),
    ))
}

#[tracing::instrument(skip_all, fields(admin = %admin.id, id = %id))]
pub async fn update_product(
    Admin(admin): Admin,
    State(products): State<ProductCollection>,
    PathObjectId(id): PathObjectId,
    multipart: Multipart,
) -> Result<(StatusCode, Json<ProductMutationResponse>), Error> {
    let input = ProductForm::from_multipart(multipart).await?.validate()?;

    let existing = products
        .find_by_id(id)
        .await?
        .ok_or(Error::NotFound("Product not found"))
        .tap_err(|_| tracing::debug!("tried updating non existing product"))?;

    let product = ProductModel {
        id,
        slug: slugify(&input.name),
        name: input.name,
        description: input.description,
        price: input.price,
        category: input.category,
        quantity: input.quantity,
        shipping: input.shipping,
        photo: input.photo.or(existing.photo),
        created_at: existing.created_at,
        updated_at: OffsetDateTime::now_utc().into(),
    };

    if !products.update(&product).await? {
        return Err(Error::NotFound("Product not found"));
    }

    Ok((
        StatusCode::CREATED,
        Json(ProductMutationResponse {
            success: true,
            message: "Product Updated Successfully".into(),
            products: product.into(),
        }),
    ))
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct AllProductsResponse {
    pub success: bool,
    pub count_total: usize,
    pub message: String,
    pub products: Vec<Product>,
}

pub async fn get_products(
    State(products): State<ProductCollection>,
    State(categories): State<CategoryCollection>,
) -> Result<Json<AllProductsResponse>, Error> {
    let found = products
        .find(&ProductQuery {
            limit: Some(HOME_PAGE_SIZE),
            ..Default::default()
        })
        .await?;

    let products = populate(&categories, found).await?;

    Ok(Json(AllProductsResponse {
        success: true,
        count_total: products.len(),
        message: "All Products".into(),
        products,
    }))
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct SingleProductResponse {
    pub success: bool,
    pub message: String,
    pub product: Product,
}

pub async fn get_product(
    State(products): State<ProductCollection>,
    State(categories): State<CategoryCollection>,
    Path(slug): Path<String>,
) -> Result<Json<SingleProductResponse>, Error> {
    let product = products
        .find_by_slug(&slug)
        .await?
        .ok_or(Error::NotFound("Product not found"))
        .tap_err(|_| tracing::debug!("tried accessing non existing product {}", slug))?;

    let product = populate(&categories, vec![product])
        .await?
        .pop()
        .ok_or(Error::NotFound("Product not found"))?;

    Ok(Json(SingleProductResponse {
        success: true,
        message: "Single Product Fetched".into(),
        product,
    }))
}

pub async fn product_photo(
    State(products): State<ProductCollection>,
    PathObjectId(id): PathObjectId,
) -> Result<Response, Error> {
    let photo = products
        .find_by_id(id)
        .await?
        .and_then(|it| it.photo)
        .ok_or(Error::NotFound("Photo not found"))?;

    Ok((
        [(header::CONTENT_TYPE, photo.content_type)],
        photo.data.bytes,
    )
        .into_response())
}

#[tracing::instrument(skip_all, fields(admin = %admin.id, id = %id))]
pub async fn delete_product(
    Admin(admin): Admin,
    State(products): State<ProductCollection>,
    PathObjectId(id): PathObjectId,
) -> Result<Json<MessageResponse>, Error> {
    if !products.delete(id).await? {
        tracing::debug!("product already absent");
    }

    Ok(Json(MessageResponse::new(true, "Product Deleted successfully")))
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct FilterRequest {
    #[serde(default)]
    pub checked: Vec<String>,
    #[serde(default)]
    pub radio: Vec<Decimal>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ProductListResponse {
    pub success: bool,
    pub products: Vec<Product>,
}

pub async fn product_filters(
    State(products): State<ProductCollection>,
    JsonBody(request): JsonBody<FilterRequest>,
) -> Result<Json<ProductListResponse>, Error> {
    let categories = request
        .checked
        .iter()
        .map(|it| parse_object_id(it))
        .collect::<Result<Vec<_>, _>>()?;

    let price = match request.radio.as_slice() {
        [] => None,
        [min, max] => Some((*min, *max)),
        _ => return Err(Error::BadRequest("Price range needs a minimum and a maximum".into())),
    };

    let found = products
        .find(&ProductQuery {
            categories,
            price,
            ..Default::default()
        })
        .await?;

    Ok(Json(ProductListResponse {
        success: true,
        products: found.into_iter().map(Into::into).collect(),
    }))
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ProductCountResponse {
    pub success: bool,
    pub total: u64,
}

pub async fn product_count(
    State(products): State<ProductCollection>,
) -> Result<Json<ProductCountResponse>, Error> {
    let total = products.count().await?;

    Ok(Json(ProductCountResponse {
        success: true,
        total,
    }))
}

pub async fn product_list(
    State(products): State<ProductCollection>,
    Path(page): Path<String>,
) -> Result<Json<ProductListResponse>, Error> {
    let invalid = || Error::BadRequest("Invalid page number".into());

    let page = page.parse::<u64>().map_err(|_| invalid())?.max(1);
    let skip = (page - 1)
        .checked_mul(PAGE_SIZE)
        .filter(|it| i64::try_from(*it).is_ok())
        .ok_or_else(invalid)?;

    let found = products
        .find(&ProductQuery {
            skip,
            limit: Some(PAGE_SIZE as i64),
            ..Default::default()
        })
        .await?;

    Ok(Json(ProductListResponse {
        success: true,
        products: found.into_iter().map(Into::into).collect(),
    }))
}

pub async fn search_product(
    State(products): State<ProductCollection>,
    Path(keyword): Path<String>,
) -> Result<Json<Vec<Product>>, Error> {
    let found = products
        .find(&ProductQuery {
            keyword: Some(keyword),
            ..Default::default()
        })
        .await?;

    Ok(Json(found.into_iter().map(Into::into).collect()))
}

pub async fn related_product(
    State(products): State<ProductCollection>,
    State(categories): State<CategoryCollection>,
    Path((pid, cid)): Path<(String, String)>,
) -> Result<Json<ProductListResponse>, Error> {
    let pid = parse_object_id(&pid)?;
    let cid = parse_object_id(&cid)?;

    let found = products
        .find(&ProductQuery {
            categories: vec![cid],
            exclude: Some(pid),
            limit: Some(RELATED_LIMIT),
            ..Default::default()
        })
        .await?;

    Ok(Json(ProductListResponse {
        success: true,
        products: populate(&categories, found).await?,
    }))
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct CategoryProductsResponse {
    pub success: bool,
    pub category: Category,
    pub products: Vec<Product>,
}

pub async fn product_category(
    State(products): State<ProductCollection>,
    State(categories): State<CategoryCollection>,
    Path(slug): Path<String>,
) -> Result<Json<CategoryProductsResponse>, Error> {
    let category = categories
        .find_by_slug(&slug)
        .await?
        .ok_or(Error::NotFound("Category not found"))?;

    let found = products
        .find(&ProductQuery {
            categories: vec![category.id],
            ..Default::default()
        })
        .await?;

    let category: Category = category.into();
    let products = found
        .into_iter()
        .map(|it| Product::with_category(it, CategoryField::Populated(category.clone())))
        .collect();

    Ok(Json(CategoryProductsResponse {
        success: true,
        category,
        products,
    }))
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use axum::http::Method;
    use serde_json::json;

    use crate::api::v1::tests::{bootstrap, failing_bootstrap};

    use super::*;

    fn form(category: &ObjectId) -> ProductForm {
        ProductForm {
            name: Some("Test product".into()),
            description: Some("Test product description".into()),
            price: Some("99".into()),
            category: Some(category.to_hex()),
            quantity: Some("19".into()),
            shipping: Some("true".into()),
            photo: Some((vec![0xff, 0xd8, 0xff], "image/jpeg".into())),
        }
    }

    #[test]
    fn test_validate_form() {
        let category = ObjectId::new();

        let input = form(&category).validate().unwrap();
        assert_eq!(input.name, "Test product");
        assert_eq!(input.price, Decimal::from(99));
        assert_eq!(input.category, category);
        assert_eq!(input.quantity, 19);
        assert_eq!(input.shipping, Some(true));
        assert_eq!(input.photo.unwrap().content_type, "image/jpeg");
    }

    #[test]
    fn test_validate_form_order() {
        let category = ObjectId::new();

        let cases: [(fn(&mut ProductForm), &str); 10] = [
            (
                |it| {
                    it.name = None;
                    it.description = None;
                },
                "Name is Required",
            ),
            (
                |it| {
                    it.description = None;
                    it.price = None;
                },
                "Description is Required",
            ),
            (|it| it.price = Some(" ".into()), "Price is Required"),
            (|it| it.category = None, "Category is Required"),
            (|it| it.quantity = None, "Quantity is Required"),
            (|it| it.price = Some("abc".into()), "Price must be a number"),
            (|it| it.price = Some("-1".into()), "Price must not be negative"),
            (
                |it| it.price = Some("50000000000000000000000000000".into()),
                "Price is too large",
            ),
            (
                |it| it.quantity = Some("1.5".into()),
                "Quantity must be a whole number",
            ),
            (
                |it| it.category = Some("invalidid".into()),
                "Invalid category ID",
            ),
        ];

        for (edit, message) in cases {
            let mut form = form(&category);
            edit(&mut form);
            assert_matches!(form.validate(), Err(Error::BadRequest(it)) if it == message);
        }
    }

    #[test]
    fn test_validate_photo_size() {
        let category = ObjectId::new();

        let at_limit = ProductForm {
            photo: Some((vec![0; MAX_PHOTO_BYTES], "image/png".into())),
            ..form(&category)
        };
        assert!(at_limit.validate().is_ok());

        let too_big = ProductForm {
            photo: Some((vec![0; MAX_PHOTO_BYTES + 1], "image/png".into())),
            ..form(&category)
        };
        assert_matches!(too_big.validate(), Err(Error::BadRequest(_)));
    }

    #[test]
    fn test_category_field_shapes() {
        let id = ObjectId::new();

        let bare = serde_json::to_value(CategoryField::Id(id.into())).unwrap();
        assert_eq!(bare, json!(id.to_hex()));

        let populated = serde_json::to_value(CategoryField::Populated(Category {
            id: id.into(),
            name: "Books".into(),
            slug: "books".into(),
        }))
        .unwrap();
        assert_eq!(populated["slug"], "books");
    }

    #[tokio::test]
    async fn test_create_product_route() {
        let bootstrap = bootstrap().await;
        let category = bootstrap.category("Electronics").await;

        let response = bootstrap
            .request_multipart(
                Method::POST,
                "/api/v1/product/create-product",
                Some(bootstrap.admin_token.as_str()),
                &[
                    ("name", "Test product"),
                    ("description", "Test product description"),
                    ("price", "99"),
                    ("category", category.id.to_hex().as_str()),
                    ("quantity", "19"),
                    ("shipping", "true"),
                ],
                Some(("image/jpeg", vec![0xff, 0xd8, 0xff, 0xe0])),
            )
            .await;

        assert_eq!(response.status, StatusCode::CREATED);
        assert_eq!(response.json["success"], true);
        assert_eq!(response.json["products"]["name"], "Test product");
        assert_eq!(response.json["products"]["slug"], "test-product");
        assert_eq!(response.json["products"]["price"], 99.0);
        assert_eq!(response.json["products"]["quantity"], 19);
        assert_eq!(response.json["products"]["shipping"], true);
        assert_eq!(response.json["products"]["category"], category.id.to_hex());

        let id = parse_object_id(response.json["products"]["_id"].as_str().unwrap()).unwrap();
        let stored = bootstrap
            .app_state
            .products
            .find_by_id(id)
            .await
            .unwrap()
            .unwrap();
        let photo = stored.photo.unwrap();
        assert_eq!(photo.content_type, "image/jpeg");
        assert_eq!(photo.data.bytes, vec![0xff, 0xd8, 0xff, 0xe0]);

        let response = bootstrap
            .request(
                Method::GET,
                &format!("/api/v1/product/product-photo/{}", id.to_hex()),
                None,
                None,
            )
            .await;
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.content_type.as_deref(), Some("image/jpeg"));
        assert_eq!(response.bytes, vec![0xff, 0xd8, 0xff, 0xe0]);
    }

    #[tokio::test]
    async fn test_create_product_requires_admin_and_fields() {
        let bootstrap = bootstrap().await;

        let response = bootstrap
            .request_multipart(
                Method::POST,
                "/api/v1/product/create-product",
                Some(bootstrap.customer_token.as_str()),
                &[("name", "Sneaky")],
                None,
            )
            .await;
        assert_eq!(response.status, StatusCode::FORBIDDEN);

        let response = bootstrap
            .request_multipart(
                Method::POST,
                "/api/v1/product/create-product",
                Some(bootstrap.admin_token.as_str()),
                &[("name", "No description")],
                None,
            )
            .await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        assert_eq!(response.json["message"], "Description is Required");
    }

    #[tokio::test]
    async fn test_update_product_route() {
        let bootstrap = bootstrap().await;
        let category = bootstrap.category("Books").await;
        let product = bootstrap
            .product("Novel", "A thrilling story", 15, category.id)
            .await;

        let response = bootstrap
            .request_multipart(
                Method::PUT,
                &format!("/api/v1/product/update-product/{}", product.id.to_hex()),
                Some(bootstrap.admin_token.as_str()),
                &[
                    ("name", "Updated Novel"),
                    ("description", "Now with an epilogue"),
                    ("price", "19.5"),
                    ("category", category.id.to_hex().as_str()),
                    ("quantity", "3"),
                    ("shipping", "false"),
                ],
                None,
            )
            .await;

        assert_eq!(response.status, StatusCode::CREATED);
        assert_eq!(response.json["products"]["slug"], "updated-novel");
        assert_eq!(response.json["products"]["price"], 19.5);
        assert_eq!(response.json["products"]["shipping"], false);

        let stored = bootstrap
            .app_state
            .products
            .find_by_id(product.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.created_at, product.created_at);
        assert_eq!(stored.photo, product.photo, "photo kept when not re-uploaded");

        let response = bootstrap
            .request_multipart(
                Method::PUT,
                &format!("/api/v1/product/update-product/{}", ObjectId::new().to_hex()),
                Some(bootstrap.admin_token.as_str()),
                &[
                    ("name", "Ghost"),
                    ("description", "Nothing here"),
                    ("price", "1"),
                    ("category", category.id.to_hex().as_str()),
                    ("quantity", "1"),
                ],
                None,
            )
            .await;
        assert_eq!(response.status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_listing_and_lookup() {
        let bootstrap = bootstrap().await;
        let category = bootstrap.category("Books").await;
        for i in 0..14 {
            bootstrap
                .product(&format!("Book {}", i), "Paperback", 10 + i, category.id)
                .await;
        }

        let Json(all) = super::get_products(bootstrap.products(), bootstrap.categories())
            .await
            .unwrap();
        assert_eq!(all.count_total, 12);
        assert_eq!(all.message, "All Products");
        assert_eq!(all.products[0].name, "Book 13");
        assert_matches!(
            &all.products[0].category,
            CategoryField::Populated(it) if it.name == "Books"
        );

        let Json(count) = super::product_count(bootstrap.products()).await.unwrap();
        assert_eq!(count.total, 14);

        let Json(page) = super::product_list(bootstrap.products(), Path("3".into()))
            .await
            .unwrap();
        let names: Vec<_> = page.products.iter().map(|it| it.name.as_str()).collect();
        assert_eq!(names, ["Book 1", "Book 0"]);

        let Json(single) = super::get_product(
            bootstrap.products(),
            bootstrap.categories(),
            Path("book-4".into()),
        )
        .await
        .unwrap();
        assert_eq!(single.message, "Single Product Fetched");
        assert_eq!(single.product.name, "Book 4");

        let err = super::get_product(
            bootstrap.products(),
            bootstrap.categories(),
            Path("nonexistent".into()),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_product_list_paging() {
        let bootstrap = bootstrap().await;
        for i in 0..8 {
            bootstrap
                .product(&format!("Lamp {}", i), "Bright", 5, ObjectId::new())
                .await;
        }

        let first = bootstrap
            .request(Method::GET, "/api/v1/product/product-list/1", None, None)
            .await;
        let zero = bootstrap
            .request(Method::GET, "/api/v1/product/product-list/0", None, None)
            .await;
        assert_eq!(zero.status, StatusCode::OK);
        assert_eq!(zero.json, first.json);
        assert_eq!(zero.json["products"].as_array().unwrap().len(), 6);
        assert_eq!(zero.json["products"][0]["name"], "Lamp 7");

        let past_end = bootstrap
            .request(Method::GET, "/api/v1/product/product-list/99", None, None)
            .await;
        assert_eq!(past_end.status, StatusCode::OK);
        assert_eq!(past_end.json["products"], json!([]));

        for page in ["abc", "-1", "18446744073709551615", "3074457345618258603"] {
            let response = bootstrap
                .request(
                    Method::GET,
                    &format!("/api/v1/product/product-list/{}", page),
                    None,
                    None,
                )
                .await;
            assert_eq!(response.status, StatusCode::BAD_REQUEST, "{}", page);
            assert_eq!(response.json["message"], "Invalid page number");
        }
    }

    #[tokio::test]
    async fn test_related_product_edges() {
        let bootstrap = bootstrap().await;
        let books = bootstrap.category("Books").await;
        let novel = bootstrap.product("Novel", "A thrilling story", 15, books.id).await;

        let unknown = format!(
            "/api/v1/product/related-product/{}/{}",
            ObjectId::new().to_hex(),
            ObjectId::new().to_hex()
        );
        let response = bootstrap.request(Method::GET, &unknown, None, None).await;
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.json["products"], json!([]));

        let only_self = format!(
            "/api/v1/product/related-product/{}/{}",
            novel.id.to_hex(),
            books.id.to_hex()
        );
        let response = bootstrap.request(Method::GET, &only_self, None, None).await;
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.json["products"], json!([]));

        let response = bootstrap
            .request(
                Method::GET,
                "/api/v1/product/related-product/invalidid/invalidid",
                None,
                None,
            )
            .await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_filters_search_and_related() {
        let bootstrap = bootstrap().await;
        let books = bootstrap.category("Books").await;
        let phones = bootstrap.category("Phones").await;
        let novel = bootstrap.product("Novel", "A thrilling story", 15, books.id).await;
        let textbook = bootstrap.product("Textbook", "Algebra (2nd ed.)", 80, books.id).await;
        bootstrap.product("Smartphone", "Latest model", 999, phones.id).await;

        let Json(filtered) = super::product_filters(
            bootstrap.products(),
            JsonBody(FilterRequest {
                checked: vec![books.id.to_hex()],
                radio: vec![Decimal::from(0), Decimal::from(20)],
            }),
        )
        .await
        .unwrap();
        assert_eq!(filtered.products.len(), 1);
        assert_eq!(filtered.products[0].id, novel.id);

        let Json(everything) =
            super::product_filters(bootstrap.products(), JsonBody(FilterRequest::default()))
                .await
                .unwrap();
        assert_eq!(everything.products.len(), 3);

        let Json(found) = super::search_product(bootstrap.products(), Path("STORY".into()))
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, novel.id);

        let Json(found) = super::search_product(bootstrap.products(), Path("(2nd".into()))
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, textbook.id);

        let Json(related) = super::related_product(
            bootstrap.products(),
            bootstrap.categories(),
            Path((novel.id.to_hex(), books.id.to_hex())),
        )
        .await
        .unwrap();
        assert_eq!(related.products.len(), 1);
        assert_eq!(related.products[0].id, textbook.id);

        let Json(by_category) = super::product_category(
            bootstrap.products(),
            bootstrap.categories(),
            Path("phones".into()),
        )
        .await
        .unwrap();
        assert_eq!(by_category.category.name, "Phones");
        assert_eq!(by_category.products.len(), 1);

        let err = super::product_category(
            bootstrap.products(),
            bootstrap.categories(),
            Path("unknown".into()),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_delete_product() {
        let bootstrap = bootstrap().await;
        let product = bootstrap.product("Gone", "Soon", 1, ObjectId::new()).await;

        for _ in 0..2 {
            let Json(response) = super::delete_product(
                bootstrap.admin(),
                bootstrap.products(),
                PathObjectId(product.id),
            )
            .await
            .unwrap();
            assert_eq!(response.message, "Product Deleted successfully");
        }

        let err = super::product_photo(bootstrap.products(), PathObjectId(product.id))
            .await
            .err();
        assert_matches!(err, Some(Error::NotFound(_)));
    }

    #[tokio::test]
    async fn test_store_failure() {
        let bootstrap = failing_bootstrap().await;

        for uri in [
            "/api/v1/product/get-product",
            "/api/v1/product/get-product/some-slug",
            "/api/v1/product/product-count",
        ] {
            let response = bootstrap.request(Method::GET, uri, None, None).await;
            assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR, "{}", uri);
            assert_eq!(response.json["success"], false);
        }
    }
}
