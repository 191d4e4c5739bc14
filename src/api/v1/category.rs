use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use tap::TapFallible;

use crate::{
    error::Error,
    store::CategoryCollection,
    util::{required, slugify, JsonBody, ObjectIdString, PathObjectId},
};

use super::auth::{Admin, MessageResponse};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CategoryModel {
    #[serde(rename = "_id")]
    pub id: ObjectId,

    pub name: String,
    pub slug: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Category {
    #[serde(rename = "_id")]
    pub id: ObjectIdString,

    pub name: String,
    pub slug: String,
}

impl From<CategoryModel> for Category {
    fn from(value: CategoryModel) -> Self {
        Self {
            id: value.id.into(),
            name: value.name,
            slug: value.slug,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct CategoryRequest {
    pub name: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct CategoryResponse {
    pub success: bool,
    pub message: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct CategoryListResponse {
    pub success: bool,
    pub message: String,
    pub category: Vec<Category>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct SingleCategoryResponse {
    pub success: bool,
    pub message: String,
    pub category: Option<Category>,
}

#[tracing::instrument(skip_all, fields(name = ?request.name))]
pub async fn create_category(
    _admin: Admin,
    State(categories): State<CategoryCollection>,
    JsonBody(request): JsonBody<CategoryRequest>,
) -> Result<(StatusCode, Json<CategoryResponse>), Error> {
    let name = required(&request.name, "")
        .map_err(|_| Error::CustomStr(StatusCode::UNAUTHORIZED, "Name is required"))?;

    if categories.find_by_name(name).await?.is_some() {
        tracing::debug!("category already exists");
        return Ok((
            StatusCode::OK,
            Json(CategoryResponse {
                success: true,
                message: "Category Already Exists".into(),
                category: None,
            }),
        ));
    }

    let category = CategoryModel {
        id: ObjectId::new(),
        name: name.to_string(),
        slug: slugify(name),
    };

    categories.insert(&category).await?;
    tracing::debug!("created category {}", category.id);

    Ok((
        StatusCode::CREATED,
        Json(CategoryResponse {
            success: true,
            message: "New category created".into(),
            category: Some(category.into()),
        }),
    ))
}

#[tracing::instrument(skip_all, fields(id = %id))]
pub async fn update_category(
    _admin: Admin,
    State(categories): State<CategoryCollection>,
    PathObjectId(id): PathObjectId,
    JsonBody(request): JsonBody<CategoryRequest>,
) -> Result<Json<CategoryResponse>, Error> {
    let name = required(&request.name, "Name is required")?;

    let category = CategoryModel {
        id,
        name: name.to_string(),
        slug: slugify(name),
    };

    if !categories.update(&category).await? {
        return Err(Error::NotFound("Category not found"))
            .tap_err(|_| tracing::debug!("tried updating non existing category"));
    }

    Ok(Json(CategoryResponse {
        success: true,
        message: "Category Updated Successfully".into(),
        category: Some(category.into()),
    }))
}

pub async fn get_categories(
    State(categories): State<CategoryCollection>,
) -> Result<Json<CategoryListResponse>, Error> {
    let category = categories
        .list()
        .await?
        .into_iter()
        .map(Into::into)
        .collect();

    Ok(Json(CategoryListResponse {
        success: true,
        message: "All Categories List".into(),
        category,
    }))
}

pub async fn single_category(
    State(categories): State<CategoryCollection>,
    Path(slug): Path<String>,
) -> Result<Json<SingleCategoryResponse>, Error> {
    let category = categories.find_by_slug(&slug).await?;

    Ok(Json(SingleCategoryResponse {
        success: true,
        message: "Get Single Category Successfully".into(),
        category: category.map(Into::into),
    }))
}

#[tracing::instrument(skip_all, fields(id = %id))]
pub async fn delete_category(
    _admin: Admin,
    State(categories): State<CategoryCollection>,
    PathObjectId(id): PathObjectId,
) -> Result<Json<MessageResponse>, Error> {
    if !categories.delete(id).await? {
        tracing::debug!("category already absent");
    }

    Ok(Json(MessageResponse::new(
        true,
        "Category Deleted Successfully",
    )))
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use axum::http::Method;
    use serde_json::json;

    use crate::api::v1::tests::{bootstrap, failing_bootstrap, Bootstrap};

    use super::*;

    async fn create(
        bootstrap: &Bootstrap,
        name: Option<&str>,
    ) -> Result<(StatusCode, Json<CategoryResponse>), Error> {
        super::create_category(
            bootstrap.admin(),
            bootstrap.categories(),
            JsonBody(CategoryRequest {
                name: name.map(Into::into),
            }),
        )
        .await
    }

    #[tokio::test]
    async fn test_create_category() {
        let bootstrap = bootstrap().await;

        let (status, Json(response)) = create(&bootstrap, Some("MyCategory")).await.unwrap();
        assert_eq!(status, StatusCode::CREATED);
        assert!(response.success);
        assert_eq!(response.message, "New category created");

        let category = response.category.unwrap();
        assert_eq!(category.name, "MyCategory");
        assert_eq!(category.slug, "mycategory");

        let stored = bootstrap
            .app_state
            .categories
            .find_by_id(category.id.into())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.slug, "mycategory");
    }

    #[tokio::test]
    async fn test_create_keeps_name_untrimmed() {
        let bootstrap = bootstrap().await;

        let (_, Json(response)) = create(&bootstrap, Some("  Trimmed  ")).await.unwrap();
        let category = response.category.unwrap();

        assert_eq!(category.name, "  Trimmed  ");
        assert_eq!(category.slug, "trimmed");
    }

    #[tokio::test]
    async fn test_create_requires_name() {
        let bootstrap = bootstrap().await;

        for name in [None, Some(""), Some("   ")] {
            let err = create(&bootstrap, name).await.unwrap_err();
            assert_matches!(err, Error::CustomStr(StatusCode::UNAUTHORIZED, "Name is required"));
        }
    }

    #[tokio::test]
    async fn test_create_duplicate_category() {
        let bootstrap = bootstrap().await;

        create(&bootstrap, Some("Books")).await.unwrap();
        let (status, Json(response)) = create(&bootstrap, Some("Books")).await.unwrap();

        assert_eq!(status, StatusCode::OK);
        assert!(response.success);
        assert!(response.message.contains("Already Exists"));
        assert_eq!(bootstrap.app_state.categories.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_update_category() {
        let bootstrap = bootstrap().await;
        let category = bootstrap.category("Old Name").await;

        let Json(response) = super::update_category(
            bootstrap.admin(),
            bootstrap.categories(),
            PathObjectId(category.id),
            JsonBody(CategoryRequest {
                name: Some("New Name".into()),
            }),
        )
        .await
        .unwrap();

        let updated = response.category.unwrap();
        assert_eq!(updated.name, "New Name");
        assert_eq!(updated.slug, "new-name");

        let err = super::update_category(
            bootstrap.admin(),
            bootstrap.categories(),
            PathObjectId(ObjectId::new()),
            JsonBody(CategoryRequest {
                name: Some("Whatever".into()),
            }),
        )
        .await
        .unwrap_err();
        assert_matches!(err, Error::NotFound(_));

        let err = super::update_category(
            bootstrap.admin(),
            bootstrap.categories(),
            PathObjectId(category.id),
            JsonBody(CategoryRequest { name: None }),
        )
        .await
        .unwrap_err();
        assert_matches!(err, Error::BadRequest(_));
    }

    #[tokio::test]
    async fn test_list_and_single_category() {
        let bootstrap = bootstrap().await;
        bootstrap.category("Electronics").await;
        bootstrap.category("Books").await;

        let Json(list) = super::get_categories(bootstrap.categories()).await.unwrap();
        assert!(list.success);
        assert_eq!(list.message, "All Categories List");
        assert_eq!(list.category.len(), 2);

        let Json(single) =
            super::single_category(bootstrap.categories(), Path("books".to_string()))
                .await
                .unwrap();
        assert_eq!(single.category.unwrap().name, "Books");

        let Json(missing) =
            super::single_category(bootstrap.categories(), Path("nope".to_string()))
                .await
                .unwrap();
        assert!(missing.success);
        assert!(missing.category.is_none());
    }

    #[tokio::test]
    async fn test_delete_category() {
        let bootstrap = bootstrap().await;
        let category = bootstrap.category("Gone").await;

        for _ in 0..2 {
            let Json(response) = super::delete_category(
                bootstrap.admin(),
                bootstrap.categories(),
                PathObjectId(category.id),
            )
            .await
            .unwrap();
            assert_eq!(response.message, "Category Deleted Successfully");
        }

        assert!(bootstrap
            .app_state
            .categories
            .find_by_id(category.id)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_category_routes() {
        let bootstrap = bootstrap().await;
        let admin = bootstrap.admin_token.clone();

        let response = bootstrap
            .request(
                Method::POST,
                "/api/v1/category/create-category",
                Some(admin.as_str()),
                Some(json!({ "name": "Route Category" })),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED);
        assert_eq!(response.json["category"]["slug"], "route-category");

        let response = bootstrap
            .request(
                Method::POST,
                "/api/v1/category/create-category",
                Some(bootstrap.customer_token.as_str()),
                Some(json!({ "name": "Sneaky" })),
            )
            .await;
        assert_eq!(response.status, StatusCode::FORBIDDEN);

        let response = bootstrap
            .request(
                Method::DELETE,
                "/api/v1/category/delete-category/invalidid",
                Some(admin.as_str()),
                None,
            )
            .await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        assert_eq!(response.json["message"], "Invalid ID format");

        let response = bootstrap
            .request(Method::GET, "/api/v1/category/single-category/unknown", None, None)
            .await;
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.json["category"], serde_json::Value::Null);
    }

    #[tokio::test]
    async fn test_store_failure() {
        let bootstrap = failing_bootstrap().await;

        let response = bootstrap
            .request(Method::GET, "/api/v1/category/get-category", None, None)
            .await;
        assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.json["success"], false);
    }
}
