pub mod auth;
pub mod category;
pub mod order;
pub mod payment;
pub mod product;
pub mod token;

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post, put},
    Router,
};

use crate::app::AppState;

/// Multipart product forms carry the photo; the photo itself is capped
/// separately at [`product::MAX_PHOTO_BYTES`].
const PRODUCT_FORM_LIMIT: usize = 8 * 1024 * 1024;

pub fn router() -> Router<AppState> {
    Router::new()
        .nest(
            "/auth",
            Router::new()
                .route("/register", post(auth::register))
                .route("/login", post(auth::login))
                .route("/forgot-password", post(auth::forgot_password))
                .route("/test", get(auth::protected_test))
                .route("/user-auth", get(auth::user_auth))
                .route("/admin-auth", get(auth::admin_auth))
                .route("/profile", put(auth::update_profile))
                .route("/orders", get(order::orders))
                .route("/all-orders", get(order::all_orders))
                .route("/order-status/:order_id", put(order::order_status)),
        )
        .nest(
            "/category",
            Router::new()
                .route("/create-category", post(category::create_category))
                .route("/update-category/:id", put(category::update_category))
                .route("/get-category", get(category::get_categories))
                .route("/single-category/:slug", get(category::single_category))
                .route("/delete-category/:id", delete(category::delete_category)),
        )
        .nest(
            "/product",
            Router::new()
                .route(
                    "/create-product",
                    post(product::create_product).layer(DefaultBodyLimit::max(PRODUCT_FORM_LIMIT)),
                )
                .route(
                    "/update-product/:pid",
                    put(product::update_product).layer(DefaultBodyLimit::max(PRODUCT_FORM_LIMIT)),
                )
                .route("/get-product", get(product::get_products))
                .route("/get-product/:slug", get(product::get_product))
                .route("/product-photo/:pid", get(product::product_photo))
                .route("/delete-product/:pid", delete(product::delete_product))
                .route("/product-filters", post(product::product_filters))
                .route("/product-count", get(product::product_count))
                .route("/product-list/:page", get(product::product_list))
                .route("/search/:keyword", get(product::search_product))
                .route("/related-product/:pid/:cid", get(product::related_product))
                .route("/product-category/:slug", get(product::product_category))
                .route("/braintree/token", get(payment::braintree_token))
                .route("/braintree/payment", post(payment::braintree_payment)),
        )
}
