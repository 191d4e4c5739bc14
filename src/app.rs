use std::sync::Arc;

use argon2::Argon2;
use axum::{extract::FromRef, http::Uri, Router};
use secrecy::ExposeSecret;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    api::v1::token::JwtState,
    config::{Config, DatabaseBackend},
    error::Error,
    payment::{BraintreeGateway, DisabledGateway, Gateway},
    store::{
        CategoryCollection, CategoryStore, MemoryStore, MongoStore, OrderCollection, OrderStore,
        ProductCollection, ProductStore, UserCollection, UserStore,
    },
};

#[derive(FromRef, Clone)]
pub struct AppState {
    pub argon: Argon2<'static>,
    pub jwt_state: JwtState,

    pub users: UserCollection,
    pub categories: CategoryCollection,
    pub products: ProductCollection,
    pub orders: OrderCollection,
    pub gateway: Gateway,
}

impl AppState {
    /// State where every collection is served by the same store.
    pub fn with_store<S>(store: Arc<S>, jwt_state: JwtState, gateway: Gateway) -> Self
    where
        S: UserStore + CategoryStore + ProductStore + OrderStore + 'static,
    {
        Self {
            argon: Argon2::default(),
            jwt_state,

            users: UserCollection(store.clone()),
            categories: CategoryCollection(store.clone()),
            products: ProductCollection(store.clone()),
            orders: OrderCollection(store),
            gateway,
        }
    }

    pub async fn from_config(config: &Config) -> Result<Self, Error> {
        let jwt_state = JwtState::new(config.jwt_secret.expose_secret().as_bytes(), config.jwt_ttl);

        let gateway = match &config.braintree {
            Some(braintree) => {
                tracing::info!(
                    "braintree {:?} gateway enabled for merchant {}",
                    braintree.environment,
                    braintree.merchant_id
                );
                Gateway(Arc::new(BraintreeGateway::new(braintree)))
            }
            None => {
                tracing::warn!("braintree credentials missing, payments disabled");
                Gateway(Arc::new(DisabledGateway))
            }
        };

        match config.backend {
            DatabaseBackend::Mongo => {
                let uri = config
                    .mongodb_uri
                    .as_ref()
                    .ok_or_else(|| {
                        anyhow::anyhow!("MONGODB_URI is required for the mongo backend")
                    })?;

                let store = MongoStore::connect(uri.expose_secret(), &config.database_name).await?;
                store.run_migration().await?;

                Ok(Self::with_store(Arc::new(store), jwt_state, gateway))
            }
            DatabaseBackend::Memory => {
                tracing::warn!("using in-memory store, data is lost on restart");

                Ok(Self::with_store(
                    Arc::new(MemoryStore::new()),
                    jwt_state,
                    gateway,
                ))
            }
        }
    }
}

async fn fallback(uri: Uri) -> Error {
    Error::RouteNotFound(uri)
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", crate::api::v1::router())
        .fallback(fallback)
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
