use axum::{
    http::{StatusCode, Uri},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::payment::PaymentError;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{}", first_validation_message(.0))]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("{0}")]
    BadRequest(String),

    #[error("Invalid ID format")]
    InvalidObjectId,

    #[error("{0} not found")]
    RouteNotFound(Uri),

    #[error("{0}")]
    NotFound(&'static str),

    #[error("{0}")]
    Unauthorized(UnauthorizedType),

    #[error("Forbidden: Admin privileges required")]
    Forbidden,

    #[error("{0}")]
    PasswordHashError(#[from] password_hash::Error),

    #[error("{0}")]
    DatabaseError(#[from] mongodb::error::Error),

    #[error("{0}")]
    BSONSerError(#[from] bson::ser::Error),

    #[error("{0}")]
    JWTError(#[from] jsonwebtoken::errors::Error),

    #[error("{0}")]
    PaymentError(#[from] PaymentError),

    #[error("{0}")]
    Internal(#[from] anyhow::Error),

    #[error("{1}")]
    CustomStr(StatusCode, &'static str),
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum UnauthorizedType {
    #[error("Authentication required")]
    MissingToken,

    #[error("Invalid token format")]
    InvalidTokenFormat,

    #[error("Token has expired, please login again")]
    ExpiredToken,

    #[error("Invalid or expired token")]
    InvalidToken,
}

fn first_validation_message(errors: &validator::ValidationErrors) -> String {
    errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, errors)| {
            errors.iter().map(move |error| {
                error
                    .message
                    .as_ref()
                    .map(|message| message.to_string())
                    .unwrap_or_else(|| format!("{} is invalid", field))
            })
        })
        .next()
        .unwrap_or_else(|| "Invalid request".to_string())
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorJson {
    pub success: bool,
    pub r#type: String,
    pub message: String,
}

impl Error {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::ValidationError(..) | Self::BadRequest(..) | Self::InvalidObjectId => {
                StatusCode::BAD_REQUEST
            }
            Self::Unauthorized(..) => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::NotFound(..) | Self::RouteNotFound(..) => StatusCode::NOT_FOUND,
            Self::PaymentError(PaymentError::NotConfigured) => StatusCode::SERVICE_UNAVAILABLE,
            Self::PasswordHashError(..)
            | Self::DatabaseError(..)
            | Self::BSONSerError(..)
            | Self::JWTError(..)
            | Self::PaymentError(..)
            | Self::Internal(..) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::CustomStr(code, ..) => *code,
        }
    }

    pub fn to_string_variant(&self) -> String {
        macro_rules! match_var {
            ($id:ident !) => {
                Self::$id
            };
            ($id:ident (..)) => {
                Self::$id(..)
            };
        }

        macro_rules! variant {
            ($($name:ident $tt:tt),+) => {
                match self {
                    $(
                        match_var!($name $tt) => {
                            stringify!($name)
                       }
                    )+
                }
            };
        }

        variant! {
            ValidationError(..),
            BadRequest(..),
            InvalidObjectId!,
            RouteNotFound(..),
            NotFound(..),
            Unauthorized(..),
            Forbidden!,
            PasswordHashError(..),
            DatabaseError(..),
            BSONSerError(..),
            JWTError(..),
            PaymentError(..),
            Internal(..),
            CustomStr(..)
        }
        .to_string()
    }
}

impl From<Error> for ErrorJson {
    fn from(err: Error) -> Self {
        let r#type = err.to_string_variant();

        // internal details stay in the logs
        let message = if err.status().is_server_error()
            && !matches!(err, Error::PaymentError(PaymentError::NotConfigured))
        {
            "Something went wrong".to_string()
        } else {
            err.to_string()
        };

        Self {
            success: false,
            r#type,
            message,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();

        if status.is_server_error() {
            tracing::error!("error: {:?}", self);
        } else {
            tracing::debug!("rejected request: {}", self);
        }

        let error = ErrorJson::from(self);

        (status, Json(error)).into_response()
    }
}

impl From<axum::extract::rejection::PathRejection> for Error {
    fn from(_value: axum::extract::rejection::PathRejection) -> Self {
        Self::InvalidObjectId
    }
}

impl From<axum::extract::rejection::JsonRejection> for Error {
    fn from(value: axum::extract::rejection::JsonRejection) -> Self {
        Self::BadRequest(value.body_text())
    }
}

impl From<axum::extract::multipart::MultipartError> for Error {
    fn from(value: axum::extract::multipart::MultipartError) -> Self {
        Self::BadRequest(value.body_text())
    }
}
