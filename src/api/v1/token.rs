use jsonwebtoken::{errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

use crate::error::{Error, UnauthorizedType};

#[derive(Clone)]
pub struct JwtState {
    validation: Validation,
    header: Header,
    ttl: Duration,

    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl JwtState {
    pub fn new(secret: &[u8], ttl: Duration) -> Self {
        let header = Header::new(Algorithm::HS256);

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        // tokens without `exp` never expire
        validation.required_spec_claims.clear();

        Self {
            header,
            validation,
            ttl,

            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
        }
    }
}

pub fn current_timestamp() -> OffsetDateTime {
    OffsetDateTime::now_utc()
}

/// Claims carried by a bearer token. Anything besides `_id`, `iat` and `exp`
/// is preserved in `extra` and handed back to the request.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Claims {
    #[serde(rename = "_id")]
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,

    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Claims {
    pub fn new(id: impl Into<String>, exp: OffsetDateTime) -> Self {
        Self {
            id: id.into(),
            iat: Some(current_timestamp().unix_timestamp()),
            exp: Some(exp.unix_timestamp()),
            extra: Default::default(),
        }
    }
}

pub fn generate_token(jwt_state: &JwtState, user_id: &str) -> Result<String, Error> {
    let expired_at = current_timestamp() + jwt_state.ttl;

    encode_claims(jwt_state, &Claims::new(user_id, expired_at))
}

pub fn encode_claims(jwt_state: &JwtState, claims: &Claims) -> Result<String, Error> {
    jsonwebtoken::encode(&jwt_state.header, claims, &jwt_state.encoding_key).map_err(Into::into)
}

pub fn decode_token(jwt_state: &JwtState, token: &str) -> Result<Claims, Error> {
    jsonwebtoken::decode::<Claims>(token, &jwt_state.decoding_key, &jwt_state.validation)
        .map(|data| data.claims)
        .map_err(|err| match err.kind() {
            ErrorKind::ExpiredSignature => Error::Unauthorized(UnauthorizedType::ExpiredToken),
            _ => Error::Unauthorized(UnauthorizedType::InvalidToken),
        })
}
