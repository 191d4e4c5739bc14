use argon2::Argon2;
use axum::{
    extract::{FromRef, FromRequestParts, State},
    http::{header::AUTHORIZATION, request::Parts, HeaderValue, StatusCode},
    Json, RequestPartsExt,
};
use bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use tap::TapFallible;
use time::OffsetDateTime;
use validator::Validate;

use crate::{
    error::{Error, UnauthorizedType},
    store::UserCollection,
    util::{
        hash_password, required, verify_password, FormattedDateTime, JsonBody, ObjectIdString,
    },
};

use super::token::{decode_token, generate_token, Claims, JwtState};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserModel {
    #[serde(rename = "_id")]
    pub id: ObjectId,

    pub name: String,
    pub email: String,
    pub password: String,
    pub phone: String,
    /// Either a plain string or a structured object, kept as sent.
    pub address: serde_json::Value,
    pub answer: String,
    #[serde(default)]
    pub role: UserRole,

    pub created_at: bson::DateTime,
    pub updated_at: bson::DateTime,
}

/// Stored as an integer flag: `0` customer, `1` admin.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(from = "i32", into = "i32")]
pub enum UserRole {
    #[default]
    Customer,
    Admin,
}

impl From<i32> for UserRole {
    fn from(value: i32) -> Self {
        match value {
            1 => Self::Admin,
            _ => Self::Customer,
        }
    }
}

impl From<UserRole> for i32 {
    fn from(value: UserRole) -> Self {
        match value {
            UserRole::Customer => 0,
            UserRole::Admin => 1,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    #[serde(rename = "_id")]
    pub id: ObjectIdString,

    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: serde_json::Value,
    pub role: UserRole,

    pub created_at: FormattedDateTime,
    pub updated_at: FormattedDateTime,
}

impl From<UserModel> for UserResponse {
    fn from(value: UserModel) -> Self {
        Self {
            id: value.id.into(),
            name: value.name,
            email: value.email,
            phone: value.phone,
            address: value.address,
            role: value.role,

            created_at: value.created_at.into(),
            updated_at: value.updated_at.into(),
        }
    }
}

/// Request carrying a valid bearer token. The decoded claims are handed over
/// untouched, extra fields included.
#[derive(Debug, Clone)]
pub struct SignedIn(pub Claims);

impl SignedIn {
    pub fn from_authorization(
        jwt_state: &JwtState,
        header: Option<&HeaderValue>,
    ) -> Result<Self, Error> {
        let header = header.ok_or(Error::Unauthorized(UnauthorizedType::MissingToken))?;

        let token = header
            .to_str()
            .ok()
            .and_then(|it| it.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|it| !it.is_empty())
            .ok_or(Error::Unauthorized(UnauthorizedType::InvalidTokenFormat))
            .tap_err(|_| tracing::debug!("authorization header is not a bearer token"))?;

        decode_token(jwt_state, token).map(Self)
    }

    pub fn user_id(&self) -> Result<ObjectId, Error> {
        self.0
            .id
            .parse()
            .map_err(|_| Error::BadRequest("Invalid user ID format".into()))
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for SignedIn
where
    JwtState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let jwt = JwtState::from_ref(state);

        Self::from_authorization(&jwt, parts.headers.get(AUTHORIZATION))
    }
}

impl UserModel {
    pub async fn from_claims(signed_in: &SignedIn, users: &UserCollection) -> Result<Self, Error> {
        let id = signed_in.user_id()?;

        users
            .find_by_id(id)
            .await?
            .ok_or(Error::NotFound("User not found"))
            .tap_err(|_| tracing::debug!("token refers to missing user {}", id))
    }
}

/// Signed-in request with the user record loaded from the store.
#[axum::async_trait]
impl<S> FromRequestParts<S> for UserModel
where
    JwtState: FromRef<S>,
    UserCollection: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let signed_in = parts.extract_with_state::<SignedIn, _>(state).await?;
        let users = UserCollection::from_ref(state);

        Self::from_claims(&signed_in, &users).await
    }
}

/// Signed-in request whose user currently holds the admin role. The role is
/// read from the store on every request, never from the token.
#[derive(Debug, Clone)]
pub struct Admin(pub UserModel);

#[axum::async_trait]
impl<S> FromRequestParts<S> for Admin
where
    JwtState: FromRef<S>,
    UserCollection: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = parts.extract_with_state::<UserModel, _>(state).await?;

        match user.role {
            UserRole::Admin => Ok(Self(user)),
            UserRole::Customer => Err(Error::Forbidden)
                .tap_err(|_| tracing::debug!("user {} tried accessing admin route", user.id)),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

impl MessageResponse {
    pub fn new(success: bool, message: impl Into<String>) -> Self {
        Self {
            success,
            message: message.into(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct AuthCheckResponse {
    pub ok: bool,
}

pub struct CreateUserRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub phone: String,
    pub address: serde_json::Value,
    pub answer: String,
    pub role: UserRole,
}

pub async fn create_user(
    users: &UserCollection,
    argon: &Argon2<'_>,
    request: CreateUserRequest,
) -> Result<UserModel, Error> {
    let now = OffsetDateTime::now_utc();

    let user = UserModel {
        id: ObjectId::new(),
        name: request.name,
        email: request.email,
        password: hash_password(argon, &request.password)?,
        phone: request.phone,
        address: request.address,
        answer: request.answer,
        role: request.role,
        created_at: now.into(),
        updated_at: now.into(),
    };

    users.insert(&user).await?;

    Ok(user)
}

#[derive(Validate, Serialize, Deserialize, Debug, Clone, Default)]
pub struct RegisterRequest {
    pub name: Option<String>,

    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,

    pub password: Option<String>,
    pub phone: Option<String>,
    pub address: Option<serde_json::Value>,
    pub answer: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct RegisterResponse {
    pub success: bool,
    pub message: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<UserResponse>,
}

fn present_address(address: &Option<serde_json::Value>) -> Result<serde_json::Value, Error> {
    match address {
        None | Some(serde_json::Value::Null) => {
            Err(Error::BadRequest("Address is Required".into()))
        }
        Some(serde_json::Value::String(it)) if it.trim().is_empty() => {
            Err(Error::BadRequest("Address is Required".into()))
        }
        Some(it) => Ok(it.clone()),
    }
}

#[tracing::instrument(skip_all, fields(email = ?request.email))]
pub async fn register(
    State(users): State<UserCollection>,
    State(argon): State<Argon2<'static>>,
    JsonBody(request): JsonBody<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), Error> {
    let name = required(&request.name, "Name is Required")?;
    let email = required(&request.email, "Email is Required")?;
    let password = required(&request.password, "Password is Required")?;
    let phone = required(&request.phone, "Phone is Required")?;
    let address = present_address(&request.address)?;
    let answer = required(&request.answer, "Answer is Required")?;

    request.validate()?;

    if users.find_by_email(email).await?.is_some() {
        tracing::debug!("email already registered");
        return Ok((
            StatusCode::OK,
            Json(RegisterResponse {
                success: false,
                message: "Already Registered. Please login".into(),
                user: None,
            }),
        ));
    }

    let user = create_user(
        &users,
        &argon,
        CreateUserRequest {
            name: name.to_string(),
            email: email.to_string(),
            password: password.to_string(),
            phone: phone.to_string(),
            address,
            answer: answer.to_string(),
            role: UserRole::Customer,
        },
    )
    .await?;

    tracing::debug!("registered user {}", user.id);

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            success: true,
            message: "User Register Successfully".into(),
            user: Some(user.into()),
        }),
    ))
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct LoginResponse {
    pub success: bool,
    pub message: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<UserResponse>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

#[tracing::instrument(skip_all, fields(email = ?request.email))]
pub async fn login(
    State(users): State<UserCollection>,
    State(argon): State<Argon2<'static>>,
    State(jwt_state): State<JwtState>,
    JsonBody(request): JsonBody<LoginRequest>,
) -> Result<Json<LoginResponse>, Error> {
    let invalid = |_| Error::CustomStr(StatusCode::NOT_FOUND, "Invalid email or password");
    let email = required(&request.email, "").map_err(invalid)?;
    let password = required(&request.password, "").map_err(invalid)?;

    let user = users
        .find_by_email(email)
        .await?
        .ok_or(Error::CustomStr(StatusCode::NOT_FOUND, "Email is not registered"))
        .tap_err(|_| tracing::debug!("login with unknown email"))?;

    if !verify_password(&argon, password, &user.password) {
        tracing::debug!("login with wrong password");
        return Ok(Json(LoginResponse {
            success: false,
            message: "Invalid Password".into(),
            user: None,
            token: None,
        }));
    }

    let token = generate_token(&jwt_state, &user.id.to_hex())?;

    Ok(Json(LoginResponse {
        success: true,
        message: "Login successfully".into(),
        user: Some(user.into()),
        token: Some(token),
    }))
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct ForgotPasswordRequest {
    pub email: Option<String>,
    pub answer: Option<String>,
    pub new_password: Option<String>,
}

#[tracing::instrument(skip_all, fields(email = ?request.email))]
pub async fn forgot_password(
    State(users): State<UserCollection>,
    State(argon): State<Argon2<'static>>,
    JsonBody(request): JsonBody<ForgotPasswordRequest>,
) -> Result<Json<MessageResponse>, Error> {
    let email = required(&request.email, "Email is required")?;
    let answer = required(&request.answer, "Answer is required")?;
    let new_password = required(&request.new_password, "New Password is required")?;

    let user = users
        .find_by_email(email)
        .await?
        .filter(|it| it.answer == answer)
        .ok_or(Error::NotFound("Wrong Email Or Answer"))
        .tap_err(|_| tracing::debug!("password reset with wrong email or answer"))?;

    let user = UserModel {
        password: hash_password(&argon, new_password)?,
        updated_at: OffsetDateTime::now_utc().into(),
        ..user
    };

    users.update(&user).await?;

    Ok(Json(MessageResponse::new(true, "Password Reset Successfully")))
}

pub async fn protected_test(_admin: Admin) -> &'static str {
    "Protected Routes"
}

pub async fn user_auth(_signed_in: SignedIn) -> Json<AuthCheckResponse> {
    Json(AuthCheckResponse { ok: true })
}

pub async fn admin_auth(_admin: Admin) -> Json<AuthCheckResponse> {
    Json(AuthCheckResponse { ok: true })
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub phone: Option<String>,
    pub address: Option<serde_json::Value>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileResponse {
    pub success: bool,
    pub message: String,
    pub updated_user: UserResponse,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|it| !it.trim().is_empty())
}

#[tracing::instrument(skip_all, fields(user = %user.id))]
pub async fn update_profile(
    State(users): State<UserCollection>,
    State(argon): State<Argon2<'static>>,
    user: UserModel,
    JsonBody(request): JsonBody<UpdateProfileRequest>,
) -> Result<Json<UpdateProfileResponse>, Error> {
    let password = match request.password {
        Some(password) if password.trim().is_empty() || password.chars().count() < 6 => {
            return Err(Error::BadRequest(
                "Password is required and 6 character long".into(),
            ))
        }
        Some(password) => hash_password(&argon, &password)?,
        None => user.password.clone(),
    };

    let user = UserModel {
        name: non_blank(request.name).unwrap_or(user.name),
        password,
        phone: non_blank(request.phone).unwrap_or(user.phone),
        address: match request.address {
            None | Some(serde_json::Value::Null) => user.address,
            Some(address) => address,
        },
        updated_at: OffsetDateTime::now_utc().into(),
        ..user
    };

    if !users.update(&user).await? {
        return Err(Error::NotFound("User not found"));
    }

    tracing::debug!("profile updated");

    Ok(Json(UpdateProfileResponse {
        success: true,
        message: "Profile Updated Successfully".into(),
        updated_user: user.into(),
    }))
}
