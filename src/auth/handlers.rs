use axum::{
    extract::{DefaultBodyLimit, FromRef, Multipart, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::{
        dto::{
            AvatarResponse, LoginRequest, MessageResponse, PublicUser, RefreshRequest,
            RegisterRequest, ResetConfirmQuery, ResetRequestQuery, TokenResponse,
            VerifyEmailQuery,
        },
        extractors::CurrentUser,
        password::{hash_password, verify_password},
        repo::User,
        services::{is_valid_email, normalize_email, reset_link, verification_link},
        tokens::{JwtKeys, TokenPurpose},
    },
    error::{is_unique_violation, ApiError, ApiResult},
    state::AppState,
};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users", post(register))
        .route(
            "/users/avatar",
            post(upload_avatar).layer(DefaultBodyLimit::max(5 * 1024 * 1024)),
        )
        .route("/me", get(get_me))
}

pub fn token_routes() -> Router<AppState> {
    Router::new()
        .route("/token", post(login))
        .route("/token/refresh", post(refresh))
}

pub fn flow_routes() -> Router<AppState> {
    Router::new()
        .route("/verify-email", get(verify_email))
        .route("/reset-password", post(reset_password_request))
        .route("/reset-password/confirm", post(reset_password_confirm))
}

fn sign_pair(keys: &JwtKeys, email: &str) -> ApiResult<TokenResponse> {
    let access_token = keys
        .sign(email, TokenPurpose::Access)
        .map_err(ApiError::Internal)?;
    let refresh_token = keys
        .sign(email, TokenPurpose::Refresh)
        .map_err(ApiError::Internal)?;
    Ok(TokenResponse {
        access_token,
        refresh_token,
        token_type: "bearer".into(),
    })
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(mut payload): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<PublicUser>)> {
    payload.email = normalize_email(&payload.email);

    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err(ApiError::Validation("invalid email".into()));
    }
    if payload.password.chars().count() < 8 {
        warn!("password too short");
        return Err(ApiError::Validation("password too short".into()));
    }

    if User::find_by_email(&state.db, &payload.email)
        .await
        .map_err(ApiError::Internal)?
        .is_some()
    {
        warn!(email = %payload.email, "email already registered");
        return Err(ApiError::Conflict("email already registered".into()));
    }

    let hash = hash_password(&payload.password).map_err(ApiError::Internal)?;
    let user = match User::create(&state.db, &payload.email, &hash).await {
        Ok(user) => user,
        // Lost check-then-insert race: the unique index reports the
        // duplicate, which is still a conflict, not a server error.
        Err(e) if is_unique_violation(&e) => {
            warn!(email = %payload.email, "email already registered");
            return Err(ApiError::Conflict("email already registered".into()));
        }
        Err(e) => return Err(ApiError::Internal(e)),
    };

    let keys = JwtKeys::from_ref(&state);
    let token = keys
        .sign(&user.email, TokenPurpose::VerifyEmail)
        .map_err(ApiError::Internal)?;
    let link = verification_link(&state.config.public_base_url, &token);
    if let Err(e) = state.mailer.send_verification(&user.email, &link).await {
        warn!(error = %e, email = %user.email, "verification email send failed");
    }

    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok((StatusCode::CREATED, Json(user.into())))
}

#[instrument(skip(state, query))]
pub async fn verify_email(
    State(state): State<AppState>,
    Query(query): Query<VerifyEmailQuery>,
) -> ApiResult<Json<MessageResponse>> {
    let keys = JwtKeys::from_ref(&state);
    let claims = keys.verify_purpose(&query.token, TokenPurpose::VerifyEmail)?;

    // An unknown subject gets the same response as a bad token so the
    // endpoint cannot be used to probe for accounts.
    let user = User::mark_verified(&state.db, &claims.sub)
        .await
        .map_err(ApiError::Internal)?
        .ok_or(ApiError::InvalidToken)?;

    info!(user_id = %user.id, email = %user.email, "email verified");
    Ok(Json(MessageResponse {
        message: "email verified successfully".into(),
    }))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(mut payload): Json<LoginRequest>,
) -> ApiResult<Json<TokenResponse>> {
    payload.email = normalize_email(&payload.email);

    let user = User::find_by_email(&state.db, &payload.email)
        .await
        .map_err(ApiError::Internal)?
        .ok_or_else(|| {
            warn!(email = %payload.email, "login unknown email");
            ApiError::Unauthorized("invalid credentials".into())
        })?;

    let ok = verify_password(&payload.password, &user.hashed_password)
        .map_err(ApiError::Internal)?;
    if !ok {
        warn!(user_id = %user.id, "login invalid password");
        return Err(ApiError::Unauthorized("invalid credentials".into()));
    }

    let keys = JwtKeys::from_ref(&state);
    let tokens = sign_pair(&keys, &user.email)?;
    info!(user_id = %user.id, email = %user.email, "user logged in");
    Ok(Json(tokens))
}

#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> ApiResult<Json<TokenResponse>> {
    let keys = JwtKeys::from_ref(&state);
    let claims = keys
        .verify_purpose(&payload.refresh_token, TokenPurpose::Refresh)
        .map_err(|_| ApiError::Unauthorized("invalid or expired token".into()))?;

    // The subject must still exist before a fresh pair is issued.
    User::find_by_email(&state.db, &claims.sub)
        .await
        .map_err(ApiError::Internal)?
        .ok_or_else(|| ApiError::Unauthorized("invalid or expired token".into()))?;

    let tokens = sign_pair(&keys, &claims.sub)?;
    Ok(Json(tokens))
}

#[instrument(skip_all)]
pub async fn get_me(CurrentUser(user): CurrentUser) -> ApiResult<Json<PublicUser>> {
    Ok(Json(user.into()))
}

#[instrument(skip_all)]
pub async fn upload_avatar(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    mut multipart: Multipart,
) -> ApiResult<Json<AvatarResponse>> {
    let mut uploaded: Option<(bytes::Bytes, String)> = None;
    while let Ok(Some(field)) = multipart.next_field().await {
        if field.name() == Some("file") {
            let content_type = field
                .content_type()
                .map(|s| s.to_string())
                .unwrap_or_else(|| "application/octet-stream".into());
            let data = field
                .bytes()
                .await
                .map_err(|e| ApiError::Validation(e.to_string()))?;
            uploaded = Some((data, content_type));
            break;
        }
    }

    let (data, content_type) =
        uploaded.ok_or_else(|| ApiError::Validation("file field is required".into()))?;
    if data.is_empty() {
        return Err(ApiError::Validation("file is empty".into()));
    }

    let ext = crate::storage::ext_from_mime(&content_type).unwrap_or("bin");
    let key = format!("avatars/{}/{}.{}", user.id, Uuid::new_v4(), ext);
    let avatar_url = state
        .storage
        .upload(&key, data, &content_type)
        .await
        .map_err(ApiError::Internal)?;

    // Explicit UPDATE rather than mutating the loaded row.
    User::set_avatar_url(&state.db, user.id, &avatar_url)
        .await
        .map_err(ApiError::Internal)?
        .ok_or_else(|| ApiError::NotFound("user not found".into()))?;

    info!(user_id = %user.id, %key, "avatar updated");
    Ok(Json(AvatarResponse { avatar_url }))
}

#[instrument(skip(state, query))]
pub async fn reset_password_request(
    State(state): State<AppState>,
    Query(query): Query<ResetRequestQuery>,
) -> ApiResult<(StatusCode, Json<MessageResponse>)> {
    let email = normalize_email(&query.email);

    // Same response whether or not the account exists.
    if let Some(user) = User::find_by_email(&state.db, &email)
        .await
        .map_err(ApiError::Internal)?
    {
        let keys = JwtKeys::from_ref(&state);
        let token = keys
            .sign(&user.email, TokenPurpose::ResetPassword)
            .map_err(ApiError::Internal)?;
        let link = reset_link(&state.config.public_base_url, &token);
        if let Err(e) = state.mailer.send_password_reset(&user.email, &link).await {
            warn!(error = %e, email = %user.email, "reset email send failed");
        }
        info!(user_id = %user.id, "password reset requested");
    }

    Ok((
        StatusCode::ACCEPTED,
        Json(MessageResponse {
            message: "if the account exists, a reset link has been sent".into(),
        }),
    ))
}

#[instrument(skip(state, query))]
pub async fn reset_password_confirm(
    State(state): State<AppState>,
    Query(query): Query<ResetConfirmQuery>,
) -> ApiResult<Json<MessageResponse>> {
    if query.new_password.chars().count() < 8 {
        return Err(ApiError::Validation("password too short".into()));
    }

    let keys = JwtKeys::from_ref(&state);
    let claims = keys.verify_purpose(&query.token, TokenPurpose::ResetPassword)?;

    let hash = hash_password(&query.new_password).map_err(ApiError::Internal)?;
    let user = User::set_password(&state.db, &claims.sub, &hash)
        .await
        .map_err(ApiError::Internal)?
        .ok_or(ApiError::InvalidToken)?;

    info!(user_id = %user.id, "password reset");
    Ok(Json(MessageResponse {
        message: "password reset successfully".into(),
    }))
}
