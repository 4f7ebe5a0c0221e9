use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    middleware::from_fn_with_state,
    routing::{get, post, put},
    Json, Router,
};
use time::OffsetDateTime;
use tracing::{info, instrument, warn};

use crate::{
    auth::{extractors::CurrentUser, services::is_valid_email},
    contacts::dto::{CreateContactRequest, Pagination, SearchQuery, UpdateContactRequest},
    contacts::repo::Contact,
    error::{ApiError, ApiResult},
    rate_limit::{rate_limit, RateLimitState},
    state::AppState,
};

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/contacts", get(list_contacts))
        .route("/contacts/search", get(search_contacts))
        .route("/contacts/birthdays", get(upcoming_birthdays))
        .route("/contacts/:id", get(get_contact))
}

pub fn write_routes(limiter: RateLimitState) -> Router<AppState> {
    // Only creation is rate-limited.
    let create = Router::new()
        .route("/contacts", post(create_contact))
        .route_layer(from_fn_with_state(limiter, rate_limit));
    Router::new()
        .merge(create)
        .route("/contacts/:id", put(update_contact).delete(delete_contact))
}

#[instrument(skip(state, user, payload))]
pub async fn create_contact(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(payload): Json<CreateContactRequest>,
) -> ApiResult<(StatusCode, Json<Contact>)> {
    if !is_valid_email(&payload.email) {
        warn!(owner_id = %user.id, "invalid contact email");
        return Err(ApiError::Validation("invalid contact email".into()));
    }

    let contact = Contact::create(&state.db, user.id, &payload)
        .await
        .map_err(ApiError::Internal)?;
    info!(owner_id = %user.id, contact_id = %contact.id, "contact created");
    Ok((StatusCode::CREATED, Json(contact)))
}

#[instrument(skip(state, user))]
pub async fn list_contacts(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(p): Query<Pagination>,
) -> ApiResult<Json<Vec<Contact>>> {
    let limit = p.limit.clamp(1, 500);
    let offset = p.offset.max(0);
    let contacts = Contact::list(&state.db, user.id, limit, offset)
        .await
        .map_err(ApiError::Internal)?;
    Ok(Json(contacts))
}

#[instrument(skip(state, user))]
pub async fn get_contact(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> ApiResult<Json<Contact>> {
    let contact = Contact::get(&state.db, user.id, id)
        .await
        .map_err(ApiError::Internal)?
        .ok_or_else(|| ApiError::NotFound("contact not found".into()))?;
    Ok(Json(contact))
}

#[instrument(skip(state, user, payload))]
pub async fn update_contact(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateContactRequest>,
) -> ApiResult<Json<Contact>> {
    if let Some(email) = &payload.email {
        if !is_valid_email(email) {
            return Err(ApiError::Validation("invalid contact email".into()));
        }
    }

    let contact = Contact::update(&state.db, user.id, id, &payload)
        .await
        .map_err(ApiError::Internal)?
        .ok_or_else(|| ApiError::NotFound("contact not found".into()))?;
    info!(owner_id = %user.id, contact_id = %contact.id, "contact updated");
    Ok(Json(contact))
}

#[instrument(skip(state, user))]
pub async fn delete_contact(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> ApiResult<Json<Contact>> {
    let contact = Contact::delete(&state.db, user.id, id)
        .await
        .map_err(ApiError::Internal)?
        .ok_or_else(|| ApiError::NotFound("contact not found".into()))?;
    info!(owner_id = %user.id, contact_id = %contact.id, "contact deleted");
    Ok(Json(contact))
}

#[instrument(skip(state, user))]
pub async fn search_contacts(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Json<Vec<Contact>>> {
    let contacts = Contact::search(&state.db, user.id, &query.q)
        .await
        .map_err(ApiError::Internal)?;
    Ok(Json(contacts))
}

#[instrument(skip(state, user))]
pub async fn upcoming_birthdays(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> ApiResult<Json<Vec<Contact>>> {
    let today = OffsetDateTime::now_utc().date();
    let contacts = Contact::upcoming_birthdays(&state.db, user.id, today)
        .await
        .map_err(ApiError::Internal)?;
    Ok(Json(contacts))
}
