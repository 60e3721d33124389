//! User endpoints

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};

use crate::http::error::ApiError;
use crate::http::extractors::{JsonBody, ValidUserId};
use crate::http::server::AppState;
use crate::models::{CreateUserDto, User};

/// GET /users - list all users
async fn list_users(State(state): State<AppState>) -> Result<Json<Vec<User>>, ApiError> {
    let users = state.users.find_all().await?;
    Ok(Json(users))
}

/// POST /users - create a new user
async fn create_user(
    State(state): State<AppState>,
    JsonBody(dto): JsonBody<CreateUserDto>,
) -> Result<(StatusCode, Json<User>), ApiError> {
    let user = state.users.create(dto).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// GET /users/{id} - get a single user
async fn get_user(
    State(state): State<AppState>,
    ValidUserId(id): ValidUserId,
) -> Result<Json<User>, ApiError> {
    let user = state.users.find_one(id).await?;
    Ok(Json(user))
}

/// User routes
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users).post(create_user))
        .route("/users/{id}", get(get_user))
}
