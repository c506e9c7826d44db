// User handlers
// HTTP handlers for user management operations

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use tracing::info;

use crate::{
    error::ApiResult,
    models::user::{CreateUserRequest, UserList},
    state::AppState,
};

/// Create a new user
/// POST /users
pub async fn create_user(
    State(state): State<AppState>,
    payload: Result<Json<CreateUserRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(request) = payload?;
    info!("Creating new user with email: {}", request.email);

    let user = state.connections.database.create_user(request).await?;

    info!("Successfully created user with id: {}", user.id);
    Ok((StatusCode::CREATED, Json(user)))
}

/// List the most recently created users
/// GET /users
pub async fn list_users(State(state): State<AppState>) -> ApiResult<Json<UserList>> {
    info!("Fetching recent users");

    let users = state.connections.database.recent_users().await?;

    info!("Retrieved {} users", users.len());
    Ok(Json(UserList { users }))
}
