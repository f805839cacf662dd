//! Read-only JSON views of the public lists.

use axum::Json;
use axum::extract::{Path, State};

use super::server::AppState;
use crate::directory::{self, PublicProfile, UserDirectory};
use crate::error::AppError;
use crate::validation::slug::validate_slug;

pub async fn list_users(State(state): State<AppState>) -> Result<Json<UserDirectory>, AppError> {
    let directory = directory::all_users(state.tables.as_ref()).await?;
    Ok(Json(directory))
}

pub async fn get_user(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<PublicProfile>, AppError> {
    let username = username.to_lowercase();
    validate_slug(&username)?;

    directory::public_profile(state.tables.as_ref(), &username)
        .await?
        .map(Json)
        .ok_or(AppError::NotFound)
}
