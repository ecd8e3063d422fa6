use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;

use crate::content::friends;
use crate::db::models::UserSummary;
use crate::error::AppResult;
use crate::extractors::{CurrentUser, JsonBody};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct AddFriendRequest {
    pub friend_id: i64,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/friends", get(list_friends).post(add_friend))
}

async fn list_friends(
    State(state): State<AppState>,
    user: CurrentUser,
) -> AppResult<Json<Vec<UserSummary>>> {
    let conn = state.db.get()?;
    Ok(Json(friends::list_friends(&conn, user.id)?))
}

async fn add_friend(
    State(state): State<AppState>,
    user: CurrentUser,
    JsonBody(req): JsonBody<AddFriendRequest>,
) -> AppResult<Response> {
    let mut conn = state.db.get()?;
    let friend = friends::add_friend(&mut conn, &user, req.friend_id)?;
    Ok((StatusCode::CREATED, Json(friend)).into_response())
}
