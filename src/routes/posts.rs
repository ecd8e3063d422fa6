use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;

use crate::content::posts::{self, NewPost, FEED_LIMIT};
use crate::db::models::Post;
use crate::error::AppResult;
use crate::extractors::{CurrentUser, JsonBody, PathParams};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/posts", get(list_posts).post(create_post))
        .route("/posts/{id}", get(get_post).delete(delete_post))
}

async fn list_posts(
    State(state): State<AppState>,
    user: CurrentUser,
) -> AppResult<Json<Vec<Post>>> {
    let conn = state.db.get()?;
    Ok(Json(posts::list_posts(&conn, Some(user.id), FEED_LIMIT)?))
}

async fn create_post(
    State(state): State<AppState>,
    user: CurrentUser,
    JsonBody(req): JsonBody<NewPost>,
) -> AppResult<Response> {
    let mut conn = state.db.get()?;
    let post = posts::create_post(&mut conn, &user, &req)?;
    Ok((StatusCode::CREATED, Json(post)).into_response())
}

async fn get_post(
    State(state): State<AppState>,
    user: CurrentUser,
    PathParams(id): PathParams<i64>,
) -> AppResult<Json<Post>> {
    let conn = state.db.get()?;
    Ok(Json(posts::get_post(&conn, id, Some(user.id))?))
}

async fn delete_post(
    State(state): State<AppState>,
    user: CurrentUser,
    PathParams(id): PathParams<i64>,
) -> AppResult<Response> {
    let mut conn = state.db.get()?;
    posts::delete_post(&mut conn, &user, id)?;
    Ok((StatusCode::OK, Json(json!({ "deleted": id }))).into_response())
}
