use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;

use crate::content::comments::{self, CommentParent, NewComment};
use crate::db::models::Comment;
use crate::error::AppResult;
use crate::extractors::{CurrentUser, JsonBody, PathParams};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct CreateCommentRequest {
    pub match_id: Option<i64>,
    pub post_id: Option<i64>,
    pub text: Option<String>,
    pub reply_to_id: Option<i64>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/comments", post(create_comment))
        .route("/comments/{id}", delete(delete_comment))
        .route("/matches/{id}/comments", get(list_match_comments))
        .route("/posts/{id}/comments", get(list_post_comments))
}

async fn create_comment(
    State(state): State<AppState>,
    user: CurrentUser,
    JsonBody(req): JsonBody<CreateCommentRequest>,
) -> AppResult<Response> {
    let parent = CommentParent::from_ids(req.match_id, req.post_id)?;
    let new = NewComment {
        parent,
        text: req.text.as_deref().unwrap_or_default(),
        reply_to_id: req.reply_to_id,
    };

    let mut conn = state.db.get()?;
    let comment = comments::create_comment(&mut conn, &user, new)?;
    Ok((StatusCode::CREATED, Json(comment)).into_response())
}

async fn delete_comment(
    State(state): State<AppState>,
    user: CurrentUser,
    PathParams(id): PathParams<i64>,
) -> AppResult<Response> {
    let mut conn = state.db.get()?;
    let removed = comments::delete_comment(&mut conn, &user, id)?;
    Ok((StatusCode::OK, Json(json!({ "deleted": removed }))).into_response())
}

async fn list_match_comments(
    State(state): State<AppState>,
    user: CurrentUser,
    PathParams(id): PathParams<i64>,
) -> AppResult<Json<Vec<Comment>>> {
    let conn = state.db.get()?;
    Ok(Json(comments::list_comments(
        &conn,
        CommentParent::Match(id),
        Some(user.id),
    )?))
}

async fn list_post_comments(
    State(state): State<AppState>,
    user: CurrentUser,
    PathParams(id): PathParams<i64>,
) -> AppResult<Json<Vec<Comment>>> {
    let conn = state.db.get()?;
    Ok(Json(comments::list_comments(
        &conn,
        CommentParent::Post(id),
        Some(user.id),
    )?))
}
