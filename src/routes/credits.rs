use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;

use crate::db::models::BalanceSnapshot;
use crate::domain::PaymentMethod;
use crate::error::AppResult;
use crate::extractors::{CurrentUser, JsonBody};
use crate::ledger::credits;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct RechargeRequest {
    pub amount: i64,
    pub method: String,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/credits", get(balance))
        .route("/credits/recharge", post(recharge))
}

async fn balance(
    State(state): State<AppState>,
    user: CurrentUser,
) -> AppResult<Json<BalanceSnapshot>> {
    let conn = state.db.get()?;
    Ok(Json(credits::balance(&conn, user.id)?))
}

async fn recharge(
    State(state): State<AppState>,
    user: CurrentUser,
    JsonBody(req): JsonBody<RechargeRequest>,
) -> AppResult<Response> {
    let method: PaymentMethod = req.method.trim().parse()?;
    let mut conn = state.db.get()?;
    let tx = credits::recharge(&mut conn, user.id, req.amount, method)?;
    Ok((StatusCode::CREATED, Json(tx)).into_response())
}
