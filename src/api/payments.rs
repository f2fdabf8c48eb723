//! WaafiPay routes

use axum::{extract::rejection::JsonRejection, extract::State, Json};

use crate::api::requests::PaymentBody;
use crate::api::AppState;
use crate::error::AppResult;
use crate::payments::flow::{OperationKind, TransactionEnvelope, WaafiPayCommand};

type Body = Result<Json<PaymentBody>, JsonRejection>;

async fn run(state: &AppState, command: WaafiPayCommand) -> AppResult<Json<TransactionEnvelope>> {
    Ok(Json(state.flow.run_waafipay(command).await?))
}

/// `POST /payments/initialize`: purchase, then withdraw when an account is given
pub async fn initialize(
    State(state): State<AppState>,
    body: Body,
) -> AppResult<Json<TransactionEnvelope>> {
    let Json(body) = body?;
    run(&state, body.into_payment(OperationKind::Purchase)?).await
}

pub async fn refund(
    State(state): State<AppState>,
    body: Body,
) -> AppResult<Json<TransactionEnvelope>> {
    let Json(body) = body?;
    run(&state, body.into_refund()?).await
}

pub async fn withdraw(
    State(state): State<AppState>,
    body: Body,
) -> AppResult<Json<TransactionEnvelope>> {
    let Json(body) = body?;
    run(&state, body.into_withdraw()?).await
}

pub async fn pre_authorize(
    State(state): State<AppState>,
    body: Body,
) -> AppResult<Json<TransactionEnvelope>> {
    let Json(body) = body?;
    run(&state, body.into_pre_authorize()?).await
}

/// `POST /payments/pre-authorize/commit`: commit, then the optional withdraw
pub async fn pre_authorize_commit(
    State(state): State<AppState>,
    body: Body,
) -> AppResult<Json<TransactionEnvelope>> {
    let Json(body) = body?;
    run(&state, body.into_payment(OperationKind::PreAuthorizeCommit)?).await
}

pub async fn pre_authorize_cancel(
    State(state): State<AppState>,
    body: Body,
) -> AppResult<Json<TransactionEnvelope>> {
    let Json(body) = body?;
    run(&state, body.into_cancel()?).await
}
