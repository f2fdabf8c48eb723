//! eDahab routes

use axum::{extract::rejection::JsonRejection, extract::State, Json};

use crate::api::requests::PaymentBody;
use crate::api::AppState;
use crate::error::AppResult;
use crate::payments::flow::InvoiceEnvelope;

/// `POST /payments/issue-invoice`: issue, then credit when an account is given
pub async fn issue_invoice(
    State(state): State<AppState>,
    body: Result<Json<PaymentBody>, JsonRejection>,
) -> AppResult<Json<InvoiceEnvelope>> {
    let Json(body) = body?;
    let command = body.into_issue_invoice()?;
    Ok(Json(state.flow.run_edahab(command).await?))
}

pub async fn credit_invoice(
    State(state): State<AppState>,
    body: Result<Json<PaymentBody>, JsonRejection>,
) -> AppResult<Json<InvoiceEnvelope>> {
    let Json(body) = body?;
    let command = body.into_credit_invoice()?;
    Ok(Json(state.flow.run_edahab(command).await?))
}
