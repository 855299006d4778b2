//! Route handlers.
//!
//! Each handler authenticates the caller, unpacks the camelCase JSON body and hands
//! off to the matching workflow in [`crate::core`].

use super::{AppState, extract::AuthUser};
use crate::{
    core::{
        boost::{BoostPurchase, create_boost_payment},
        escrow::{
            self, CompletionResult, PaymentRequestCreated, create_remote_payment_request,
        },
        reputation::{UserReputation, get_user_reputation, submit_rating},
        seller::{SellerAccountRequest, SellerOnboarding, create_seller_account},
        trade::{ConfirmOutcome, confirm_trade, get_trade},
        xp::{BoostApplied, XpProgress, get_xp_progress, spend_xp_boost},
    },
    entities::trade::TradeStatus,
    errors::{Error, Result},
};
use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Unwraps a JSON body, turning extraction failures into validation errors.
fn body<T>(payload: std::result::Result<Json<T>, JsonRejection>) -> Result<T> {
    payload.map(|Json(inner)| inner).map_err(Error::from)
}

/// `GET /health`
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendPaymentRequestBody {
    pub game_id: i64,
    pub buyer_id: String,
}

/// `POST /functions/send-payment-request`
pub async fn send_payment_request(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    payload: std::result::Result<Json<SendPaymentRequestBody>, JsonRejection>,
) -> Result<Json<PaymentRequestCreated>> {
    let request = body(payload)?;
    create_remote_payment_request(
        &state.db,
        &state.profiles,
        &user_id,
        request.game_id,
        &request.buyer_id,
    )
    .await
    .map(Json)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionBody {
    pub transaction_id: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutResponse {
    pub url: String,
    pub session_id: String,
}

/// `POST /functions/pay-payment-request`
pub async fn pay_payment_request(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    payload: std::result::Result<Json<TransactionBody>, JsonRejection>,
) -> Result<Json<CheckoutResponse>> {
    let request = body(payload)?;
    let session = escrow::pay_payment_request(
        &state.db,
        state.gateway.as_ref(),
        &state.settings.payments,
        request.transaction_id,
        &user_id,
    )
    .await?;
    Ok(Json(CheckoutResponse {
        url: session.url,
        session_id: session.id,
    }))
}

/// `POST /functions/complete-transaction`
pub async fn complete_transaction(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    payload: std::result::Result<Json<TransactionBody>, JsonRejection>,
) -> Result<Json<CompletionResult>> {
    let request = body(payload)?;
    escrow::complete_transaction(&state.db, request.transaction_id, &user_id)
        .await
        .map(Json)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoostBody {
    pub game_id: i64,
    pub boost_type: String,
}

/// `POST /functions/create-boost-payment`
pub async fn create_boost_payment_handler(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    payload: std::result::Result<Json<BoostBody>, JsonRejection>,
) -> Result<Json<Value>> {
    let request = body(payload)?;
    let BoostPurchase::Paid(boost) = BoostPurchase::parse(&request.boost_type)? else {
        return Err(Error::validation("XP boosts are bought with spend-xp-boost"));
    };
    let session = create_boost_payment(
        &state.db,
        state.gateway.as_ref(),
        &state.settings.payments,
        &user_id,
        request.game_id,
        boost,
    )
    .await?;
    Ok(Json(json!({ "url": session.url })))
}

/// `POST /functions/spend-xp-boost`
pub async fn spend_xp_boost_handler(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    payload: std::result::Result<Json<BoostBody>, JsonRejection>,
) -> Result<Json<BoostApplied>> {
    let request = body(payload)?;
    let BoostPurchase::Xp(boost) = BoostPurchase::parse(&request.boost_type)? else {
        return Err(Error::validation("Paid boosts are bought with create-boost-payment"));
    };
    spend_xp_boost(&state.db, &user_id, request.game_id, boost)
        .await
        .map(Json)
}

/// `POST /functions/create-seller-account`
pub async fn create_seller_account_handler(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    payload: std::result::Result<Json<SellerAccountRequest>, JsonRejection>,
) -> Result<Json<SellerOnboarding>> {
    let request = body(payload)?;
    let onboarding = create_seller_account(
        &state.db,
        state.gateway.as_ref(),
        &state.settings.payments,
        &user_id,
        request,
    )
    .await?;
    state.profiles.invalidate(&user_id).await;
    Ok(Json(onboarding))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmTradeBody {
    pub trade_id: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmTradeResponse {
    pub outcome: ConfirmOutcome,
    pub completed: bool,
}

/// `POST /functions/confirm-trade`
pub async fn confirm_trade_handler(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    payload: std::result::Result<Json<ConfirmTradeBody>, JsonRejection>,
) -> Result<Json<ConfirmTradeResponse>> {
    let request = body(payload)?;
    let outcome = confirm_trade(&state.db, request.trade_id, &user_id).await?;
    let completed = match outcome {
        ConfirmOutcome::Completed => true,
        ConfirmOutcome::AwaitingCounterparty => false,
        // Already confirmed earlier; report the trade's current state
        ConfirmOutcome::AlreadyConfirmed => {
            get_trade(&*state.db, request.trade_id)
                .await?
                .is_some_and(|t| t.status == TradeStatus::Completed)
        }
    };
    Ok(Json(ConfirmTradeResponse { outcome, completed }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRatingBody {
    pub trade_id: i64,
    pub rated_user_id: String,
    pub rating: i32,
    #[serde(default)]
    pub comment: Option<String>,
}

/// `POST /functions/submit-rating`
pub async fn submit_rating_handler(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    payload: std::result::Result<Json<SubmitRatingBody>, JsonRejection>,
) -> Result<Json<Value>> {
    let request = body(payload)?;
    let rating = submit_rating(
        &state.db,
        request.trade_id,
        &user_id,
        &request.rated_user_id,
        request.rating,
        request.comment,
    )
    .await?;
    Ok(Json(json!({ "success": true, "ratingId": rating.id })))
}

/// `GET /users/{id}/reputation`
pub async fn user_reputation(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Json<UserReputation> {
    Json(get_user_reputation(&state.db, &user_id).await)
}

/// `GET /users/{id}/xp`
pub async fn user_xp(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<XpProgress>> {
    get_xp_progress(&state.db, &user_id).await.map(Json)
}
