//! Trade confirmation business logic.
//!
//! A trade moves from `pending` to `completed` once both participants have confirmed.
//! There is no coordinator: each confirmation sets the caller's own flag with a
//! conditional update, then attempts the completion flip with a second conditional
//! update whose predicate requires both flags. The store evaluates that predicate
//! against the current row, so whichever confirmation lands second performs the flip
//! even when both arrive concurrently.

use crate::{
    core::game::require_game,
    entities::{
        Trade, trade,
        trade::TradeStatus,
    },
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{Set, prelude::*, sea_query::Expr};
use serde::Serialize;
use tracing::{debug, info};

/// Result of a confirmation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfirmOutcome {
    /// The caller had already confirmed; nothing changed for them
    AlreadyConfirmed,
    /// The caller's flag is set; the other participant has not confirmed yet
    AwaitingCounterparty,
    /// Both flags are set and the trade is completed
    Completed,
}

/// Opens a trade on a listing between its owner and another user.
pub async fn create_trade(
    db: &DatabaseConnection,
    listing_id: i64,
    initiator_id: String,
    counterparty_id: String,
) -> Result<trade::Model> {
    if initiator_id == counterparty_id {
        return Err(Error::validation("Cannot trade with yourself"));
    }

    let listing = require_game(db, listing_id).await?;
    if listing.owner_id != initiator_id && listing.owner_id != counterparty_id {
        return Err(Error::validation(
            "One of the participants must own the listing",
        ));
    }

    let trade = trade::ActiveModel {
        listing_id: Set(listing_id),
        user1_id: Set(initiator_id),
        user2_id: Set(counterparty_id),
        status: Set(TradeStatus::Pending),
        user1_confirmed: Set(false),
        user2_confirmed: Set(false),
        created_at: Set(Utc::now()),
        completed_at: Set(None),
        ..Default::default()
    };

    let trade = trade.insert(db).await?;
    info!(trade_id = trade.id, listing_id, "Trade opened");
    Ok(trade)
}

/// Finds a trade by id.
pub async fn get_trade<C>(db: &C, trade_id: i64) -> Result<Option<trade::Model>>
where
    C: ConnectionTrait,
{
    Trade::find_by_id(trade_id).one(db).await.map_err(Into::into)
}

/// Records `caller_id`'s confirmation of a trade.
///
/// Fails with `NotFound` for an unknown trade and `Forbidden` when the caller is not a
/// participant. A repeated confirmation is a no-op reported as
/// [`ConfirmOutcome::AlreadyConfirmed`], but still retries the completion flip so that
/// a flag write whose flip failed earlier gets finished.
pub async fn confirm_trade(
    db: &DatabaseConnection,
    trade_id: i64,
    caller_id: &str,
) -> Result<ConfirmOutcome> {
    let trade = get_trade(db, trade_id)
        .await?
        .ok_or_else(|| Error::not_found("Trade", trade_id))?;

    if !trade.involves(caller_id) {
        return Err(Error::forbidden("Not a participant of this trade"));
    }
    let (flag, already_confirmed) = if trade.user1_id == caller_id {
        (trade::Column::User1Confirmed, trade.user1_confirmed)
    } else {
        (trade::Column::User2Confirmed, trade.user2_confirmed)
    };

    if already_confirmed {
        debug!(trade_id, caller_id, "Trade already confirmed by caller");
        finalize_trade_if_ready(db, trade_id).await?;
        return Ok(ConfirmOutcome::AlreadyConfirmed);
    }

    let flagged = Trade::update_many()
        .col_expr(flag, Expr::val(true).into())
        .filter(trade::Column::Id.eq(trade_id))
        .filter(flag.eq(false))
        .exec(db)
        .await?;

    if flagged.rows_affected == 0 {
        // A concurrent request from the same caller set the flag first
        finalize_trade_if_ready(db, trade_id).await?;
        return Ok(ConfirmOutcome::AlreadyConfirmed);
    }
    info!(trade_id, caller_id, "Trade confirmation recorded");

    if finalize_trade_if_ready(db, trade_id).await? {
        return Ok(ConfirmOutcome::Completed);
    }

    // The counterparty's flip may have landed between our two writes
    let current = get_trade(db, trade_id)
        .await?
        .ok_or_else(|| Error::not_found("Trade", trade_id))?;
    Ok(if current.status == TradeStatus::Completed {
        ConfirmOutcome::Completed
    } else {
        ConfirmOutcome::AwaitingCounterparty
    })
}

/// Completes the trade if both flags are set and it is still pending.
///
/// Returns `true` when this call performed the transition. Safe to call any number of
/// times; it is the retry step after a failed flip.
pub async fn finalize_trade_if_ready<C>(db: &C, trade_id: i64) -> Result<bool>
where
    C: ConnectionTrait,
{
    let flipped = Trade::update_many()
        .set(trade::ActiveModel {
            status: Set(TradeStatus::Completed),
            completed_at: Set(Some(Utc::now())),
            ..Default::default()
        })
        .filter(trade::Column::Id.eq(trade_id))
        .filter(trade::Column::Status.eq(TradeStatus::Pending))
        .filter(trade::Column::User1Confirmed.eq(true))
        .filter(trade::Column::User2Confirmed.eq(true))
        .exec(db)
        .await?;

    let completed = flipped.rows_affected > 0;
    if completed {
        info!(trade_id, "Trade completed");
    }
    Ok(completed)
}
