//! XP ledger and progression.
//!
//! The `xp_transactions` ledger is authoritative. A profile's `xp` column is a
//! materialized sum that only moves inside the same database transaction that
//! appends the matching ledger row, and spending uses a conditional decrement
//! (`xp = xp - cost WHERE xp >= cost`) so concurrent spends cannot overdraw.

use crate::{
    core::{
        game::get_game,
        pricing::XpBoost,
        profile::{get_profile, require_profile},
    },
    entities::{Game, Profile, XpTransaction, game, profile, xp_award_log, xp_transaction},
    errors::{Error, Result, is_unique_violation},
};
use chrono::{DateTime, Utc};
use sea_orm::{Set, TransactionTrait, prelude::*, sea_query::Expr};
use serde::Serialize;
use tracing::{debug, info};

/// XP granted to the seller of a completed card sale.
pub const SELLER_SALE_XP: i64 = 100;

/// XP granted to the buyer of a completed card sale.
pub const BUYER_PURCHASE_XP: i64 = 40;

/// Award-log type for seller sale XP.
pub const AWARD_SALE: &str = "sale";

/// Award-log type for buyer purchase XP.
pub const AWARD_PURCHASE: &str = "purchase";

/// A progression tier
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Rank {
    /// Display name
    pub name: &'static str,
    /// XP needed to reach this rank
    pub min_xp: i64,
    /// XP gain multiplier granted by the rank
    pub multiplier: f64,
    /// Benefits unlocked at this rank
    pub perks: &'static [&'static str],
}

/// Ranks by ascending `min_xp`.
pub const RANKS: [Rank; 5] = [
    Rank {
        name: "Bronze",
        min_xp: 0,
        multiplier: 1.0,
        perks: &["Basic listings"],
    },
    Rank {
        name: "Silver",
        min_xp: 500,
        multiplier: 1.1,
        perks: &["Silver badge", "5% XP bonus"],
    },
    Rank {
        name: "Gold",
        min_xp: 1500,
        multiplier: 1.25,
        perks: &["Gold badge", "Priority support"],
    },
    Rank {
        name: "Platinum",
        min_xp: 4000,
        multiplier: 1.5,
        perks: &["Platinum badge", "Featured profile"],
    },
    Rank {
        name: "Elite",
        min_xp: 10000,
        multiplier: 2.0,
        perks: &["Elite badge", "Free monthly boost"],
    },
];

/// Highest rank whose threshold `xp` reaches.
#[must_use]
pub fn get_user_rank(xp: i64) -> &'static Rank {
    RANKS
        .iter()
        .rev()
        .find(|rank| xp >= rank.min_xp)
        .unwrap_or(&RANKS[0])
}

/// Rank immediately above the current one, if any.
#[must_use]
pub fn get_next_rank(xp: i64) -> Option<&'static Rank> {
    RANKS.iter().find(|rank| rank.min_xp > xp.max(0))
}

/// Percentage of the way from the current rank to the next, capped at 100.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn rank_progress(xp: i64) -> f64 {
    let current = get_user_rank(xp);
    let Some(next) = get_next_rank(xp) else {
        return 100.0;
    };
    let span = (next.min_xp - current.min_xp) as f64;
    let gained = (xp - current.min_xp).max(0) as f64;
    (gained / span * 100.0).min(100.0)
}

/// Balance and progression summary for display
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct XpProgress {
    /// Current balance
    pub xp: i64,
    /// Current rank
    pub rank: &'static Rank,
    /// Next rank, absent at the top
    pub next_rank: Option<&'static Rank>,
    /// Progress toward the next rank, 0-100
    pub progress_percent: f64,
}

impl XpProgress {
    /// Builds the summary for a balance.
    #[must_use]
    pub fn from_xp(xp: i64) -> Self {
        Self {
            xp,
            rank: get_user_rank(xp),
            next_rank: get_next_rank(xp),
            progress_percent: rank_progress(xp),
        }
    }
}

/// Reads a user's balance and progression.
pub async fn get_xp_progress(db: &DatabaseConnection, user_id: &str) -> Result<XpProgress> {
    let profile = require_profile(db, user_id).await?;
    Ok(XpProgress::from_xp(profile.xp))
}

/// Appends a ledger row and moves the balance by `amount`, atomically.
pub async fn award_xp(
    db: &DatabaseConnection,
    user_id: &str,
    amount: i64,
    reason: &str,
) -> Result<xp_transaction::Model> {
    let txn = db.begin().await?;
    let entry = award_xp_in(&txn, user_id, amount, reason).await?;
    txn.commit().await?;
    Ok(entry)
}

/// [`award_xp`] inside a caller-owned transaction.
pub async fn award_xp_in<C>(
    conn: &C,
    user_id: &str,
    amount: i64,
    reason: &str,
) -> Result<xp_transaction::Model>
where
    C: ConnectionTrait,
{
    if amount == 0 {
        return Err(Error::validation("XP amount cannot be zero"));
    }

    let moved = Profile::update_many()
        .col_expr(
            profile::Column::Xp,
            Expr::col(profile::Column::Xp).add(amount),
        )
        .filter(profile::Column::Id.eq(user_id))
        .exec(conn)
        .await?;
    if moved.rows_affected == 0 {
        return Err(Error::not_found("Profile", user_id));
    }

    let entry = append_ledger(conn, user_id, amount, reason).await?;
    info!(user_id, amount, reason, "XP awarded");
    Ok(entry)
}

/// Deducts `cost` only if the balance covers it, appending the negative ledger row.
///
/// Fails with `InsufficientXp` (nothing written) when the balance is too low.
pub async fn deduct_xp_in<C>(
    conn: &C,
    user_id: &str,
    cost: i64,
    reason: &str,
) -> Result<xp_transaction::Model>
where
    C: ConnectionTrait,
{
    if cost <= 0 {
        return Err(Error::validation("XP cost must be positive"));
    }

    let moved = Profile::update_many()
        .col_expr(profile::Column::Xp, Expr::col(profile::Column::Xp).sub(cost))
        .filter(profile::Column::Id.eq(user_id))
        .filter(profile::Column::Xp.gte(cost))
        .exec(conn)
        .await?;

    if moved.rows_affected == 0 {
        let profile = require_profile(conn, user_id).await?;
        return Err(Error::InsufficientXp {
            current: profile.xp,
            required: cost,
        });
    }

    let entry = append_ledger(conn, user_id, -cost, reason).await?;
    info!(user_id, cost, reason, "XP spent");
    Ok(entry)
}

async fn append_ledger<C>(
    conn: &C,
    user_id: &str,
    amount: i64,
    reason: &str,
) -> Result<xp_transaction::Model>
where
    C: ConnectionTrait,
{
    let entry = xp_transaction::ActiveModel {
        user_id: Set(user_id.to_string()),
        amount: Set(amount),
        reason: Set(reason.to_string()),
        created_at: Set(Utc::now()),
        ..Default::default()
    };
    entry.insert(conn).await.map_err(Into::into)
}

/// Grants a one-time award. Returns `false` without changing anything when the
/// `(user_id, award_type, reference_id)` award was already granted.
pub async fn award_xp_once(
    db: &DatabaseConnection,
    user_id: &str,
    award_type: &str,
    reference_id: &str,
    amount: i64,
    reason: &str,
) -> Result<bool> {
    let txn = db.begin().await?;
    let granted = award_xp_once_in(&txn, user_id, award_type, reference_id, amount, reason).await?;
    txn.commit().await?;
    Ok(granted)
}

/// [`award_xp_once`] inside a caller-owned transaction.
///
/// The award-log insert runs in a savepoint so a uniqueness conflict rolls back only
/// this award, never the caller's work.
pub async fn award_xp_once_in<C>(
    conn: &C,
    user_id: &str,
    award_type: &str,
    reference_id: &str,
    amount: i64,
    reason: &str,
) -> Result<bool>
where
    C: ConnectionTrait + TransactionTrait,
{
    let savepoint = conn.begin().await?;

    let log = xp_award_log::ActiveModel {
        user_id: Set(user_id.to_string()),
        award_type: Set(award_type.to_string()),
        reference_id: Set(reference_id.to_string()),
        created_at: Set(Utc::now()),
        ..Default::default()
    };

    match log.insert(&savepoint).await {
        Ok(_) => {}
        Err(e) if is_unique_violation(&e) => {
            savepoint.rollback().await?;
            debug!(user_id, award_type, reference_id, "Award already granted, skipping");
            return Ok(false);
        }
        Err(e) => return Err(e.into()),
    }

    award_xp_in(&savepoint, user_id, amount, reason).await?;
    savepoint.commit().await?;
    Ok(true)
}

/// Grants the seller's XP for a listing once, no matter how often it is called.
pub async fn award_sale_xp(db: &DatabaseConnection, user_id: &str, post_id: i64) -> Result<bool> {
    award_xp_once(
        db,
        user_id,
        AWARD_SALE,
        &post_id.to_string(),
        SELLER_SALE_XP,
        "sale_completed",
    )
    .await
}

/// Outcome of an XP boost purchase
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BoostApplied {
    /// Boosted listing
    pub game_id: i64,
    /// Value written to the listing's `boost_type`
    pub boost_type: String,
    /// When the boost ends
    pub expires_at: DateTime<Utc>,
    /// Balance after the purchase
    pub remaining_xp: i64,
}

/// Spends XP to boost a listing the caller owns.
///
/// The deduction, the ledger row and the listing update commit together. When the
/// listing update matches no row (unknown listing, or not the caller's) the whole
/// purchase is rolled back and reported as `NotFound` or `Forbidden`.
pub async fn spend_xp_boost(
    db: &DatabaseConnection,
    user_id: &str,
    game_id: i64,
    boost: XpBoost,
) -> Result<BoostApplied> {
    let txn = db.begin().await?;

    deduct_xp_in(&txn, user_id, boost.cost(), &format!("boost_{}", boost.boost_type())).await?;

    let expires_at = Utc::now() + boost.duration();
    let boosted = Game::update_many()
        .set(game::ActiveModel {
            is_boosted: Set(true),
            boost_expires_at: Set(Some(expires_at)),
            boost_type: Set(Some(boost.boost_type().to_string())),
            ..Default::default()
        })
        .filter(game::Column::Id.eq(game_id))
        .filter(game::Column::OwnerId.eq(user_id))
        .exec(&txn)
        .await?;

    if boosted.rows_affected == 0 {
        let exists = get_game(&txn, game_id).await?.is_some();
        txn.rollback().await?;
        return Err(if exists {
            Error::forbidden("Only the owner can boost this listing")
        } else {
            Error::not_found("Game", game_id)
        });
    }

    let remaining_xp = require_profile(&txn, user_id).await?.xp;
    txn.commit().await?;

    info!(user_id, game_id, boost_type = boost.boost_type(), %expires_at, "Listing boosted with XP");
    Ok(BoostApplied {
        game_id,
        boost_type: boost.boost_type().to_string(),
        expires_at,
        remaining_xp,
    })
}

/// Sum of a user's ledger rows.
pub async fn ledger_balance(db: &DatabaseConnection, user_id: &str) -> Result<i64> {
    let entries = XpTransaction::find()
        .filter(xp_transaction::Column::UserId.eq(user_id))
        .all(db)
        .await?;
    Ok(entries.iter().map(|e| e.amount).sum())
}

/// Whether the materialized balance equals the ledger sum.
pub async fn verify_xp_ledger(db: &DatabaseConnection, user_id: &str) -> Result<bool> {
    let profile = get_profile(db, user_id)
        .await?
        .ok_or_else(|| Error::not_found("Profile", user_id))?;
    Ok(profile.xp == ledger_balance(db, user_id).await?)
}
