//! Reputation engine - trust score, league and verified-seller status.
//!
//! Reputation is never stored. It is recomputed on every read from the user's
//! ratings and completed trades, so it cannot drift from the underlying rows.

use crate::{
    core::profile::get_profile,
    entities::{Rating, Trade, rating, trade, trade::TradeStatus},
    errors::{Error, Result, is_unique_violation},
};
use chrono::{DateTime, Utc};
use sea_orm::{Condition, PaginatorTrait, Set, prelude::*};
use serde::Serialize;
use tracing::{info, warn};

/// Completed trades needed before a seller can be verified.
pub const VERIFIED_MIN_TRADES: u64 = 3;

/// Average rating needed before a seller can be verified.
pub const VERIFIED_MIN_AVERAGE: f64 = 4.0;

/// Reputation bracket
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum League {
    /// Score 0 and up
    Bronze,
    /// Score 20 and up
    Silver,
    /// Score 50 and up
    Gold,
    /// Score 100 and up
    Platinum,
    /// Score 200 and up
    Diamond,
}

/// Leagues by descending minimum score; the first match wins.
const LEAGUE_THRESHOLDS: [(League, i64); 5] = [
    (League::Diamond, 200),
    (League::Platinum, 100),
    (League::Gold, 50),
    (League::Silver, 20),
    (League::Bronze, 0),
];

impl League {
    /// Highest league whose threshold `score` reaches. Bronze is the floor.
    #[must_use]
    pub fn from_score(score: i64) -> Self {
        LEAGUE_THRESHOLDS
            .iter()
            .find(|(_, threshold)| score >= *threshold)
            .map_or(Self::Bronze, |(league, _)| *league)
    }
}

/// Derived reputation of a user
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserReputation {
    /// Mean rating, 0 when there are no reviews
    pub average_rating: f64,
    /// Number of ratings received
    pub total_reviews: u64,
    /// Number of completed trades the user took part in
    pub completed_trades: u64,
    /// Verified-seller badge
    pub is_verified: bool,
    /// Weighted trust score
    pub reputation_score: i64,
    /// Bracket derived from the score
    pub league: League,
    /// When the user signed up
    pub member_since: Option<DateTime<Utc>>,
}

impl Default for UserReputation {
    fn default() -> Self {
        Self {
            average_rating: 0.0,
            total_reviews: 0,
            completed_trades: 0,
            is_verified: false,
            reputation_score: 0,
            league: League::Bronze,
            member_since: None,
        }
    }
}

/// Computes a reputation from raw rating values and a completed-trade count.
///
/// `score = trades×10 + round(average×2×reviews) + fiveStars×3`. The middle term
/// is rounded half away from zero.
#[must_use]
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
pub fn compute_reputation(
    ratings: &[i32],
    completed_trades: u64,
    member_since: Option<DateTime<Utc>>,
) -> UserReputation {
    let total_reviews = ratings.len() as u64;
    let average_rating = if ratings.is_empty() {
        0.0
    } else {
        f64::from(ratings.iter().sum::<i32>()) / ratings.len() as f64
    };
    let five_star_count = ratings.iter().filter(|r| **r == 5).count() as i64;

    let trades = i64::try_from(completed_trades).unwrap_or(i64::MAX);
    let review_weight = (average_rating * 2.0 * total_reviews as f64).round() as i64;
    let reputation_score = trades
        .saturating_mul(10)
        .saturating_add(review_weight)
        .saturating_add(five_star_count * 3);

    UserReputation {
        average_rating,
        total_reviews,
        completed_trades,
        is_verified: completed_trades >= VERIFIED_MIN_TRADES
            && average_rating >= VERIFIED_MIN_AVERAGE,
        reputation_score,
        league: League::from_score(reputation_score),
        member_since,
    }
}

/// Reads and computes a user's reputation.
///
/// Any read failure is logged and yields the zero reputation, so callers that only
/// display reputation never fail because of it.
pub async fn get_user_reputation(db: &DatabaseConnection, user_id: &str) -> UserReputation {
    match load_reputation(db, user_id).await {
        Ok(reputation) => reputation,
        Err(e) => {
            warn!(user_id, error = %e, "Reputation read failed, reporting zero reputation");
            UserReputation::default()
        }
    }
}

async fn load_reputation(db: &DatabaseConnection, user_id: &str) -> Result<UserReputation> {
    let ratings: Vec<i32> = Rating::find()
        .filter(rating::Column::RatedUserId.eq(user_id))
        .all(db)
        .await?
        .into_iter()
        .map(|r| r.rating)
        .collect();

    let completed_trades = Trade::find()
        .filter(
            Condition::any()
                .add(trade::Column::User1Id.eq(user_id))
                .add(trade::Column::User2Id.eq(user_id)),
        )
        .filter(trade::Column::Status.eq(TradeStatus::Completed))
        .count(db)
        .await?;

    let member_since = get_profile(db, user_id).await?.map(|p| p.created_at);

    Ok(compute_reputation(&ratings, completed_trades, member_since))
}

/// Records a rating of `rated_user_id` by `rater_id` for a completed trade.
///
/// Fails with `Validation` for a score outside 1..=5, and with `DuplicateRating` when
/// the rater already rated this trade.
pub async fn submit_rating(
    db: &DatabaseConnection,
    trade_id: i64,
    rater_id: &str,
    rated_user_id: &str,
    score: i32,
    comment: Option<String>,
) -> Result<rating::Model> {
    if !(1..=5).contains(&score) {
        return Err(Error::validation(format!(
            "Rating must be between 1 and 5, got {score}"
        )));
    }

    let trade = Trade::find_by_id(trade_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Trade", trade_id))?;

    let Some(counterparty) = trade.counterparty_of(rater_id) else {
        return Err(Error::forbidden("Not a participant of this trade"));
    };
    if trade.status != TradeStatus::Completed {
        return Err(Error::invalid_state("Trade is not completed yet"));
    }
    if counterparty != rated_user_id {
        return Err(Error::validation("Rated user must be the trade counterparty"));
    }

    let comment = comment
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty());

    let new_rating = rating::ActiveModel {
        trade_id: Set(trade_id),
        rater_id: Set(rater_id.to_string()),
        rated_user_id: Set(rated_user_id.to_string()),
        rating: Set(score),
        comment: Set(comment),
        created_at: Set(Utc::now()),
        ..Default::default()
    };

    match new_rating.insert(db).await {
        Ok(model) => {
            info!(trade_id, rater_id, rated_user_id, score, "Rating submitted");
            Ok(model)
        }
        Err(e) if is_unique_violation(&e) => Err(Error::DuplicateRating {
            trade_id,
            rater_id: rater_id.to_string(),
        }),
        Err(e) => Err(e.into()),
    }
}
