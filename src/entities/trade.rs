//! Trade entity - A peer-to-peer exchange of a listing between two users.
//!
//! Both participants confirm independently; the row becomes `completed` only once
//! both flags are set. Trades are never deleted since reputation counts them.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Lifecycle of a trade
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum TradeStatus {
    /// Waiting for one or both confirmations
    #[sea_orm(string_value = "pending")]
    Pending,
    /// Both participants confirmed
    #[sea_orm(string_value = "completed")]
    Completed,
}

/// Trade database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "trades")]
pub struct Model {
    /// Unique identifier for the trade
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Listing being exchanged
    pub listing_id: i64,
    /// User who initiated the exchange
    pub user1_id: String,
    /// Counterparty
    pub user2_id: String,
    /// Pending or completed
    pub status: TradeStatus,
    /// Whether `user1_id` confirmed
    pub user1_confirmed: bool,
    /// Whether `user2_id` confirmed
    pub user2_confirmed: bool,
    /// When the trade was opened
    pub created_at: DateTimeUtc,
    /// Set together with the transition to `completed`
    pub completed_at: Option<DateTimeUtc>,
}

impl Model {
    /// Whether `user_id` is one of the two participants.
    #[must_use]
    pub fn involves(&self, user_id: &str) -> bool {
        self.user1_id == user_id || self.user2_id == user_id
    }

    /// The participant that is not `user_id`.
    #[must_use]
    pub fn counterparty_of(&self, user_id: &str) -> Option<&str> {
        if self.user1_id == user_id {
            Some(&self.user2_id)
        } else if self.user2_id == user_id {
            Some(&self.user1_id)
        } else {
            None
        }
    }
}

/// Defines relationships between Trade and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One trade has up to two ratings
    #[sea_orm(has_many = "super::rating::Entity")]
    Ratings,
}

impl Related<super::rating::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Ratings.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
