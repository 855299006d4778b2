//! Rating entity - One participant's review of the other for a completed trade.
//!
//! Unique on `(trade_id, rater_id)`; the index is created alongside the table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Rating database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "ratings")]
pub struct Model {
    /// Unique identifier for the rating
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Trade being rated
    pub trade_id: i64,
    /// Participant giving the rating
    pub rater_id: String,
    /// Participant being rated
    pub rated_user_id: String,
    /// Score from 1 to 5
    pub rating: i32,
    /// Optional free-text review
    pub comment: Option<String>,
    /// When the rating was submitted
    pub created_at: DateTimeUtc,
}

/// Defines relationships between Rating and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each rating belongs to one trade
    #[sea_orm(
        belongs_to = "super::trade::Entity",
        from = "Column::TradeId",
        to = "super::trade::Column::Id"
    )]
    Trade,
}

impl Related<super::trade::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Trade.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
