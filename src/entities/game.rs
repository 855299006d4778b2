//! Game entity - A board game listed on the marketplace.
//!
//! Listings can be offered for sale, for exchange, or both. Sale listings carry a
//! price in minor currency units. Boost columns give a listing temporary ranking
//! priority.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// What the owner is willing to do with the listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum ListingType {
    /// Priced sale only
    #[sea_orm(string_value = "sale")]
    Sale,
    /// Exchange only
    #[sea_orm(string_value = "trade")]
    Trade,
    /// Sale or exchange
    #[sea_orm(string_value = "both")]
    Both,
}

impl ListingType {
    /// Whether the listing can be bought for money.
    #[must_use]
    pub const fn is_for_sale(self) -> bool {
        matches!(self, Self::Sale | Self::Both)
    }
}

/// Availability of a listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum ListingStatus {
    /// Open for offers
    #[sea_orm(string_value = "available")]
    Available,
    /// Held for a buyer
    #[sea_orm(string_value = "reserved")]
    Reserved,
    /// Sale completed
    #[sea_orm(string_value = "sold")]
    Sold,
}

/// Game listing database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "games")]
pub struct Model {
    /// Unique identifier for the listing
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Profile id of the owner
    pub owner_id: String,
    /// Game title
    pub title: String,
    /// Sale, trade or both
    pub listing_type: ListingType,
    /// Asking price in cents (0 for trade-only listings)
    pub price_cents: i64,
    /// Availability
    pub status: ListingStatus,
    /// Whether a boost is active
    pub is_boosted: bool,
    /// When the active boost ends
    pub boost_expires_at: Option<DateTimeUtc>,
    /// Boost kind, e.g. `"XP_48H"`
    pub boost_type: Option<String>,
    /// When the listing was created
    pub created_at: DateTimeUtc,
}

/// Defines relationships between Game and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each listing belongs to one owner
    #[sea_orm(
        belongs_to = "super::profile::Entity",
        from = "Column::OwnerId",
        to = "super::profile::Column::Id"
    )]
    Owner,
    /// One listing has many escrow transactions
    #[sea_orm(has_many = "super::transaction::Entity")]
    Transactions,
}

impl Related<super::profile::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Owner.def()
    }
}

impl Related<super::transaction::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Transactions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
