//! Transaction entity - A priced sale of a listing, optionally held in escrow.
//!
//! `status` only moves from `pending` to `completed` or `expired`. `escrow_status`
//! advances from `none` to `pending_escrow` for card and remote payments; the release
//! itself happens outside this service. Amounts are in cents.
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// How the buyer pays
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Direct card checkout
    #[sea_orm(string_value = "card")]
    Card,
    /// Seller-initiated payment request paid remotely by the buyer
    #[sea_orm(string_value = "remote")]
    Remote,
    /// In-person cash handover, unverified
    #[sea_orm(string_value = "cash")]
    Cash,
}

/// Lifecycle of a sale
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    /// Open
    #[sea_orm(string_value = "pending")]
    Pending,
    /// Both sides done; listing sold
    #[sea_orm(string_value = "completed")]
    Completed,
    /// Payment window lapsed
    #[sea_orm(string_value = "expired")]
    Expired,
}

/// Escrow hold state of the captured funds
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum EscrowStatus {
    /// No funds held
    #[sea_orm(string_value = "none")]
    NoEscrow,
    /// Funds captured, waiting for the release horizon
    #[sea_orm(string_value = "pending_escrow")]
    PendingEscrow,
    /// Funds transferred to the seller
    #[sea_orm(string_value = "released")]
    Released,
}

/// Transaction database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    /// Unique identifier for the transaction
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Listing being sold
    pub post_id: i64,
    /// Listing owner
    pub seller_id: String,
    /// Paying user
    pub buyer_id: String,
    /// Sale price in cents
    pub amount_cents: i64,
    /// Platform commission withheld from the seller, in cents
    pub platform_fee_cents: i64,
    /// Card, remote or cash
    pub method: PaymentMethod,
    /// Pending, completed or expired
    pub status: TransactionStatus,
    /// Escrow hold state
    pub escrow_status: EscrowStatus,
    /// When held funds become releasable
    pub escrow_release_at: Option<DateTimeUtc>,
    /// Deadline for paying a remote request
    pub expires_at: Option<DateTimeUtc>,
    /// Checkout session opened at the gateway
    pub stripe_checkout_session_id: Option<String>,
    /// When the transaction was created
    pub created_at: DateTimeUtc,
    /// When the transaction was completed
    pub completed_at: Option<DateTimeUtc>,
}

impl Model {
    /// Whether `user_id` is the buyer or the seller.
    #[must_use]
    pub fn involves(&self, user_id: &str) -> bool {
        self.seller_id == user_id || self.buyer_id == user_id
    }
}

/// Defines relationships between Transaction and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each transaction belongs to one listing
    #[sea_orm(
        belongs_to = "super::game::Entity",
        from = "Column::PostId",
        to = "super::game::Column::Id"
    )]
    Game,
}

impl Related<super::game::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Game.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
