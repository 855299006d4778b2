//! Profile entity - One row per registered user.
//!
//! Holds the materialized XP balance (kept equal to the sum of the user's
//! `xp_transactions` rows) and the connected payment account used for payouts.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Profile database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "profiles")]
pub struct Model {
    /// User id issued by the identity provider (JWT `sub`)
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    /// Name shown to other users
    pub display_name: String,
    /// Current XP balance
    pub xp: i64,
    /// Connected payment account id, once the user has onboarded as a seller
    pub stripe_account_id: Option<String>,
    /// When the user signed up
    pub created_at: DateTimeUtc,
}

/// Defines relationships between Profile and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One profile has many XP ledger rows
    #[sea_orm(has_many = "super::xp_transaction::Entity")]
    XpTransactions,
    /// One profile owns many listings
    #[sea_orm(has_many = "super::game::Entity")]
    Games,
}

impl Related<super::xp_transaction::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::XpTransactions.def()
    }
}

impl Related<super::game::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Games.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
