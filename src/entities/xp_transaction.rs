//! XP transaction entity - Append-only ledger of XP deltas.
//!
//! The ledger is authoritative: a profile's `xp` column is the sum of its rows and is
//! only ever moved in the same database transaction that appends a row here.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// XP ledger database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "xp_transactions")]
pub struct Model {
    /// Unique identifier for the ledger row
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Profile whose balance moved
    pub user_id: String,
    /// Signed delta (negative for spending)
    pub amount: i64,
    /// Human-readable reason, e.g. `"sale_completed"`
    pub reason: String,
    /// When the delta was recorded
    pub created_at: DateTimeUtc,
}

/// Defines relationships between `XpTransaction` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each ledger row belongs to one profile
    #[sea_orm(
        belongs_to = "super::profile::Entity",
        from = "Column::UserId",
        to = "super::profile::Column::Id"
    )]
    Profile,
}

impl Related<super::profile::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Profile.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
