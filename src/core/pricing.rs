//! Prices, fees and time windows shared by the payment and boost workflows.
//!
//! The platform commission is computed here and nowhere else, so the amount recorded
//! when a payment request is created and the amount withheld at checkout can never
//! diverge.

use chrono::Duration;
use serde::{Deserialize, Serialize};

/// Platform commission, in percent of the sale price.
pub const COMMISSION_PERCENT: i64 = 7;

/// How long a remote payment request stays payable.
pub const PAYMENT_REQUEST_TTL_HOURS: i64 = 24;

/// How long captured funds are held before release.
pub const ESCROW_HOLD_HOURS: i64 = 48;

/// Maximum number of simultaneously pending remote requests per listing and seller.
pub const MAX_PENDING_REMOTE_REQUESTS: u64 = 3;

/// Platform fee for a sale of `amount_cents`, rounded half-up to the cent.
#[must_use]
pub const fn platform_fee(amount_cents: i64) -> i64 {
    (amount_cents * COMMISSION_PERCENT + 50) / 100
}

/// Remote payment request lifetime.
#[must_use]
pub fn payment_request_ttl() -> Duration {
    Duration::hours(PAYMENT_REQUEST_TTL_HOURS)
}

/// Escrow hold window.
#[must_use]
pub fn escrow_hold() -> Duration {
    Duration::hours(ESCROW_HOLD_HOURS)
}

/// Boosts bought with XP
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum XpBoost {
    /// 48 hours for 300 XP
    #[serde(rename = "48H")]
    Hours48,
    /// 7 days for 900 XP
    #[serde(rename = "7D")]
    Days7,
}

impl XpBoost {
    /// XP cost.
    #[must_use]
    pub const fn cost(self) -> i64 {
        match self {
            Self::Hours48 => 300,
            Self::Days7 => 900,
        }
    }

    /// How long the boost lasts.
    #[must_use]
    pub fn duration(self) -> Duration {
        match self {
            Self::Hours48 => Duration::hours(48),
            Self::Days7 => Duration::hours(168),
        }
    }

    /// Value stored in the listing's `boost_type` column.
    #[must_use]
    pub const fn boost_type(self) -> &'static str {
        match self {
            Self::Hours48 => "XP_48H",
            Self::Days7 => "XP_7D",
        }
    }
}

/// Boosts bought with money
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaidBoost {
    /// 24 hours
    #[serde(rename = "24h")]
    Hours24,
    /// 72 hours
    #[serde(rename = "72h")]
    Hours72,
    /// 7 days
    #[serde(rename = "7d")]
    Days7,
}

impl PaidBoost {
    /// Price in cents.
    #[must_use]
    pub const fn price_cents(self) -> i64 {
        match self {
            Self::Hours24 => 299,
            Self::Hours72 => 599,
            Self::Days7 => 1199,
        }
    }

    /// Duration in hours, as passed to fulfillment.
    #[must_use]
    pub const fn hours(self) -> i64 {
        match self {
            Self::Hours24 => 24,
            Self::Hours72 => 72,
            Self::Days7 => 168,
        }
    }

    /// Key used in request bodies and checkout metadata.
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Hours24 => "24h",
            Self::Hours72 => "72h",
            Self::Days7 => "7d",
        }
    }

    /// Product name shown on the checkout page.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Hours24 => "Boost 24h",
            Self::Hours72 => "Boost 72h",
            Self::Days7 => "Boost 7 jours",
        }
    }
}
