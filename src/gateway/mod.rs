//! Payment gateway seam.
//!
//! Workflows only see the [`PaymentGateway`] trait. The production implementation is
//! [`stripe::StripeGateway`]; tests substitute the generated `MockPaymentGateway`.

pub mod stripe;

use crate::errors::Result;
use async_trait::async_trait;
use std::collections::BTreeMap;

pub use stripe::StripeGateway;

/// Funds routing for a checkout that pays a connected seller account
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DestinationCharge {
    /// Platform commission withheld, in cents
    pub application_fee_amount: i64,
    /// Connected account receiving the remainder
    pub destination: String,
}

/// A single-item checkout session request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutRequest {
    /// ISO currency code
    pub currency: String,
    /// Price in minor units
    pub unit_amount: i64,
    /// Line item name
    pub product_name: String,
    /// Optional line item description
    pub description: Option<String>,
    /// Redirect after payment
    pub success_url: String,
    /// Redirect when the buyer backs out
    pub cancel_url: String,
    /// Free-form key/value pairs echoed back to fulfillment
    pub metadata: BTreeMap<String, String>,
    /// Present when funds go to a seller account
    pub destination: Option<DestinationCharge>,
}

/// An opened checkout session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutSession {
    /// Gateway session id
    pub id: String,
    /// Page the buyer is redirected to
    pub url: String,
}

/// Identity and payout details for a new seller account
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectedAccountRequest {
    /// Seller email
    pub email: String,
    /// Optional phone number
    pub phone: Option<String>,
    /// Legal first name
    pub first_name: String,
    /// Legal last name
    pub last_name: String,
    /// ISO country of the account
    pub country: String,
    /// Payout currency
    pub currency: String,
    /// Normalized IBAN for payouts
    pub iban: String,
}

/// State of a connected seller account
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectedAccount {
    /// Gateway account id
    pub id: String,
    /// Whether the account may accept charges
    pub charges_enabled: bool,
    /// Whether the account may receive payouts
    pub payouts_enabled: bool,
}

impl ConnectedAccount {
    /// Whether the account can both be charged for and paid out to.
    #[must_use]
    pub const fn is_fully_enabled(&self) -> bool {
        self.charges_enabled && self.payouts_enabled
    }
}

/// Hosted onboarding link for a connected account
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountLink {
    /// Onboarding page URL
    pub url: String,
}

/// Operations the marketplace needs from a payment provider.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Opens a hosted checkout session.
    async fn create_checkout_session(&self, request: CheckoutRequest) -> Result<CheckoutSession>;

    /// Creates an express connected account for a seller.
    async fn create_connected_account(
        &self,
        request: ConnectedAccountRequest,
    ) -> Result<ConnectedAccount>;

    /// Fetches the current state of a connected account.
    async fn retrieve_account(&self, account_id: &str) -> Result<ConnectedAccount>;

    /// Creates an onboarding link for a connected account.
    async fn create_account_link(
        &self,
        account_id: &str,
        refresh_url: &str,
        return_url: &str,
    ) -> Result<AccountLink>;
}
