//! Seller onboarding: opening a connected payout account at the gateway.

use crate::{
    config::settings::PaymentSettings,
    core::profile::require_profile,
    entities::{Profile, profile},
    errors::{Error, Result},
    gateway::{ConnectedAccountRequest, PaymentGateway},
};
use sea_orm::{Set, prelude::*};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Identity and payout details submitted by a future seller
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SellerAccountRequest {
    /// Contact email
    pub email: String,
    /// Optional phone number
    #[serde(default)]
    pub phone: Option<String>,
    /// Legal first name
    pub first_name: String,
    /// Legal last name
    pub last_name: String,
    /// Payout IBAN, spaces allowed
    pub iban: String,
}

/// Result of onboarding
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SellerOnboarding {
    /// Always `true`; failures are errors
    pub success: bool,
    /// Connected account id
    pub account_id: String,
    /// Hosted onboarding page to finish verification
    pub onboarding_url: String,
}

/// Normalizes an IBAN and verifies its ISO 13616 mod-97 checksum.
pub fn validate_iban(raw: &str) -> Result<String> {
    let iban: String = raw
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| c.to_ascii_uppercase())
        .collect();

    let bytes = iban.as_bytes();
    let well_formed = (15..=34).contains(&bytes.len())
        && bytes[..2].iter().all(u8::is_ascii_uppercase)
        && bytes[2..4].iter().all(u8::is_ascii_digit)
        && bytes.iter().all(u8::is_ascii_alphanumeric);
    if !well_formed {
        return Err(Error::validation("Malformed IBAN"));
    }

    // Country code and check digits move to the end; letters count as 10..=35
    let remainder = iban[4..]
        .bytes()
        .chain(iban[..4].bytes())
        .fold(0_u32, |acc, b| {
            if b.is_ascii_digit() {
                (acc * 10 + u32::from(b - b'0')) % 97
            } else {
                (acc * 100 + u32::from(b - b'A' + 10)) % 97
            }
        });
    if remainder != 1 {
        return Err(Error::validation("Invalid IBAN checksum"));
    }
    Ok(iban)
}

fn validate_email(email: &str) -> Result<()> {
    let valid = email.split_once('@').is_some_and(|(local, domain)| {
        !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
    });
    if valid {
        Ok(())
    } else {
        Err(Error::validation("Invalid email address"))
    }
}

/// Opens a connected account for `user_id` and returns its onboarding link.
///
/// A user who already has an account gets a fresh onboarding link for it instead of
/// a second account.
pub async fn create_seller_account(
    db: &DatabaseConnection,
    gateway: &dyn PaymentGateway,
    settings: &PaymentSettings,
    user_id: &str,
    request: SellerAccountRequest,
) -> Result<SellerOnboarding> {
    let email = request.email.trim().to_string();
    validate_email(&email)?;
    let first_name = request.first_name.trim().to_string();
    let last_name = request.last_name.trim().to_string();
    if first_name.is_empty() || last_name.is_empty() {
        return Err(Error::validation("First and last name are required"));
    }
    let iban = validate_iban(&request.iban)?;

    let profile = require_profile(db, user_id).await?;
    let account_id = if let Some(existing) = profile.stripe_account_id {
        existing
    } else {
        let account = gateway
            .create_connected_account(ConnectedAccountRequest {
                email,
                phone: request.phone.filter(|p| !p.trim().is_empty()),
                first_name,
                last_name,
                country: settings.country.clone(),
                currency: settings.currency.clone(),
                iban,
            })
            .await?;

        let linked = Profile::update_many()
            .set(profile::ActiveModel {
                stripe_account_id: Set(Some(account.id.clone())),
                ..Default::default()
            })
            .filter(profile::Column::Id.eq(user_id))
            .filter(profile::Column::StripeAccountId.is_null())
            .exec(db)
            .await?;
        if linked.rows_affected == 0 {
            return Err(Error::Conflict {
                message: format!("Payment account for {user_id} was created concurrently"),
            });
        }
        info!(user_id, account_id = %account.id, "Seller account created");
        account.id
    };

    let site = settings.site_url.trim_end_matches('/');
    let link = gateway
        .create_account_link(
            &account_id,
            &format!("{site}/seller/onboarding?refresh=true"),
            &format!("{site}/seller/onboarding?completed=true"),
        )
        .await?;

    Ok(SellerOnboarding {
        success: true,
        account_id,
        onboarding_url: link.url,
    })
}
