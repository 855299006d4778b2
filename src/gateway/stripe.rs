//! Stripe REST client.
//!
//! Stripe takes `application/x-www-form-urlencoded` bodies with bracketed keys for
//! nested fields (`line_items[0][price_data][currency]`). The form builders below are
//! pure so the encoding is tested without a network.

use super::{
    AccountLink, CheckoutRequest, CheckoutSession, ConnectedAccount, ConnectedAccountRequest,
    PaymentGateway,
};
use crate::errors::{Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, de::DeserializeOwned};
use tracing::{debug, warn};

type Form = Vec<(String, String)>;

/// [`PaymentGateway`] backed by the Stripe API
#[derive(Debug, Clone)]
pub struct StripeGateway {
    client: reqwest::Client,
    api_base: String,
    secret_key: String,
}

impl StripeGateway {
    /// Creates a client for `api_base` authenticated with `secret_key`.
    #[must_use]
    pub fn new(api_base: &str, secret_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_base: api_base.trim_end_matches('/').to_string(),
            secret_key,
        }
    }

    async fn post_form<T: DeserializeOwned>(&self, path: &str, form: &Form) -> Result<T> {
        debug!(path, fields = form.len(), "Stripe POST");
        let response = self
            .client
            .post(format!("{}{path}", self.api_base))
            .bearer_auth(&self.secret_key)
            .form(form)
            .send()
            .await
            .map_err(|e| Error::gateway(e.to_string()))?;
        decode(response).await
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        debug!(path, "Stripe GET");
        let response = self
            .client
            .get(format!("{}{path}", self.api_base))
            .bearer_auth(&self.secret_key)
            .send()
            .await
            .map_err(|e| Error::gateway(e.to_string()))?;
        decode(response).await
    }
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

#[derive(Deserialize)]
struct SessionResponse {
    id: String,
    url: Option<String>,
}

#[derive(Deserialize)]
struct AccountResponse {
    id: String,
    #[serde(default)]
    charges_enabled: bool,
    #[serde(default)]
    payouts_enabled: bool,
}

impl From<AccountResponse> for ConnectedAccount {
    fn from(account: AccountResponse) -> Self {
        Self {
            id: account.id,
            charges_enabled: account.charges_enabled,
            payouts_enabled: account.payouts_enabled,
        }
    }
}

#[derive(Deserialize)]
struct LinkResponse {
    url: String,
}

async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let status = response.status();
    if status.is_success() {
        return response
            .json::<T>()
            .await
            .map_err(|e| Error::gateway(format!("Unreadable gateway response: {e}")));
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorEnvelope>(&body)
        .ok()
        .and_then(|envelope| envelope.error.message)
        .unwrap_or_else(|| format!("Gateway returned {status}"));
    warn!(%status, %message, "Stripe request failed");
    Err(Error::gateway(message))
}

/// Form body for `POST /v1/checkout/sessions`.
#[must_use]
pub fn checkout_form(request: &CheckoutRequest) -> Vec<(String, String)> {
    let mut form: Form = vec![
        ("mode".into(), "payment".into()),
        ("success_url".into(), request.success_url.clone()),
        ("cancel_url".into(), request.cancel_url.clone()),
        ("line_items[0][quantity]".into(), "1".into()),
        (
            "line_items[0][price_data][currency]".into(),
            request.currency.clone(),
        ),
        (
            "line_items[0][price_data][unit_amount]".into(),
            request.unit_amount.to_string(),
        ),
        (
            "line_items[0][price_data][product_data][name]".into(),
            request.product_name.clone(),
        ),
    ];
    if let Some(description) = &request.description {
        form.push((
            "line_items[0][price_data][product_data][description]".into(),
            description.clone(),
        ));
    }
    for (key, value) in &request.metadata {
        form.push((format!("metadata[{key}]"), value.clone()));
    }
    if let Some(charge) = &request.destination {
        form.push((
            "payment_intent_data[application_fee_amount]".into(),
            charge.application_fee_amount.to_string(),
        ));
        form.push((
            "payment_intent_data[transfer_data][destination]".into(),
            charge.destination.clone(),
        ));
    }
    form
}

/// Form body for `POST /v1/accounts`.
#[must_use]
pub fn account_form(request: &ConnectedAccountRequest) -> Vec<(String, String)> {
    let mut form: Form = vec![
        ("type".into(), "express".into()),
        ("country".into(), request.country.clone()),
        ("email".into(), request.email.clone()),
        ("business_type".into(), "individual".into()),
        ("capabilities[card_payments][requested]".into(), "true".into()),
        ("capabilities[transfers][requested]".into(), "true".into()),
        ("individual[first_name]".into(), request.first_name.clone()),
        ("individual[last_name]".into(), request.last_name.clone()),
        ("individual[email]".into(), request.email.clone()),
    ];
    if let Some(phone) = &request.phone {
        form.push(("individual[phone]".into(), phone.clone()));
    }
    form.extend([
        ("external_account[object]".into(), "bank_account".into()),
        ("external_account[country]".into(), request.country.clone()),
        ("external_account[currency]".into(), request.currency.clone()),
        ("external_account[account_number]".into(), request.iban.clone()),
    ]);
    form
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    async fn create_checkout_session(&self, request: CheckoutRequest) -> Result<CheckoutSession> {
        let session: SessionResponse = self
            .post_form("/v1/checkout/sessions", &checkout_form(&request))
            .await?;
        let url = session
            .url
            .ok_or_else(|| Error::gateway("Checkout session has no redirect URL"))?;
        Ok(CheckoutSession {
            id: session.id,
            url,
        })
    }

    async fn create_connected_account(
        &self,
        request: ConnectedAccountRequest,
    ) -> Result<ConnectedAccount> {
        let account: AccountResponse = self
            .post_form("/v1/accounts", &account_form(&request))
            .await?;
        Ok(account.into())
    }

    async fn retrieve_account(&self, account_id: &str) -> Result<ConnectedAccount> {
        let account: AccountResponse = self.get(&format!("/v1/accounts/{account_id}")).await?;
        Ok(account.into())
    }

    async fn create_account_link(
        &self,
        account_id: &str,
        refresh_url: &str,
        return_url: &str,
    ) -> Result<AccountLink> {
        let form: Form = vec![
            ("account".into(), account_id.to_string()),
            ("refresh_url".into(), refresh_url.to_string()),
            ("return_url".into(), return_url.to_string()),
            ("type".into(), "account_onboarding".into()),
        ];
        let link: LinkResponse = self.post_form("/v1/account_links", &form).await?;
        Ok(AccountLink { url: link.url })
    }
}
