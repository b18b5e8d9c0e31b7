//! Seller notifications, delivered through a transactional email HTTP API.
use std::{sync::Arc, time::Duration};

use futures::future::BoxFuture;
use log::*;
use marketplace_payment_engine::events::{EventHandlers, EventHooks, SellerOnboardedEvent};
use reqwest::Client;
use serde::Serialize;
use thiserror::Error;

use crate::config::EmailConfig;

pub const EMAIL_EVENT_BUFFER_SIZE: usize = 25;
const ONBOARDING_COMPLETE_SUBJECT: &str = "Your seller account is ready";

#[derive(Debug, Error)]
pub enum EmailApiError {
    #[error("Could not initialize the email client. {0}")]
    Initialization(String),
    #[error("The email could not be sent. {0}")]
    SendFailed(String),
    #[error("The email service rejected the message ({status}). {message}")]
    Rejected { status: u16, message: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct EmailMessage {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub text: String,
}

#[derive(Clone)]
pub struct EmailApi {
    config: EmailConfig,
    client: Arc<Client>,
}

impl EmailApi {
    pub fn new(config: EmailConfig) -> Result<Self, EmailApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| EmailApiError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    pub async fn send(&self, message: &EmailMessage) -> Result<(), EmailApiError> {
        trace!("✉️ Sending '{}' to {}", message.subject, message.to);
        let response = self
            .client
            .post(&self.config.api_url)
            .bearer_auth(self.config.api_key.reveal())
            .json(message)
            .send()
            .await
            .map_err(|e| EmailApiError::SendFailed(e.to_string()))?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let message = response.text().await.unwrap_or_default();
            Err(EmailApiError::Rejected { status: status.as_u16(), message })
        }
    }

    pub async fn send_seller_onboarding_complete_email(
        &self,
        address: &str,
        seller_name: &str,
    ) -> Result<(), EmailApiError> {
        let message = onboarding_complete_message(&self.config.from, address, seller_name);
        self.send(&message).await
    }
}

pub fn onboarding_complete_message(from: &str, to: &str, seller_name: &str) -> EmailMessage {
    let name = if seller_name.trim().is_empty() { "there" } else { seller_name };
    let text = format!(
        "Hi {name},\n\nYour seller account has been verified and payouts are enabled. You will receive your share of \
         every sale directly to your connected account.\n\nHappy selling!\n"
    );
    EmailMessage { from: from.to_string(), to: to.to_string(), subject: ONBOARDING_COMPLETE_SUBJECT.to_string(), text }
}

/// Sends the "onboarding complete" email when a seller's connected account is first seen fully onboarded.
///
/// Delivery is fire-and-forget: failures are logged and never reach the request that triggered them.
pub fn create_email_event_handlers(config: EmailConfig) -> Result<EventHandlers, EmailApiError> {
    let mut hooks = EventHooks::default();
    let api = EmailApi::new(config)?;
    hooks.on_seller_onboarded(move |ev| {
        let SellerOnboardedEvent { user_id, email, seller_name, .. } = ev;
        let Some(address) = email.filter(|e| !e.is_empty()) else {
            warn!("✉️ Seller {user_id} finished onboarding, but has no email address on file.");
            return no_op();
        };
        let api = api.clone();
        Box::pin(async move {
            match api.send_seller_onboarding_complete_email(&address, &seller_name).await {
                Ok(()) => info!("✉️ Onboarding complete email sent to seller {user_id}"),
                Err(e) => error!("✉️ Could not send the onboarding complete email to seller {user_id}. {e}"),
            }
        })
    });
    Ok(EventHandlers::new(EMAIL_EVENT_BUFFER_SIZE, hooks))
}

fn no_op() -> BoxFuture<'static, ()> {
    Box::pin(async {})
}
