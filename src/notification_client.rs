use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, Secret};
use std::time;

use crate::domain::{NotificationChannel, PhoneNumber};
use crate::error_chain_fmt;

const REQUEST_TIMEOUT: time::Duration = time::Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct NotificationRequest {
    pub channel: NotificationChannel,
    pub subject: String,
    pub body: String,
    pub target: String,
}

impl NotificationRequest {
    /// Subject and body joined the way they are delivered.
    pub fn message(&self) -> String {
        format!("{}\n{}", self.subject, self.body)
    }
}

#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    async fn dispatch(&self, request: &NotificationRequest) -> Result<(), NotificationError>;
}

#[derive(thiserror::Error)]
pub enum NotificationError {
    #[error("{0} notifications are not supported.")]
    UnsupportedChannel(NotificationChannel),
    #[error("Failed to deliver the notification.")]
    Delivery(#[from] reqwest::Error),
}

impl std::fmt::Debug for NotificationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

/// Sends WhatsApp messages through the Twilio Messages REST API.
pub struct TwilioClient {
    http_client: Client,
    base_url: String,
    account_sid: String,
    sender: PhoneNumber,
    auth_token: Secret<String>,
}

#[derive(serde::Serialize)]
struct CreateMessageForm {
    #[serde(rename = "To")]
    to: String,
    #[serde(rename = "From")]
    from: String,
    #[serde(rename = "Body")]
    body: String,
}

impl TwilioClient {
    pub fn new(
        base_url: String,
        account_sid: String,
        sender: PhoneNumber,
        auth_token: Secret<String>,
        timeout: Option<time::Duration>,
    ) -> Result<TwilioClient, reqwest::Error> {
        let http_client = Client::builder()
            .timeout(timeout.unwrap_or(REQUEST_TIMEOUT))
            .build()?;

        Ok(TwilioClient {
            http_client,
            base_url,
            account_sid,
            sender,
            auth_token,
        })
    }

    pub fn supports(&self, channel: NotificationChannel) -> bool {
        matches!(channel, NotificationChannel::Whatsapp)
    }

    fn whatsapp_address(phone: &str) -> String {
        format!("whatsapp:{}", phone)
    }
}

#[async_trait]
impl NotificationDispatcher for TwilioClient {
    #[tracing::instrument(
        name = "Sending a notification",
        skip(self, request),
        fields(channel = %request.channel, target = %request.target)
    )]
    async fn dispatch(&self, request: &NotificationRequest) -> Result<(), NotificationError> {
        if !self.supports(request.channel) {
            return Err(NotificationError::UnsupportedChannel(request.channel));
        }

        let url = format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.base_url, self.account_sid
        );
        let form = CreateMessageForm {
            to: Self::whatsapp_address(&request.target),
            from: Self::whatsapp_address(self.sender.as_ref()),
            body: request.message(),
        };

        self.http_client
            .post(&url)
            .basic_auth(&self.account_sid, Some(self.auth_token.expose_secret()))
            .form(&form)
            .send()
            .await?
            .error_for_status()?; // return an error when provider response status code is 4xx or 5xx

        tracing::info!("Notification delivered");

        Ok(())
    }
}
