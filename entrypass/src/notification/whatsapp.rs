//! WhatsApp delivery through the Twilio messages API.

use super::{
    NotificationError, NotificationGateway, NotificationResult, TicketContext,
    normalize_phone_number, share_message, ticket_message,
};
use crate::config::NotificationConfig;
use crate::types::EventSummary;
use reqwest::Client;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

#[derive(Clone)]
struct Credentials {
    account_sid: String,
    auth_token: String,
    sender_number: String,
}

/// Twilio-backed WhatsApp gateway.
///
/// Built from [`NotificationConfig`] at startup. Without credentials the
/// gateway still constructs, but every delivery fails with
/// [`NotificationError::NotConfigured`].
#[derive(Clone)]
pub struct WhatsAppGateway {
    client: Client,
    credentials: Option<Credentials>,
    api_base_url: String,
    country_code: String,
    currency: String,
    timeout: Duration,
}

impl WhatsAppGateway {
    /// Create a gateway from configuration
    #[must_use]
    pub fn new(config: &NotificationConfig) -> Self {
        let credentials = match (&config.account_sid, &config.auth_token, &config.sender_number) {
            (Some(account_sid), Some(auth_token), Some(sender_number)) => Some(Credentials {
                account_sid: account_sid.clone(),
                auth_token: auth_token.clone(),
                sender_number: sender_number.clone(),
            }),
            _ => {
                tracing::warn!("Twilio credentials not configured, WhatsApp delivery is disabled");
                None
            }
        };

        Self {
            client: Client::new(),
            credentials,
            api_base_url: config.api_base_url.trim_end_matches('/').to_string(),
            country_code: config.default_country_code.clone(),
            currency: config.currency_label.clone(),
            timeout: config.timeout(),
        }
    }

    /// Returns `true` if deliveries can be attempted
    #[must_use]
    pub const fn is_configured(&self) -> bool {
        self.credentials.is_some()
    }

    async fn send_message(
        &self,
        destination: &str,
        body: String,
        media_url: Option<&str>,
    ) -> NotificationResult<()> {
        let credentials = self
            .credentials
            .as_ref()
            .ok_or(NotificationError::NotConfigured)?;

        let to = normalize_phone_number(destination, &self.country_code);
        let mut form = vec![
            ("From", format!("whatsapp:{}", credentials.sender_number)),
            ("To", format!("whatsapp:{to}")),
            ("Body", body),
        ];
        if let Some(media_url) = media_url {
            form.push(("MediaUrl", media_url.to_string()));
        }

        let response = self
            .client
            .post(format!(
                "{}/Accounts/{}/Messages.json",
                self.api_base_url, credentials.account_sid
            ))
            .basic_auth(&credentials.account_sid, Some(&credentials.auth_token))
            .timeout(self.timeout)
            .form(&form)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    NotificationError::Timeout(self.timeout)
                } else {
                    NotificationError::Unavailable(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(NotificationError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        tracing::info!(to = %to, "WhatsApp message delivered");
        Ok(())
    }
}

impl NotificationGateway for WhatsAppGateway {
    fn send_ticket<'a>(
        &'a self,
        destination: &'a str,
        artifact: &'a str,
        context: &'a TicketContext,
    ) -> Pin<Box<dyn Future<Output = NotificationResult<()>> + Send + 'a>> {
        Box::pin(async move {
            let body = ticket_message(context, &self.currency);
            self.send_message(destination, body, Some(artifact)).await
        })
    }

    fn share_event<'a>(
        &'a self,
        destination: &'a str,
        summary: &'a EventSummary,
        image_url: Option<&'a str>,
    ) -> Pin<Box<dyn Future<Output = NotificationResult<()>> + Send + 'a>> {
        Box::pin(async move {
            let body = format!(
                "{}\n\nBook now: {}",
                share_message(summary, &self.currency),
                summary.url
            );
            self.send_message(destination, body, image_url).await
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Money;

    fn context() -> TicketContext {
        TicketContext {
            event_name: "Jazz Night".to_string(),
            event_date: "31/12/2026 20:00:00".to_string(),
            places: 2,
            amount: Money::new(4000),
            recipient_name: "Awa Kone".to_string(),
        }
    }

    #[tokio::test]
    async fn test_unconfigured_gateway_reports_not_configured() {
        let gateway = WhatsAppGateway::new(&NotificationConfig::default());
        assert!(!gateway.is_configured());

        let result = gateway
            .send_ticket("0712345678", "data:image/png;base64,AAAA", &context())
            .await;
        assert_eq!(result, Err(NotificationError::NotConfigured));
    }

    #[tokio::test]
    async fn test_unreachable_provider_is_unavailable() {
        let config = NotificationConfig {
            account_sid: Some("AC123".to_string()),
            auth_token: Some("secret".to_string()),
            sender_number: Some("+14155238886".to_string()),
            // Reserved port, nothing listens there
            api_base_url: "http://127.0.0.1:9".to_string(),
            timeout_secs: 2,
            ..NotificationConfig::default()
        };
        let gateway = WhatsAppGateway::new(&config);
        assert!(gateway.is_configured());

        let result = gateway
            .send_ticket("0712345678", "data:image/png;base64,AAAA", &context())
            .await;
        assert!(matches!(
            result,
            Err(NotificationError::Unavailable(_) | NotificationError::Timeout(_))
        ));
    }
}
