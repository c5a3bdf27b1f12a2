use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::config::WhatsAppConfig;

/// Anything that can deliver a text message to a phone number.
#[async_trait]
pub trait MessageChannel: Send + Sync {
    /// Returns whether the message was delivered. Failures are logged, never raised.
    async fn send_message(&self, phone: &str, message: &str) -> bool;
}

/// Strips everything but digits and forces the international prefix:
/// a leading `0` becomes the country code, and a number without the
/// country code gets it prepended.
pub fn normalize_phone(raw: &str, country_code: &str) -> String {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return digits;
    }

    if let Some(local) = digits.strip_prefix('0') {
        format!("{}{}", country_code, local)
    } else if digits.starts_with(country_code) {
        digits
    } else {
        format!("{}{}", country_code, digits)
    }
}

/// Click-to-chat link used when messages are sent by hand.
pub fn click_to_chat_url(phone: &str, message: &str) -> Option<Url> {
    Url::parse_with_params(&format!("https://wa.me/{}", phone), &[("text", message)]).ok()
}

#[derive(Serialize)]
struct SendMessageRequest<'a> {
    phone: &'a str,
    message: &'a str,
}

/// WhatsApp delivery through the FlowKirim gateway, or through the log in
/// manual mode.
pub struct WhatsAppClient {
    client: Client,
    config: WhatsAppConfig,
}

impl WhatsAppClient {
    pub fn new(config: WhatsAppConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    pub fn manual_mode(&self) -> bool {
        self.config.manual_mode
    }

    async fn post_to_gateway(&self, phone: &str, message: &str) -> bool {
        let Some(api_key) = self.config.api_key.as_deref() else {
            warn!(phone, "WhatsApp gateway has no API key configured; message not sent");
            return false;
        };

        let url = format!("{}/v1/send-message", self.config.base_url.trim_end_matches('/'));
        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&SendMessageRequest { phone, message })
            .send()
            .await;

        match response {
            Ok(response) if response.status().is_success() => {
                info!(phone, status = response.status().as_u16(), "WhatsApp notification sent");
                true
            }
            Ok(response) => {
                let status = response.status().as_u16();
                let body = response.text().await.unwrap_or_default();
                error!(phone, status, body = %body, "WhatsApp gateway rejected notification");
                false
            }
            Err(err) => {
                error!(phone, error = %err, "WhatsApp gateway request failed");
                false
            }
        }
    }
}

#[async_trait]
impl MessageChannel for WhatsAppClient {
    async fn send_message(&self, phone: &str, message: &str) -> bool {
        let phone = normalize_phone(phone, &self.config.country_code);
        if phone.is_empty() {
            warn!("WhatsApp notification skipped: phone number has no digits");
            return false;
        }

        if self.config.manual_mode {
            let url = click_to_chat_url(&phone, message)
                .map(|url| url.to_string())
                .unwrap_or_default();
            info!(
                phone = %phone,
                url = %url,
                message,
                "WhatsApp notification (manual mode): send this message by hand"
            );
            return true;
        }

        self.post_to_gateway(&phone, message).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::State;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::Value;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct Gateway {
        requests: Mutex<Vec<(Option<String>, Value)>>,
    }

    async fn spawn_gateway(status: StatusCode) -> (String, Arc<Gateway>) {
        let gateway = Arc::new(Gateway::default());
        let app = Router::new()
            .route(
                "/v1/send-message",
                post(
                    move |State(gateway): State<Arc<Gateway>>,
                          headers: HeaderMap,
                          Json(body): Json<Value>| async move {
                        let auth = headers
                            .get("authorization")
                            .and_then(|v| v.to_str().ok())
                            .map(str::to_string);
                        gateway.requests.lock().unwrap().push((auth, body));
                        status
                    },
                ),
            )
            .with_state(gateway.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{}", addr), gateway)
    }

    fn config(base_url: &str, manual_mode: bool) -> WhatsAppConfig {
        WhatsAppConfig {
            api_key: Some("test-key".to_string()),
            base_url: base_url.to_string(),
            manual_mode,
            country_code: "62".to_string(),
        }
    }

    #[test]
    fn normalizes_indonesian_numbers() {
        assert_eq!(normalize_phone("081234567890", "62"), "6281234567890");
        assert_eq!(normalize_phone("81234567890", "62"), "6281234567890");
        assert_eq!(normalize_phone("6281234567890", "62"), "6281234567890");
        assert_eq!(normalize_phone("+62 812-3456-7890", "62"), "6281234567890");
        assert_eq!(normalize_phone("  ", "62"), "");
    }

    #[test]
    fn country_code_is_configurable() {
        assert_eq!(normalize_phone("0412 345 678", "61"), "61412345678");
    }

    #[test]
    fn click_to_chat_link_encodes_text() {
        let url = click_to_chat_url("6281234567890", "Halo *Siti*,\n\nOK").unwrap();
        assert_eq!(
            url.as_str(),
            "https://wa.me/6281234567890?text=Halo+*Siti*%2C%0A%0AOK"
        );
    }

    #[tokio::test]
    async fn manual_mode_succeeds_without_calling_gateway() {
        let (base_url, gateway) = spawn_gateway(StatusCode::OK).await;
        let client = WhatsAppClient::new(config(&base_url, true));

        assert!(client.send_message("081234567890", "hello").await);
        assert!(gateway.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn gateway_mode_posts_normalized_phone_with_bearer() {
        let (base_url, gateway) = spawn_gateway(StatusCode::OK).await;
        let client = WhatsAppClient::new(config(&base_url, false));

        assert!(client.send_message("0812-3456-7890", "hello").await);

        let requests = gateway.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        let (auth, body) = &requests[0];
        assert_eq!(auth.as_deref(), Some("Bearer test-key"));
        assert_eq!(body["phone"], "6281234567890");
        assert_eq!(body["message"], "hello");
    }

    #[tokio::test]
    async fn gateway_error_status_is_failure() {
        let (base_url, _gateway) = spawn_gateway(StatusCode::BAD_GATEWAY).await;
        let client = WhatsAppClient::new(config(&base_url, false));
        assert!(!client.send_message("081234567890", "hello").await);
    }

    #[tokio::test]
    async fn unreachable_gateway_is_failure() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = WhatsAppClient::new(config(&format!("http://{}", addr), false));
        assert!(!client.send_message("081234567890", "hello").await);
    }
}
