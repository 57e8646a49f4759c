//! Bulk SMS broadcasts to gallery clients.
//!
//! A broadcast creates one [`sms_message`] record, then walks the eligible
//! clients in order: render the template, send through the [`SmsGateway`],
//! record a [`sms_delivery`], pause. Gateway failures are recorded per
//! recipient and do not stop the loop.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use maws_common::{AppError, AppResult, IdGenerator, config::SmsConfig};
use maws_db::{
    entities::{
        client, gallery,
        sms_delivery::{self, DeliveryStatus},
        sms_message::{self, SmsStatus},
        user,
    },
    repositories::{ClientRepository, GalleryRepository, SmsRepository, UserRepository},
};
use sea_orm::Set;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info, warn};

use super::permission::require_staff_tier;

const MAX_MESSAGE_CHARS: usize = 1000;
const HISTORY_LIMIT: u64 = 20;
const HISTORY_PREVIEW_CHARS: usize = 50;
/// `data` key that opts a client out of messages when `false`.
const CONSENT_KEY: &str = "문자수신동의";

/// Gateway acknowledgement of one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayReceipt {
    pub message_id: String,
    pub status: String,
}

/// Outbound SMS transport.
#[async_trait]
pub trait SmsGateway: Send + Sync {
    /// Send `body` to an international-format number.
    async fn send(&self, to: &str, body: &str) -> AppResult<GatewayReceipt>;
}

/// Twilio-compatible REST gateway.
pub struct TwilioGateway {
    http_client: reqwest::Client,
    api_base: String,
    account_sid: String,
    auth_token: String,
    from_number: String,
}

impl TwilioGateway {
    /// Build from config. `None` when credentials or the sender number are
    /// missing.
    pub fn from_config(config: &SmsConfig) -> AppResult<Option<Self>> {
        let Some(from_number) = config.from_number.clone().filter(|_| config.is_configured()) else {
            return Ok(None);
        };
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| AppError::Config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Some(Self {
            http_client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            account_sid: config.account_sid.clone(),
            auth_token: config.auth_token.clone(),
            from_number,
        }))
    }
}

#[async_trait]
impl SmsGateway for TwilioGateway {
    async fn send(&self, to: &str, body: &str) -> AppResult<GatewayReceipt> {
        #[derive(Deserialize)]
        struct MessageResource {
            sid: String,
            status: String,
        }

        let url = format!("{}/Accounts/{}/Messages.json", self.api_base, self.account_sid);
        let params = [("To", to), ("From", self.from_number.as_str()), ("Body", body)];

        let response = self
            .http_client
            .post(&url)
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&params)
            .send()
            .await
            .map_err(|e| AppError::ExternalService(format!("SMS request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ExternalService(format!(
                "SMS gateway error: {status} - {body}"
            )));
        }

        let resource: MessageResource = response.json().await.map_err(|e| {
            AppError::ExternalService(format!("Failed to parse SMS gateway response: {e}"))
        })?;

        Ok(GatewayReceipt {
            message_id: resource.sid,
            status: resource.status,
        })
    }
}

/// International format for a phone number. Domestic Korean numbers
/// (`0…`) get `+82` in place of the leading zero; everything else is
/// prefixed with `+` as is.
pub fn format_phone_number(phone: &str) -> AppResult<String> {
    let digits: String = phone.chars().filter(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return Err(AppError::Validation("전화번호가 비어있습니다.".to_string()));
    }
    Ok(match digits.strip_prefix('0') {
        Some(rest) => format!("+82{rest}"),
        None => format!("+{digits}"),
    })
}

/// Client name used in templates.
fn client_name(client: &client::Model) -> Option<String> {
    client
        .name
        .clone()
        .filter(|n| !n.trim().is_empty())
        .or_else(|| {
            client
                .data
                .get("고객명")
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .map(str::to_string)
        })
}

/// Substitute the known `{{…}}` tokens. Unknown tokens stay as written.
#[must_use]
pub fn render_template(template: &str, client: &client::Model, gallery: &gallery::Model) -> String {
    let name = client_name(client).unwrap_or_else(|| "고객".to_string());
    let gallery_name = if gallery.name.is_empty() { "갤러리" } else { &gallery.name };

    template
        .replace("{{고객명}}", &name)
        .replace("{{갤러리명}}", gallery_name)
        .replace("{{갤러리_연락처}}", gallery.phone.as_deref().unwrap_or(""))
        .replace("{{갤러리_주소}}", gallery.address.as_deref().unwrap_or(""))
}

/// Whether a client can receive a broadcast.
fn is_eligible(client: &client::Model) -> bool {
    let has_phone = client.phone.as_deref().is_some_and(|p| !p.trim().is_empty());
    let opted_out = client.data.get(CONSENT_KEY) == Some(&Value::Bool(false));
    has_phone && !opted_out
}

fn preview(template: &str) -> String {
    if template.chars().count() > HISTORY_PREVIEW_CHARS {
        let head: String = template.chars().take(HISTORY_PREVIEW_CHARS).collect();
        format!("{head}...")
    } else {
        template.to_string()
    }
}

/// Broadcast request: a message template and the clients to receive it.
#[derive(Debug, Clone, Deserialize)]
pub struct SendSmsInput {
    #[serde(default)]
    pub client_ids: Vec<String>,
    #[serde(default)]
    pub message: String,
}

/// Per-recipient outcome.
#[derive(Debug, Clone, Serialize)]
pub struct RecipientResult {
    pub client_id: String,
    pub client_name: Option<String>,
    pub phone: String,
    pub success: bool,
    pub provider_message_id: Option<String>,
    pub error: Option<String>,
}

/// Outcome of a broadcast.
#[derive(Debug, Clone, Serialize)]
pub struct BulkSendResult {
    pub message_id: String,
    /// Number of eligible recipients.
    pub total_count: usize,
    pub sent_count: usize,
    pub failed_count: usize,
    pub results: Vec<RecipientResult>,
}

/// One row of the broadcast history, template shortened.
#[derive(Debug, Clone, Serialize)]
pub struct HistoryEntry {
    pub id: String,
    pub message_template: String,
    pub recipients_count: i32,
    pub sent_count: i32,
    pub failed_count: i32,
    pub status: &'static str,
    pub created_at: String,
    pub sender: Option<String>,
}

/// Header of a broadcast detail. Carries the full template.
#[derive(Debug, Clone, Serialize)]
pub struct MessageInfo {
    pub id: String,
    pub message_template: String,
    pub recipients_count: i32,
    pub sent_count: i32,
    pub failed_count: i32,
    pub status: &'static str,
    pub created_at: String,
    pub sender: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeliveryEntry {
    /// `None` when the client has no name.
    pub client_name: Option<String>,
    pub phone_number: String,
    pub status: &'static str,
    pub provider_status: Option<String>,
    pub sent_at: Option<String>,
    pub error_message: Option<String>,
}

/// A broadcast with its per-recipient deliveries.
#[derive(Debug, Clone, Serialize)]
pub struct MessageDetail {
    pub message_info: MessageInfo,
    pub deliveries: Vec<DeliveryEntry>,
}

/// SMS service.
#[derive(Clone)]
pub struct SmsService {
    sms_repo: SmsRepository,
    client_repo: ClientRepository,
    gallery_repo: GalleryRepository,
    user_repo: UserRepository,
    gateway: Option<Arc<dyn SmsGateway>>,
    send_delay: Duration,
    id_gen: IdGenerator,
}

impl SmsService {
    /// Create a new SMS service. The gateway is built from `config` when it
    /// carries credentials.
    pub fn new(
        sms_repo: SmsRepository,
        client_repo: ClientRepository,
        gallery_repo: GalleryRepository,
        user_repo: UserRepository,
        config: &SmsConfig,
    ) -> AppResult<Self> {
        let gateway = TwilioGateway::from_config(config)?
            .map(|g| Arc::new(g) as Arc<dyn SmsGateway>);
        if gateway.is_none() {
            warn!("SMS gateway not configured, sending is disabled");
        }

        Ok(Self {
            sms_repo,
            client_repo,
            gallery_repo,
            user_repo,
            gateway,
            send_delay: Duration::from_millis(config.send_delay_ms),
            id_gen: IdGenerator::new(),
        })
    }

    /// Replace the gateway.
    #[must_use]
    pub fn with_gateway(mut self, gateway: Arc<dyn SmsGateway>) -> Self {
        self.gateway = Some(gateway);
        self
    }

    /// Replace the pause between sends.
    #[must_use]
    pub const fn with_send_delay(mut self, delay: Duration) -> Self {
        self.send_delay = delay;
        self
    }

    fn validate(sender: &user::Model, input: &SendSmsInput) -> AppResult<String> {
        if input.client_ids.is_empty() {
            return Err(AppError::BadRequest("발송 대상 고객을 선택해주세요.".to_string()));
        }
        let message = input.message.trim();
        if message.is_empty() {
            return Err(AppError::BadRequest("메시지 내용을 입력해주세요.".to_string()));
        }
        if message.chars().count() > MAX_MESSAGE_CHARS {
            return Err(AppError::BadRequest(
                "메시지는 1000자를 초과할 수 없습니다.".to_string(),
            ));
        }
        if sender.gallery_id.is_none() {
            return Err(AppError::BadRequest(
                "갤러리 정보가 없습니다. 관리자에게 문의하세요.".to_string(),
            ));
        }
        require_staff_tier(sender)?;
        Ok(message.to_string())
    }

    /// Send `input.message` to the requested clients of the sender's gallery.
    pub async fn send_bulk(&self, sender: &user::Model, input: SendSmsInput) -> AppResult<BulkSendResult> {
        let template = Self::validate(sender, &input)?;
        let gateway = self
            .gateway
            .clone()
            .ok_or_else(|| AppError::Config("SMS gateway is not configured".to_string()))?;
        let gallery_id = sender.gallery_id.as_deref().unwrap_or_default();
        let gallery = self.gallery_repo.get_by_id(gallery_id).await?;

        let requested = i32::try_from(input.client_ids.len()).unwrap_or(i32::MAX);
        let message = self
            .sms_repo
            .create_message(sms_message::ActiveModel {
                id: Set(self.id_gen.generate()),
                gallery_id: Set(gallery.id.clone()),
                sender_id: Set(Some(sender.id.clone())),
                message_template: Set(template.clone()),
                total_recipients: Set(requested),
                sent_count: Set(0),
                failed_count: Set(0),
                status: Set(SmsStatus::Sending),
                created_at: Set(Utc::now().into()),
                completed_at: Set(None),
            })
            .await?;

        let outcome = self
            .deliver_all(gateway.as_ref(), &message, &gallery, &template, &input.client_ids)
            .await;
        match outcome {
            Ok(result) => {
                let mut active: sms_message::ActiveModel = message.into();
                active.sent_count = Set(i32::try_from(result.sent_count).unwrap_or(i32::MAX));
                active.failed_count = Set(i32::try_from(result.failed_count).unwrap_or(i32::MAX));
                active.status = Set(SmsStatus::Completed);
                active.completed_at = Set(Some(Utc::now().into()));
                self.sms_repo.update_message(active).await?;

                info!(
                    message_id = %result.message_id,
                    gallery_id = %gallery.id,
                    total = result.total_count,
                    sent = result.sent_count,
                    failed = result.failed_count,
                    "SMS broadcast completed"
                );
                Ok(result)
            }
            Err(e) => {
                error!(message_id = %message.id, error = %e, "SMS broadcast aborted");
                let message_id = message.id.clone();
                let mut active: sms_message::ActiveModel = message.into();
                active.sent_count = Set(0);
                active.failed_count = Set(requested);
                active.status = Set(SmsStatus::Failed);
                active.completed_at = Set(Some(Utc::now().into()));
                self.sms_repo.update_message(active).await?;
                Err(AppError::Internal(format!(
                    "SMS broadcast {message_id} aborted, {requested} recipients marked failed: {e}"
                )))
            }
        }
    }

    async fn deliver_all(
        &self,
        gateway: &dyn SmsGateway,
        message: &sms_message::Model,
        gallery: &gallery::Model,
        template: &str,
        client_ids: &[String],
    ) -> AppResult<BulkSendResult> {
        let mut eligible: Vec<client::Model> = self
            .client_repo
            .find_by_ids_in_gallery(&gallery.id, client_ids)
            .await?
            .into_iter()
            .filter(is_eligible)
            .collect();
        // Send in the order the ids were requested.
        let position: HashMap<&str, usize> = client_ids
            .iter()
            .enumerate()
            .rev()
            .map(|(i, id)| (id.as_str(), i))
            .collect();
        eligible.sort_by_key(|c| position.get(c.id.as_str()).copied().unwrap_or(usize::MAX));

        let mut results = Vec::with_capacity(eligible.len());
        for (i, client) in eligible.iter().enumerate() {
            if i > 0 && !self.send_delay.is_zero() {
                tokio::time::sleep(self.send_delay).await;
            }
            results.push(self.deliver_one(gateway, message, gallery, template, client).await?);
        }

        let sent_count = results.iter().filter(|r| r.success).count();
        Ok(BulkSendResult {
            message_id: message.id.clone(),
            total_count: eligible.len(),
            sent_count,
            failed_count: results.len() - sent_count,
            results,
        })
    }

    async fn deliver_one(
        &self,
        gateway: &dyn SmsGateway,
        message: &sms_message::Model,
        gallery: &gallery::Model,
        template: &str,
        client: &client::Model,
    ) -> AppResult<RecipientResult> {
        let raw_phone = client.phone.clone().unwrap_or_default();
        let rendered = render_template(template, client, gallery);
        let formatted = format_phone_number(&raw_phone);

        let delivery = self
            .sms_repo
            .create_delivery(sms_delivery::ActiveModel {
                id: Set(self.id_gen.generate()),
                message_id: Set(message.id.clone()),
                client_id: Set(client.id.clone()),
                phone_number: Set(formatted.as_ref().map_or_else(|_| raw_phone.clone(), Clone::clone)),
                rendered_message: Set(rendered.clone()),
                status: Set(DeliveryStatus::Pending),
                provider_message_id: Set(None),
                provider_status: Set(None),
                error_message: Set(None),
                sent_at: Set(None),
                delivered_at: Set(None),
                created_at: Set(Utc::now().into()),
            })
            .await?;

        let outcome = match formatted {
            Ok(to) => gateway.send(&to, &rendered).await,
            Err(e) => Err(e),
        };

        let mut active: sms_delivery::ActiveModel = delivery.into();
        let result = match outcome {
            Ok(receipt) => {
                active.status = Set(DeliveryStatus::from_provider(&receipt.status));
                active.provider_message_id = Set(Some(receipt.message_id.clone()));
                active.provider_status = Set(Some(receipt.status));
                active.sent_at = Set(Some(Utc::now().into()));
                RecipientResult {
                    client_id: client.id.clone(),
                    client_name: client_name(client),
                    phone: raw_phone,
                    success: true,
                    provider_message_id: Some(receipt.message_id),
                    error: None,
                }
            }
            Err(e) => {
                warn!(client_id = %client.id, error = %e, "SMS delivery failed");
                active.status = Set(DeliveryStatus::Failed);
                active.provider_status = Set(Some("failed".to_string()));
                active.error_message = Set(Some(e.to_string()));
                RecipientResult {
                    client_id: client.id.clone(),
                    client_name: client_name(client),
                    phone: raw_phone,
                    success: false,
                    provider_message_id: None,
                    error: Some(e.to_string()),
                }
            }
        };
        self.sms_repo.update_delivery(active).await?;
        Ok(result)
    }

    /// Usernames for sender ids, looked up once each.
    async fn sender_names(
        &self,
        messages: &[sms_message::Model],
    ) -> AppResult<HashMap<String, String>> {
        let mut names = HashMap::new();
        for id in messages.iter().filter_map(|m| m.sender_id.as_deref()) {
            if names.contains_key(id) {
                continue;
            }
            if let Some(user) = self.user_repo.find_by_id(id).await? {
                names.insert(id.to_string(), user.username);
            }
        }
        Ok(names)
    }

    /// Latest broadcasts of the gallery.
    pub async fn history(&self, gallery_id: &str) -> AppResult<Vec<HistoryEntry>> {
        let messages = self
            .sms_repo
            .find_recent_by_gallery(gallery_id, HISTORY_LIMIT)
            .await?;
        let names = self.sender_names(&messages).await?;

        Ok(messages
            .into_iter()
            .map(|m| HistoryEntry {
                sender: m.sender_id.as_ref().and_then(|id| names.get(id).cloned()),
                message_template: preview(&m.message_template),
                recipients_count: m.total_recipients,
                sent_count: m.sent_count,
                failed_count: m.failed_count,
                status: m.status.display_name(),
                created_at: m.created_at.format("%Y-%m-%d %H:%M").to_string(),
                id: m.id,
            })
            .collect())
    }

    /// One broadcast with its deliveries, newest first.
    pub async fn detail(&self, gallery_id: &str, message_id: &str) -> AppResult<MessageDetail> {
        let message = self
            .sms_repo
            .get_message_in_gallery(gallery_id, message_id)
            .await?;
        let deliveries = self.sms_repo.find_deliveries(&message.id).await?;

        let client_ids: Vec<String> = deliveries.iter().map(|d| d.client_id.clone()).collect();
        let clients: HashMap<String, client::Model> = self
            .client_repo
            .find_by_ids_in_gallery(gallery_id, &client_ids)
            .await?
            .into_iter()
            .map(|c| (c.id.clone(), c))
            .collect();
        let names = self.sender_names(std::slice::from_ref(&message)).await?;

        let deliveries = deliveries
            .into_iter()
            .map(|d| DeliveryEntry {
                client_name: clients.get(&d.client_id).and_then(client_name),
                phone_number: d.phone_number,
                status: d.status.display_name(),
                provider_status: d.provider_status,
                sent_at: d.sent_at.map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string()),
                error_message: d.error_message,
            })
            .collect();

        Ok(MessageDetail {
            message_info: MessageInfo {
                sender: message.sender_id.as_ref().and_then(|id| names.get(id).cloned()),
                id: message.id,
                message_template: message.message_template,
                recipients_count: message.total_recipients,
                sent_count: message.sent_count,
                failed_count: message.failed_count,
                status: message.status.display_name(),
                created_at: message.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            },
            deliveries,
        })
    }
}
