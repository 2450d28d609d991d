//! Twilio Conversations transport: conversation discovery, outbound sends,
//! newest-first message listing and media downloads, plus the fixed-interval
//! poll loop that drives the dispatcher.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, info, warn};
use reqwest::Client;
use serde::Deserialize;

use crate::config::{PollConfig, TwilioConfig};
use crate::dispatch::DispatchController;
use crate::error::BotError;
use crate::model::{Author, InboundMessage, MediaRef};

const CONVERSATIONS_BASE_URL: &str = "https://conversations.twilio.com/v1";
const MEDIA_BASE_URL: &str = "https://mcs.us1.twilio.com/v1";
const CONVERSATION_FRIENDLY_NAME: &str = "NutriScan WhatsApp Conversation";

/// Outbound side of the transport, as seen by the dispatcher: deliver one
/// text, or resolve a media reference into a local file.
#[async_trait]
pub trait MessageSender: Send + Sync {
    /// Send one text to the active conversation. `Ok(false)` means the
    /// transport rejected the message; the caller logs and moves on.
    async fn send(&self, body: &str) -> Result<bool, BotError>;

    /// Download a media attachment into the image directory and return the
    /// local path, or `None` when the download fails.
    async fn fetch_media(&self, media: &MediaRef) -> Result<Option<PathBuf>, BotError>;
}

pub struct TwilioTransport {
    client: Client,
    api_key_sid: String,
    api_key_secret: String,
    service_sid: String,
    user_whatsapp: String,
    twilio_whatsapp: String,
    base_url: String,
    media_base_url: String,
    img_dir: PathBuf,
    conversation_sid: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ConversationPage {
    #[serde(default)]
    conversations: Vec<ConversationResource>,
}

#[derive(Debug, Deserialize)]
struct ConversationResource {
    sid: String,
    friendly_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ParticipantPage {
    #[serde(default)]
    participants: Vec<ParticipantResource>,
}

#[derive(Debug, Deserialize)]
struct ParticipantResource {
    messaging_binding: Option<MessagingBinding>,
}

#[derive(Debug, Deserialize)]
struct MessagingBinding {
    address: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MessagePage {
    #[serde(default)]
    messages: Vec<MessageResource>,
}

#[derive(Debug, Deserialize)]
struct MessageResource {
    sid: String,
    author: Option<String>,
    body: Option<String>,
    media: Option<Vec<MediaResource>>,
}

#[derive(Debug, Deserialize)]
struct MediaResource {
    sid: String,
    content_type: Option<String>,
}

impl MessageResource {
    fn into_inbound(self) -> InboundMessage {
        // Messages the bot itself created through the API carry the
        // default "system" author.
        let author = match self.author.as_deref() {
            Some("system") => Author::System,
            _ => Author::User,
        };

        InboundMessage {
            sid: self.sid,
            author,
            body: self.body,
            media: self
                .media
                .unwrap_or_default()
                .into_iter()
                .map(|m| MediaRef {
                    sid: m.sid,
                    content_type: m.content_type.unwrap_or_else(|| "unknown".to_string()),
                })
                .collect(),
        }
    }
}

impl TwilioTransport {
    pub fn new(config: &TwilioConfig, img_dir: impl AsRef<Path>) -> Result<Self, BotError> {
        let img_dir = img_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&img_dir)?;

        Ok(TwilioTransport {
            client: Client::new(),
            api_key_sid: config.api_key_sid.clone(),
            api_key_secret: config.api_key_secret.clone(),
            service_sid: config.conversation_service_sid.clone(),
            user_whatsapp: config.user_whatsapp.clone(),
            twilio_whatsapp: config.twilio_whatsapp.clone(),
            base_url: config
                .base_url
                .clone()
                .unwrap_or_else(|| CONVERSATIONS_BASE_URL.to_string()),
            media_base_url: config
                .media_base_url
                .clone()
                .unwrap_or_else(|| MEDIA_BASE_URL.to_string()),
            img_dir,
            conversation_sid: None,
        })
    }

    fn conversations_url(&self) -> String {
        format!(
            "{}/Services/{}/Conversations",
            self.base_url, self.service_sid
        )
    }

    fn conversation_sid(&self) -> Result<&str, BotError> {
        self.conversation_sid.as_deref().ok_or_else(|| {
            BotError::Transport("no conversation available; call setup_conversation first".into())
        })
    }

    /// Find the conversation whose participant binding matches the
    /// configured user address, or create one and add the participant.
    pub async fn setup_conversation(&mut self) -> Result<(), BotError> {
        let response = self
            .client
            .get(self.conversations_url())
            .basic_auth(&self.api_key_sid, Some(&self.api_key_secret))
            .query(&[("PageSize", "50")])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(BotError::Transport(format!(
                "listing conversations failed with status {}",
                response.status()
            )));
        }

        let page: ConversationPage = response.json().await?;
        for conversation in &page.conversations {
            debug!(
                "found conversation {} ({})",
                conversation.sid,
                conversation.friendly_name.as_deref().unwrap_or("unnamed")
            );
            if self.has_user_participant(&conversation.sid).await? {
                info!("using existing conversation {}", conversation.sid);
                self.conversation_sid = Some(conversation.sid.clone());
                return Ok(());
            }
        }

        self.create_conversation().await
    }

    async fn has_user_participant(&self, conversation_sid: &str) -> Result<bool, BotError> {
        let response = self
            .client
            .get(format!(
                "{}/{}/Participants",
                self.conversations_url(),
                conversation_sid
            ))
            .basic_auth(&self.api_key_sid, Some(&self.api_key_secret))
            .send()
            .await?;

        if !response.status().is_success() {
            warn!(
                "listing participants for {conversation_sid} failed with status {}",
                response.status()
            );
            return Ok(false);
        }

        let page: ParticipantPage = response.json().await?;
        Ok(page.participants.iter().any(|p| {
            p.messaging_binding
                .as_ref()
                .and_then(|b| b.address.as_deref())
                == Some(self.user_whatsapp.as_str())
        }))
    }

    async fn create_conversation(&mut self) -> Result<(), BotError> {
        info!("no existing conversation found; creating a new one");
        let response = self
            .client
            .post(self.conversations_url())
            .basic_auth(&self.api_key_sid, Some(&self.api_key_secret))
            .form(&[("FriendlyName", CONVERSATION_FRIENDLY_NAME)])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(BotError::Transport(format!(
                "creating conversation failed with status {}",
                response.status()
            )));
        }

        let conversation: ConversationResource = response.json().await?;
        info!("created conversation {}", conversation.sid);

        // A WhatsApp number can only be bound to one conversation per
        // service; a conflict here usually means the user is already a
        // participant elsewhere and is not fatal.
        let response = self
            .client
            .post(format!(
                "{}/{}/Participants",
                self.conversations_url(),
                conversation.sid
            ))
            .basic_auth(&self.api_key_sid, Some(&self.api_key_secret))
            .form(&[
                ("MessagingBinding.Address", self.user_whatsapp.as_str()),
                ("MessagingBinding.ProxyAddress", self.twilio_whatsapp.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            warn!(
                "adding participant failed with status {}; the user may already \
                 be bound to another conversation",
                response.status()
            );
        }

        self.conversation_sid = Some(conversation.sid);
        Ok(())
    }

    /// Fetch up to `limit` messages, newest first, in transport order.
    pub async fn list_recent_messages(&self, limit: u32) -> Result<Vec<InboundMessage>, BotError> {
        let conversation_sid = self.conversation_sid()?;
        let response = self
            .client
            .get(format!(
                "{}/{}/Messages",
                self.conversations_url(),
                conversation_sid
            ))
            .basic_auth(&self.api_key_sid, Some(&self.api_key_secret))
            .query(&[("Order", "desc"), ("PageSize", limit.to_string().as_str())])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(BotError::Transport(format!(
                "listing messages failed with status {}",
                response.status()
            )));
        }

        let page: MessagePage = response.json().await?;
        Ok(page
            .messages
            .into_iter()
            .map(MessageResource::into_inbound)
            .collect())
    }
}

#[async_trait]
impl MessageSender for TwilioTransport {
    async fn send(&self, body: &str) -> Result<bool, BotError> {
        let conversation_sid = self.conversation_sid()?;
        let response = self
            .client
            .post(format!(
                "{}/{}/Messages",
                self.conversations_url(),
                conversation_sid
            ))
            .basic_auth(&self.api_key_sid, Some(&self.api_key_secret))
            .form(&[("Body", body)])
            .send()
            .await?;

        if response.status().is_success() {
            debug!("message sent to conversation {conversation_sid}");
            Ok(true)
        } else {
            warn!("sending message failed with status {}", response.status());
            Ok(false)
        }
    }

    async fn fetch_media(&self, media: &MediaRef) -> Result<Option<PathBuf>, BotError> {
        let extension = match media.content_type.rsplit('/').next() {
            Some("jpeg") => "jpg",
            Some(ext) if !ext.is_empty() => ext,
            _ => "bin",
        };
        let path = self.img_dir.join(format!("media_{}.{}", media.sid, extension));

        // Repeated polls may hand the same attachment over more than once.
        if path.exists() {
            debug!("media already downloaded: {}", path.display());
            return Ok(Some(path));
        }

        let response = self
            .client
            .get(format!(
                "{}/Services/{}/Media/{}/Content",
                self.media_base_url, self.service_sid, media.sid
            ))
            .basic_auth(&self.api_key_sid, Some(&self.api_key_secret))
            .header("Accept", media.content_type.as_str())
            .send()
            .await?;

        if !response.status().is_success() {
            warn!(
                "media download for {} failed with status {}",
                media.sid,
                response.status()
            );
            return Ok(None);
        }

        let bytes = response.bytes().await?;
        tokio::fs::write(&path, &bytes).await?;
        info!("media saved to {} ({} bytes)", path.display(), bytes.len());
        Ok(Some(path))
    }
}

/// Drive the dispatcher from the transport: one backlog replay pass with
/// media downloads disabled, then fixed-interval polling of the bounded
/// message window. Poll failures are logged and retried on the next tick.
pub async fn run(
    transport: &TwilioTransport,
    controller: &mut DispatchController,
    poll: &PollConfig,
) -> Result<(), BotError> {
    let mut seen: HashSet<String> = HashSet::new();

    info!("processing message backlog (media downloads disabled)");
    let backlog = transport.list_recent_messages(poll.window).await?;
    for message in &backlog {
        if seen.insert(message.sid.clone()) {
            controller.handle_message(message).await;
        }
    }
    controller.complete_backlog();
    info!("acknowledged {} backlog message(s)", backlog.len());

    info!(
        "polling for new messages every {}s (window of {})",
        poll.interval_secs, poll.window
    );
    let mut ticker = tokio::time::interval(Duration::from_secs(poll.interval_secs));
    loop {
        ticker.tick().await;
        match transport.list_recent_messages(poll.window).await {
            Ok(messages) => {
                for message in &messages {
                    if seen.insert(message.sid.clone()) {
                        controller.handle_message(message).await;
                    }
                }
            }
            Err(e) => warn!("message poll failed: {e}"),
        }
    }
}
