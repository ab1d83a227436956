//! Discord REST client implementing the `ChatGateway` operations.

use async_trait::async_trait;
use reqwest::{Method, StatusCode, Url};
use serde::de::DeserializeOwned;
use tracing::debug;

use bento_core::ports::{ChannelId, ChatGateway, ChatMessage, GatewayError, MessageId, UserId};

use super::model::{
    AllowedMentions, ChannelRef, CreateDm, CreateMessage, Message, MessageRef, MessageReference,
};

pub const API_BASE_URL: &str = "https://discord.com/api/v10/";
const USER_AGENT: &str = concat!(
    "DiscordBot (",
    env!("CARGO_PKG_NAME"),
    ", ",
    env!("CARGO_PKG_VERSION"),
    ")"
);

pub struct DiscordRest {
    http: reqwest::Client,
    base: Url,
    authorization: String,
}

impl DiscordRest {
    pub fn new(http: reqwest::Client, token: &str) -> Result<Self, GatewayError> {
        Self::with_base(http, token, API_BASE_URL)
    }

    pub fn with_base(http: reqwest::Client, token: &str, base: &str) -> Result<Self, GatewayError> {
        let base = Url::parse(base).map_err(|err| GatewayError::Transport(err.to_string()))?;
        Ok(Self {
            http,
            base,
            authorization: format!("Bot {token}"),
        })
    }

    /// Base URL plus `segments`, each percent-encoded on its own.
    pub fn endpoint(&self, segments: &[&str]) -> Result<Url, GatewayError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|()| {
                GatewayError::Transport(format!("base url cannot hold a path: {}", self.base))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> reqwest::RequestBuilder {
        self.http
            .request(method, url)
            .header(reqwest::header::AUTHORIZATION, &self.authorization)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
    }

    async fn send(&self, builder: reqwest::RequestBuilder) -> Result<reqwest::Response, GatewayError> {
        let response = builder
            .send()
            .await
            .map_err(|err| GatewayError::Transport(err.to_string()))?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(GatewayError::Status {
            status: status.as_u16(),
            body,
        })
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        builder: reqwest::RequestBuilder,
    ) -> Result<T, GatewayError> {
        self.send(builder)
            .await?
            .json()
            .await
            .map_err(|err| GatewayError::Decode(err.to_string()))
    }

    async fn post_message(
        &self,
        channel: &str,
        body: &CreateMessage<'_>,
    ) -> Result<MessageId, GatewayError> {
        let url = self.endpoint(&["channels", channel, "messages"])?;
        let created: MessageRef = self
            .send_json(self.request(Method::POST, url).json(body))
            .await?;
        Ok(MessageId::new(created.id))
    }
}

#[async_trait]
impl ChatGateway for DiscordRest {
    async fn add_reaction(
        &self,
        channel: &ChannelId,
        message: &MessageId,
        symbol: &str,
    ) -> Result<(), GatewayError> {
        let url = self.endpoint(&[
            "channels",
            channel.as_str(),
            "messages",
            message.as_str(),
            "reactions",
            symbol,
            "@me",
        ])?;
        self.send(self.request(Method::PUT, url)).await?;
        debug!(message_id = %message, %symbol, "reaction added");
        Ok(())
    }

    async fn remove_reaction(
        &self,
        channel: &ChannelId,
        message: &MessageId,
        symbol: &str,
        user: &UserId,
    ) -> Result<(), GatewayError> {
        let url = self.endpoint(&[
            "channels",
            channel.as_str(),
            "messages",
            message.as_str(),
            "reactions",
            symbol,
            user.as_str(),
        ])?;
        self.send(self.request(Method::DELETE, url)).await?;
        debug!(message_id = %message, %symbol, user_id = %user, "reaction removed");
        Ok(())
    }

    async fn fetch_latest_message(
        &self,
        channel: &ChannelId,
    ) -> Result<Option<ChatMessage>, GatewayError> {
        let mut url = self.endpoint(&["channels", channel.as_str(), "messages"])?;
        url.query_pairs_mut().append_pair("limit", "1");
        let messages: Vec<Message> = self.send_json(self.request(Method::GET, url)).await?;
        Ok(messages.into_iter().next().map(ChatMessage::from))
    }

    async fn fetch_message(
        &self,
        channel: &ChannelId,
        message: &MessageId,
    ) -> Result<ChatMessage, GatewayError> {
        let url = self.endpoint(&["channels", channel.as_str(), "messages", message.as_str()])?;
        match self
            .send_json::<Message>(self.request(Method::GET, url))
            .await
        {
            Ok(found) => Ok(found.into()),
            Err(GatewayError::Status { status, .. }) if status == StatusCode::NOT_FOUND.as_u16() => {
                Err(GatewayError::NotFound(message.clone()))
            }
            Err(err) => Err(err),
        }
    }

    async fn send_direct_message(&self, user: &UserId, text: &str) -> Result<(), GatewayError> {
        let url = self.endpoint(&["users", "@me", "channels"])?;
        let dm: ChannelRef = self
            .send_json(self.request(Method::POST, url).json(&CreateDm {
                recipient_id: user.as_str(),
            }))
            .await?;
        let body = CreateMessage {
            content: text,
            message_reference: None,
            allowed_mentions: AllowedMentions::default(),
        };
        self.post_message(&dm.id, &body).await?;
        debug!(user_id = %user, "direct message sent");
        Ok(())
    }

    async fn reply(
        &self,
        channel: &ChannelId,
        message: &MessageId,
        text: &str,
        mention: Option<&UserId>,
    ) -> Result<MessageId, GatewayError> {
        let body = CreateMessage {
            content: text,
            message_reference: Some(MessageReference {
                message_id: message.as_str(),
                fail_if_not_exists: false,
            }),
            allowed_mentions: AllowedMentions {
                users: mention.map(|user| vec![user.to_string()]).unwrap_or_default(),
                ..AllowedMentions::default()
            },
        };
        self.post_message(channel.as_str(), &body).await
    }

    async fn delete_message(
        &self,
        channel: &ChannelId,
        message: &MessageId,
    ) -> Result<(), GatewayError> {
        let url = self.endpoint(&["channels", channel.as_str(), "messages", message.as_str()])?;
        self.send(self.request(Method::DELETE, url)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rest() -> DiscordRest {
        DiscordRest::new(reqwest::Client::new(), "T0KEN").expect("client")
    }

    #[test]
    fn test_reaction_endpoint_percent_encodes_emoji() {
        let url = rest()
            .endpoint(&["channels", "1", "messages", "2", "reactions", "🍱", "@me"])
            .expect("url");
        assert_eq!(
            url.as_str(),
            "https://discord.com/api/v10/channels/1/messages/2/reactions/%F0%9F%8D%B1/@me"
        );
    }

    #[test]
    fn test_custom_emoji_keeps_name_id_form() {
        let url = rest()
            .endpoint(&["channels", "1", "messages", "2", "reactions", "bento:42", "@me"])
            .expect("url");
        assert!(url.as_str().ends_with("/reactions/bento:42/@me"));
    }

    #[test]
    fn test_authorization_uses_bot_scheme() {
        assert_eq!(rest().authorization, "Bot T0KEN");
    }
}
