use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::domain::ChatId;
use crate::notifier::Notifier;

/// Minimal Telegram Bot API client: long polling, messages, inline buttons.
#[derive(Clone)]
pub struct TelegramClient {
    base_url: String,
    http: Client,
    request_timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<Message>,
    #[serde(default)]
    pub callback_query: Option<CallbackQuery>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub chat: Chat,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CallbackQuery {
    pub id: String,
    #[serde(default)]
    pub data: Option<String>,
    #[serde(default)]
    pub message: Option<Message>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct InlineKeyboardMarkup {
    pub inline_keyboard: Vec<Vec<InlineKeyboardButton>>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct InlineKeyboardButton {
    pub text: String,
    pub callback_data: String,
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: i64,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    parse_mode: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_markup: Option<&'a InlineKeyboardMarkup>,
}

#[derive(Serialize)]
struct AnswerCallback<'a> {
    callback_query_id: &'a str,
    text: &'a str,
}

#[derive(Serialize)]
struct GetUpdates {
    offset: i64,
    timeout: u64,
    allowed_updates: [&'static str; 2],
}

impl TelegramClient {
    pub fn new(api_url: &str, token: &str, request_timeout: Duration) -> Result<Self> {
        if token.trim().is_empty() {
            return Err(anyhow!("telegram bot token is empty"));
        }
        Ok(Self {
            base_url: format!("{}/bot{}", api_url.trim_end_matches('/'), token.trim()),
            http: Client::builder().build()?,
            request_timeout,
        })
    }

    async fn call<B: Serialize, T: DeserializeOwned>(
        &self,
        method: &str,
        body: &B,
        timeout: Duration,
    ) -> Result<T> {
        let url = format!("{}/{method}", self.base_url);
        let resp = self
            .http
            .post(url)
            .timeout(timeout)
            .json(body)
            .send()
            .await
            .with_context(|| format!("telegram {method}"))?;

        let status = resp.status();
        let parsed: ApiResponse<T> = resp
            .json()
            .await
            .with_context(|| format!("telegram {method}: unreadable response ({status})"))?;

        if !parsed.ok {
            let reason = parsed.description.unwrap_or_else(|| status.to_string());
            return Err(anyhow!("telegram {method} failed: {reason}"));
        }
        parsed.result.ok_or_else(|| anyhow!("telegram {method}: missing result"))
    }

    /// Long-polls for updates newer than `offset`.
    pub async fn get_updates(&self, offset: i64, poll_timeout_secs: u64) -> Result<Vec<Update>> {
        let body = GetUpdates {
            offset,
            timeout: poll_timeout_secs,
            allowed_updates: ["message", "callback_query"],
        };
        // The HTTP deadline has to outlive the server-side long poll.
        let timeout = Duration::from_secs(poll_timeout_secs) + self.request_timeout;
        self.call("getUpdates", &body, timeout).await
    }

    pub async fn send_message(
        &self,
        chat: ChatId,
        text: &str,
        markdown: bool,
        keyboard: Option<&InlineKeyboardMarkup>,
    ) -> Result<()> {
        let body = SendMessage {
            chat_id: chat.0,
            text,
            parse_mode: markdown.then_some("Markdown"),
            reply_markup: keyboard,
        };
        let _: serde_json::Value = self.call("sendMessage", &body, self.request_timeout).await?;
        Ok(())
    }

    pub async fn answer_callback_query(&self, callback_query_id: &str, text: &str) -> Result<()> {
        let body = AnswerCallback {
            callback_query_id,
            text,
        };
        let _: bool = self
            .call("answerCallbackQuery", &body, self.request_timeout)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl Notifier for TelegramClient {
    async fn notify(&self, destination: ChatId, text: &str) -> Result<()> {
        self.send_message(destination, text, false, None).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn client(server: &mockito::ServerGuard) -> TelegramClient {
        TelegramClient::new(&server.url(), "123:abc", Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn rejects_empty_token() {
        let client = TelegramClient::new("https://api.telegram.org", " ", Duration::from_secs(1));
        assert!(client.is_err());
    }

    #[tokio::test]
    async fn notify_posts_plain_text() {
        let mut server = mockito::Server::new_async().await;
        let m = server
            .mock("POST", "/bot123:abc/sendMessage")
            .match_body(Matcher::Json(serde_json::json!({"chat_id": 42, "text": "hello"})))
            .with_status(200)
            .with_body(r#"{"ok":true,"result":{"message_id":1,"chat":{"id":42}}}"#)
            .create_async()
            .await;

        client(&server).notify(ChatId(42), "hello").await.unwrap();
        m.assert_async().await;
    }

    #[tokio::test]
    async fn api_error_surfaces_description() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/bot123:abc/sendMessage")
            .with_status(403)
            .with_body(r#"{"ok":false,"description":"Forbidden: bot was blocked by the user"}"#)
            .create_async()
            .await;

        let err = client(&server).notify(ChatId(1), "x").await.unwrap_err();
        assert!(err.to_string().contains("blocked by the user"));
    }

    #[tokio::test]
    async fn get_updates_parses_messages_and_callbacks() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/bot123:abc/getUpdates")
            .match_body(Matcher::PartialJson(serde_json::json!({"offset": 7, "timeout": 0})))
            .with_status(200)
            .with_body(
                r#"{"ok":true,"result":[
                    {"update_id":7,"message":{"message_id":1,"chat":{"id":5},"text":"/start"}},
                    {"update_id":8,"callback_query":{"id":"cb1","data":"boost_10",
                        "message":{"message_id":2,"chat":{"id":5}}}}
                ]}"#,
            )
            .create_async()
            .await;

        let updates = client(&server).get_updates(7, 0).await.unwrap();
        assert_eq!(updates.len(), 2);
        assert_eq!(updates[0].message.as_ref().unwrap().text.as_deref(), Some("/start"));
        let cb = updates[1].callback_query.as_ref().unwrap();
        assert_eq!(cb.data.as_deref(), Some("boost_10"));
        assert_eq!(cb.message.as_ref().unwrap().chat.id, 5);
    }

    #[tokio::test]
    async fn menu_is_sent_with_keyboard() {
        let mut server = mockito::Server::new_async().await;
        let m = server
            .mock("POST", "/bot123:abc/sendMessage")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "parse_mode": "Markdown",
                "reply_markup": {
                    "inline_keyboard": [[{"text": "Boost Volume 10x", "callback_data": "boost_10"}]]
                }
            })))
            .with_status(200)
            .with_body(r#"{"ok":true,"result":{}}"#)
            .create_async()
            .await;

        let kb = InlineKeyboardMarkup {
            inline_keyboard: vec![vec![InlineKeyboardButton {
                text: "Boost Volume 10x".into(),
                callback_data: "boost_10".into(),
            }]],
        };
        client(&server)
            .send_message(ChatId(3), "menu", true, Some(&kb))
            .await
            .unwrap();
        m.assert_async().await;
    }
}
