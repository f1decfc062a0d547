use std::time::Duration;

use anyhow::Result;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::dispatch::Dispatcher;
use crate::domain::ChatId;
use crate::telegram::{InlineKeyboardButton, InlineKeyboardMarkup, TelegramClient, Update};

const CALLBACK_PREFIX: &str = "boost_";
const POLL_BACKOFF: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Boost(u32),
}

impl Command {
    /// `/start`, `/start@botname`, `/boost 10`.
    pub fn parse_text(text: &str) -> Option<Self> {
        let mut parts = text.split_whitespace();
        let head = parts.next()?;
        let name = head.split('@').next().unwrap_or(head);
        match name {
            "/start" => Some(Command::Start),
            "/boost" => parts.next()?.parse().ok().map(Command::Boost),
            _ => None,
        }
    }

    /// Inline button payload, e.g. `boost_50`.
    pub fn parse_callback(data: &str) -> Option<Self> {
        data.strip_prefix(CALLBACK_PREFIX)?.parse().ok().map(Command::Boost)
    }
}

/// Static info shown by `/start`.
#[derive(Debug, Clone)]
pub struct Menu {
    pub wallet: String,
    pub token_mint: String,
    pub presets: Vec<u32>,
}

impl Menu {
    pub fn text(&self) -> String {
        format!(
            "Volume Bot Ready 🚀\nWallet: `{}`\nToken: `{}`\n\nChoose how hard to boost:",
            self.wallet, self.token_mint
        )
    }

    pub fn keyboard(&self) -> InlineKeyboardMarkup {
        InlineKeyboardMarkup {
            inline_keyboard: self
                .presets
                .iter()
                .map(|n| {
                    vec![InlineKeyboardButton {
                        text: format!("Boost Volume {n}x"),
                        callback_data: format!("{CALLBACK_PREFIX}{n}"),
                    }]
                })
                .collect(),
        }
    }
}

pub struct Bot {
    telegram: TelegramClient,
    dispatcher: Dispatcher,
    menu: Menu,
    poll_timeout_secs: u64,
}

impl Bot {
    pub fn new(
        telegram: TelegramClient,
        dispatcher: Dispatcher,
        menu: Menu,
        poll_timeout_secs: u64,
    ) -> Self {
        Self {
            telegram,
            dispatcher,
            menu,
            poll_timeout_secs,
        }
    }

    /// Polls for updates until the process stops.
    pub async fn run(&self) -> Result<()> {
        info!(wallet = %self.menu.wallet, token = %self.menu.token_mint, "bot.polling");
        let mut offset = 0;
        loop {
            let updates = match self.telegram.get_updates(offset, self.poll_timeout_secs).await {
                Ok(u) => u,
                Err(err) => {
                    warn!(error = %err, "bot.poll.failed");
                    tokio::time::sleep(POLL_BACKOFF).await;
                    continue;
                }
            };
            for update in updates {
                offset = offset.max(update.update_id + 1);
                // Started runs are detached and report through the notifier.
                if let Err(err) = self.handle(update).await {
                    warn!(error = %err, "bot.update.failed");
                }
            }
        }
    }

    /// Acts on one update and returns the handle of the run it started, if any.
    async fn handle(&self, update: Update) -> Result<Option<JoinHandle<()>>> {
        if let Some(cb) = update.callback_query {
            let command = cb.data.as_deref().and_then(Command::parse_callback);
            let chat = cb.message.as_ref().map(|m| ChatId(m.chat.id));
            let (Some(Command::Boost(n)), Some(chat)) = (command, chat) else {
                debug!(data = ?cb.data, "bot.callback.ignored");
                return Ok(None);
            };
            // The button spinner is cosmetic; a failed ack must not cost the run.
            let ack = format!("Boosting {n}x ...");
            if let Err(err) = self.telegram.answer_callback_query(&cb.id, &ack).await {
                warn!(%chat, error = %err, "bot.callback.ack_failed");
            }
            return Ok(Some(self.boost(chat, n)));
        }

        let Some(msg) = update.message else {
            return Ok(None);
        };
        let chat = ChatId(msg.chat.id);
        match msg.text.as_deref().and_then(Command::parse_text) {
            Some(Command::Start) => {
                self.telegram
                    .send_message(chat, &self.menu.text(), true, Some(&self.menu.keyboard()))
                    .await?;
                Ok(None)
            }
            Some(Command::Boost(n)) => Ok(Some(self.boost(chat, n))),
            None => Ok(None),
        }
    }

    fn boost(&self, chat: ChatId, repeat_count: u32) -> JoinHandle<()> {
        info!(%chat, repeat_count, "bot.boost");
        self.dispatcher.start_run(chat, repeat_count)
    }
}
