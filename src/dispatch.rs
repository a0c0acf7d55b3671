//! Stateless routing of inbound chat text.
//!
//! The table is built once at startup and only read afterwards; handling a
//! message never registers further handlers.

use std::collections::HashMap;

use crate::models::InboundMessage;

/// Prefix that turns a group message into a question for the bot
pub const GROUP_QUESTION_PREFIX: char = '*';

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    Start,
    Help,
    Usage,
}

/// What an inbound message should trigger
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Command(Command),
    Question(String),
    Ignore,
}

/// Prefix of the `/start` payload carried by invite links
pub const REFERRAL_PREFIX: &str = "ref_";

/// Inviter id from `/start ref_<id>`, as sent when a user opens an invite link
pub fn referrer_from_start(text: &str) -> Option<i64> {
    let mut words = text.split_whitespace();
    words.next()?;
    words.next()?.strip_prefix(REFERRAL_PREFIX)?.parse().ok()
}

#[derive(Debug, Clone)]
pub struct CommandTable {
    commands: HashMap<&'static str, Command>,
}

impl Default for CommandTable {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandTable {
    pub fn new() -> Self {
        let commands = HashMap::from([
            ("/start", Command::Start),
            ("/help", Command::Help),
            ("/usage", Command::Usage),
        ]);
        Self { commands }
    }

    pub fn lookup(&self, word: &str) -> Option<Command> {
        // `/usage@SomeBot` addresses a specific bot in groups
        let name = word.split_once('@').map_or(word, |(name, _)| name);
        self.commands.get(name.to_ascii_lowercase().as_str()).copied()
    }

    pub fn route(&self, message: &InboundMessage) -> Route {
        let text = message.text.trim();

        if message.chat_kind.is_group() {
            return match text.strip_prefix(GROUP_QUESTION_PREFIX) {
                Some(question) => Route::Question(question.trim().to_string()),
                None => Route::Ignore,
            };
        }

        if text.starts_with('/') {
            let word = text.split_whitespace().next().unwrap_or(text);
            return match self.lookup(word) {
                Some(command) => Route::Command(command),
                None => Route::Ignore,
            };
        }

        Route::Question(text.to_string())
    }
}
