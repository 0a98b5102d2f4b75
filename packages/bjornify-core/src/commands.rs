//! Chat command parsing and execution.
//!
//! Commands use a `!` prefix, the way the bot has always been driven from
//! chat: `!add <query>`, `!pause` (`!stop`), `!next` (`!skip`), `!np`
//! (`!playing`), `!search <query>` and `!version`.

use std::sync::Arc;

use thiserror::Error;

use crate::protocol_constants::APP_NAME;
use crate::services::{ActionKind, NowPlayingReader, PlaybackDispatcher, TrackQueue};
use crate::spotify::traits::SpotifyCatalog;

/// Command prefix.
pub const COMMAND_PREFIX: char = '!';

/// Number of suggestions returned by `!search`.
pub const SEARCH_SUGGESTIONS: u32 = 5;

/// A parsed chat command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCommand {
    Add(String),
    Pause,
    Next,
    NowPlaying,
    Search(String),
    Version,
}

/// Why a chat line is not a runnable command.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseCommandError {
    #[error("not a command")]
    NotACommand,

    #[error("unknown command: !{0}")]
    Unknown(String),

    #[error("!{0} needs a search query")]
    MissingArgument(&'static str),
}

impl ChatCommand {
    /// Parses one chat line.
    ///
    /// Command names are case-insensitive; everything after the name is the
    /// argument, trimmed.
    pub fn parse(line: &str) -> Result<Self, ParseCommandError> {
        let body = line
            .trim()
            .strip_prefix(COMMAND_PREFIX)
            .ok_or(ParseCommandError::NotACommand)?;

        let (name, arg) = match body.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, arg.trim()),
            None => (body, ""),
        };

        if name.is_empty() {
            return Err(ParseCommandError::NotACommand);
        }

        let with_query = |cmd: &'static str, make: fn(String) -> Self| {
            if arg.is_empty() {
                Err(ParseCommandError::MissingArgument(cmd))
            } else {
                Ok(make(arg.to_string()))
            }
        };

        match name.to_ascii_lowercase().as_str() {
            "add" => with_query("add", Self::Add),
            "search" => with_query("search", Self::Search),
            "pause" | "stop" => Ok(Self::Pause),
            "next" | "skip" => Ok(Self::Next),
            "np" | "playing" => Ok(Self::NowPlaying),
            "version" => Ok(Self::Version),
            other => Err(ParseCommandError::Unknown(other.to_string())),
        }
    }
}

/// Runs chat commands against the playback services.
pub struct CommandHandler {
    dispatcher: Arc<PlaybackDispatcher>,
    now_playing: Arc<NowPlayingReader>,
    queue: Arc<TrackQueue>,
    catalog: Arc<dyn SpotifyCatalog>,
}

impl CommandHandler {
    pub fn new(
        dispatcher: Arc<PlaybackDispatcher>,
        now_playing: Arc<NowPlayingReader>,
        queue: Arc<TrackQueue>,
        catalog: Arc<dyn SpotifyCatalog>,
    ) -> Self {
        Self {
            dispatcher,
            now_playing,
            queue,
            catalog,
        }
    }

    /// Executes `command` and returns the chat reply.
    pub async fn handle(&self, command: ChatCommand) -> String {
        log::debug!("[Command] {:?}", command);
        match command {
            ChatCommand::Add(query) => self.queue.add(&query).await.reply(),
            ChatCommand::Pause => {
                let result = self.dispatcher.dispatch(ActionKind::Pause).await;
                format!("{} Paused playback.", result.glyph())
            }
            ChatCommand::Next => {
                let result = self.dispatcher.dispatch(ActionKind::Skip).await;
                format!("{} Skipped to next track.", result.glyph())
            }
            ChatCommand::NowPlaying => match self.now_playing.current_snapshot().await {
                Some(snapshot) => snapshot.to_string(),
                None => "Nothing is playing.".to_string(),
            },
            ChatCommand::Search(query) => self.search(&query).await,
            ChatCommand::Version => version_reply(),
        }
    }

    /// Parses and executes one chat line; `None` for lines that are not commands.
    pub async fn handle_line(&self, line: &str) -> Option<String> {
        match ChatCommand::parse(line) {
            Ok(command) => Some(self.handle(command).await),
            Err(ParseCommandError::NotACommand) => None,
            Err(e) => Some(format!("🚫 {}", e)),
        }
    }

    async fn search(&self, query: &str) -> String {
        match self.catalog.search_tracks(query, SEARCH_SUGGESTIONS).await {
            Ok(tracks) if tracks.is_empty() => "🚫 No results found.".to_string(),
            Ok(tracks) => tracks
                .iter()
                .map(|t| t.display_name())
                .collect::<Vec<_>>()
                .join("\n"),
            Err(e) => {
                log::error!("[Command] Search for {:?} failed: {}", query, e);
                "🚫 Search failed.".to_string()
            }
        }
    }
}

pub fn version_reply() -> String {
    format!("{} version: {}", APP_NAME, env!("CARGO_PKG_VERSION"))
}
