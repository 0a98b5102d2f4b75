//! Application services layer.
//!
//! This module contains the playback logic that sits between the chat
//! commands and the two backends (spotify/, sonos/).

pub mod classifier;
pub mod dispatcher;
pub mod now_playing;
pub mod queue;

#[cfg(test)]
pub(crate) mod test_support;

pub use classifier::{
    classify_stream, DeviceClassifier, LocalTarget, StreamKind, StreamRule, STREAM_RULES,
};
pub use dispatcher::{
    ActionKind, ActionResult, FailureReason, PlaybackDispatcher, PlaybackTarget,
};
pub use now_playing::{NowPlayingReader, PlaybackSnapshot, PlaybackSource};
pub use queue::{QueueOutcome, TrackQueue};
