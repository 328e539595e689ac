//! Merged multi-destination chat feed.

use std::collections::VecDeque;

use chrono::Utc;
use tracing::trace;

use gostream_ipc::{ChatMessage, Platform};

use crate::error::EngineError;
use crate::random::RandomSource;
use crate::EngineResult;

/// Messages required before the mood can be analyzed.
pub const MOOD_MIN_MESSAGES: usize = 5;

/// Most recent messages sent for mood analysis.
pub const MOOD_SAMPLE_SIZE: usize = 10;

const CHAT_USERS: [&str; 6] = [
    "ShadowNinja",
    "GamerGuy88",
    "StreamFan",
    "ProClicker",
    "LogicMaster",
    "ByteSize",
];

const CHAT_LINES: [&str; 7] = [
    "LFG!",
    "POGGERS",
    "Nice play!",
    "What game is this?",
    "Hello from {platform}!",
    "This multi-stream is clean",
    "How is the latency?",
];

/// Bounded, arrival-ordered feed of chat from every active destination.
#[derive(Debug)]
pub struct ChatAggregator {
    capacity: usize,
    feed: VecDeque<ChatMessage>,
    next_id: u64,
}

impl ChatAggregator {
    /// Create an empty feed keeping at most `capacity` messages.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            feed: VecDeque::with_capacity(capacity),
            next_id: 0,
        }
    }

    /// Number of messages currently retained.
    pub fn len(&self) -> usize {
        self.feed.len()
    }

    /// Returns true if the feed is empty.
    pub fn is_empty(&self) -> bool {
        self.feed.is_empty()
    }

    /// Messages, oldest first.
    pub fn messages(&self) -> impl Iterator<Item = &ChatMessage> {
        self.feed.iter()
    }

    /// Synthesize one message from a random broadcasting destination.
    ///
    /// Returns `None` when `sources` is empty.
    pub fn tick(
        &mut self,
        sources: &[&Platform],
        rng: &mut impl RandomSource,
    ) -> Option<ChatMessage> {
        let Some(platform) = rng.pick(sources) else {
            trace!("No active destinations, skipping chat tick");
            return None;
        };
        let platform = platform.id.clone();

        let line = rng.pick(&CHAT_LINES).copied().unwrap_or(CHAT_LINES[0]);
        let text = line.replace("{platform}", &platform);
        let user = rng.pick(&CHAT_USERS).copied().unwrap_or(CHAT_USERS[0]);

        let message = ChatMessage {
            id: self.next_id,
            user: user.to_string(),
            platform,
            text,
            timestamp: Utc::now(),
        };
        self.next_id += 1;

        self.push(message.clone());
        Some(message)
    }

    /// Append a message, evicting the oldest beyond the cap.
    pub fn push(&mut self, message: ChatMessage) {
        self.feed.push_back(message);
        while self.feed.len() > self.capacity {
            self.feed.pop_front();
        }
    }

    /// Drop every message. Ids keep increasing.
    pub fn clear(&mut self) {
        self.feed.clear();
    }

    /// Texts of the most recent messages for mood analysis.
    ///
    /// Fails with `InsufficientData` below [`MOOD_MIN_MESSAGES`].
    pub fn mood_sample(&self) -> EngineResult<Vec<String>> {
        if self.feed.len() < MOOD_MIN_MESSAGES {
            return Err(EngineError::InsufficientData {
                have: self.feed.len(),
                need: MOOD_MIN_MESSAGES,
            });
        }

        let skip = self.feed.len().saturating_sub(MOOD_SAMPLE_SIZE);
        Ok(self.feed.iter().skip(skip).map(|m| m.text.clone()).collect())
    }
}

impl Default for ChatAggregator {
    fn default() -> Self {
        Self::new(100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::{RngSource, ScriptedRandom};
    use gostream_ipc::default_catalog;

    fn message(id: u64) -> ChatMessage {
        ChatMessage {
            id,
            user: "StreamFan".to_string(),
            platform: "twitch".to_string(),
            text: format!("msg {id}"),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_no_sources_no_message() {
        let mut chat = ChatAggregator::default();
        let mut rng = ScriptedRandom::new([0, 0, 0]);
        assert!(chat.tick(&[], &mut rng).is_none());
        assert!(chat.is_empty());
    }

    #[test]
    fn test_tick_uses_scripted_draws() {
        let catalog = default_catalog();
        let sources: Vec<&Platform> = catalog.iter().filter(|p| p.is_broadcasting()).collect();
        let mut chat = ChatAggregator::default();
        // youtube, the greeting line, third user
        let mut rng = ScriptedRandom::new([1, 4, 2]);

        let msg = chat.tick(&sources, &mut rng).unwrap();

        assert_eq!(msg.platform, "youtube");
        assert_eq!(msg.text, "Hello from youtube!");
        assert_eq!(msg.user, "StreamFan");
        assert_eq!(chat.len(), 1);
    }

    #[test]
    fn test_messages_only_from_sources() {
        let catalog = default_catalog();
        let sources: Vec<&Platform> = catalog.iter().filter(|p| p.id == "twitch").collect();
        let mut chat = ChatAggregator::new(50);
        let mut rng = RngSource::seeded(11);

        for _ in 0..200 {
            chat.tick(&sources, &mut rng);
        }

        assert_eq!(chat.len(), 50);
        assert!(chat.messages().all(|m| m.platform == "twitch"));
        let ids: Vec<_> = chat.messages().map(|m| m.id).collect();
        assert!(ids.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_cap_evicts_oldest_first() {
        let mut chat = ChatAggregator::new(100);
        for id in 0..101 {
            chat.push(message(id));
        }

        assert_eq!(chat.len(), 100);
        let ids: Vec<_> = chat.messages().map(|m| m.id).collect();
        assert_eq!(ids, (1..101).collect::<Vec<_>>());
    }

    #[test]
    fn test_mood_sample_needs_five_messages() {
        let mut chat = ChatAggregator::default();
        for id in 0..4 {
            chat.push(message(id));
        }
        assert!(matches!(
            chat.mood_sample(),
            Err(EngineError::InsufficientData { have: 4, need: 5 })
        ));

        chat.push(message(4));
        assert_eq!(chat.mood_sample().unwrap().len(), 5);
    }

    #[test]
    fn test_mood_sample_takes_latest_ten() {
        let mut chat = ChatAggregator::default();
        for id in 0..25 {
            chat.push(message(id));
        }

        let sample = chat.mood_sample().unwrap();
        assert_eq!(sample.len(), 10);
        assert_eq!(sample.first().map(String::as_str), Some("msg 15"));
        assert_eq!(sample.last().map(String::as_str), Some("msg 24"));
    }
}
