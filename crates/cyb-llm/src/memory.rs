//! Bounded per-episode conversational memory, threaded around provider
//! calls so a multi-turn episode sees its own prior turns (spec §4.10:
//! "bounded per-episode memory prepended/appended around calls").

use std::collections::VecDeque;

use cyb_core::EpisodeId;
use dashmap::DashMap;

/// One turn recorded against an episode.
#[derive(Debug, Clone)]
pub struct MemoryItem {
    pub role: MemoryRole,
    pub content: String,
}

/// Who produced a [`MemoryItem`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryRole {
    User,
    Assistant,
}

/// Per-episode memory storage. Implementations decide retention and
/// ordering; the router only ever reads `context` and writes `record`.
pub trait Memory: Send + Sync {
    /// Append one turn to `episode`'s history.
    fn record(&self, episode: EpisodeId, role: MemoryRole, content: impl Into<String>);

    /// The episode's retained history, oldest first.
    fn context(&self, episode: EpisodeId) -> Vec<MemoryItem>;
}

/// A ring buffer per episode, capped at `capacity` turns. The default
/// memory backing the router; entirely in-process, lost on restart.
pub struct InMemoryEpisodeMemory {
    capacity: usize,
    turns: DashMap<EpisodeId, VecDeque<MemoryItem>>,
}

impl InMemoryEpisodeMemory {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            turns: DashMap::new(),
        }
    }
}

impl Default for InMemoryEpisodeMemory {
    fn default() -> Self {
        Self::new(20)
    }
}

impl Memory for InMemoryEpisodeMemory {
    fn record(&self, episode: EpisodeId, role: MemoryRole, content: impl Into<String>) {
        let mut turns = self.turns.entry(episode).or_default();
        turns.push_back(MemoryItem {
            role,
            content: content.into(),
        });
        while turns.len() > self.capacity {
            turns.pop_front();
        }
    }

    fn context(&self, episode: EpisodeId) -> Vec<MemoryItem> {
        self.turns
            .get(&episode)
            .map(|turns| turns.iter().cloned().collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_are_returned_oldest_first() {
        let mem = InMemoryEpisodeMemory::new(10);
        let episode = EpisodeId::new();
        mem.record(episode, MemoryRole::User, "first");
        mem.record(episode, MemoryRole::Assistant, "second");
        let ctx = mem.context(episode);
        assert_eq!(ctx[0].content, "first");
        assert_eq!(ctx[1].content, "second");
    }

    #[test]
    fn ring_buffer_drops_oldest_past_capacity() {
        let mem = InMemoryEpisodeMemory::new(2);
        let episode = EpisodeId::new();
        mem.record(episode, MemoryRole::User, "a");
        mem.record(episode, MemoryRole::Assistant, "b");
        mem.record(episode, MemoryRole::User, "c");
        let ctx = mem.context(episode);
        assert_eq!(ctx.len(), 2);
        assert_eq!(ctx[0].content, "b");
        assert_eq!(ctx[1].content, "c");
    }

    #[test]
    fn unseen_episode_has_empty_context() {
        let mem = InMemoryEpisodeMemory::default();
        assert!(mem.context(EpisodeId::new()).is_empty());
    }
}
