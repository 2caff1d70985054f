use std::collections::VecDeque;

use tracing::{debug, warn};

use super::command::Command;

pub const DEFAULT_CACHE_LIMIT: usize = 25;
pub const MIN_CACHE_LIMIT: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueueError {
    #[error("history index {index} out of range (count {count})")]
    OutOfRange { index: usize, count: usize },
    #[error("command queue is closed")]
    Closed,
}

/// Bounded command history that doubles as the dispatch queue.
///
/// Entries before `cursor` have been handed out by [`CommandQueue::next_waiting`]
/// and are processed; entries from `cursor` on are still waiting. `pointer`
/// is the history-navigation position and always lies in `[0, len]`.
#[derive(Debug)]
pub struct CommandQueue {
    entries: VecDeque<Command>,
    cache_limit: usize,
    pointer: usize,
    cursor: usize,
    closed: bool,
}

impl Default for CommandQueue {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_LIMIT)
    }
}

impl CommandQueue {
    pub fn new(cache_limit: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            cache_limit: cache_limit.max(MIN_CACHE_LIMIT),
            pointer: 0,
            cursor: 0,
            closed: false,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn cache_limit(&self) -> usize {
        self.cache_limit
    }

    pub fn set_cache_limit(&mut self, limit: usize) {
        self.cache_limit = limit.max(MIN_CACHE_LIMIT);
        self.prune();
    }

    pub fn pointer(&self) -> usize {
        self.pointer
    }

    /// True while at least one command is waiting to be dispatched.
    pub fn is_active(&self) -> bool {
        self.cursor < self.entries.len()
    }

    pub fn pending(&self) -> usize {
        self.entries.len() - self.cursor
    }

    /// How many more commands can wait before one is evicted undispatched.
    pub fn room(&self) -> usize {
        self.cache_limit.saturating_sub(self.pending())
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn enqueue(&mut self, cmd: Command) -> Result<(), QueueError> {
        if self.closed {
            return Err(QueueError::Closed);
        }
        debug!(command = cmd.text(), actor = cmd.actor().name(), "enqueue");
        self.entries.push_back(cmd);
        self.prune();
        self.pointer = self.entries.len();
        Ok(())
    }

    /// Places `cmd` ahead of every waiting command, so it runs next.
    pub fn insert_next(&mut self, cmd: Command) -> Result<(), QueueError> {
        if self.closed {
            return Err(QueueError::Closed);
        }
        self.entries.insert(self.cursor, cmd);
        self.prune();
        self.pointer = self.entries.len();
        Ok(())
    }

    /// Hands out the oldest waiting command.
    ///
    /// A cacheable command stays in history marked processed; any other
    /// command leaves the queue.
    pub fn next_waiting(&mut self) -> Option<Command> {
        let entry = self.entries.get_mut(self.cursor)?;
        if entry.allow_cache() {
            entry.mark_processed();
            let cmd = entry.clone();
            self.cursor += 1;
            Some(cmd)
        } else {
            let mut cmd = self.entries.remove(self.cursor)?;
            cmd.mark_processed();
            self.pointer = self.pointer.min(self.entries.len());
            Some(cmd)
        }
    }

    /// Steps the history pointer back; `""` once the oldest entry is passed.
    pub fn previous(&mut self) -> &str {
        if self.pointer == 0 {
            return "";
        }
        self.pointer -= 1;
        self.entries
            .get(self.pointer)
            .map(Command::text)
            .unwrap_or("")
    }

    /// Steps the history pointer forward; `""` at the end of history.
    pub fn next(&mut self) -> &str {
        if self.pointer >= self.entries.len() {
            return "";
        }
        self.pointer += 1;
        self.entries
            .get(self.pointer)
            .map(Command::text)
            .unwrap_or("")
    }

    pub fn reset_pointer(&mut self) {
        self.pointer = self.entries.len();
    }

    pub fn get(&self, index: usize) -> Result<&Command, QueueError> {
        self.entries.get(index).ok_or(QueueError::OutOfRange {
            index,
            count: self.entries.len(),
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = &Command> {
        self.entries.iter()
    }

    /// Removes every processed command.
    pub fn purge(&mut self) -> usize {
        let removed = self.cursor;
        self.entries.drain(..self.cursor);
        self.cursor = 0;
        self.pointer = self.entries.len();
        removed
    }

    /// Drops waiting commands without running them; processed history stays.
    pub fn discard_pending(&mut self) -> usize {
        let dropped = self.entries.len() - self.cursor;
        if dropped > 0 {
            warn!(dropped, "discarding waiting commands");
        }
        self.entries.truncate(self.cursor);
        self.pointer = self.entries.len();
        dropped
    }

    /// Refuses further enqueues; used once the exit token is seen.
    pub fn close(&mut self) {
        self.closed = true;
    }

    fn prune(&mut self) {
        while self.entries.len() > self.cache_limit {
            if let Some(evicted) = self.entries.pop_front() {
                if evicted.is_processed() {
                    debug!(command = evicted.text(), "evicted from history");
                } else {
                    warn!(command = evicted.text(), "evicted before dispatch");
                }
            }
            self.cursor = self.cursor.saturating_sub(1);
        }
        self.pointer = self.pointer.min(self.entries.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::actor::Actor;
    use crate::core::rank::RankLevel;

    fn cmd(text: &str) -> Command {
        Command::new(text, Actor::new("tester", RankLevel::BasicUser))
    }

    fn filled(limit: usize, texts: &[&str]) -> CommandQueue {
        let mut queue = CommandQueue::new(limit);
        for text in texts {
            queue.enqueue(cmd(text)).unwrap();
        }
        queue
    }

    #[test]
    fn test_count_and_active_under_limit() {
        let mut queue = filled(10, &["AAAA", "BBBB", "CCCC"]);
        assert_eq!(queue.len(), 3);
        assert!(queue.is_active());

        for expected in ["AAAA", "BBBB", "CCCC"] {
            assert!(queue.is_active());
            assert_eq!(queue.next_waiting().unwrap().text(), expected);
        }
        assert!(!queue.is_active());
        assert!(queue.next_waiting().is_none());
        assert_eq!(queue.len(), 3);
    }

    #[test]
    fn test_cache_limit_floor() {
        let mut queue = CommandQueue::new(1);
        assert_eq!(queue.cache_limit(), MIN_CACHE_LIMIT);
        queue.set_cache_limit(0);
        assert_eq!(queue.cache_limit(), MIN_CACHE_LIMIT);
    }

    #[test]
    fn test_eviction_keeps_bound() {
        let texts = ["C1", "C2", "C3", "C4", "C5", "C6", "C7"];
        let mut queue = CommandQueue::new(5);
        for text in texts {
            queue.enqueue(cmd(text)).unwrap();
            assert!(queue.len() <= queue.cache_limit());
            assert!(queue.pointer() <= queue.len());
        }
        assert_eq!(queue.len(), 5);
        assert_eq!(queue.get(0).unwrap().text(), "C3");
        assert_eq!(queue.next_waiting().unwrap().text(), "C3");
    }

    #[test]
    fn test_processed_history_evicted_before_waiting() {
        let mut queue = filled(5, &["P1", "P2", "P3"]);
        for _ in 0..3 {
            queue.next_waiting();
        }
        assert_eq!(queue.room(), 5);

        for text in ["W1", "W2", "W3", "W4"] {
            queue.enqueue(cmd(text)).unwrap();
        }
        assert_eq!(queue.room(), 1);
        let texts: Vec<&str> = queue.iter().map(Command::text).collect();
        assert_eq!(texts, vec!["P3", "W1", "W2", "W3", "W4"]);
        assert_eq!(queue.next_waiting().unwrap().text(), "W1");
    }

    #[test]
    fn test_uncached_commands_leave_queue() {
        let mut queue = CommandQueue::new(10);
        queue.enqueue(cmd("SECRET").uncached()).unwrap();
        queue.enqueue(cmd("KEPT")).unwrap();

        let first = queue.next_waiting().unwrap();
        assert_eq!(first.text(), "SECRET");
        assert!(first.is_processed());
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.next_waiting().unwrap().text(), "KEPT");
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_history_navigation_clamps() {
        let mut queue = filled(10, &["ONE1", "TWO2"]);
        assert_eq!(queue.next(), "");
        assert_eq!(queue.pointer(), 2);

        assert_eq!(queue.previous(), "TWO2");
        assert_eq!(queue.previous(), "ONE1");
        assert_eq!(queue.previous(), "");
        assert_eq!(queue.pointer(), 0);

        assert_eq!(queue.next(), "TWO2");
        assert_eq!(queue.next(), "");
        assert_eq!(queue.next(), "");
        assert_eq!(queue.pointer(), 2);
    }

    #[test]
    fn test_empty_history_navigation() {
        let mut queue = CommandQueue::default();
        assert_eq!(queue.previous(), "");
        assert_eq!(queue.next(), "");
        assert_eq!(queue.pointer(), 0);
    }

    #[test]
    fn test_purge_removes_processed_only() {
        let mut queue = filled(10, &["AAAA", "BBBB", "CCCC"]);
        queue.next_waiting();
        queue.next_waiting();

        assert_eq!(queue.purge(), 2);
        assert_eq!(queue.len(), 1);
        assert!(queue.is_active());
        assert_eq!(queue.next_waiting().unwrap().text(), "CCCC");
    }

    #[test]
    fn test_insert_next_runs_before_waiting() {
        let mut queue = filled(10, &["ll extra", "LATER"]);
        let alias = queue.next_waiting().unwrap();
        queue
            .insert_next(alias.expanded_from("ll", "LIST /all extra"))
            .unwrap();

        assert_eq!(queue.next_waiting().unwrap().text(), "LIST /all extra");
        assert_eq!(queue.next_waiting().unwrap().text(), "LATER");
    }

    #[test]
    fn test_discard_and_close() {
        let mut queue = filled(10, &["AAAA", "BBBB", "CCCC"]);
        queue.next_waiting();
        queue.close();

        assert_eq!(queue.discard_pending(), 2);
        assert!(!queue.is_active());
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.enqueue(cmd("DDDD")), Err(QueueError::Closed));
    }

    #[test]
    fn test_out_of_range_is_reported() {
        let queue = filled(10, &["AAAA"]);
        assert_eq!(
            queue.get(3).unwrap_err(),
            QueueError::OutOfRange { index: 3, count: 1 }
        );
    }
}
