use std::time::{Duration, Instant};

use tracing::debug;

use crate::core::actor::Actor;
use crate::core::commands::{PluginRegistry, RegistrySnapshot};

pub type HeartbeatSubscriber = Box<dyn FnMut(&Actor, &RegistrySnapshot) + Send>;

/// Periodic notification checked by the dispatcher between commands.
pub struct HeartbeatTimer {
    interval: Duration,
    last: Instant,
    subscribers: Vec<HeartbeatSubscriber>,
}

impl HeartbeatTimer {
    /// A zero interval disables the timer.
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: Instant::now(),
            subscribers: Vec::new(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        !self.interval.is_zero()
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn subscribe(&mut self, subscriber: HeartbeatSubscriber) {
        self.subscribers.push(subscriber);
    }

    /// Time left before the next firing, if enabled.
    pub fn until_due(&self, now: Instant) -> Option<Duration> {
        if !self.is_enabled() {
            return None;
        }
        Some((self.last + self.interval).saturating_duration_since(now))
    }

    /// Fires if the interval has elapsed and the registry is non-empty.
    /// Returns whether subscribers were notified.
    pub fn tick(&mut self, now: Instant, actor: &Actor, registry: &PluginRegistry) -> bool {
        if !self.is_enabled() || now.duration_since(self.last) < self.interval {
            return false;
        }
        self.last = now;
        if registry.is_empty() {
            return false;
        }

        let snapshot = registry.snapshot();
        debug!(
            actor = actor.name(),
            plugins = snapshot.len(),
            subscribers = self.subscribers.len(),
            "heartbeat"
        );
        for subscriber in &mut self.subscribers {
            subscriber(actor, &snapshot);
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;
    use crate::core::rank::RankLevel;

    fn counter(timer: &mut HeartbeatTimer) -> Arc<AtomicUsize> {
        let fired = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&fired);
        timer.subscribe(Box::new(move |_, snapshot| {
            assert!(!snapshot.is_empty());
            seen.fetch_add(1, Ordering::SeqCst);
        }));
        fired
    }

    #[test]
    fn test_fires_after_interval() {
        let mut timer = HeartbeatTimer::new(Duration::from_secs(2));
        let fired = counter(&mut timer);
        let registry = PluginRegistry::with_builtins().unwrap();
        let actor = Actor::new("ada", RankLevel::BasicUser);
        let start = Instant::now();

        assert!(!timer.tick(start + Duration::from_secs(1), &actor, &registry));
        assert!(timer.tick(start + Duration::from_secs(3), &actor, &registry));
        assert!(!timer.tick(start + Duration::from_secs(4), &actor, &registry));
        assert!(timer.tick(start + Duration::from_secs(6), &actor, &registry));
        assert_eq!(fired.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_disabled_and_empty_registry() {
        let actor = Actor::new("ada", RankLevel::BasicUser);
        let later = Instant::now() + Duration::from_secs(60);

        let mut disabled = HeartbeatTimer::new(Duration::ZERO);
        let fired = counter(&mut disabled);
        assert!(!disabled.tick(later, &actor, &PluginRegistry::with_builtins().unwrap()));
        assert_eq!(disabled.until_due(later), None);

        let mut timer = HeartbeatTimer::new(Duration::from_secs(1));
        let empty_fired = counter(&mut timer);
        assert!(!timer.tick(later, &actor, &PluginRegistry::new()));

        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert_eq!(empty_fired.load(Ordering::SeqCst), 0);
    }
}
