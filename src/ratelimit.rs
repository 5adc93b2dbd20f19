//! Fixed-window per-client throttle.
//!
//! Each endpoint owns one `RateLimiter`. A request whose key was last accepted less
//! than `window_ms` ago is rejected; otherwise its time is recorded, whatever happens
//! to the request afterwards. Rejected requests do not refresh the record.

use std::collections::HashMap;

use tracing::{debug, info};

/// Where last-access times live. The in-memory map is the only implementation today;
/// a shared store would slot in here for multi-instance deployments.
pub trait AccessStore: Send {
    fn get(&self, key: &str) -> Option<u64>;
    fn set(&mut self, key: &str, at_ms: u64);
    fn len(&self) -> usize;
    /// Drop records last touched more than `stale_ms` before `now_ms`. Returns how many were removed.
    fn sweep(&mut self, now_ms: u64, stale_ms: u64) -> usize;
}

#[derive(Debug, Default)]
pub struct MemoryAccessStore {
    last_access: HashMap<String, u64>,
}

impl AccessStore for MemoryAccessStore {
    fn get(&self, key: &str) -> Option<u64> {
        self.last_access.get(key).copied()
    }

    fn set(&mut self, key: &str, at_ms: u64) {
        self.last_access.insert(key.to_string(), at_ms);
    }

    fn len(&self) -> usize {
        self.last_access.len()
    }

    fn sweep(&mut self, now_ms: u64, stale_ms: u64) -> usize {
        let before = self.last_access.len();
        self.last_access.retain(|_, at| now_ms.saturating_sub(*at) <= stale_ms);
        before - self.last_access.len()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LimiterSettings {
    pub window_ms: u64,
    /// Sweeping starts once this many keys are tracked.
    pub sweep_threshold: usize,
    pub stale_ms: u64,
}

impl LimiterSettings {
    pub fn with_window(window_ms: u64) -> Self {
        Self { window_ms, sweep_threshold: 5_000, stale_ms: 60_000 }
    }
}

pub struct RateLimiter {
    name: &'static str,
    store: Box<dyn AccessStore>,
    settings: LimiterSettings,
}

impl RateLimiter {
    pub fn new(name: &'static str, settings: LimiterSettings) -> Self {
        Self::with_store(name, settings, Box::new(MemoryAccessStore::default()))
    }

    pub fn with_store(name: &'static str, settings: LimiterSettings, store: Box<dyn AccessStore>) -> Self {
        Self { name, store, settings }
    }

    /// `true` when the request may proceed.
    pub fn check(&mut self, key: &str, now_ms: u64) -> bool {
        if self.store.len() >= self.settings.sweep_threshold {
            let removed = self.store.sweep(now_ms, self.settings.stale_ms);
            info!(target: "ratelimit", limiter = self.name, removed, remaining = self.store.len(), "Swept stale access records");
        }

        if let Some(last) = self.store.get(key) {
            if now_ms.saturating_sub(last) < self.settings.window_ms {
                debug!(target: "ratelimit", limiter = self.name, %key, since_ms = now_ms.saturating_sub(last), "Request throttled");
                return false;
            }
        }
        self.store.set(key, now_ms);
        true
    }

    pub fn tracked(&self) -> usize {
        self.store.len()
    }

    pub fn settings(&self) -> LimiterSettings {
        self.settings
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("name", &self.name)
            .field("settings", &self.settings)
            .field("tracked", &self.store.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_request_inside_window_is_rejected() {
        let mut limiter = RateLimiter::new("chat", LimiterSettings::with_window(1_500));
        assert!(limiter.check("1.2.3.4", 10_000));
        assert!(!limiter.check("1.2.3.4", 11_000));
        // The rejected call did not move the window.
        assert!(limiter.check("1.2.3.4", 11_500));
    }

    #[test]
    fn keys_are_independent() {
        let mut limiter = RateLimiter::new("leaderboard", LimiterSettings::with_window(1_200));
        assert!(limiter.check("1.2.3.4:GET", 0));
        assert!(limiter.check("1.2.3.4:POST", 10));
        assert!(limiter.check("5.6.7.8:GET", 20));
        assert!(!limiter.check("1.2.3.4:GET", 30));
    }

    #[test]
    fn sweep_only_past_threshold() {
        let settings = LimiterSettings { window_ms: 100, sweep_threshold: 3, stale_ms: 1_000 };
        let mut limiter = RateLimiter::new("feedback", settings);
        limiter.check("a", 0);
        limiter.check("b", 0);
        assert_eq!(limiter.tracked(), 2);
        limiter.check("c", 5_000);
        // Below threshold when "c" arrived, nothing swept yet.
        assert_eq!(limiter.tracked(), 3);
        limiter.check("d", 5_001);
        // a and b were stale; c survives, d is added.
        assert_eq!(limiter.tracked(), 2);
    }

    #[test]
    fn memory_store_sweep_keeps_fresh_entries() {
        let mut store = MemoryAccessStore::default();
        store.set("old", 0);
        store.set("new", 59_000);
        assert_eq!(store.sweep(60_001, 60_000), 1);
        assert_eq!(store.get("new"), Some(59_000));
        assert_eq!(store.get("old"), None);
    }
}
