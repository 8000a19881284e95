//! A driver that records instead of running anything
//!
//! Useful for asserting on what the proxy sends (and when) without a page.
//! Scripted failures and return values can be queued up front.

use crate::{Driver, Result, ScriptResult};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Default)]
struct LogInner {
    scripts: Vec<String>,
    events: Vec<String>,
    bootstrap: Vec<(String, String)>,
    outcomes: VecDeque<ScriptResult>,
}

/// Shared view of everything a [`RecordingDriver`] saw
#[derive(Clone, Default)]
pub struct RecordingLog {
    inner: Arc<Mutex<LogInner>>,
}

impl RecordingLog {
    // A panicking test thread must not hide what was recorded
    fn lock(&self) -> MutexGuard<'_, LogInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Every executed script, in order
    pub fn scripts(&self) -> Vec<String> {
        self.lock().scripts.clone()
    }

    pub fn execution_count(&self) -> usize {
        self.lock().scripts.len()
    }

    /// Driver calls as short descriptions: `execute`, `navigate <url>`,
    /// `add <name>`, `remove <name>`
    pub fn events(&self) -> Vec<String> {
        self.lock().events.clone()
    }

    /// Bootstrap scripts currently registered, in registration order
    pub fn bootstrap_scripts(&self) -> Vec<String> {
        self.lock()
            .bootstrap
            .iter()
            .map(|(_, s)| s.clone())
            .collect()
    }

    pub fn clear(&self) {
        let mut g = self.lock();
        g.scripts.clear();
        g.events.clear();
    }
}

/// Driver that records every call into a [`RecordingLog`]
pub struct RecordingDriver {
    log: RecordingLog,
}

impl RecordingDriver {
    pub fn new() -> Self {
        Self { log: RecordingLog::default() }
    }

    pub fn log(&self) -> RecordingLog {
        self.log.clone()
    }

    /// Make the next execution report a page exception with `message`
    pub fn fail_next(&self, message: &str) {
        self.push_outcome(ScriptResult { value: message.to_string(), is_error: true });
    }

    /// Make the next execution return `value` (a JSON rendering)
    pub fn return_next(&self, value: &str) {
        self.push_outcome(ScriptResult { value: value.to_string(), is_error: false });
    }

    fn push_outcome(&self, outcome: ScriptResult) {
        self.log.lock().outcomes.push_back(outcome);
    }
}

impl Default for RecordingDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl Driver for RecordingDriver {
    fn execute_script(&mut self, script: &str) -> Result<ScriptResult> {
        let mut g = self.log.lock();
        g.scripts.push(script.to_string());
        g.events.push("execute".to_string());
        Ok(g.outcomes.pop_front().unwrap_or(ScriptResult {
            value: "null".to_string(),
            is_error: false,
        }))
    }

    fn navigate(&mut self, url: &str) -> Result<()> {
        self.log.lock().events.push(format!("navigate {}", url));
        Ok(())
    }

    fn add_bootstrap_script(&mut self, name: &str, script: &str) -> Result<()> {
        let mut g = self.log.lock();
        g.events.push(format!("add {}", name));
        match g.bootstrap.iter_mut().find(|(n, _)| n == name) {
            Some(slot) => slot.1 = script.to_string(),
            None => g.bootstrap.push((name.to_string(), script.to_string())),
        }
        Ok(())
    }

    fn remove_bootstrap_script(&mut self, name: &str) -> Result<()> {
        let mut g = self.log.lock();
        g.events.push(format!("remove {}", name));
        g.bootstrap.retain(|(n, _)| n != name);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_and_replays_outcomes() {
        let mut d = RecordingDriver::new();
        let log = d.log();
        d.return_next("42");
        d.fail_next("boom");

        assert_eq!(d.execute_script("a").unwrap().value, "42");
        let failed = d.execute_script("b").unwrap();
        assert!(failed.is_error);
        assert_eq!(failed.value, "boom");
        assert_eq!(d.execute_script("c").unwrap().value, "null");

        assert_eq!(log.scripts(), vec!["a", "b", "c"]);
        assert_eq!(log.execution_count(), 3);
    }

    #[test]
    fn test_bootstrap_scripts_replace_by_name() {
        let mut d = RecordingDriver::new();
        let log = d.log();
        d.add_bootstrap_script("m", "one").unwrap();
        d.add_bootstrap_script("m", "two").unwrap();
        assert_eq!(log.bootstrap_scripts(), vec!["two"]);
        d.remove_bootstrap_script("m").unwrap();
        d.remove_bootstrap_script("unknown").unwrap();
        assert!(log.bootstrap_scripts().is_empty());
    }
}
