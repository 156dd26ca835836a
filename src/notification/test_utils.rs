//! A scripted, in-memory `Transport` for exercising retry and dispatch logic.

use crate::core::Transport;
use crate::error::TransportError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Debug, Clone, Copy)]
enum Script {
    Ok,
    Fail,
    FailFirst(usize),
}

/// Records every attempt and answers according to a per-address script.
#[derive(Debug)]
pub struct ScriptedTransport {
    default: Script,
    scripts: Mutex<HashMap<String, Script>>,
    attempts: Mutex<Vec<String>>,
}

impl ScriptedTransport {
    /// Every address succeeds unless scripted otherwise.
    pub fn always_ok() -> Self {
        Self::with_default(Script::Ok)
    }

    /// Every address fails unless scripted otherwise.
    pub fn always_fail() -> Self {
        Self::with_default(Script::Fail)
    }

    fn with_default(default: Script) -> Self {
        Self {
            default,
            scripts: Mutex::new(HashMap::new()),
            attempts: Mutex::new(Vec::new()),
        }
    }

    /// `address` fails `count` times, then succeeds.
    pub fn fail_first(self, address: &str, count: usize) -> Self {
        self.script(address, Script::FailFirst(count))
    }

    /// `address` never succeeds.
    pub fn fail_always(self, address: &str) -> Self {
        self.script(address, Script::Fail)
    }

    fn script(self, address: &str, script: Script) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .insert(address.to_string(), script);
        self
    }

    /// Every attempted address, in order.
    pub fn attempts(&self) -> Vec<String> {
        self.attempts.lock().unwrap().clone()
    }

    pub fn attempts_for(&self, address: &str) -> usize {
        self.attempts
            .lock()
            .unwrap()
            .iter()
            .filter(|a| a.as_str() == address)
            .count()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn get(&self, address: &str) -> Result<(), TransportError> {
        let previous = {
            let mut attempts = self.attempts.lock().unwrap();
            let previous = attempts.iter().filter(|a| a.as_str() == address).count();
            attempts.push(address.to_string());
            previous
        };

        let script = self
            .scripts
            .lock()
            .unwrap()
            .get(address)
            .copied()
            .unwrap_or(self.default);

        let ok = match script {
            Script::Ok => true,
            Script::Fail => false,
            Script::FailFirst(count) => previous >= count,
        };

        if ok {
            Ok(())
        } else {
            Err(TransportError::Other(format!(
                "connection refused (scripted attempt {})",
                previous + 1
            )))
        }
    }
}
