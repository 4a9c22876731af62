//! Connection lifecycle hooks.
//!
//! Some collaborators model the engine as a remote service and drive a
//! connect/reconnect cycle. In-process there is nothing to dial, so
//! connecting always succeeds on the first attempt; the retry policy is
//! still honoured so the contract matches the remote deployment.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::Duration;

use tracing::{info, warn};

use super::Engine;
use crate::error::{Error, Result};

/// Bounded retry with a fixed backoff interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    pub backoff: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff: Duration::from_millis(500),
        }
    }
}

#[derive(Debug)]
pub(crate) struct Connection {
    connected: AtomicBool,
    /// Successful `connect` calls, for diagnostics.
    sessions: AtomicU32,
    policy: ReconnectPolicy,
}

impl Connection {
    pub(crate) fn new(policy: ReconnectPolicy) -> Self {
        Self {
            connected: AtomicBool::new(false),
            sessions: AtomicU32::new(0),
            policy,
        }
    }

    /// Nothing to dial in-process.
    fn establish(&self) -> Result<()> {
        Ok(())
    }
}

impl Engine {
    /// Connect, retrying per the configured policy. Idempotent.
    pub fn connect(&self) -> Result<()> {
        let conn = &self.connection;
        if conn.connected.load(Ordering::Acquire) {
            return Ok(());
        }

        let attempts = conn.policy.max_retries + 1;
        let mut last_err = None;
        for attempt in 1..=attempts {
            match conn.establish() {
                Ok(()) => {
                    conn.connected.store(true, Ordering::Release);
                    let session = conn.sessions.fetch_add(1, Ordering::Relaxed) + 1;
                    info!(attempt, session, "engine connected");
                    return Ok(());
                }
                Err(e) => {
                    warn!(attempt, attempts, error = %e, "connect attempt failed");
                    last_err = Some(e);
                    if attempt < attempts {
                        std::thread::sleep(conn.policy.backoff);
                    }
                }
            }
        }
        Err(last_err.unwrap_or_else(|| Error::Other("connect failed".to_string())))
    }

    /// Disconnect. Always succeeds; calling it twice is harmless.
    pub fn disconnect(&self) -> Result<()> {
        if self.connection.connected.swap(false, Ordering::AcqRel) {
            info!("engine disconnected");
        }
        Ok(())
    }

    pub fn is_connected(&self) -> bool {
        self.connection.connected.load(Ordering::Acquire)
    }

    pub fn reconnect_policy(&self) -> ReconnectPolicy {
        self.connection.policy
    }
}
