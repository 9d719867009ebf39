//! Shared HTTP plumbing: agent construction, failure classification and
//! bounded retry for transient failures.

use std::io::Read;
use std::time::Duration;
use tracing::debug;

pub const USER_AGENT: &str = concat!("ytm-enrich/", env!("CARGO_PKG_VERSION"));

/// Upper bound for any single response body we buffer (cover images, JSON).
pub const MAX_BODY_BYTES: u64 = 16 * 1024 * 1024;

/// How a failed request should be treated by callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpFailureKind {
    /// 401/403
    Unauthorized,
    /// Timeouts, connection resets, 408/429/5xx. Worth another attempt.
    Transient,
    Hard,
}

/// Retry budget for transient failures.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    /// `retries` extra attempts after the first one.
    pub fn new(retries: u32) -> Self {
        Self {
            max_attempts: retries.saturating_add(1),
            base_delay: Duration::from_millis(250),
        }
    }

    /// Exponential backoff, capped at 4s.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(6);
        let multiplier = 1u32 << exponent;
        self.base_delay
            .checked_mul(multiplier)
            .unwrap_or(Duration::from_secs(4))
            .min(Duration::from_secs(4))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(2)
    }
}

/// Build an agent with the same timeout on connect, read and write.
pub fn build_agent(timeout: Duration) -> ureq::Agent {
    ureq::AgentBuilder::new()
        .timeout_connect(timeout)
        .timeout_read(timeout)
        .timeout_write(timeout)
        .user_agent(USER_AGENT)
        .build()
}

pub fn classify_failure(error: &ureq::Error) -> HttpFailureKind {
    match error {
        ureq::Error::Status(code, _) => match code {
            401 | 403 => HttpFailureKind::Unauthorized,
            408 | 429 | 500 | 502 | 503 | 504 => HttpFailureKind::Transient,
            _ => HttpFailureKind::Hard,
        },
        ureq::Error::Transport(transport) => match transport.kind() {
            ureq::ErrorKind::Io | ureq::ErrorKind::ConnectionFailed => HttpFailureKind::Transient,
            _ => HttpFailureKind::Hard,
        },
    }
}

/// Run `operation` until it succeeds, fails non-transiently, or the
/// policy's attempts are used up. The last error is returned unchanged.
pub fn with_retry<T, F>(policy: RetryPolicy, label: &str, mut operation: F) -> Result<T, ureq::Error>
where
    F: FnMut() -> Result<T, ureq::Error>,
{
    let mut attempt = 1u32;
    loop {
        match operation() {
            Ok(value) => return Ok(value),
            Err(error)
                if classify_failure(&error) == HttpFailureKind::Transient
                    && attempt < policy.max_attempts =>
            {
                let backoff = policy.backoff_delay(attempt);
                debug!(
                    "{} attempt {} failed ({}), retrying in {:?}",
                    label, attempt, error, backoff
                );
                std::thread::sleep(backoff);
                attempt = attempt.saturating_add(1);
            }
            Err(error) => return Err(error),
        }
    }
}

/// Read a response body, refusing anything larger than `MAX_BODY_BYTES`.
pub fn read_body(response: ureq::Response) -> std::io::Result<Vec<u8>> {
    read_capped(response.into_reader(), MAX_BODY_BYTES)
}

/// Read all of `reader`, failing with `InvalidData` past `cap` bytes
/// instead of returning a truncated body.
pub fn read_capped<R: Read>(reader: R, cap: u64) -> std::io::Result<Vec<u8>> {
    let mut bytes = Vec::new();
    reader.take(cap.saturating_add(1)).read_to_end(&mut bytes)?;
    if bytes.len() as u64 > cap {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("body exceeds {} bytes", cap),
        ));
    }
    Ok(bytes)
}
