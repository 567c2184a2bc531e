use std::time::Duration;

pub const DEFAULT_RECONNECT_DELAYS_MS: [u64; 3] = [1_000, 2_000, 3_000];

/// Capped reconnect schedule. Attempt `n` waits `delays[n]`; attempts past the
/// end repeat the final entry forever.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackoffPolicy {
    delays: Vec<Duration>,
}

impl BackoffPolicy {
    /// An empty list falls back to [`DEFAULT_RECONNECT_DELAYS_MS`].
    pub fn new(delays: Vec<Duration>) -> Self {
        if delays.is_empty() {
            Self::default()
        } else {
            Self { delays }
        }
    }

    pub fn from_millis(delays_ms: &[u64]) -> Self {
        Self::new(delays_ms.iter().copied().map(Duration::from_millis).collect())
    }

    pub fn delay(&self, attempt: i64) -> Duration {
        delay_for_attempt(attempt, &self.delays)
    }

    pub fn delays(&self) -> &[Duration] {
        &self.delays
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::from_millis(&DEFAULT_RECONNECT_DELAYS_MS)
    }
}

/// `delays[clamp(attempt, 0, len - 1)]`, with the default sequence standing in
/// for an empty slice.
pub fn delay_for_attempt(attempt: i64, delays: &[Duration]) -> Duration {
    if delays.is_empty() {
        return delay_for_attempt(attempt, &default_delays());
    }
    let last = delays.len() - 1;
    let index = usize::try_from(attempt.max(0)).map_or(last, |index| index.min(last));
    delays[index]
}

fn default_delays() -> [Duration; 3] {
    DEFAULT_RECONNECT_DELAYS_MS.map(Duration::from_millis)
}
