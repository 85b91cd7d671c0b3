//! Layout readiness – turns a content source's asynchronous, incremental
//! layout into a single "page count N is final" signal.
//!
//! The gate polls the source's page count on tokio's clock, yielding to the
//! caller's event loop between observations. A count is final once the same
//! value has been seen `stable_observations` times in a row.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::{sleep, Instant};

use crate::error::ReadinessError;
use crate::geometry::PrintableRect;
use crate::source::{ContentSource, SourceHandle};

/// Default delay between two page-count observations.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 50;
/// Default budget for layout to settle.
pub const DEFAULT_LAYOUT_TIMEOUT_MS: u64 = 10_000;
/// Default number of identical consecutive observations that count as stable.
pub const DEFAULT_STABLE_OBSERVATIONS: usize = 2;

/// Stabilisation constants for [`LayoutReadinessGate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadinessConfig {
    pub poll_interval_ms: u64,
    pub timeout_ms: u64,
    pub stable_observations: usize,
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            timeout_ms: DEFAULT_LAYOUT_TIMEOUT_MS,
            stable_observations: DEFAULT_STABLE_OBSERVATIONS,
        }
    }
}

impl ReadinessConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Tracks runs of identical page-count observations.
#[derive(Debug)]
struct StabilityTracker {
    required: usize,
    last: Option<usize>,
    run: usize,
}

impl StabilityTracker {
    fn new(required: usize) -> Self {
        Self {
            required: required.max(1),
            last: None,
            run: 0,
        }
    }

    /// Record one observation; returns the count once it is stable.
    fn observe(&mut self, count: Option<usize>) -> Option<usize> {
        let Some(n) = count else {
            self.last = None;
            self.run = 0;
            return None;
        };
        if self.last == Some(n) {
            self.run += 1;
        } else {
            self.last = Some(n);
            self.run = 1;
        }
        (self.run >= self.required).then_some(n)
    }

    fn last(&self) -> Option<usize> {
        self.last
    }
}

/// Waits for a content source's layout to settle.
#[derive(Debug, Clone, Default)]
pub struct LayoutReadinessGate {
    config: ReadinessConfig,
}

impl LayoutReadinessGate {
    pub fn new(config: ReadinessConfig) -> Self {
        Self { config }
    }

    /// Arm the source for `printable` and wait until its page count is final.
    ///
    /// This is the pipeline's only suspension point.
    pub async fn wait<S>(
        &self,
        handle: &SourceHandle<S>,
        printable: &PrintableRect,
    ) -> Result<usize, ReadinessError>
    where
        S: ContentSource + ?Sized,
    {
        let poll = self.config.poll_interval();
        let deadline = Instant::now() + self.config.timeout();
        let mut tracker = StabilityTracker::new(self.config.stable_observations);
        let mut armed = try_arm(handle, printable)?;

        loop {
            sleep(poll).await;

            if !armed {
                armed = try_arm(handle, printable)?;
            }
            let observed = if armed { observe(handle)? } else { None };
            if observed != tracker.last() {
                log::debug!("layout observation: page count {observed:?}");
            }
            match tracker.observe(observed) {
                Some(0) => return Err(ReadinessError::EmptyContent),
                Some(n) => return Ok(n),
                None => {}
            }

            if Instant::now() >= deadline {
                log::debug!(
                    "layout did not settle within {:?} (last count {:?})",
                    self.config.timeout(),
                    tracker.last()
                );
                return Err(ReadinessError::LayoutTimeout);
            }
        }
    }
}

/// Ask the source to paginate. Returns `Ok(false)` when the source is
/// currently borrowed by its owner; arming is retried on the next poll.
fn try_arm<S>(handle: &SourceHandle<S>, printable: &PrintableRect) -> Result<bool, ReadinessError>
where
    S: ContentSource + ?Sized,
{
    let source = handle
        .upgrade()
        .ok_or(ReadinessError::SourceInvalidated)?;
    let Ok(mut source) = source.try_borrow_mut() else {
        return Ok(false);
    };
    if !source.is_valid() {
        return Err(ReadinessError::SourceInvalidated);
    }
    source.prepare_layout(printable);
    Ok(true)
}

/// Read the current page count. A source busy with its owner counts as a
/// layout pass still in flight.
fn observe<S>(handle: &SourceHandle<S>) -> Result<Option<usize>, ReadinessError>
where
    S: ContentSource + ?Sized,
{
    let source = handle
        .upgrade()
        .ok_or(ReadinessError::SourceInvalidated)?;
    let Ok(source) = source.try_borrow() else {
        return Ok(None);
    };
    if !source.is_valid() {
        return Err(ReadinessError::SourceInvalidated);
    }
    Ok(source.page_count())
}
