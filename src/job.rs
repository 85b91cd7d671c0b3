//! Render job bookkeeping – the per-invocation state machine.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::geometry::PrintableRect;

static NEXT_JOB_ID: AtomicU64 = AtomicU64::new(1);

/// Lifecycle of a render job.
///
/// ```text
/// Created → GeometryResolved → AwaitingLayout → Rendering → Assembled
///    └────────────┴──────────────────┴──────────────┴──────→ Failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Created,
    GeometryResolved,
    AwaitingLayout,
    Rendering,
    Assembled,
    Failed,
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Assembled | JobState::Failed)
    }

    fn can_advance_to(self, next: JobState) -> bool {
        use JobState::*;
        matches!(
            (self, next),
            (Created, GeometryResolved)
                | (GeometryResolved, AwaitingLayout)
                | (AwaitingLayout, Rendering)
                | (Rendering, Assembled)
                | (Created | GeometryResolved | AwaitingLayout | Rendering, Failed)
        )
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// An attempted transition the state machine does not allow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidTransition {
    pub from: JobState,
    pub to: JobState,
}

/// One end-to-end request, tracked from invocation to its terminal state.
#[derive(Debug)]
pub struct RenderJob {
    id: u64,
    state: JobState,
    geometry: Option<PrintableRect>,
    page_count: Option<usize>,
}

impl RenderJob {
    pub fn new() -> Self {
        Self {
            id: NEXT_JOB_ID.fetch_add(1, Ordering::Relaxed),
            state: JobState::Created,
            geometry: None,
            page_count: None,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    pub fn geometry(&self) -> Option<PrintableRect> {
        self.geometry
    }

    /// Last page count known to the job, 0 before layout settled.
    pub fn page_count(&self) -> usize {
        self.page_count.unwrap_or(0)
    }

    pub fn set_geometry(&mut self, geometry: PrintableRect) {
        self.geometry = Some(geometry);
    }

    pub fn set_page_count(&mut self, page_count: usize) {
        self.page_count = Some(page_count);
    }

    /// Move to `next`; terminal states never move again.
    pub fn advance(&mut self, next: JobState) -> Result<(), InvalidTransition> {
        if !self.state.can_advance_to(next) {
            return Err(InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        log::debug!("job {}: {} → {}", self.id, self.state, next);
        self.state = next;
        Ok(())
    }
}

impl Default for RenderJob {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path_reaches_assembled() {
        let mut job = RenderJob::new();
        for next in [
            JobState::GeometryResolved,
            JobState::AwaitingLayout,
            JobState::Rendering,
            JobState::Assembled,
        ] {
            job.advance(next).unwrap();
        }
        assert!(job.state().is_terminal());
    }

    #[test]
    fn every_live_state_can_fail() {
        for path in [
            &[][..],
            &[JobState::GeometryResolved][..],
            &[JobState::GeometryResolved, JobState::AwaitingLayout][..],
            &[
                JobState::GeometryResolved,
                JobState::AwaitingLayout,
                JobState::Rendering,
            ][..],
        ] {
            let mut job = RenderJob::new();
            for next in path {
                job.advance(*next).unwrap();
            }
            assert_eq!(job.advance(JobState::Failed), Ok(()));
        }
    }

    #[test]
    fn terminal_states_cannot_be_reentered() {
        let mut job = RenderJob::new();
        job.advance(JobState::Failed).unwrap();
        for next in [JobState::Failed, JobState::Rendering, JobState::Assembled] {
            assert_eq!(
                job.advance(next),
                Err(InvalidTransition {
                    from: JobState::Failed,
                    to: next
                })
            );
        }
    }

    #[test]
    fn stages_cannot_be_skipped() {
        let mut job = RenderJob::new();
        assert!(job.advance(JobState::Rendering).is_err());
        assert_eq!(job.state(), JobState::Created);
    }

    #[test]
    fn job_ids_are_unique() {
        assert_ne!(RenderJob::new().id(), RenderJob::new().id());
    }

    #[test]
    fn geometry_is_recorded_once_resolved() {
        let mut job = RenderJob::new();
        assert_eq!(job.geometry(), None);
        let printable = PrintableRect {
            x: 36.0,
            y: 36.0,
            width: 540.0,
            height: 720.0,
        };
        job.set_geometry(printable);
        assert_eq!(job.geometry(), Some(printable));
    }

    #[test]
    fn page_count_defaults_to_zero() {
        let mut job = RenderJob::new();
        assert_eq!(job.page_count(), 0);
        job.set_page_count(5);
        assert_eq!(job.page_count(), 5);
    }
}
