use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle status of a job.
///
/// Each job flows through: SUSPENDED → WORKING ⇄ SUSPENDED → COMPLETE
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Suspended,
    Working,
    Complete,
}

impl JobStatus {
    pub(crate) fn as_u8(self) -> u8 {
        match self {
            JobStatus::Suspended => 0,
            JobStatus::Working => 1,
            JobStatus::Complete => 2,
        }
    }

    pub(crate) fn from_u8(raw: u8) -> Self {
        match raw {
            1 => JobStatus::Working,
            2 => JobStatus::Complete,
            _ => JobStatus::Suspended,
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStatus::Suspended => write!(f, "SUSPENDED"),
            JobStatus::Working => write!(f, "WORKING"),
            JobStatus::Complete => write!(f, "COMPLETE"),
        }
    }
}

/// Elapsed and target time of a running job, in abstract time units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub elapsed: u64,
    pub target: u64,
}

impl Progress {
    pub fn new(target: u64) -> Self {
        Self { elapsed: 0, target }
    }

    /// Target for a job of `duration` hours with the given random scale.
    pub fn for_duration(duration: f64, scale: u32) -> Self {
        let target = (duration.max(0.0) * f64::from(scale)).ceil() as u64;
        Self::new(target)
    }

    pub fn is_complete(&self) -> bool {
        self.elapsed >= self.target
    }

    /// Percentage done, clamped to [0, 100]. An empty target counts as done.
    pub fn percent(&self) -> u8 {
        if self.target == 0 {
            return 100;
        }
        let pct = self.elapsed.saturating_mul(100) / self.target;
        pct.min(100) as u8
    }
}

/// Flags observed by the job task at every tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Controls {
    pub suspended: bool,
    pub cancelled: bool,
}

/// The result of one tick of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Elapsed time advanced; the job keeps working.
    Advanced { percent: u8 },
    /// Suspended: nothing accrued this tick.
    Held { percent: u8 },
    /// Terminal. `cancelled` distinguishes early termination from natural
    /// completion.
    Finished { cancelled: bool },
}

impl Transition {
    pub fn status(&self) -> JobStatus {
        match self {
            Transition::Advanced { .. } => JobStatus::Working,
            Transition::Held { .. } => JobStatus::Suspended,
            Transition::Finished { .. } => JobStatus::Complete,
        }
    }
}

/// Drives the progress of a job one tick at a time.
pub struct StateMachine;

impl StateMachine {
    /// Compute the next transition for the given progress and controls.
    ///
    /// - Cancellation wins over everything and finishes immediately.
    /// - A suspended job holds its elapsed time unchanged.
    /// - Otherwise elapsed grows by `step` and the job finishes once it
    ///   reaches the target.
    pub fn step(progress: &mut Progress, controls: Controls, step: u64) -> Transition {
        if controls.cancelled {
            progress.elapsed = progress.elapsed.max(progress.target);
            return Transition::Finished { cancelled: true };
        }
        if progress.is_complete() {
            return Transition::Finished { cancelled: false };
        }
        if controls.suspended {
            return Transition::Held {
                percent: progress.percent(),
            };
        }

        progress.elapsed = progress.elapsed.saturating_add(step);
        if progress.is_complete() {
            Transition::Finished { cancelled: false }
        } else {
            Transition::Advanced {
                percent: progress.percent(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RUN: Controls = Controls {
        suspended: false,
        cancelled: false,
    };
    const PAUSE: Controls = Controls {
        suspended: true,
        cancelled: false,
    };
    const CANCEL: Controls = Controls {
        suspended: false,
        cancelled: true,
    };

    #[test]
    fn happy_path_runs_to_completion() {
        let mut p = Progress::new(300);

        assert_eq!(
            StateMachine::step(&mut p, RUN, 100),
            Transition::Advanced { percent: 33 }
        );
        assert_eq!(
            StateMachine::step(&mut p, RUN, 100),
            Transition::Advanced { percent: 66 }
        );
        assert_eq!(
            StateMachine::step(&mut p, RUN, 100),
            Transition::Finished { cancelled: false }
        );
        assert_eq!(p.percent(), 100);

        // Complete is terminal.
        assert_eq!(
            StateMachine::step(&mut p, RUN, 100),
            Transition::Finished { cancelled: false }
        );
    }

    #[test]
    fn suspension_freezes_elapsed_time() {
        let mut p = Progress::new(1000);
        StateMachine::step(&mut p, RUN, 100);
        StateMachine::step(&mut p, RUN, 100);
        let frozen = p.elapsed;

        for _ in 0..5 {
            assert_eq!(
                StateMachine::step(&mut p, PAUSE, 100),
                Transition::Held { percent: 20 }
            );
        }
        assert_eq!(p.elapsed, frozen);

        // Resuming continues from the frozen value, no loss and no replay.
        StateMachine::step(&mut p, RUN, 100);
        assert_eq!(p.elapsed, frozen + 100);
    }

    #[test]
    fn cancel_finishes_early() {
        let mut p = Progress::new(1000);
        StateMachine::step(&mut p, RUN, 100);

        assert_eq!(
            StateMachine::step(&mut p, CANCEL, 100),
            Transition::Finished { cancelled: true }
        );
        assert_eq!(p.percent(), 100);
    }

    #[test]
    fn cancel_while_suspended_still_finishes() {
        let mut p = Progress::new(1000);
        let both = Controls {
            suspended: true,
            cancelled: true,
        };
        assert_eq!(
            StateMachine::step(&mut p, both, 100),
            Transition::Finished { cancelled: true }
        );
    }

    #[test]
    fn zero_duration_is_complete_immediately() {
        let p = Progress::for_duration(0.0, 250);
        assert!(p.is_complete());
        assert_eq!(p.percent(), 100);
    }

    #[test]
    fn target_scales_with_duration() {
        assert_eq!(Progress::for_duration(5.0, 100).target, 500);
        assert_eq!(Progress::for_duration(0.1, 399).target, 40);
        assert_eq!(Progress::for_duration(-2.0, 300).target, 0);
    }

    #[test]
    fn percent_is_clamped() {
        let p = Progress {
            elapsed: 900,
            target: 400,
        };
        assert_eq!(p.percent(), 100);
    }

    #[test]
    fn status_round_trips_through_u8() {
        for status in [JobStatus::Suspended, JobStatus::Working, JobStatus::Complete] {
            assert_eq!(JobStatus::from_u8(status.as_u8()), status);
        }
    }

    #[test]
    fn status_display() {
        assert_eq!(JobStatus::Suspended.to_string(), "SUSPENDED");
        assert_eq!(JobStatus::Working.to_string(), "WORKING");
        assert_eq!(JobStatus::Complete.to_string(), "COMPLETE");
    }
}
