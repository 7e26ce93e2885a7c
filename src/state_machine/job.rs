use std::ops::Range;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicU64, Ordering};
use std::time::Duration;

use rand::Rng;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::debug;

use super::state::{Controls, JobStatus, Progress, StateMachine, Transition};
use crate::config::SeaportConfig;
use crate::events::{Event, SharedSink};
use crate::world::EntityId;

/// Everything a job task needs from its surroundings.
#[derive(Clone)]
pub struct JobContext {
    pub tick: Duration,
    pub units_per_tick: u64,
    pub scale: Range<u32>,
    pub events: SharedSink,
    /// Signalled whenever a job finishes so the scheduler can wake early.
    pub completions: Arc<Notify>,
}

impl JobContext {
    pub fn from_config(config: &SeaportConfig, events: SharedSink, completions: Arc<Notify>) -> Self {
        Self {
            tick: config.tick(),
            units_per_tick: config.units_per_tick,
            scale: config.scale_min..config.scale_max,
            events,
            completions,
        }
    }
}

/// What a cancel request did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelOutcome {
    /// The running task will observe the flag on its next tick.
    Signalled,
    /// The job had not been started and was finalized on the spot.
    Finalized,
    AlreadyFinished,
}

/// A work order attached to a ship.
///
/// Identity and requirements are immutable. Run state lives in atomics so
/// the job task, the scheduler and the control surface can all touch it
/// without locks.
#[derive(Debug)]
pub struct Job {
    pub id: EntityId,
    pub name: String,
    pub parent: EntityId,
    /// Nominal duration in hours.
    pub duration: f64,
    pub requirements: Vec<String>,
    started: AtomicBool,
    suspend_requested: AtomicBool,
    cancel_requested: AtomicBool,
    finished: AtomicBool,
    status: AtomicU8,
    percent: AtomicU8,
    elapsed: AtomicU64,
}

impl Job {
    pub fn new(
        id: EntityId,
        name: impl Into<String>,
        parent: EntityId,
        duration: f64,
        requirements: Vec<String>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            parent,
            duration: duration.max(0.0),
            requirements,
            started: AtomicBool::new(false),
            suspend_requested: AtomicBool::new(false),
            cancel_requested: AtomicBool::new(false),
            finished: AtomicBool::new(false),
            status: AtomicU8::new(JobStatus::Suspended.as_u8()),
            percent: AtomicU8::new(0),
            elapsed: AtomicU64::new(0),
        }
    }

    /// Spawns the execution task. Returns `None` if the job was already
    /// started.
    pub fn start(self: &Arc<Self>, ctx: &JobContext) -> Option<JoinHandle<()>> {
        // SeqCst pairs with `request_cancel`: either the task sees the cancel
        // flag on entry or the canceller sees the job as started.
        if self.started.swap(true, Ordering::SeqCst) {
            return None;
        }
        let job = Arc::clone(self);
        let ctx = ctx.clone();
        Some(tokio::spawn(async move { job.run(ctx).await }))
    }

    /// Flips the suspend flag and returns its new value.
    pub fn request_suspend_toggle(&self) -> bool {
        !self.suspend_requested.fetch_xor(true, Ordering::AcqRel)
    }

    pub fn request_cancel(&self) -> CancelOutcome {
        if self.is_finished() {
            return CancelOutcome::AlreadyFinished;
        }
        self.cancel_requested.store(true, Ordering::SeqCst);
        if self.started.load(Ordering::SeqCst) {
            CancelOutcome::Signalled
        } else if self.mark_finished() {
            CancelOutcome::Finalized
        } else {
            CancelOutcome::AlreadyFinished
        }
    }

    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Acquire)
    }

    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::Acquire)
    }

    pub fn is_suspend_requested(&self) -> bool {
        self.suspend_requested.load(Ordering::Acquire)
    }

    pub fn is_cancel_requested(&self) -> bool {
        self.cancel_requested.load(Ordering::Acquire)
    }

    pub fn status(&self) -> JobStatus {
        JobStatus::from_u8(self.status.load(Ordering::Acquire))
    }

    pub fn percent(&self) -> u8 {
        self.percent.load(Ordering::Acquire)
    }

    /// Time units accrued so far.
    pub fn elapsed(&self) -> u64 {
        self.elapsed.load(Ordering::Acquire)
    }

    fn controls(&self) -> Controls {
        Controls {
            suspended: self.suspend_requested.load(Ordering::Acquire),
            cancelled: self.cancel_requested.load(Ordering::SeqCst),
        }
    }

    async fn run(self: Arc<Self>, ctx: JobContext) {
        let scale = rand::thread_rng().gen_range(ctx.scale.clone());
        let mut progress = Progress::for_duration(self.duration, scale);
        debug!(job = self.id, target = progress.target, scale, "job started");

        let mut last = (self.status(), self.percent());
        let mut cancelled = self.controls().cancelled;

        while !progress.is_complete() && !cancelled {
            sleep(ctx.tick).await;
            let transition = StateMachine::step(&mut progress, self.controls(), ctx.units_per_tick);
            match transition {
                Transition::Finished { cancelled: c } => {
                    cancelled = c;
                    break;
                }
                Transition::Advanced { percent } | Transition::Held { percent } => {
                    self.elapsed.store(progress.elapsed, Ordering::Release);
                    let now = (transition.status(), percent);
                    if now != last {
                        self.status.store(now.0.as_u8(), Ordering::Release);
                        self.percent.store(percent, Ordering::Release);
                        ctx.events.emit(Event::JobProgress {
                            job: self.id,
                            percent,
                            status: now.0,
                        });
                        last = now;
                    }
                }
            }
        }

        if !cancelled {
            self.elapsed.store(progress.elapsed, Ordering::Release);
        }
        if self.mark_finished() {
            debug!(job = self.id, cancelled, "job finished");
            ctx.events.emit(Event::JobProgress {
                job: self.id,
                percent: 100,
                status: JobStatus::Complete,
            });
        }
        ctx.completions.notify_one();
    }

    /// Forces progress to 100 and sets the finished flag. Returns `true` if
    /// this call was the one that finished the job.
    fn mark_finished(&self) -> bool {
        self.percent.store(100, Ordering::Release);
        self.status.store(JobStatus::Complete.as_u8(), Ordering::Release);
        !self.finished.swap(true, Ordering::AcqRel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::NullSink;
    use crate::events::testing::RecordingSink;

    fn ctx_with(events: SharedSink) -> JobContext {
        JobContext {
            tick: Duration::from_millis(100),
            units_per_tick: 100,
            scale: 100..400,
            events,
            completions: Arc::new(Notify::new()),
        }
    }

    fn ctx() -> JobContext {
        ctx_with(Arc::new(NullSink))
    }

    fn job(duration: f64) -> Arc<Job> {
        Arc::new(Job::new(60001, "Load_Cargo", 30001, duration, vec!["crane".into()]))
    }

    #[test]
    fn job_creation_defaults() {
        let job = job(2.5);
        assert_eq!(job.status(), JobStatus::Suspended);
        assert_eq!(job.percent(), 0);
        assert!(!job.is_finished());
        assert!(!job.is_started());
    }

    #[test]
    fn negative_duration_is_clamped() {
        let job = Job::new(1, "x", 2, -3.0, vec![]);
        assert_eq!(job.duration, 0.0);
    }

    #[test]
    fn suspend_toggle_flips() {
        let job = job(1.0);
        assert!(job.request_suspend_toggle());
        assert!(job.is_suspend_requested());
        assert!(!job.request_suspend_toggle());
        assert!(!job.is_suspend_requested());
    }

    #[test]
    fn cancel_before_start_finalizes() {
        let job = job(5.0);
        assert_eq!(job.request_cancel(), CancelOutcome::Finalized);
        assert!(job.is_finished());
        assert_eq!(job.percent(), 100);
        assert_eq!(job.status(), JobStatus::Complete);
        assert_eq!(job.request_cancel(), CancelOutcome::AlreadyFinished);
    }

    #[tokio::test(start_paused = true)]
    async fn start_is_idempotent() {
        let job = job(0.0);
        let ctx = ctx();
        let handle = job.start(&ctx).expect("first start spawns");
        assert!(job.start(&ctx).is_none());
        handle.await.unwrap();
        assert!(job.is_finished());
    }

    #[tokio::test(start_paused = true)]
    async fn zero_duration_finishes_without_ticking() {
        let sink = Arc::new(RecordingSink::default());
        let job = job(0.0);
        job.start(&ctx_with(sink.clone())).unwrap().await.unwrap();

        assert!(job.is_finished());
        assert_eq!(job.elapsed(), 0);
        assert_eq!(
            sink.events(),
            vec![Event::JobProgress {
                job: 60001,
                percent: 100,
                status: JobStatus::Complete
            }]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn natural_completion_reaches_target() {
        let job = job(0.2);
        job.start(&ctx()).unwrap().await.unwrap();

        assert!(job.is_finished());
        assert_eq!(job.percent(), 100);
        assert_eq!(job.status(), JobStatus::Complete);
        // 0.2 h scaled by [100, 400) is at most 80 units: a single tick.
        assert_eq!(job.elapsed(), 100);
    }

    #[tokio::test(start_paused = true)]
    async fn suspend_freezes_and_resume_continues() {
        let job = job(5.0);
        let handle = job.start(&ctx()).unwrap();

        sleep(Duration::from_millis(250)).await;
        assert_eq!(job.elapsed(), 200);
        assert_eq!(job.status(), JobStatus::Working);

        job.request_suspend_toggle();
        sleep(Duration::from_millis(1000)).await;
        assert_eq!(job.elapsed(), 200);
        assert_eq!(job.status(), JobStatus::Suspended);
        assert!(!job.is_finished());

        job.request_suspend_toggle();
        sleep(Duration::from_millis(100)).await;
        assert_eq!(job.elapsed(), 300);
        assert_eq!(job.status(), JobStatus::Working);

        job.request_cancel();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_mid_run_finishes_within_one_tick() {
        let job = job(5.0);
        let handle = job.start(&ctx()).unwrap();

        sleep(Duration::from_millis(250)).await;
        assert!(!job.is_finished());

        assert_eq!(job.request_cancel(), CancelOutcome::Signalled);
        sleep(Duration::from_millis(100)).await;

        assert!(job.is_finished());
        assert_eq!(job.percent(), 100);
        assert_eq!(job.status(), JobStatus::Complete);
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_while_suspended_finishes() {
        let job = job(5.0);
        let handle = job.start(&ctx()).unwrap();
        job.request_suspend_toggle();
        sleep(Duration::from_millis(350)).await;

        job.request_cancel();
        handle.await.unwrap();
        assert!(job.is_finished());
        assert_eq!(job.elapsed(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn finished_is_monotonic() {
        let job = job(0.1);
        let handle = job.start(&ctx()).unwrap();
        let mut seen_finished = false;
        for _ in 0..20 {
            let now = job.is_finished();
            assert!(!(seen_finished && !now), "finished went true -> false");
            seen_finished |= now;
            // Toggling and cancelling after the fact must not resurrect it.
            job.request_suspend_toggle();
            sleep(Duration::from_millis(30)).await;
        }
        handle.await.unwrap();
        assert!(job.is_finished());
        job.request_cancel();
        assert!(job.is_finished());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn cancel_racing_start_never_reopens_a_finalized_job() {
        let sink = Arc::new(RecordingSink::default());
        let ctx = JobContext {
            tick: Duration::from_millis(1),
            ..ctx_with(sink.clone())
        };

        for id in 0..200 {
            let job = Arc::new(Job::new(id, "race", 1, 5.0, vec![]));
            let canceller = {
                let job = Arc::clone(&job);
                std::thread::spawn(move || job.request_cancel())
            };
            let handle = job.start(&ctx);
            let outcome = canceller.join().unwrap();
            if let Some(handle) = handle {
                handle.await.unwrap();
            }

            assert!(job.is_finished(), "job {id} ({outcome:?})");
            assert_eq!(job.status(), JobStatus::Complete, "job {id} ({outcome:?})");
            assert_eq!(job.percent(), 100, "job {id} ({outcome:?})");
            if outcome == CancelOutcome::Finalized {
                let reopened = sink.events().into_iter().any(|e| {
                    matches!(e, Event::JobProgress { job, status, .. }
                        if job == id && status != JobStatus::Complete)
                });
                assert!(!reopened, "finalized job {id} reported progress");
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn completion_notifies_scheduler() {
        let ctx = ctx();
        let notified = ctx.completions.clone();
        job(0.0).start(&ctx).unwrap().await.unwrap();
        // The permit stored by notify_one is consumed immediately.
        tokio::time::timeout(Duration::from_millis(1), notified.notified())
            .await
            .expect("completion should leave a permit");
    }
}
