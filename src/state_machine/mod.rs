mod job;
mod state;

pub use job::{CancelOutcome, Job, JobContext};
pub use state::{Controls, JobStatus, Progress, StateMachine, Transition};
