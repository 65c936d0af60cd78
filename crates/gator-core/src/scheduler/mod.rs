mod cycle;
mod service;

pub use cycle::{run_once, CycleOptions, CycleReport};
pub use service::{SchedulerEvent, SchedulerService};
