mod runner;

pub(crate) use runner::{PeriodicTask, run_with_shutdown};
