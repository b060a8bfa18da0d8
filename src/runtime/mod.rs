mod orchestrator;
mod runner;
mod shutdown;

pub(crate) use runner::run;
