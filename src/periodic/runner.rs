use std::{future::Future, time::Duration};

use tokio_util::sync::CancellationToken;

/// A task that repeats with a delay of its choosing between runs.
pub(crate) trait PeriodicTask: Send {
    fn name(&self) -> &'static str;

    /// One iteration. Returns the delay before the next run, or `None` to stop.
    fn run_once(&mut self) -> impl Future<Output = Option<Duration>> + Send;
}

/// Runs `task` until it stops itself, `max_runs` is reached or `shutdown` fires.
///
/// Cancellation is observed between runs only; a run in progress completes.
/// Returns the number of completed runs.
pub(crate) async fn run_with_shutdown<T: PeriodicTask>(
    task: &mut T,
    shutdown: &CancellationToken,
    max_runs: Option<u64>,
) -> u64 {
    let task_name = task.name();
    let mut runs = 0;
    loop {
        if shutdown.is_cancelled() {
            tracing::info!(task = task_name, "Periodic task shutting down");
            break;
        }

        let delay = task.run_once().await;
        runs += 1;
        let Some(delay) = delay else {
            tracing::info!(task = task_name, runs, "Periodic task stopped itself");
            break;
        };
        if max_runs.is_some_and(|max| runs >= max) {
            break;
        }

        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = shutdown.cancelled() => {
                tracing::info!(task = task_name, "Periodic task shutting down");
                break;
            }
        }
    }
    runs
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Counter {
        runs: u64,
        stop_after: Option<u64>,
        cancel_after: Option<(u64, CancellationToken)>,
    }

    impl Counter {
        fn new() -> Self {
            Self {
                runs: 0,
                stop_after: None,
                cancel_after: None,
            }
        }
    }

    impl PeriodicTask for Counter {
        fn name(&self) -> &'static str {
            "counter"
        }

        async fn run_once(&mut self) -> Option<Duration> {
            self.runs += 1;
            if let Some((after, token)) = &self.cancel_after
                && self.runs >= *after
            {
                token.cancel();
            }
            if self.stop_after.is_some_and(|after| self.runs >= after) {
                return None;
            }
            Some(Duration::from_secs(600))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn stops_after_max_runs() {
        let mut task = Counter::new();
        let runs = run_with_shutdown(&mut task, &CancellationToken::new(), Some(3)).await;
        assert_eq!(runs, 3);
        assert_eq!(task.runs, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn single_run_does_not_sleep() {
        let started = tokio::time::Instant::now();
        let mut task = Counter::new();
        run_with_shutdown(&mut task, &CancellationToken::new(), Some(1)).await;
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_interrupts_the_sleep() {
        let shutdown = CancellationToken::new();
        let mut task = Counter::new();
        task.cancel_after = Some((2, shutdown.clone()));

        let runs = run_with_shutdown(&mut task, &shutdown, None).await;
        assert_eq!(runs, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn task_can_stop_itself() {
        let mut task = Counter::new();
        task.stop_after = Some(4);
        let runs = run_with_shutdown(&mut task, &CancellationToken::new(), None).await;
        assert_eq!(runs, 4);
    }

    #[tokio::test]
    async fn cancelled_before_start_runs_nothing() {
        let shutdown = CancellationToken::new();
        shutdown.cancel();
        let mut task = Counter::new();
        assert_eq!(run_with_shutdown(&mut task, &shutdown, None).await, 0);
    }
}
