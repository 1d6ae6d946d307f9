// Bounded-retry execution of a single job's attempt function
//
// Retries are immediate (no backoff) and the loop is iterative, so large
// retry budgets cannot grow the stack.

use crate::errors::ExecutionError;
use metrics::counter;
use std::future::Future;
use tracing::warn;

/// Run `attempt` until it succeeds or the budget is exhausted.
///
/// `tries` is the remaining-attempts budget: the function is invoked at
/// most `tries + 1` times. On exhaustion the final attempt's error is
/// returned unchanged.
pub async fn run_with_retry<F, Fut>(mut attempt: F, tries: u32) -> Result<(), ExecutionError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<(), ExecutionError>>,
{
    let mut remaining = tries;
    loop {
        match attempt().await {
            Ok(()) => return Ok(()),
            Err(e) if remaining == 0 => return Err(e),
            Err(e) => {
                counter!("jobs_retried_total").increment(1);
                warn!(error = %e, remaining, "Job attempt failed, retrying");
                remaining -= 1;
            }
        }
    }
}
