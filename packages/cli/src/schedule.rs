//! Periodic cycle loop.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tokio::time::MissedTickBehavior;

/// Runs `cycle` immediately and then every `interval` until `shutdown`
/// resolves. Returns the number of cycles started.
///
/// A failed cycle is logged and the loop continues. Ticks missed while a
/// cycle was running are skipped, so cycles never overlap. Shutdown is
/// only observed between cycles.
pub async fn run_schedule<F, Fut, E>(
    interval: Duration,
    shutdown: impl Future<Output = ()>,
    mut cycle: F,
) -> usize
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<(), E>>,
    E: Display,
{
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    tokio::pin!(shutdown);

    let mut cycles = 0;
    loop {
        tokio::select! {
            biased;
            () = &mut shutdown => {
                log::info!("Shutdown requested after {cycles} cycles");
                break;
            }
            _ = ticker.tick() => {
                cycles += 1;
                log::info!("Starting cycle {cycles}");
                if let Err(e) = cycle().await {
                    log::error!("Cycle {cycles} failed: {e}");
                }
            }
        }
    }
    cycles
}
