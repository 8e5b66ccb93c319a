//! Event waiting helpers

use coursesync::{CredentialId, Event, SyncReport, SyncStage};
use std::time::Duration;
use tokio::sync::broadcast;

/// Result of waiting for a sync run to finish
#[derive(Debug)]
pub enum WaitResult {
    /// The run completed
    Completed(SyncReport),
    /// The run failed at a stage
    Failed(SyncStage, String),
    /// Timeout waiting for the run
    Timeout,
    /// Channel closed unexpectedly
    ChannelClosed,
}

/// Wait for the next sync run of `credential` to finish
pub async fn wait_for_sync(
    events: &mut broadcast::Receiver<Event>,
    credential: CredentialId,
    timeout: Duration,
) -> WaitResult {
    let result = tokio::time::timeout(timeout, async {
        loop {
            match events.recv().await {
                Ok(Event::SyncCompleted {
                    credential: id,
                    report,
                }) if id == credential => return WaitResult::Completed(report),
                Ok(Event::SyncFailed {
                    credential: id,
                    stage,
                    error,
                }) if id == credential => return WaitResult::Failed(stage, error),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => return WaitResult::ChannelClosed,
            }
        }
    })
    .await;

    result.unwrap_or(WaitResult::Timeout)
}

/// Collect events until `done` matches one or the timeout passes
pub async fn collect_events_until<F>(
    events: &mut broadcast::Receiver<Event>,
    timeout: Duration,
    done: F,
) -> Vec<Event>
where
    F: Fn(&Event) -> bool,
{
    let mut collected = Vec::new();
    let _ = tokio::time::timeout(timeout, async {
        while let Ok(event) = events.recv().await {
            let finished = done(&event);
            collected.push(event);
            if finished {
                break;
            }
        }
    })
    .await;
    collected
}
