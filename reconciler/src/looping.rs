//! The reconciliation loop: drive a [`Session`] from a frame stream until it
//! reaches `Done` or `Failed`.

use std::pin::pin;

use futures::stream::{Stream, StreamExt};
use tracing::{debug, info, instrument};

use crate::error::TransportError;
use crate::io::config::ReconcileConfig;
use crate::io::frames::FrameItem;
use crate::session::{FrameStep, ReconcileFailure, Reconciled, Session};

/// Reconcile `original` against every frame of `frames`.
///
/// Waiting for the next frame is the only suspension point. A read failure or
/// a stream that ends before a terminal frame fails the session with a
/// transport error; nothing is retried. No frame is pulled after the session
/// finishes.
#[instrument(skip_all, fields(original_len = original.len()))]
pub async fn reconcile<S>(
    original: String,
    frames: S,
    config: &ReconcileConfig,
) -> Result<Reconciled, ReconcileFailure>
where
    S: Stream<Item = FrameItem>,
{
    let mut session = Session::new(original, config);
    let mut frames = pin!(frames);

    loop {
        let raw = match frames.next().await {
            Some(Ok(raw)) => raw,
            Some(Err(err)) => {
                session.fail(err.into());
                break;
            }
            None => {
                session.fail(TransportError::Closed.into());
                break;
            }
        };
        match session.handle_frame(&raw) {
            Ok(FrameStep::Continue) => {}
            Ok(FrameStep::Finished) => break,
            Err(err) if err.is_fatal() => break,
            Err(err) => debug!(error = %err, "recoverable frame error"),
        }
    }

    let outcome = session.finish();
    match &outcome {
        Ok(done) => info!(
            frames = done.stats.frames,
            patches = done.stats.patches_applied,
            "reconciliation done"
        ),
        Err(failure) => info!(
            frames = failure.stats.frames,
            patches = failure.stats.patches_applied,
            error = %failure.error,
            "reconciliation failed"
        ),
    }
    outcome
}

/// Run `passes` sessions back to back, each over the previous pass's output.
///
/// `open_frames` is called once per pass (1-indexed) and must return a fresh
/// frame stream for that pass. Stops at the first failed pass.
pub async fn reconcile_passes<F, S>(
    original: String,
    passes: u32,
    config: &ReconcileConfig,
    mut open_frames: F,
) -> Result<Vec<Reconciled>, ReconcileFailure>
where
    F: FnMut(u32) -> S,
    S: Stream<Item = FrameItem>,
{
    let mut text = original;
    let mut outcomes = Vec::with_capacity(passes as usize);
    for pass in 1..=passes {
        debug!(pass, passes, "starting pass");
        let done = reconcile(text, open_frames(pass), config).await?;
        text = done.text.clone();
        outcomes.push(done);
    }
    Ok(outcomes)
}
