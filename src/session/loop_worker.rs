use std::sync::{Arc, RwLock};

use anyhow::anyhow;
use image::RgbImage;
use tokio::sync::{watch, Mutex};
use tokio::time::{Duration, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::capture::{encode_jpeg, FrameSource};
use crate::client::AnalysisClient;
use crate::model::EmotionReading;
use crate::timeline::SharedTimeline;

use super::state::{CurrentDisplay, SessionState};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_error, log_info};

pub(super) struct SamplerContext {
    pub session_id: String,
    pub client: Arc<AnalysisClient>,
    pub state: Arc<Mutex<SessionState>>,
    pub timeline: SharedTimeline,
    pub display: Arc<RwLock<CurrentDisplay>>,
    pub latest_frame: Arc<RwLock<Option<RgbImage>>>,
    pub interval: Duration,
    pub request_timeout: Duration,
    pub jpeg_quality: u8,
}

/// Fixed-cadence sampling loop: one frame grabbed, encoded and analyzed per
/// tick. Ticks are a no-op while paused; the tick body is awaited, so at
/// most one analysis request is in flight at a time. Per-tick failures are
/// recorded and the loop keeps going; only cancellation stops it. The
/// source is released on every exit path.
pub(super) async fn sampling_loop(
    source: Box<dyn FrameSource>,
    ctx: SamplerContext,
    cancel: CancellationToken,
    pause_rx: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(ctx.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut slot = Some(source);
    let mut seq: u64 = 0;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if *pause_rx.borrow() {
                    continue;
                }
                let Some(src) = slot.take() else { break };
                seq += 1;

                // The cycle is awaited to completion: an in-flight request is
                // never dropped mid-flight, so stop joins it (bounded by the
                // request timeout) and the device handle always comes back.
                let (src_back, result) = sample_tick(src, &ctx, seq).await;
                slot = src_back;
                if let Err(err) = result {
                    record_failure(&ctx, seq, &err).await;
                }
                if slot.is_none() {
                    log_error!("frame source lost, ending session {}", ctx.session_id);
                    break;
                }
            }
            _ = cancel.cancelled() => {
                log_info!("sampling loop shutting down for session {}", ctx.session_id);
                break;
            }
        }
    }

    if let Some(mut src) = slot {
        src.release();
    }
}

/// One capture+analyze cycle. Always hands the source back unless the grab
/// worker failed to join.
async fn sample_tick(
    src: Box<dyn FrameSource>,
    ctx: &SamplerContext,
    seq: u64,
) -> (Option<Box<dyn FrameSource>>, anyhow::Result<()>) {
    let join = tokio::task::spawn_blocking(move || {
        let mut src = src;
        let frame = src.grab();
        (src, frame)
    })
    .await;

    let (src, grabbed) = match join {
        Ok(pair) => pair,
        Err(err) => return (None, Err(anyhow!("frame grab worker join failed: {err}"))),
    };

    let frame = match grabbed {
        Ok(frame) => frame,
        Err(err) => return (Some(src), Err(err.context("frame grab failed"))),
    };

    // Publish the frame before analysis so the render loop stays fresh even
    // when the classifier is slow.
    *ctx.latest_frame.write().unwrap() = Some(frame.clone());

    let encoded = match encode_jpeg(&frame, ctx.jpeg_quality) {
        Ok(bytes) => bytes,
        Err(err) => return (Some(src), Err(err)),
    };

    let outcome = tokio::time::timeout(ctx.request_timeout, ctx.client.analyze_image(encoded)).await;
    let result = match outcome {
        Ok(Ok(reading)) => {
            apply_reading(ctx, seq, reading).await;
            Ok(())
        }
        Ok(Err(err)) => Err(err),
        Err(_) => Err(anyhow!(
            "analysis request timeout (> {}s)",
            ctx.request_timeout.as_secs()
        )),
    };

    (Some(src), result)
}

async fn apply_reading(ctx: &SamplerContext, seq: u64, reading: EmotionReading) {
    ctx.display
        .write()
        .unwrap()
        .apply(seq, reading.label, reading.confidence);
    ctx.timeline.write().unwrap().append(reading);
    // Error banner clears on the next successful result.
    ctx.state.lock().await.last_error = None;
}

async fn record_failure(ctx: &SamplerContext, seq: u64, err: &anyhow::Error) {
    log_error!(
        "sampling tick failed for session {}: {err:?}",
        ctx.session_id
    );
    ctx.display.write().unwrap().clear(seq);
    ctx.state.lock().await.last_error = Some(err.to_string());
}
