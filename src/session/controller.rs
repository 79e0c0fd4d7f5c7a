use std::sync::{Arc, RwLock};

use anyhow::{anyhow, bail, Context, Result};
use chrono::Utc;
use image::RgbImage;
use log::info;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::Duration;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::capture::FrameSource;
use crate::client::AnalysisClient;
use crate::config::CaptureSettings;
use crate::model::EmotionReading;
use crate::timeline::{SharedTimeline, Timeline};

use super::loop_worker::{sampling_loop, SamplerContext};
use super::state::{CurrentDisplay, SessionState, SessionStatus};

/// Owns one live-analysis session: the capture device, the sampling loop
/// and the timeline it feeds. Start/pause/resume/stop gate the loop; all
/// teardown funnels through [`SessionController::stop`] so repeated
/// start/stop cycles release every timer and device handle.
pub struct SessionController {
    client: Arc<AnalysisClient>,
    capture: CaptureSettings,
    state: Arc<Mutex<SessionState>>,
    timeline: SharedTimeline,
    display: Arc<RwLock<CurrentDisplay>>,
    latest_frame: Arc<RwLock<Option<RgbImage>>>,
    handle: Option<JoinHandle<()>>,
    cancel_token: Option<CancellationToken>,
    pause_tx: Option<watch::Sender<bool>>,
}

impl SessionController {
    pub fn new(client: AnalysisClient, capture: CaptureSettings, live_capacity: usize) -> Self {
        Self {
            client: Arc::new(client),
            capture,
            state: Arc::new(Mutex::new(SessionState::default())),
            timeline: Timeline::shared(live_capacity),
            display: Arc::new(RwLock::new(CurrentDisplay::default())),
            latest_frame: Arc::new(RwLock::new(None)),
            handle: None,
            cancel_token: None,
            pause_tx: None,
        }
    }

    /// Acquire the device and begin streaming. Acquisition failure leaves
    /// the session idle with the error recorded; no loop is started.
    pub async fn start(&mut self, source: Box<dyn FrameSource>) -> Result<()> {
        if self.handle.is_some() {
            bail!("session already active");
        }

        self.state.lock().await.begin_loading();

        let join = tokio::task::spawn_blocking(move || {
            let mut source = source;
            let opened = source.open();
            (source, opened)
        })
        .await;

        let (source, opened) = match join {
            Ok(pair) => pair,
            Err(err) => {
                let message = format!("device open worker join failed: {err}");
                self.state.lock().await.fail_loading(message.clone());
                return Err(anyhow!(message));
            }
        };

        if let Err(err) = opened {
            let message = format!("could not access the capture device: {err}");
            self.state.lock().await.fail_loading(message.clone());
            return Err(anyhow!(message));
        }

        let session_id = Uuid::new_v4().to_string();
        let started_at = Utc::now();

        // Fresh session, fresh data.
        {
            let capacity = self.timeline.read().unwrap().capacity();
            *self.timeline.write().unwrap() = Timeline::new(capacity);
        }
        self.display.write().unwrap().reset();

        self.state
            .lock()
            .await
            .begin_streaming(session_id.clone(), started_at);

        let cancel_token = CancellationToken::new();
        let (pause_tx, pause_rx) = watch::channel(false);

        let ctx = SamplerContext {
            session_id: session_id.clone(),
            client: self.client.clone(),
            state: self.state.clone(),
            timeline: self.timeline.clone(),
            display: self.display.clone(),
            latest_frame: self.latest_frame.clone(),
            interval: Duration::from_millis(self.capture.interval_ms),
            request_timeout: Duration::from_millis(self.capture.request_timeout_ms),
            jpeg_quality: self.capture.jpeg_quality,
        };

        let handle = tokio::spawn(sampling_loop(source, ctx, cancel_token.clone(), pause_rx));

        self.handle = Some(handle);
        self.cancel_token = Some(cancel_token);
        self.pause_tx = Some(pause_tx);

        info!("live analysis session {session_id} streaming");
        Ok(())
    }

    /// Stop scheduling new sampling ticks. An in-flight request still
    /// completes and its result is applied.
    pub async fn pause(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        if state.status != SessionStatus::Streaming {
            bail!("no streaming session to pause");
        }
        if let Some(tx) = &self.pause_tx {
            let _ = tx.send(true);
        }
        state.status = SessionStatus::Paused;
        Ok(())
    }

    pub async fn resume(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        if state.status != SessionStatus::Paused {
            bail!("no paused session to resume");
        }
        if let Some(tx) = &self.pause_tx {
            let _ = tx.send(false);
        }
        state.status = SessionStatus::Streaming;
        Ok(())
    }

    /// Single teardown routine for every exit path: cancels the loop, joins
    /// it (which releases the device) and returns the session to idle. The
    /// timeline is retained for export until the next start.
    pub async fn stop(&mut self) -> Result<()> {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }
        self.pause_tx = None;

        if let Some(handle) = self.handle.take() {
            handle
                .await
                .context("sampling loop task failed to join")?;
        }

        self.state.lock().await.reset();
        self.display.write().unwrap().reset();
        *self.latest_frame.write().unwrap() = None;
        Ok(())
    }

    pub async fn state(&self) -> SessionState {
        self.state.lock().await.clone()
    }

    pub fn display(&self) -> CurrentDisplay {
        self.display.read().unwrap().clone()
    }

    pub fn timeline(&self) -> SharedTimeline {
        self.timeline.clone()
    }

    pub fn latest_frame(&self) -> Arc<RwLock<Option<RgbImage>>> {
        self.latest_frame.clone()
    }

    /// The most recent detections, newest first.
    pub fn recent(&self, count: usize) -> Vec<EmotionReading> {
        self.timeline.read().unwrap().recent(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::{Resolution, SyntheticSource};
    use crate::config::ApiSettings;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use tokio::time::sleep;

    fn test_client() -> AnalysisClient {
        // Unroutable local port: per-tick request errors, never a response.
        AnalysisClient::new(&ApiSettings {
            base_url: "http://127.0.0.1:9".into(),
            ..ApiSettings::default()
        })
    }

    fn test_capture() -> CaptureSettings {
        CaptureSettings {
            interval_ms: 50,
            request_timeout_ms: 500,
            ..CaptureSettings::default()
        }
    }

    fn synthetic() -> Box<SyntheticSource> {
        Box::new(SyntheticSource::new(Resolution {
            width: 32,
            height: 24,
        }))
    }

    struct RejectingSource;

    impl FrameSource for RejectingSource {
        fn open(&mut self) -> Result<()> {
            bail!("camera permission denied")
        }
        fn resolution(&self) -> Resolution {
            Resolution {
                width: 0,
                height: 0,
            }
        }
        fn grab(&mut self) -> Result<image::RgbImage> {
            bail!("no device")
        }
        fn release(&mut self) {}
    }

    struct CountingSource {
        inner: SyntheticSource,
        grabs: Arc<AtomicUsize>,
    }

    impl FrameSource for CountingSource {
        fn open(&mut self) -> Result<()> {
            self.inner.open()
        }
        fn resolution(&self) -> Resolution {
            self.inner.resolution()
        }
        fn grab(&mut self) -> Result<image::RgbImage> {
            self.grabs.fetch_add(1, Ordering::SeqCst);
            self.inner.grab()
        }
        fn release(&mut self) {}
    }

    struct TrackedSource {
        inner: SyntheticSource,
        released: Arc<AtomicBool>,
    }

    impl FrameSource for TrackedSource {
        fn open(&mut self) -> Result<()> {
            self.inner.open()
        }
        fn resolution(&self) -> Resolution {
            self.inner.resolution()
        }
        fn grab(&mut self) -> Result<image::RgbImage> {
            self.inner.grab()
        }
        fn release(&mut self) {
            self.released.store(true, Ordering::SeqCst);
            self.inner.release();
        }
    }

    #[tokio::test]
    async fn rejected_device_leaves_session_idle_with_error() {
        let mut controller = SessionController::new(test_client(), test_capture(), 30);
        let result = controller.start(Box::new(RejectingSource)).await;
        assert!(result.is_err());

        let state = controller.state().await;
        assert_eq!(state.status, SessionStatus::Idle);
        assert!(!state.last_error.as_deref().unwrap_or("").is_empty());
        // No loop was started.
        assert!(controller.handle.is_none());
    }

    #[tokio::test]
    async fn session_walks_the_state_machine() {
        let mut controller = SessionController::new(test_client(), test_capture(), 30);
        controller.start(synthetic()).await.unwrap();
        assert_eq!(controller.state().await.status, SessionStatus::Streaming);

        controller.pause().await.unwrap();
        assert_eq!(controller.state().await.status, SessionStatus::Paused);

        controller.resume().await.unwrap();
        assert_eq!(controller.state().await.status, SessionStatus::Streaming);

        controller.stop().await.unwrap();
        assert_eq!(controller.state().await.status, SessionStatus::Idle);
    }

    #[tokio::test]
    async fn paused_session_stops_sampling_until_resume() {
        let mut controller = SessionController::new(test_client(), test_capture(), 30);
        let grabs = Arc::new(AtomicUsize::new(0));
        let source = CountingSource {
            inner: SyntheticSource::new(Resolution {
                width: 16,
                height: 16,
            }),
            grabs: grabs.clone(),
        };

        controller.start(Box::new(source)).await.unwrap();
        controller.pause().await.unwrap();
        // Let a tick that started before the pause finish.
        sleep(Duration::from_millis(100)).await;

        let frozen = grabs.load(Ordering::SeqCst);
        let timeline_len = controller.timeline().read().unwrap().len();
        sleep(Duration::from_millis(250)).await;
        assert_eq!(grabs.load(Ordering::SeqCst), frozen);
        assert_eq!(controller.timeline().read().unwrap().len(), timeline_len);

        controller.resume().await.unwrap();
        sleep(Duration::from_millis(250)).await;
        assert!(grabs.load(Ordering::SeqCst) > frozen);

        controller.stop().await.unwrap();
    }

    #[tokio::test]
    async fn pause_without_session_is_rejected() {
        let controller = SessionController::new(test_client(), test_capture(), 30);
        assert!(controller.pause().await.is_err());
        assert!(controller.resume().await.is_err());
    }

    #[tokio::test]
    async fn stop_releases_the_device_every_cycle() {
        let mut controller = SessionController::new(test_client(), test_capture(), 30);

        for _ in 0..3 {
            let released = Arc::new(AtomicBool::new(false));
            let source = TrackedSource {
                inner: SyntheticSource::new(Resolution {
                    width: 16,
                    height: 16,
                }),
                released: released.clone(),
            };
            controller.start(Box::new(source)).await.unwrap();
            controller.stop().await.unwrap();
            assert!(released.load(Ordering::SeqCst));
        }
    }

    #[tokio::test]
    async fn double_start_is_rejected() {
        let mut controller = SessionController::new(test_client(), test_capture(), 30);
        controller.start(synthetic()).await.unwrap();
        assert!(controller.start(synthetic()).await.is_err());
        controller.stop().await.unwrap();
    }
}
