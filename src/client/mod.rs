mod wire;

use anyhow::{bail, Context, Result};
use futures::StreamExt;
use reqwest::multipart::{Form, Part};

use crate::config::ApiSettings;
use crate::model::{EmotionReading, Timestamp};

use wire::RawAnalysis;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::log_warn;

/// HTTP client for the remote emotion analysis service. The service is an
/// opaque collaborator; this client only shapes requests and normalizes the
/// two response forms (single JSON object, streamed records).
#[derive(Debug, Clone)]
pub struct AnalysisClient {
    http: reqwest::Client,
    base_url: String,
    model_path: String,
    landmark_path: String,
}

impl AnalysisClient {
    pub fn new(settings: &ApiSettings) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            model_path: settings.model_path.clone(),
            landmark_path: settings.landmark_path.clone(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/api/v1/analyze", self.base_url)
    }

    async fn post_media(
        &self,
        bytes: Vec<u8>,
        file_name: &str,
        mime: &str,
    ) -> Result<reqwest::Response> {
        let part = Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str(mime)
            .context("invalid media mime type")?;
        let form = Form::new().part("file", part);

        let response = self
            .http
            .post(self.endpoint())
            .query(&[
                ("model_path", self.model_path.as_str()),
                ("landmark_path", self.landmark_path.as_str()),
            ])
            .multipart(form)
            .send()
            .await
            .context("analysis request failed")?;

        let status = response.status();
        if !status.is_success() {
            // Surface the response body verbatim; the backend returns JSON or
            // plain-text error messages.
            let body = response.text().await.unwrap_or_default();
            bail!("analysis service returned {status}: {body}");
        }

        Ok(response)
    }

    /// Analyze a single encoded frame. A `no_face` response is a valid
    /// reading, not an error.
    pub async fn analyze_image(&self, jpeg: Vec<u8>) -> Result<EmotionReading> {
        let response = self.post_media(jpeg, "frame.jpg", "image/jpeg").await?;
        let raw: RawAnalysis = response
            .json()
            .await
            .context("failed to decode analysis response")?;
        Ok(raw.normalize(Timestamp::now()))
    }

    /// Analyze a whole media file, consuming the streamed response
    /// incrementally. Each complete record is normalized and handed to
    /// `on_reading` as it arrives; malformed records are skipped. Returns
    /// the number of readings delivered. A mid-stream transport error stops
    /// consumption and is returned, but readings already delivered stand.
    pub async fn analyze_media<F>(
        &self,
        bytes: Vec<u8>,
        file_name: &str,
        mime: &str,
        mut on_reading: F,
    ) -> Result<usize>
    where
        F: FnMut(EmotionReading),
    {
        let response = self.post_media(bytes, file_name, mime).await?;

        let mut decoder = StreamDecoder::new();
        let mut delivered = 0usize;
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.context("error reading analysis stream")?;
            for reading in decoder.push(&chunk) {
                delivered += 1;
                on_reading(reading);
            }
        }
        if let Some(reading) = decoder.finish() {
            delivered += 1;
            on_reading(reading);
        }

        Ok(delivered)
    }
}

/// Incremental decoder for streamed analysis responses: newline-delimited
/// JSON records, or `text/event-stream` frames whose `data:` lines carry the
/// same records. Partial lines are carried across chunk boundaries; a
/// malformed line is skipped without aborting the stream.
#[derive(Debug, Default)]
pub struct StreamDecoder {
    buf: Vec<u8>,
    records: usize,
}

impl StreamDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk of response bytes, returning the readings completed
    /// by this chunk.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<EmotionReading> {
        self.buf.extend_from_slice(chunk);

        let mut readings = Vec::new();
        while let Some(pos) = self.buf.iter().position(|byte| *byte == b'\n') {
            let line: Vec<u8> = self.buf.drain(..=pos).collect();
            if let Some(reading) = self.decode_line(&line) {
                readings.push(reading);
            }
        }
        readings
    }

    /// Flush the trailing partial line once the stream has ended.
    pub fn finish(&mut self) -> Option<EmotionReading> {
        if self.buf.is_empty() {
            return None;
        }
        let line = std::mem::take(&mut self.buf);
        self.decode_line(&line)
    }

    fn decode_line(&mut self, line: &[u8]) -> Option<EmotionReading> {
        let text = String::from_utf8_lossy(line);
        let mut trimmed = text.trim();

        // Event-stream framing: strip the field name, ignore other fields.
        if let Some(data) = trimmed.strip_prefix("data:") {
            trimmed = data.trim();
        } else if trimmed.contains(':') && !trimmed.starts_with('{') {
            return None;
        }

        if trimmed.is_empty() {
            return None;
        }

        match serde_json::from_str::<RawAnalysis>(trimmed) {
            Ok(raw) => {
                let fallback = Timestamp::Offset(self.records as f64);
                self.records += 1;
                Some(raw.normalize(fallback))
            }
            Err(err) => {
                log_warn!("skipping malformed stream record: {err}");
                None
            }
        }
    }
}
