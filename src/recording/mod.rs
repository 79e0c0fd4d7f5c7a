//! Offline media review: run a recorded image or video file through the
//! analysis service and accumulate the streamed results into a review
//! timeline, with progress reporting for video.

use std::path::Path;

use anyhow::{bail, Context, Result};

use crate::client::AnalysisClient;
use crate::timeline::{Timeline, REVIEW_CAPACITY};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    /// Sniff the media kind from the file extension.
    pub fn from_path(path: &Path) -> Result<MediaKind> {
        let ext = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            "jpg" | "jpeg" | "png" | "gif" | "bmp" | "webp" => Ok(MediaKind::Image),
            "mp4" | "webm" | "mov" | "avi" | "mkv" => Ok(MediaKind::Video),
            other => bail!("unsupported media type: .{other}"),
        }
    }

    fn mime(&self, path: &Path) -> String {
        let ext = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
            .unwrap_or_default();
        let prefix = match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
        };
        match ext.as_str() {
            "jpg" => format!("{prefix}/jpeg"),
            "mov" => format!("{prefix}/quicktime"),
            other => format!("{prefix}/{other}"),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ReviewProgress {
    pub analyzed: usize,
    /// Percent complete, when the media duration is known. Clamped to 100.
    pub percent: Option<f32>,
}

/// Drives the analyze-recording flow against the remote service.
pub struct MediaReview {
    client: AnalysisClient,
    capacity: usize,
}

impl MediaReview {
    pub fn new(client: AnalysisClient) -> Self {
        Self {
            client,
            capacity: REVIEW_CAPACITY,
        }
    }

    pub fn with_capacity(client: AnalysisClient, capacity: usize) -> Self {
        Self { client, capacity }
    }

    pub fn new_timeline(&self) -> Timeline {
        Timeline::new(self.capacity)
    }

    /// Analyze one media file into the caller's timeline. Images produce a
    /// single reading; videos are consumed as a stream, each record appended
    /// as it arrives. On a mid-stream error the readings accumulated so far
    /// stay in `timeline`; only the failure itself is returned. Returns the
    /// number of readings delivered.
    pub async fn analyze_file<F>(
        &self,
        path: &Path,
        duration_secs: Option<f64>,
        timeline: &mut Timeline,
        mut on_progress: F,
    ) -> Result<usize>
    where
        F: FnMut(ReviewProgress),
    {
        let kind = MediaKind::from_path(path)?;
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("failed to read media file {}", path.display()))?;
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("upload")
            .to_string();

        match kind {
            MediaKind::Image => {
                let reading = self.client.analyze_image(bytes).await?;
                timeline.append(reading);
                on_progress(ReviewProgress {
                    analyzed: 1,
                    percent: Some(100.0),
                });
                Ok(1)
            }
            MediaKind::Video => {
                let mime = kind.mime(path);
                self.client
                    .analyze_media(bytes, &file_name, &mime, |reading| {
                        let percent = match (reading.timestamp.offset_secs(), duration_secs) {
                            (Some(offset), Some(duration)) if duration > 0.0 => {
                                Some(((offset / duration * 100.0) as f32).min(100.0))
                            }
                            _ => None,
                        };
                        timeline.append(reading);
                        on_progress(ReviewProgress {
                            analyzed: timeline.len(),
                            percent,
                        });
                    })
                    .await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn sniffs_media_kind_from_extension() {
        assert_eq!(
            MediaKind::from_path(&PathBuf::from("face.JPG")).unwrap(),
            MediaKind::Image
        );
        assert_eq!(
            MediaKind::from_path(&PathBuf::from("clip.mp4")).unwrap(),
            MediaKind::Video
        );
        assert!(MediaKind::from_path(&PathBuf::from("notes.txt")).is_err());
        assert!(MediaKind::from_path(&PathBuf::from("noext")).is_err());
    }

    #[test]
    fn mime_types_follow_the_extension() {
        assert_eq!(
            MediaKind::Image.mime(&PathBuf::from("face.jpg")),
            "image/jpeg"
        );
        assert_eq!(
            MediaKind::Video.mime(&PathBuf::from("clip.webm")),
            "video/webm"
        );
        assert_eq!(
            MediaKind::Video.mime(&PathBuf::from("clip.mov")),
            "video/quicktime"
        );
    }
}
