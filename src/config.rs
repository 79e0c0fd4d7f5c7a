use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, sync::RwLock};

/// Connection details for the remote analysis service, including the model
/// artifacts the service is asked to load (relative paths on the backend).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiSettings {
    pub base_url: String,
    pub model_path: String,
    pub landmark_path: String,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".into(),
            model_path: "models/torchscript_model_0_66_37_wo_gl.pth".into(),
            landmark_path: "models/shape_predictor_68_face_landmarks.dat".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureSettings {
    pub width: u32,
    pub height: u32,
    pub interval_ms: u64,
    pub request_timeout_ms: u64,
    pub jpeg_quality: u8,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            interval_ms: 1_000,
            request_timeout_ms: 10_000,
            jpeg_quality: 80,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserSettings {
    pub api: ApiSettings,
    pub capture: CaptureSettings,
    pub live_capacity: usize,
    pub review_capacity: usize,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            api: ApiSettings::default(),
            capture: CaptureSettings::default(),
            live_capacity: 30,
            review_capacity: 1_000,
        }
    }
}

pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<UserSettings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_default()
        } else {
            UserSettings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn snapshot(&self) -> UserSettings {
        self.data.read().unwrap().clone()
    }

    pub fn api(&self) -> ApiSettings {
        self.data.read().unwrap().api.clone()
    }

    pub fn capture(&self) -> CaptureSettings {
        self.data.read().unwrap().capture.clone()
    }

    pub fn update(&self, settings: UserSettings) -> Result<()> {
        let mut guard = self.data.write().unwrap();
        *guard = settings;
        self.persist(&guard)
    }

    fn persist(&self, data: &UserSettings) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }
}

/// Reads the `EMOSENSE_DEBUG` environment variable used to enable per-tick
/// heartbeat logging.
pub fn debug_mode() -> bool {
    std::env::var("EMOSENSE_DEBUG")
        .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::new(dir.path().join("settings.json")).unwrap();
        let settings = store.snapshot();
        assert_eq!(settings.api.base_url, "http://localhost:8000");
        assert_eq!(settings.live_capacity, 30);
    }

    #[test]
    fn update_persists_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let store = SettingsStore::new(path.clone()).unwrap();

        let mut settings = store.snapshot();
        settings.api.base_url = "http://10.0.0.2:9000/".into();
        settings.capture.interval_ms = 500;
        store.update(settings).unwrap();

        let reloaded = SettingsStore::new(path).unwrap();
        assert_eq!(reloaded.api().base_url, "http://10.0.0.2:9000/");
        assert_eq!(reloaded.capture().interval_ms, 500);
    }
}
