use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::args::Args;

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub capture: CaptureConfig,
    pub transport: TransportConfig,
    pub extractor: ExtractorConfig,
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    pub cam_index: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    pub host: String,
    pub port: u16,
    /// Consecutive send failures before giving up, 0 = never
    pub max_send_failures: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    pub mesh_model: String,
    pub detector_model: String,
    pub refine_landmarks: bool,
    pub score_threshold: f32,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            host: "172.26.95.134".to_string(),
            port: 5005,
            max_send_failures: 50,
        }
    }
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            mesh_model: "models/face_mesh.onnx".to_string(),
            detector_model: "models/face_detection.onnx".to_string(),
            refine_landmarks: true,
            score_threshold: 0.7,
        }
    }
}

impl AppConfig {
    /// Load from `path`, writing the defaults there if the file is missing.
    /// An unparsable file falls back to defaults and is left untouched.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::info!("Configuration file not found. Creating default at {}", path.display());
            let config = Self::default();
            config.save(path)?;
            return Ok(config);
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        // serde(default) fills in any fields missing from older files
        match serde_json::from_str::<AppConfig>(&content) {
            Ok(c) => {
                log::info!("Loaded configuration from {}", path.display());
                Ok(c)
            }
            Err(e) => {
                log::warn!("Error parsing {}: {}. Using defaults.", path.display(), e);
                Ok(Self::default())
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }

    /// Command-line flags win over the file.
    pub fn apply_args(&mut self, args: &Args) {
        if let Some(index) = args.cam_index {
            self.capture.cam_index = index;
        }
        if let Some(host) = &args.host {
            self.transport.host = host.clone();
        }
        if let Some(port) = args.port {
            self.transport.port = port;
        }
        if let Some(limit) = args.max_send_failures {
            self.transport.max_send_failures = limit;
        }
        if let Some(model) = &args.mesh_model {
            self.extractor.mesh_model = model.clone();
        }
        if let Some(model) = &args.detector_model {
            self.extractor.detector_model = model.clone();
        }
        if args.no_refine {
            self.extractor.refine_landmarks = false;
        }
    }
}
