use anyhow::{bail, Context, Result};
use image::imageops::FilterType;
use ort::session::{builder::GraphOptimizationLevel, Session};
use std::path::Path;

use crate::config::ExtractorConfig;
use crate::detector::FaceDetector;
use crate::pipeline::LandmarkExtractor;
use crate::types::{Frame, Landmarks, Point3D};

pub const MESH_LANDMARKS: usize = 468;
/// Mesh plus five iris points per eye
pub const REFINED_LANDMARKS: usize = 478;

const MESH_INPUT: u32 = 192;
const ROI_PADDING: f32 = 0.25;

pub fn landmark_count(refine: bool) -> usize {
    if refine {
        REFINED_LANDMARKS
    } else {
        MESH_LANDMARKS
    }
}

/// Face landmarks from an ONNX face-mesh model, optionally cropped to the
/// first face an UltraFace detector finds.
pub struct FaceMeshExtractor {
    mesh_session: Session,
    detector: Option<FaceDetector>,
    landmark_count: usize,
    presence_threshold: f32,
}

impl FaceMeshExtractor {
    pub fn new(config: &ExtractorConfig) -> Result<Self> {
        let detector = if Path::new(&config.detector_model).exists() {
            log::info!("Loading face detector from {}", config.detector_model);
            Some(FaceDetector::new(&config.detector_model, config.score_threshold)?)
        } else {
            log::warn!(
                "Face detector {} not found, running the mesh on the full frame",
                config.detector_model
            );
            None
        };

        if !Path::new(&config.mesh_model).exists() {
            bail!("Face mesh model not found at {}", config.mesh_model);
        }
        log::info!("Loading face mesh from {}", config.mesh_model);
        let mesh_session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(4)?
            .with_execution_providers([ort::execution_providers::CPUExecutionProvider::default().build()])?
            .commit_from_file(&config.mesh_model)
            .with_context(|| format!("Failed to load face mesh from {}", config.mesh_model))?;

        Ok(Self {
            mesh_session,
            detector,
            landmark_count: landmark_count(config.refine_landmarks),
            presence_threshold: config.score_threshold,
        })
    }
}

impl LandmarkExtractor for FaceMeshExtractor {
    fn name(&self) -> String {
        format!("Face Mesh ({} pts)", self.landmark_count)
    }

    fn detect(&mut self, frame: &Frame) -> Result<Option<Landmarks>> {
        let (frame_w, frame_h) = (frame.width() as f32, frame.height() as f32);

        // 1. Pick the face region: first detection, or the whole frame without a detector
        let (crop, offset_x, offset_y, crop_w, crop_h) = match &mut self.detector {
            Some(det) => {
                let Some(first) = det.detect(frame)?.into_iter().next() else {
                    return Ok(None);
                };
                let rect = first.rect;

                // Expand ROI slightly for better mesh context, then clip to frame
                let pad_w = rect.width * ROI_PADDING;
                let pad_h = rect.height * ROI_PADDING;
                let x = (rect.x - pad_w / 2.0).max(0.0);
                let y = (rect.y - pad_h / 2.0).max(0.0);
                let w = (rect.width + pad_w).min(frame_w - x);
                let h = (rect.height + pad_h).min(frame_h - y);
                if w < 1.0 || h < 1.0 {
                    return Ok(None);
                }

                let crop = image::imageops::crop_imm(frame, x as u32, y as u32, w as u32, h as u32).to_image();
                (crop, x, y, w, h)
            }
            None => (frame.clone(), 0.0, 0.0, frame_w, frame_h),
        };

        // 2. Mesh inference, NHWC [1, 192, 192, 3] in [-1, 1]
        let resized = image::imageops::resize(&crop, MESH_INPUT, MESH_INPUT, FilterType::Triangle);
        let mut input_data = Vec::with_capacity((MESH_INPUT * MESH_INPUT * 3) as usize);
        for pixel in resized.pixels() {
            for c in 0..3 {
                input_data.push((pixel[c] as f32 / 127.5) - 1.0);
            }
        }

        let shape = vec![1, MESH_INPUT as usize, MESH_INPUT as usize, 3];
        let input = ort::value::Tensor::from_array((shape, input_data))?;
        let outputs = self.mesh_session.run(ort::inputs![input])?;

        let needed = self.landmark_count * 3;
        let mut coords: Option<Vec<f32>> = None;
        let mut presence: Option<f32> = None;
        for i in 0..outputs.len() {
            let (_, data) = outputs[i].try_extract_tensor::<f32>()?;
            if data.len() >= needed && coords.is_none() {
                coords = Some(data[..needed].to_vec());
            } else if data.len() == 1 {
                presence = Some(data[0]);
            }
        }

        let Some(coords) = coords else {
            bail!(
                "Face mesh model has no output with {} landmarks; use a refined (attention) mesh model or disable refinement",
                self.landmark_count
            );
        };

        // Face-presence logit, only meaningful when no detector gated the crop
        if self.detector.is_none() {
            if let Some(logit) = presence {
                let p = 1.0 / (1.0 + (-logit).exp());
                if p < self.presence_threshold {
                    return Ok(None);
                }
            }
        }

        // Mesh local (0..192) -> crop -> frame -> normalized
        let scale_x = crop_w / MESH_INPUT as f32;
        let scale_y = crop_h / MESH_INPUT as f32;
        let points = coords
            .chunks_exact(3)
            .map(|c| Point3D {
                x: (offset_x + c[0] * scale_x) / frame_w,
                y: (offset_y + c[1] * scale_y) / frame_h,
                z: c[2] * scale_x / frame_w,
            })
            .collect();

        Ok(Some(Landmarks { points }))
    }
}
