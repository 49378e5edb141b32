use crate::types::{Frame, Rect};
use anyhow::{Context, Result};
use image::imageops::FilterType;
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Tensor;

const INPUT_W: u32 = 320;
const INPUT_H: u32 = 240;
const NMS_IOU: f32 = 0.3;

/// A face box with the detector's confidence
#[derive(Debug, Clone, Copy)]
pub struct Detection {
    pub rect: Rect,
    pub score: f32,
}

/// UltraFace-style detector producing face boxes in frame pixels
pub struct FaceDetector {
    session: Session,
    anchors: Vec<(f32, f32, f32, f32)>, // cx, cy, w, h
    score_threshold: f32,
}

impl FaceDetector {
    pub fn new(model_path: &str, score_threshold: f32) -> Result<Self> {
        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(4)?
            .with_execution_providers([ort::execution_providers::CPUExecutionProvider::default().build()])?
            .commit_from_file(model_path)
            .with_context(|| format!("Failed to load face detector from {}", model_path))?;

        let anchors = generate_anchors(INPUT_W as usize, INPUT_H as usize);
        Ok(Self {
            session,
            anchors,
            score_threshold,
        })
    }

    /// All faces in the frame, most confident first.
    pub fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>> {
        let resized = image::imageops::resize(frame, INPUT_W, INPUT_H, FilterType::Triangle);

        // NCHW [1, 3, 240, 320], normalized (pixel - 127) / 128
        let plane = (INPUT_W * INPUT_H) as usize;
        let mut input_data = vec![0.0f32; 3 * plane];
        for (x, y, pixel) in resized.enumerate_pixels() {
            let offset = (y * INPUT_W + x) as usize;
            for c in 0..3 {
                input_data[c * plane + offset] = (pixel[c] as f32 - 127.0) / 128.0;
            }
        }

        let input_tensor = Tensor::from_array((vec![1, 3, INPUT_H as usize, INPUT_W as usize], input_data))?;
        let outputs = self.session.run(ort::inputs![input_tensor])?;

        let (_scores_shape, scores_data) = outputs["scores"].try_extract_tensor::<f32>()?;
        let (_boxes_shape, boxes_data) = outputs["boxes"].try_extract_tensor::<f32>()?;

        let candidates = decode_boxes(&self.anchors, scores_data, boxes_data, self.score_threshold);

        // Scale back to original frame
        let sx = frame.width() as f32 / INPUT_W as f32;
        let sy = frame.height() as f32 / INPUT_H as f32;

        Ok(suppress(candidates)
            .into_iter()
            .map(|d| Detection {
                rect: Rect::new(d.rect.x * sx, d.rect.y * sy, d.rect.width * sx, d.rect.height * sy),
                score: d.score,
            })
            .collect())
    }
}

/// Decode every anchor above the threshold into a box in input pixels.
fn decode_boxes(
    anchors: &[(f32, f32, f32, f32)],
    scores_raw: &[f32],
    boxes_raw: &[f32],
    threshold: f32,
) -> Vec<Detection> {
    // Variance for UltraFace
    let center_variance = 0.1;
    let size_variance = 0.2;

    let usable = anchors
        .len()
        .min(scores_raw.len() / 2)
        .min(boxes_raw.len() / 4);

    let mut found = Vec::new();
    for i in 0..usable {
        let score = scores_raw[i * 2 + 1];
        if score <= threshold {
            continue;
        }

        let (ax, ay, aw, ah) = anchors[i];
        let cx = boxes_raw[i * 4] * center_variance * aw + ax;
        let cy = boxes_raw[i * 4 + 1] * center_variance * ah + ay;
        let w = (boxes_raw[i * 4 + 2] * size_variance).exp() * aw;
        let h = (boxes_raw[i * 4 + 3] * size_variance).exp() * ah;

        let x = cx - w / 2.0;
        let y = cy - h / 2.0;

        found.push(Detection {
            rect: Rect::new(
                x * INPUT_W as f32,
                y * INPUT_H as f32,
                w * INPUT_W as f32,
                h * INPUT_H as f32,
            ),
            score,
        });
    }
    found
}

/// Greedy non-maximum suppression; output is sorted by score, descending.
fn suppress(mut candidates: Vec<Detection>) -> Vec<Detection> {
    candidates.sort_by(|a, b| b.score.total_cmp(&a.score));

    let mut kept: Vec<Detection> = Vec::new();
    for cand in candidates {
        if kept.iter().all(|k| k.rect.iou(&cand.rect) < NMS_IOU) {
            kept.push(cand);
        }
    }
    kept
}

fn generate_anchors(width: usize, height: usize) -> Vec<(f32, f32, f32, f32)> {
    // UltraFace configs
    let shrinkage_list = [8, 16, 32, 64];
    let min_boxes: [&[f32]; 4] = [
        &[10.0, 16.0, 24.0],
        &[32.0, 48.0],
        &[64.0, 96.0],
        &[128.0, 192.0, 256.0],
    ];
    let mut anchors = Vec::new();

    let w = width as f32;
    let h = height as f32;

    for (i, &shrinkage) in shrinkage_list.iter().enumerate() {
        let feature_h = (h / shrinkage as f32).ceil() as usize;
        let feature_w = (w / shrinkage as f32).ceil() as usize;

        for v in 0..feature_h {
            for u in 0..feature_w {
                let cx = (u as f32 * shrinkage as f32 + shrinkage as f32 / 2.0) / w;
                let cy = (v as f32 * shrinkage as f32 + shrinkage as f32 / 2.0) / h;

                for &min_box in min_boxes[i] {
                    anchors.push((cx, cy, min_box / w, min_box / h));
                }
            }
        }
    }
    anchors
}
