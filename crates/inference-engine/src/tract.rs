//! SSD detector backed by tract-onnx

use std::fs;
use std::path::Path;

use adas::{BoundingBox, Detection};
use image::RgbImage;
use tract_onnx::prelude::*;
use tracing::{debug, info, warn};

use crate::config::DetectorConfig;
use crate::detector::ObjectDetector;
use crate::InferenceError;

/// Only return this many results
const NUM_DETECTIONS: usize = 10;

/// Class ids skip the background entry at the top of the label map
const LABEL_OFFSET: usize = 1;

const IMAGE_MEAN: f32 = 128.0;
const IMAGE_STD: f32 = 128.0;

type SsdPlan = TypedRunnableModel<TypedModel>;

/// Read a label map: line `i` names class `i`, blank lines included
pub fn load_labels(path: impl AsRef<Path>) -> Result<Vec<String>, InferenceError> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)
        .map_err(|e| InferenceError::LabelLoadError(format!("{}: {}", path.display(), e)))?;
    let labels: Vec<String> = text.lines().map(|l| l.trim().to_string()).collect();
    if labels.iter().all(|l| l.is_empty()) {
        return Err(InferenceError::LabelLoadError(format!(
            "{}: no labels",
            path.display()
        )));
    }
    info!("Loaded {} labels from {}", labels.len(), path.display());
    Ok(labels)
}

/// SSD MobileNet style detector.
///
/// Expects an NHWC input of `[1, size, size, 3]` and the four standard
/// post-processed outputs: boxes `[1, N, 4]` (top, left, bottom, right,
/// normalized), classes `[1, N]`, scores `[1, N]` and count `[1]`.
pub struct TractSsdDetector {
    model: SsdPlan,
    labels: Vec<String>,
    input_size: u32,
    is_quantized: bool,
    num_threads: usize,
    use_nnapi: bool,
}

impl TractSsdDetector {
    /// Load the model and label map
    pub fn load(config: &DetectorConfig) -> Result<Self, InferenceError> {
        let model_path = config
            .model_path
            .as_deref()
            .ok_or_else(|| InferenceError::ModelLoadError("no model path configured".into()))?;
        info!("Loading detection model from {}", model_path);

        let size = config.input_size as usize;
        let fact = if config.is_quantized {
            InferenceFact::dt_shape(u8::datum_type(), tvec!(1, size, size, 3))
        } else {
            InferenceFact::dt_shape(f32::datum_type(), tvec!(1, size, size, 3))
        };

        let model = tract_onnx::onnx()
            .model_for_path(model_path)
            .and_then(|m| m.with_input_fact(0, fact))
            .and_then(|m| m.into_optimized())
            .and_then(|m| m.into_runnable())
            .map_err(|e| InferenceError::ModelLoadError(format!("{}: {}", model_path, e)))?;

        let labels_path = config
            .labels_path
            .as_deref()
            .ok_or_else(|| InferenceError::LabelLoadError("no label map configured".into()))?;
        let labels = load_labels(labels_path)?;

        info!("Model loaded successfully");
        Ok(Self {
            model,
            labels,
            input_size: config.input_size,
            is_quantized: config.is_quantized,
            num_threads: config.num_threads,
            use_nnapi: false,
        })
    }

    fn input_tensor(&self, image: &RgbImage) -> Tensor {
        let size = self.input_size as usize;
        if self.is_quantized {
            tract_ndarray::Array4::from_shape_fn((1, size, size, 3), |(_, y, x, c)| {
                image.get_pixel(x as u32, y as u32)[c]
            })
            .into()
        } else {
            tract_ndarray::Array4::from_shape_fn((1, size, size, 3), |(_, y, x, c)| {
                (image.get_pixel(x as u32, y as u32)[c] as f32 - IMAGE_MEAN) / IMAGE_STD
            })
            .into()
        }
    }

    fn label_for(&self, class: f32) -> String {
        let idx = class.max(0.0) as usize + LABEL_OFFSET;
        self.labels
            .get(idx)
            .cloned()
            .unwrap_or_else(|| format!("class_{}", class as i64))
    }
}

fn failed(e: impl std::fmt::Display) -> InferenceError {
    InferenceError::InferenceFailed(e.to_string())
}

impl ObjectDetector for TractSsdDetector {
    fn recognize_image(&mut self, image: &RgbImage) -> Result<Vec<Detection>, InferenceError> {
        if image.dimensions() != (self.input_size, self.input_size) {
            return Err(InferenceError::InvalidInputShape {
                expected: format!("{0}x{0}", self.input_size),
                actual: format!("{}x{}", image.width(), image.height()),
            });
        }

        let input = self.input_tensor(image);
        let outputs = self.model.run(tvec!(input.into())).map_err(failed)?;
        if outputs.len() < 4 {
            return Err(InferenceError::InvalidInputShape {
                expected: "4 outputs".into(),
                actual: format!("{} outputs", outputs.len()),
            });
        }

        let boxes = outputs[0]
            .to_array_view::<f32>()
            .map_err(failed)?
            .into_dimensionality::<tract_ndarray::Ix3>()
            .map_err(failed)?;
        let classes = outputs[1]
            .to_array_view::<f32>()
            .map_err(failed)?
            .into_dimensionality::<tract_ndarray::Ix2>()
            .map_err(failed)?;
        let scores = outputs[2]
            .to_array_view::<f32>()
            .map_err(failed)?
            .into_dimensionality::<tract_ndarray::Ix2>()
            .map_err(failed)?;
        let count = outputs[3]
            .to_array_view::<f32>()
            .map_err(failed)?
            .iter()
            .next()
            .copied()
            .unwrap_or(0.0);

        let n = (count.max(0.0) as usize)
            .min(NUM_DETECTIONS)
            .min(boxes.shape()[1])
            .min(scores.shape()[1]);
        let size = self.input_size as f32;

        let detections = (0..n)
            .map(|i| {
                let location = BoundingBox::new(
                    boxes[[0, i, 1]] * size,
                    boxes[[0, i, 0]] * size,
                    boxes[[0, i, 3]] * size,
                    boxes[[0, i, 2]] * size,
                );
                Detection::new(self.label_for(classes[[0, i]]), scores[[0, i]], Some(location))
            })
            .collect::<Vec<_>>();

        debug!("tract produced {} detections", detections.len());
        Ok(detections)
    }

    fn set_use_nnapi(&mut self, enabled: bool) {
        if enabled {
            warn!("NNAPI delegate is not available on the tract backend, running on CPU");
        }
        self.use_nnapi = enabled;
    }

    fn set_num_threads(&mut self, num_threads: usize) {
        debug!(
            "tract backend: num_threads {} -> {} (plan executes on the calling thread)",
            self.num_threads, num_threads
        );
        self.num_threads = num_threads;
    }
}
