use crate::postprocess::decode_multibox;
use crate::{label_for, InferenceBackend, InferenceModel, InferenceModelConfig};
use burn::module::Module;
use burn::tensor::TensorData;
use image::imageops::{self, FilterType};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::info;
use vision_core::interfaces::{Detection, Detector, Frame, InferenceError};

struct BurnHazardDetector {
    // Burn modules are not `Sync`; the lock only serializes forward passes.
    model: Mutex<InferenceModel<InferenceBackend>>,
    input_side: u32,
    num_classes: usize,
}

impl BurnHazardDetector {
    fn frame_to_tensor(&self, frame: &Frame) -> TensorData {
        let side = self.input_side;
        let small = imageops::resize(&frame.pixels, side, side, FilterType::Triangle);
        let plane = (side * side) as usize;
        let mut chw = vec![0f32; plane * 3];
        for (i, px) in small.pixels().enumerate() {
            chw[i] = px[0] as f32 / 255.0;
            chw[plane + i] = px[1] as f32 / 255.0;
            chw[2 * plane + i] = px[2] as f32 / 255.0;
        }
        TensorData::new(chw, [1, plane * 3])
    }
}

impl Detector for BurnHazardDetector {
    fn detect(&self, frame: &Frame) -> Result<Vec<Detection>, InferenceError> {
        let fail = |msg: String| InferenceError::Frame {
            frame: frame.index,
            msg,
        };
        if frame.pixels.width() == 0 || frame.pixels.height() == 0 {
            return Err(fail("empty frame".into()));
        }
        let input = self.frame_to_tensor(frame);
        let device = <InferenceBackend as burn::tensor::backend::Backend>::Device::default();
        let model = self
            .model
            .lock()
            .map_err(|_| fail("model mutex poisoned".into()))?;
        let out = model.forward(burn::tensor::Tensor::<InferenceBackend, 2>::from_data(
            input, &device,
        ));
        drop(model);
        let boxes = out
            .boxes
            .into_data()
            .to_vec::<f32>()
            .map_err(|e| fail(format!("{e:?}")))?;
        let scores = out
            .scores
            .into_data()
            .to_vec::<f32>()
            .map_err(|e| fail(format!("{e:?}")))?;
        let logits = out
            .class_logits
            .into_data()
            .to_vec::<f32>()
            .map_err(|e| fail(format!("{e:?}")))?;
        Ok(decode_multibox(
            &boxes,
            &scores,
            &logits,
            self.num_classes,
            frame.size(),
        ))
    }

    fn label_for(&self, class_id: usize) -> &str {
        label_for(class_id)
    }
}

/// Loads Burn checkpoints into a shareable detector.
pub struct InferenceFactory;

impl InferenceFactory {
    /// Load weights saved with `BinFileRecorder<FullPrecisionSettings>`.
    ///
    /// A missing or incompatible checkpoint is fatal; there is no fallback detector.
    pub fn load(&self, weights: &Path) -> Result<Arc<dyn Detector>, InferenceError> {
        self.load_with_config(weights, InferenceModelConfig::default())
    }

    pub fn load_with_config(
        &self,
        weights: &Path,
        config: InferenceModelConfig,
    ) -> Result<Arc<dyn Detector>, InferenceError> {
        let load_err = |msg: String| InferenceError::ModelLoad {
            path: weights.to_path_buf(),
            msg,
        };
        // The recorder appends `.bin` itself.
        let resolved = weights.with_extension("bin");
        if !resolved.exists() {
            return Err(load_err("checkpoint not found".into()));
        }
        let device = <InferenceBackend as burn::tensor::backend::Backend>::Device::default();
        let recorder = burn::record::BinFileRecorder::<burn::record::FullPrecisionSettings>::new();
        let model = InferenceModel::<InferenceBackend>::new(config, &device)
            .load_file(weights.to_path_buf(), &recorder, &device)
            .map_err(|e| load_err(format!("{e:?}")))?;
        info!(
            path = %resolved.display(),
            max_boxes = model.max_boxes(),
            classes = model.num_classes(),
            "detector checkpoint loaded"
        );
        Ok(Arc::new(BurnHazardDetector {
            input_side: model.input_side() as u32,
            num_classes: model.num_classes(),
            model: Mutex::new(model),
        }))
    }
}
