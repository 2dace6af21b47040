pub mod adapter;
pub mod factory;
pub mod labels;
pub mod postprocess;

pub type InferenceBackend = burn_ndarray::NdArray<f32>;
pub type InferenceModel<B> = models::HazardNet<B>;
pub type InferenceModelConfig = models::HazardNetConfig;

pub use adapter::{DetectorAdapter, DEFAULT_CONFIDENCE, DEFAULT_IOU};
pub use factory::InferenceFactory;
pub use labels::{label_for, HAZARD_CLASSES};

pub mod prelude {
    pub use crate::adapter::{DetectorAdapter, DEFAULT_CONFIDENCE, DEFAULT_IOU};
    pub use crate::factory::InferenceFactory;
    pub use crate::labels::{label_for, HAZARD_CLASSES};
    pub use crate::{InferenceBackend, InferenceModel, InferenceModelConfig};
}
