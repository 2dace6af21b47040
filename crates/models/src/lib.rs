//! Burn model for road hazard detection.
//!
//! `HazardNet` is a multibox detector over a downsampled RGB frame: a linear stem and
//! hidden blocks feed three heads producing, per box slot, a normalized box, an
//! objectness score and class logits. It is a pure Burn `Module` with no awareness of
//! the `Detector` trait; the `inference` crate wraps it for runtime use.

use burn::module::Module;
use burn::nn;
use burn::tensor::activation::{relu, sigmoid};
use burn::tensor::backend::Backend;
use burn::tensor::Tensor;

#[derive(Debug, Clone)]
pub struct HazardNetConfig {
    /// Side length of the square RGB input the frame is resized to.
    pub input_side: usize,
    pub hidden: usize,
    pub depth: usize,
    pub max_boxes: usize,
    pub num_classes: usize,
}

impl Default for HazardNetConfig {
    fn default() -> Self {
        Self {
            input_side: 32,
            hidden: 128,
            depth: 2,
            max_boxes: 16,
            num_classes: 3,
        }
    }
}

impl HazardNetConfig {
    pub fn input_dim(&self) -> usize {
        self.input_side * self.input_side * 3
    }
}

/// Raw head outputs for a batch.
#[derive(Debug, Clone)]
pub struct HazardNetOutput<B: Backend> {
    /// \[B, max_boxes, 4\] as \[x0,y0,x1,y1\] in 0..1, ordered so x0 <= x1 and y0 <= y1.
    pub boxes: Tensor<B, 3>,
    /// \[B, max_boxes\] objectness in 0..1.
    pub scores: Tensor<B, 2>,
    /// \[B, max_boxes, num_classes\] unnormalized class logits.
    pub class_logits: Tensor<B, 3>,
}

#[derive(Debug, Module)]
pub struct HazardNet<B: Backend> {
    stem: nn::Linear<B>,
    blocks: Vec<nn::Linear<B>>,
    box_head: nn::Linear<B>,
    score_head: nn::Linear<B>,
    class_head: nn::Linear<B>,
    max_boxes: usize,
    num_classes: usize,
    input_side: usize,
}

impl<B: Backend> HazardNet<B> {
    pub fn new(cfg: HazardNetConfig, device: &B::Device) -> Self {
        let max_boxes = cfg.max_boxes.max(1);
        let num_classes = cfg.num_classes.max(1);
        let stem = nn::LinearConfig::new(cfg.input_dim(), cfg.hidden).init(device);
        let blocks = (0..cfg.depth)
            .map(|_| nn::LinearConfig::new(cfg.hidden, cfg.hidden).init(device))
            .collect();
        let box_head = nn::LinearConfig::new(cfg.hidden, max_boxes * 4).init(device);
        let score_head = nn::LinearConfig::new(cfg.hidden, max_boxes).init(device);
        let class_head = nn::LinearConfig::new(cfg.hidden, max_boxes * num_classes).init(device);
        Self {
            stem,
            blocks,
            box_head,
            score_head,
            class_head,
            max_boxes,
            num_classes,
            input_side: cfg.input_side,
        }
    }

    pub fn input_side(&self) -> usize {
        self.input_side
    }

    pub fn max_boxes(&self) -> usize {
        self.max_boxes
    }

    pub fn num_classes(&self) -> usize {
        self.num_classes
    }

    /// Input is \[B, input_side * input_side * 3\] in CHW order, values in 0..1.
    pub fn forward(&self, input: Tensor<B, 2>) -> HazardNetOutput<B> {
        let mut x = relu(self.stem.forward(input));
        for block in &self.blocks {
            x = relu(block.forward(x));
        }
        let batch = x.dims()[0];
        let boxes_flat = sigmoid(self.box_head.forward(x.clone()));
        let scores = sigmoid(self.score_head.forward(x.clone()));
        let class_logits = self
            .class_head
            .forward(x)
            .reshape([batch, self.max_boxes, self.num_classes]);
        let boxes = order_corners(boxes_flat.reshape([batch, self.max_boxes, 4]));
        HazardNetOutput {
            boxes,
            scores,
            class_logits,
        }
    }
}

/// Reorder/clamp to enforce x0 <= x1, y0 <= y1 within \[0,1\] using arithmetic.
fn order_corners<B: Backend>(boxes: Tensor<B, 3>) -> Tensor<B, 3> {
    let [batch, n, _] = boxes.dims();
    let x0 = boxes.clone().slice([0..batch, 0..n, 0..1]);
    let y0 = boxes.clone().slice([0..batch, 0..n, 1..2]);
    let x1 = boxes.clone().slice([0..batch, 0..n, 2..3]);
    let y1 = boxes.slice([0..batch, 0..n, 3..4]);

    let dx = x0.clone() - x1.clone();
    let dy = y0.clone() - y1.clone();
    let half = 0.5;

    let x_min = ((x0.clone() + x1.clone() - dx.clone().abs()) * half).clamp(0.0, 1.0);
    let x_max = ((x0 + x1 + dx.abs()) * half).clamp(0.0, 1.0);
    let y_min = ((y0.clone() + y1.clone() - dy.clone().abs()) * half).clamp(0.0, 1.0);
    let y_max = ((y0 + y1 + dy.abs()) * half).clamp(0.0, 1.0);

    Tensor::cat(vec![x_min, y_min, x_max, y_max], 2)
}

pub mod prelude {
    pub use super::{HazardNet, HazardNetConfig, HazardNetOutput};
}
