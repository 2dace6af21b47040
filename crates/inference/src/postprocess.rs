use crate::labels::label_for;
use vision_core::interfaces::{BoundingBox, Detection};

/// Decode flat head outputs for one image into pixel-space detections.
///
/// `boxes` is `[max_boxes * 4]` normalized corners, `scores` is `[max_boxes]`,
/// `class_logits` is `[max_boxes * num_classes]`. Confidence is objectness times the
/// softmax probability of the winning class.
pub fn decode_multibox(
    boxes: &[f32],
    scores: &[f32],
    class_logits: &[f32],
    num_classes: usize,
    dims: (u32, u32),
) -> Vec<Detection> {
    let (w, h) = (dims.0 as f32, dims.1 as f32);
    let num_classes = num_classes.max(1);
    let mut out = Vec::with_capacity(scores.len());
    for (i, &obj) in scores.iter().enumerate() {
        let Some(b) = boxes.get(i * 4..i * 4 + 4) else {
            break;
        };
        let Some(logits) = class_logits.get(i * num_classes..(i + 1) * num_classes) else {
            break;
        };
        if !obj.is_finite() || b.iter().any(|v| !v.is_finite()) {
            continue;
        }
        let (class_id, prob) = softmax_argmax(logits);
        let confidence = (obj * prob).clamp(0.0, 1.0);
        out.push(Detection {
            class_id,
            label: label_for(class_id).to_string(),
            confidence,
            bbox: BoundingBox::from_corners(
                b[0].clamp(0.0, 1.0) * w,
                b[1].clamp(0.0, 1.0) * h,
                b[2].clamp(0.0, 1.0) * w,
                b[3].clamp(0.0, 1.0) * h,
            ),
        });
    }
    out
}

fn softmax_argmax(logits: &[f32]) -> (usize, f32) {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let denom: f32 = logits.iter().map(|v| (v - max).exp()).sum();
    let (best, best_logit) = logits
        .iter()
        .copied()
        .enumerate()
        .fold((0, f32::NEG_INFINITY), |acc, (i, v)| if v > acc.1 { (i, v) } else { acc });
    if denom <= 0.0 || !denom.is_finite() {
        return (best, 0.0);
    }
    (best, (best_logit - max).exp() / denom)
}

/// Drop candidates below `min_confidence`, sorted by descending confidence.
pub fn filter_confidence(mut dets: Vec<Detection>, min_confidence: f32) -> Vec<Detection> {
    dets.retain(|d| d.confidence >= min_confidence);
    dets.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    dets
}

/// Greedy per-class non-maximum suppression. Input must be sorted by confidence.
pub fn nms(dets: Vec<Detection>, iou_thresh: f32) -> Vec<Detection> {
    let mut kept: Vec<Detection> = Vec::with_capacity(dets.len());
    for det in dets {
        let suppressed = kept
            .iter()
            .any(|k| k.class_id == det.class_id && k.bbox.iou(&det.bbox) > iou_thresh);
        if !suppressed {
            kept.push(det);
        }
    }
    kept
}
