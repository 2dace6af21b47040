use crate::interfaces::{AnnotatedFrame, BoundingBox, Detection, Frame};
use image::{Rgb, RgbImage};

const BOX_THICKNESS: u32 = 2;
const TAB_HEIGHT: u32 = 6;

/// Per-class box colors: pothole, speed bump, patched road.
const PALETTE: [Rgb<u8>; 3] = [Rgb([255, 56, 56]), Rgb([255, 178, 29]), Rgb([72, 249, 10])];

pub fn class_color(class_id: usize) -> Rgb<u8> {
    PALETTE
        .get(class_id)
        .copied()
        .unwrap_or(Rgb([64, 192, 255]))
}

/// Convert a pixel-space box into inclusive corner coordinates, clamped to image bounds.
pub fn normalize_box(bbox: &BoundingBox, dims: (u32, u32)) -> Option<[u32; 4]> {
    let (w, h) = dims;
    if w == 0 || h == 0 {
        return None;
    }
    let clamp = |v: f32, max: u32| -> u32 { v.max(0.0).min((max - 1) as f32) as u32 };
    let [x0, y0, x1, y1] = bbox.corners();
    if !(x0.is_finite() && y0.is_finite() && x1.is_finite() && y1.is_finite()) {
        return None;
    }
    if x0 >= w as f32 || y0 >= h as f32 || x1 < 0.0 || y1 < 0.0 {
        return None;
    }
    Some([clamp(x0, w), clamp(y0, h), clamp(x1, w), clamp(y1, h)])
}

/// Draw a rectangle border with given thickness.
pub fn draw_rect(img: &mut RgbImage, bbox_px: [u32; 4], color: Rgb<u8>, thickness: u32) {
    let (w, h) = img.dimensions();
    let [x0, y0, x1, y1] = bbox_px;
    for t in 0..thickness {
        let xx0 = x0.saturating_add(t);
        let yy0 = y0.saturating_add(t);
        let xx1 = x1.saturating_sub(t);
        let yy1 = y1.saturating_sub(t);
        if xx0 >= w || yy0 >= h || xx1 >= w || yy1 >= h || xx0 > xx1 || yy0 > yy1 {
            continue;
        }
        for x in xx0..=xx1 {
            img.put_pixel(x, yy0, color);
            img.put_pixel(x, yy1, color);
        }
        for y in yy0..=yy1 {
            img.put_pixel(xx0, y, color);
            img.put_pixel(xx1, y, color);
        }
    }
}

/// Fill an inclusive rectangle, clipped to the image.
pub fn fill_rect(img: &mut RgbImage, bbox_px: [u32; 4], color: Rgb<u8>) {
    let (w, h) = img.dimensions();
    let [x0, y0, x1, y1] = bbox_px;
    for y in y0..=y1.min(h.saturating_sub(1)) {
        for x in x0..=x1.min(w.saturating_sub(1)) {
            img.put_pixel(x, y, color);
        }
    }
}

fn draw_detection(img: &mut RgbImage, det: &Detection) {
    let Some(px) = normalize_box(&det.bbox, img.dimensions()) else {
        return;
    };
    let color = class_color(det.class_id);
    draw_rect(img, px, color, BOX_THICKNESS);

    // Label tab above the box (inside it when the box touches the top edge);
    // its width tracks the confidence.
    let [x0, y0, x1, _] = px;
    let tab_w = (((x1 - x0) as f32) * det.confidence.clamp(0.0, 1.0)).round() as u32;
    let tab_y0 = if y0 >= TAB_HEIGHT { y0 - TAB_HEIGHT } else { y0 };
    fill_rect(
        img,
        [x0, tab_y0, x0 + tab_w, tab_y0 + TAB_HEIGHT - 1],
        color,
    );
}

/// Render detections onto the frame, taking ownership of it.
pub fn annotate(mut frame: Frame, detections: Vec<Detection>) -> AnnotatedFrame {
    for det in &detections {
        draw_detection(&mut frame.pixels, det);
    }
    AnnotatedFrame { frame, detections }
}
