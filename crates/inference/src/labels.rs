/// Class names in model output order.
pub const HAZARD_CLASSES: [&str; 3] = ["Pothole", "Speed Bump", "Patched Road"];

pub fn label_for(class_id: usize) -> &'static str {
    HAZARD_CLASSES.get(class_id).copied().unwrap_or("unknown")
}
