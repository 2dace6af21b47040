use chrono::{Local, TimeZone};
use data_contracts::{
    validate_at, LogRow, Report, ReportFields, IMAGE_PATH_SENTINEL, LOG_COLUMNS,
};
use image::RgbImage;
use report_store::prelude::*;
use report_store::{IMAGES_DIR, LOG_FILE};
use std::fs;
use vision_core::interfaces::{AnnotatedFrame, Frame};

fn report(name: &str, description: &str, secs: u32) -> Report {
    let at = Local.with_ymd_and_hms(2024, 5, 17, 9, 30, secs).unwrap();
    validate_at(
        &ReportFields {
            reporter_name: name.into(),
            location_text: "Jl. Sudirman No. 5, Bandung".into(),
            map_link: "https://maps.app.goo.gl/abc123".into(),
            description: description.into(),
            category: "Pothole".into(),
        },
        at,
    )
    .expect("valid report")
}

fn frame() -> AnnotatedFrame {
    AnnotatedFrame {
        frame: Frame::new(0, 0.0, RgbImage::from_pixel(32, 24, image::Rgb([90, 90, 90]))),
        detections: Vec::new(),
    }
}

#[test]
fn two_reports_append_in_order_with_single_header() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = ReportStore::open(dir.path()).unwrap();

    let first = store
        .persist(&report("Budi", "Lubang dalam dekat halte", 1), Some(&frame()))
        .unwrap();
    let second = store
        .persist(&report("Sari", "Polisi tidur tanpa marka", 2), None)
        .unwrap();

    let raw = fs::read_to_string(dir.path().join(LOG_FILE)).unwrap();
    assert_eq!(raw.matches("Waktu,Nama").count(), 1);
    assert!(raw.starts_with(&LOG_COLUMNS.join(",")));

    let rows = store.read_rows().unwrap();
    assert_eq!(rows, vec![first.row.clone(), second.row.clone()]);
    assert_eq!(rows[0].reporter_name, "Budi");
    assert_eq!(rows[1].reporter_name, "Sari");
}

#[test]
fn artifact_exists_at_logged_path() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = ReportStore::open(dir.path()).unwrap();
    let receipt = store
        .persist(&report("Budi Santoso", "Lubang dalam dekat halte", 7), Some(&frame()))
        .unwrap();

    assert!(receipt.has_image());
    let path = std::path::Path::new(&receipt.image_path);
    assert!(path.starts_with(dir.path().join(IMAGES_DIR)));
    assert!(path.exists());
    let name = path.file_name().unwrap().to_string_lossy().to_string();
    assert!(name.starts_with("Budi_Santoso_Pothole_"), "{name}");
    assert!(name.ends_with(".jpg"));

    let decoded = image::open(path).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (32, 24));

    let leftovers: Vec<_> = fs::read_dir(dir.path().join(IMAGES_DIR))
        .unwrap()
        .filter_map(Result::ok)
        .filter(|e| e.file_name().to_string_lossy().starts_with(".pending-"))
        .collect();
    assert!(leftovers.is_empty());
}

#[test]
fn missing_frame_logs_sentinel() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = ReportStore::open(dir.path()).unwrap();
    let receipt = store
        .persist(&report("Budi", "Aspal tambalan mengelupas", 3), None)
        .unwrap();
    assert_eq!(receipt.image_path, IMAGE_PATH_SENTINEL);
    assert!(!receipt.has_image());
    assert_eq!(
        fs::read_dir(dir.path().join(IMAGES_DIR)).unwrap().count(),
        0
    );
}

#[test]
fn embedded_delimiters_survive_reload() {
    let dir = tempfile::tempdir().unwrap();
    let description = "Lubang \"besar\", dalam\nhati-hati saat hujan";
    {
        let mut store = ReportStore::open(dir.path()).unwrap();
        store
            .persist(&report("Budi, Jr.", description, 4), None)
            .unwrap();
    }
    let reopened = ReportStore::open(dir.path()).unwrap();
    let rows: Vec<LogRow> = reopened.read_rows().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].reporter_name, "Budi, Jr.");
    assert_eq!(rows[0].description, description);
    assert_eq!(rows[0].submitted_at, "2024-05-17 09:30:04");
}

#[test]
fn reopening_appends_after_existing_rows() {
    let dir = tempfile::tempdir().unwrap();
    ReportStore::open(dir.path())
        .unwrap()
        .persist(&report("Budi", "Lubang dalam dekat halte", 1), None)
        .unwrap();
    ReportStore::open(dir.path())
        .unwrap()
        .persist(&report("Sari", "Polisi tidur tanpa marka", 2), None)
        .unwrap();
    let rows = ReportStore::open(dir.path()).unwrap().read_rows().unwrap();
    let names: Vec<_> = rows.iter().map(|r| r.reporter_name.as_str()).collect();
    assert_eq!(names, ["Budi", "Sari"]);
}

#[test]
fn failed_append_removes_artifact() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = ReportStore::open(dir.path()).unwrap();
    // A directory where the log should be makes every append fail.
    fs::create_dir(dir.path().join(LOG_FILE)).unwrap();

    let err = store
        .persist(&report("Budi", "Lubang dalam dekat halte", 1), Some(&frame()))
        .unwrap_err();
    assert!(matches!(err, StoreError::Log { .. }), "{err}");
    assert_eq!(
        fs::read_dir(dir.path().join(IMAGES_DIR)).unwrap().count(),
        0
    );
}

#[test]
fn same_second_collision_never_overwrites() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = ReportStore::open(dir.path()).unwrap();
    let r = report("Budi", "Lubang dalam dekat halte", 9);
    let first = store.persist(&r, Some(&frame())).unwrap();
    let err = store.persist(&r, Some(&frame())).unwrap_err();
    assert!(matches!(err, StoreError::Artifact { .. }));
    assert!(std::path::Path::new(&first.image_path).exists());
    assert_eq!(store.read_rows().unwrap().len(), 1);
}

#[test]
fn foreign_header_is_rejected_on_open() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join(LOG_FILE), "time,name\n2024,Budi\n").unwrap();
    let err = ReportStore::open(dir.path()).unwrap_err();
    assert!(matches!(err, StoreError::Schema { .. }), "{err}");
}

#[test]
fn short_row_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let mut log = LOG_COLUMNS.join(",");
    log.push_str("\n2024-01-01 00:00:00,Budi\n");
    fs::write(dir.path().join(LOG_FILE), log).unwrap();
    let err = ReportStore::open(dir.path()).unwrap_err();
    assert!(matches!(err, StoreError::Schema { .. }), "{err}");
}

#[test]
fn append_after_unterminated_row_starts_a_new_record() {
    let dir = tempfile::tempdir().unwrap();
    let mut log = LOG_COLUMNS.join(",");
    log.push_str(&format!(
        "\n2024-01-01 08:00:00,Ani,Jl. Merdeka 1,https://maps.app.goo.gl/x,\
         Retak panjang di jalur kiri,Pothole,{IMAGE_PATH_SENTINEL}"
    ));
    fs::write(dir.path().join(LOG_FILE), log).unwrap();

    let mut store = ReportStore::open(dir.path()).unwrap();
    store
        .persist(&report("Budi", "Lubang dalam dekat halte", 1), None)
        .unwrap();

    let rows = store.read_rows().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].reporter_name, "Ani");
    assert_eq!(rows[0].image_path, IMAGE_PATH_SENTINEL);
    assert_eq!(rows[1].reporter_name, "Budi");
    let text = fs::read_to_string(dir.path().join(LOG_FILE)).unwrap();
    assert!(text.ends_with('\n'));
    assert!(!text.contains("\n\n"));
}

#[cfg(unix)]
#[test]
fn committed_files_are_world_readable() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::tempdir().unwrap();
    let mut store = ReportStore::open(dir.path()).unwrap();
    let receipt = store
        .persist(&report("Budi", "Lubang dalam dekat halte", 1), Some(&frame()))
        .unwrap();

    let mode = |path: &std::path::Path| fs::metadata(path).unwrap().permissions().mode() & 0o777;
    assert_eq!(mode(std::path::Path::new(&receipt.image_path)), 0o644);
    assert_eq!(mode(&receipt.log_path), 0o644);
}
