//! Production logging writes JSON entries to a rotated file.
//!
//! A single test per binary: installing the global subscriber is a
//! once-per-process operation.

use acode::logging::init_production;

#[test]
fn init_production_writes_json_log_file() {
    let dir = tempfile::TempDir::new().expect("temp dir");
    let logs_dir = dir.path().join("logs");

    let guard = init_production(&logs_dir, "info").expect("logging initialises");
    tracing::info!(pack_id = "acode-standard", "pack registry ready");
    drop(guard); // flush the non-blocking writer

    let entries: Vec<_> = std::fs::read_dir(&logs_dir)
        .expect("logs dir exists")
        .map(|e| e.expect("dir entry"))
        .filter(|e| {
            e.file_name()
                .to_string_lossy()
                .starts_with("acode.log")
        })
        .collect();
    assert_eq!(entries.len(), 1, "one daily log file expected");

    let contents = std::fs::read_to_string(entries[0].path()).expect("log file reads");
    let line = contents.lines().next().expect("at least one entry");
    let entry: serde_json::Value = serde_json::from_str(line).expect("entry is JSON");
    assert_eq!(entry["fields"]["message"], "pack registry ready");
    assert_eq!(entry["fields"]["pack_id"], "acode-standard");
}
