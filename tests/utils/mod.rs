// Integration test utilities
//
// Helpers to build instrumentation archives on disk

#![allow(dead_code)]

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

/// Write a zip archive at `dir/relative` holding `entries`
pub fn write_archive(dir: &Path, relative: &str, entries: &[(&str, &str)]) -> PathBuf {
    let path = dir.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }

    let mut writer = ZipWriter::new(File::create(&path).unwrap());
    for (name, content) in entries {
        writer
            .start_file(*name, SimpleFileOptions::default())
            .unwrap();
        writer.write_all(content.as_bytes()).unwrap();
    }
    writer.finish().unwrap();
    path
}

/// Trace entry reporting one numeric field per timestamp key
pub fn trace_entry(field: &str, values: &[(&str, f64)]) -> String {
    let timestamps: serde_json::Map<String, serde_json::Value> = values
        .iter()
        .map(|(key, value)| (key.to_string(), serde_json::json!({ field: value })))
        .collect();
    serde_json::json!({ "timestamps": timestamps }).to_string()
}

/// Archive where `producer` publishes and `consumer` consumes every key
pub fn pair_archive(dir: &Path, relative: &str, latencies: &[(f64, f64)]) -> PathBuf {
    let keys: Vec<String> = (0..latencies.len()).map(|i| format!("k{}", i)).collect();
    let published: Vec<(&str, f64)> = keys
        .iter()
        .zip(latencies)
        .map(|(key, (publish, _))| (key.as_str(), *publish))
        .collect();
    let consumed: Vec<(&str, f64)> = keys
        .iter()
        .zip(latencies)
        .map(|(key, (_, consume))| (key.as_str(), *consume))
        .collect();

    let producer = trace_entry("beforePublish", &published);
    let consumer = trace_entry("afterConsume", &consumed);
    write_archive(
        dir,
        relative,
        &[
            ("producer/instrumentation.json", producer.as_str()),
            ("consumer/instrumentation.json", consumer.as_str()),
        ],
    )
}
