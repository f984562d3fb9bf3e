//! Common test data and constants

use chrono::{Duration as ChronoDuration, Utc};
use gvm_maintenance::gmp::{ReportSummary, ScannerInfo};
use std::fs::{self, File};
use std::path::Path;
use std::time::{Duration, SystemTime};

/// Scanner ids as printed by `gvmd --get-scanners`
pub mod scanners {
    pub const OPENVAS: &str = "08b69003-5fc2-4037-a479-93b440211c73";
    pub const CVE: &str = "6acd0832-df90-11e4-b9d5-28d24461215b";
}

pub fn report_aged(id: &str, days: i64) -> ReportSummary {
    ReportSummary {
        id: id.to_string(),
        timestamp: Some(Utc::now() - ChronoDuration::days(days)),
    }
}

pub fn report_without_timestamp(id: &str) -> ReportSummary {
    ReportSummary {
        id: id.to_string(),
        timestamp: None,
    }
}

pub fn scanner(id: &str, name: &str, status: &str) -> ScannerInfo {
    ScannerInfo {
        id: id.to_string(),
        name: name.to_string(),
        status: status.to_string(),
    }
}

pub fn healthy_scanners() -> Vec<ScannerInfo> {
    vec![
        scanner(scanners::OPENVAS, "OpenVAS", "1"),
        scanner(scanners::CVE, "CVE", "1"),
    ]
}

pub fn broken_scanners() -> Vec<ScannerInfo> {
    vec![
        scanner(scanners::OPENVAS, "OpenVAS", "0"),
        scanner(scanners::CVE, "CVE", "1"),
    ]
}

/// `df -Pk` output with `available_kb` free.
pub fn df_output(available_kb: u64) -> String {
    format!(
        "Filesystem     1024-blocks     Used Available Capacity Mounted on\n\
         /dev/sda1        104857600 52428800 {:>9}      50% /\n",
        available_kb
    )
}

/// Writes `contents` to `path` with an mtime `days` in the past.
pub fn write_aged(path: &Path, contents: &str, days: u64) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, contents).unwrap();
    let mtime = SystemTime::now() - Duration::from_secs(days * 86_400);
    File::options()
        .write(true)
        .open(path)
        .unwrap()
        .set_modified(mtime)
        .unwrap();
}
