use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::models::ProductRecord;
use crate::utils::error::{AppError, Result};

pub const CSV_HEADERS: [&str; 3] = ["name", "price", "link"];

/// Write `records` to `path` as `name,price,link` CSV, replacing any existing file.
///
/// Rows go to a sibling temp file that is renamed over `path` once complete,
/// so a failed write never leaves a truncated CSV behind.
pub fn write_products(records: &[ProductRecord], path: &Path) -> Result<()> {
    info!("Saving {} products to {}", records.len(), path.display());

    let tmp_path = temp_path_for(path);
    if let Err(e) = write_rows(records, &tmp_path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(AppError::write(path, e));
    }

    fs::rename(&tmp_path, path).map_err(|e| {
        let _ = fs::remove_file(&tmp_path);
        AppError::write(path, e)
    })
}

fn write_rows(records: &[ProductRecord], path: &Path) -> io::Result<()> {
    let file = File::create(path)?;
    // CRLF row endings, the usual CSV dialect for spreadsheet tools
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .terminator(csv::Terminator::CRLF)
        .from_writer(file);

    // Header goes out even for an empty list
    writer.write_record(CSV_HEADERS)?;
    for record in records {
        writer.serialize(record.as_row())?;
    }
    writer.flush()?;

    let file = writer.into_inner().map_err(|e| e.into_error())?;
    file.sync_all()
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}
