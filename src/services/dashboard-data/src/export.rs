//! CSV export and import of generated datasets
//!
//! The header is always the stored column list of the record type, so an
//! empty dataset still exports a header line. Derived columns are never
//! written.

use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::info;

use crate::error::{DashboardError, Result};
use crate::record::Record;
use crate::session::DatasetKind;

/// File name used when exporting `kind` to a directory
pub fn file_name(kind: DatasetKind) -> String {
    format!("{}_data.csv", kind)
}

/// Write `records` as CSV
pub fn write_csv<R, W>(records: &[R], writer: W) -> Result<()>
where
    R: Record + Serialize,
    W: Write,
{
    let mut csv = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);

    csv.write_record(R::COLUMNS.iter().map(|c| c.name))?;
    for record in records {
        csv.serialize(record)?;
    }
    csv.flush()?;
    Ok(())
}

pub fn to_csv_string<R: Record + Serialize>(records: &[R]) -> Result<String> {
    let mut buf = Vec::new();
    write_csv(records, &mut buf)?;
    String::from_utf8(buf).map_err(|e| DashboardError::serialization(e.to_string()))
}

/// Parse CSV written by [`write_csv`]; the header must match the record columns exactly
pub fn read_csv<R, Rd>(reader: Rd) -> Result<Vec<R>>
where
    R: Record + DeserializeOwned,
    Rd: Read,
{
    let mut csv = csv::ReaderBuilder::new().has_headers(true).from_reader(reader);

    let headers = csv.headers()?;
    let expected = R::column_names();
    if !headers.iter().eq(expected.iter().copied()) {
        return Err(DashboardError::serialization(format!(
            "unexpected {} header: {}",
            R::ENTITY,
            headers.iter().collect::<Vec<_>>().join(",")
        )));
    }

    csv.deserialize()
        .map(|row| row.map_err(DashboardError::from))
        .collect()
}

/// Write `records` to `<directory>/<kind>_data.csv` and return the path
pub fn export_to_dir<R>(records: &[R], kind: DatasetKind, directory: &Path) -> Result<PathBuf>
where
    R: Record + Serialize,
{
    std::fs::create_dir_all(directory)?;
    let path = directory.join(file_name(kind));
    let file = File::create(&path)?;
    write_csv(records, file)?;
    info!(dataset = %kind, rows = records.len(), path = %path.display(), "Exported dataset");
    Ok(path)
}
