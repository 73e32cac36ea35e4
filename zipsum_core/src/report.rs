use csv::{Terminator, Writer, WriterBuilder};
use std::io::Write;
use zipsum_common::{ArchiveEntryRecord, ComparisonRecord, Result, ZipsumError};

pub const CHECKSUM_HEADER: [&str; 3] = ["FolderName", "FileName", "Checksum"];
pub const COMPARISON_HEADER: [&str; 5] =
    ["FolderName", "FileName", "Checksum1", "Checksum2", "Status"];

/// Write the flat `FolderName,FileName,Checksum` report
pub fn write_checksum_csv<W: Write>(writer: W, records: &[ArchiveEntryRecord]) -> Result<()> {
    let mut csv = csv_writer(writer);
    csv.write_record(CHECKSUM_HEADER).map_err(csv_error)?;

    for record in records {
        csv.write_record([
            record.folder.as_str(),
            record.file.as_str(),
            record.checksum.as_str(),
        ])
        .map_err(csv_error)?;
    }

    csv.flush()?;
    Ok(())
}

/// Write the `FolderName,FileName,Checksum1,Checksum2,Status` report; absent checksums are empty
pub fn write_comparison_csv<W: Write>(writer: W, records: &[ComparisonRecord]) -> Result<()> {
    let mut csv = csv_writer(writer);
    csv.write_record(COMPARISON_HEADER).map_err(csv_error)?;

    for record in records {
        csv.write_record([
            record.folder.as_str(),
            record.file.as_str(),
            record.checksum1.as_ref().map_or("", |c| c.as_str()),
            record.checksum2.as_ref().map_or("", |c| c.as_str()),
            record.status.as_str(),
        ])
        .map_err(csv_error)?;
    }

    csv.flush()?;
    Ok(())
}

pub fn checksum_csv(records: &[ArchiveEntryRecord]) -> Result<String> {
    let mut buffer = Vec::new();
    write_checksum_csv(&mut buffer, records)?;
    into_string(buffer)
}

pub fn comparison_csv(records: &[ComparisonRecord]) -> Result<String> {
    let mut buffer = Vec::new();
    write_comparison_csv(&mut buffer, records)?;
    into_string(buffer)
}

/// Source name without its last extension (`bundle.v2.zip` -> `bundle.v2`)
pub fn base_name(source: &str) -> &str {
    match source.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => source,
    }
}

/// Conventional file name of a single-archive report
pub fn checksum_report_name(source: &str) -> String {
    format!("CheckSumData_{}.csv", base_name(source))
}

/// Conventional file name of a comparison report
pub fn comparison_report_name(first: &str, second: &str) -> String {
    format!("Comparison_{}_vs_{}.csv", base_name(first), base_name(second))
}

fn csv_writer<W: Write>(writer: W) -> Writer<W> {
    WriterBuilder::new()
        .terminator(Terminator::Any(b'\n'))
        .from_writer(writer)
}

fn csv_error(err: csv::Error) -> ZipsumError {
    ZipsumError::Report(err.to_string())
}

fn into_string(buffer: Vec<u8>) -> Result<String> {
    String::from_utf8(buffer).map_err(|e| ZipsumError::Report(e.to_string()))
}
