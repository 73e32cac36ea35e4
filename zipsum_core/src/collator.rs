use tracing::debug;
use zipsum_common::{ArchiveEntryRecord, Checksum, NormalizedPath, Result, ZipsumError};

/// Order one archive's results by (folder, file), byte-wise.
///
/// The input order is irrelevant; a normalized path seen twice fails with `InvalidEntry`.
pub fn collate(
    archive: &str,
    mut results: Vec<(NormalizedPath, Checksum)>,
) -> Result<Vec<ArchiveEntryRecord>> {
    // NormalizedPath orders by folder, then file
    results.sort_unstable_by(|a, b| a.0.cmp(&b.0));

    if let Some(pair) = results.windows(2).find(|pair| pair[0].0 == pair[1].0) {
        let duplicate = &pair[0].0;
        return Err(ZipsumError::invalid_entry(
            archive,
            format!("{}{}", duplicate.folder, duplicate.file),
            "duplicate path in archive",
        ));
    }

    debug!("Collated {} records for {}", results.len(), archive);

    Ok(results
        .into_iter()
        .map(|(path, checksum)| ArchiveEntryRecord::new(path, checksum))
        .collect())
}
