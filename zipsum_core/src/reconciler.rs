use std::collections::HashMap;
use tracing::{debug, info};
use zipsum_common::{
    ArchiveEntryRecord, ChecksumReport, ComparisonRecord, ComparisonReport, ComparisonSummary,
    Result, ZipsumError,
};

/// Full outer join of two collated record sets on `folder + "/" + file`.
///
/// Output is ordered by (folder, file). A key repeated within one side is
/// rejected with `InvalidEntry` rather than overwritten.
pub fn reconcile(
    first: &[ArchiveEntryRecord],
    second: &[ArchiveEntryRecord],
) -> Result<Vec<ComparisonRecord>> {
    reconcile_named("first", first, "second", second)
}

/// Reconcile two single-archive reports into a comparison report
pub fn reconcile_reports(first: &ChecksumReport, second: &ChecksumReport) -> Result<ComparisonReport> {
    if first.algorithm != second.algorithm {
        return Err(ZipsumError::Config(format!(
            "Cannot compare {} checksums of {} with {} checksums of {}",
            first.algorithm, first.source, second.algorithm, second.source
        )));
    }

    let records = reconcile_named(&first.source, &first.records, &second.source, &second.records)?;
    let summary = summarize(&records);

    info!(
        "Compared {} with {}: {} matched, {} mismatched, {} only in first, {} only in second",
        first.source,
        second.source,
        summary.matched,
        summary.mismatched,
        summary.only_in_first,
        summary.only_in_second
    );

    Ok(ComparisonReport {
        first: first.source.clone(),
        second: second.source.clone(),
        algorithm: first.algorithm,
        records,
        summary,
    })
}

/// Tally records per status
pub fn summarize(records: &[ComparisonRecord]) -> ComparisonSummary {
    let mut summary = ComparisonSummary::default();
    for record in records {
        summary.record(record.status);
    }
    summary
}

fn reconcile_named(
    first_name: &str,
    first: &[ArchiveEntryRecord],
    second_name: &str,
    second: &[ArchiveEntryRecord],
) -> Result<Vec<ComparisonRecord>> {
    let first_map = build_lookup(first_name, first)?;
    let mut second_map = build_lookup(second_name, second)?;

    let mut records = Vec::with_capacity(first_map.len().max(second_map.len()));

    for record in first {
        let other = second_map.remove(&record.key());
        records.extend(ComparisonRecord::from_sides(Some(record), other));
    }

    // Whatever was not consumed above exists only in the second archive
    records.extend(
        second_map
            .into_values()
            .filter_map(|record| ComparisonRecord::from_sides(None, Some(record))),
    );

    records.sort_by(|a, b| (&a.folder, &a.file).cmp(&(&b.folder, &b.file)));

    debug!("Reconciled into {} comparison records", records.len());
    Ok(records)
}

fn build_lookup<'r>(
    archive: &str,
    records: &'r [ArchiveEntryRecord],
) -> Result<HashMap<String, &'r ArchiveEntryRecord>> {
    let mut lookup = HashMap::with_capacity(records.len());
    for record in records {
        let key = record.key();
        if lookup.insert(key.clone(), record).is_some() {
            return Err(ZipsumError::invalid_entry(
                archive,
                key,
                "duplicate key in record set",
            ));
        }
    }
    Ok(lookup)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checksum::ChecksumEngine;
    use zipsum_common::{ChecksumAlgorithm, ComparisonStatus};

    fn record(folder: &str, file: &str, contents: &str) -> ArchiveEntryRecord {
        ArchiveEntryRecord {
            folder: folder.to_string(),
            file: file.to_string(),
            checksum: ChecksumEngine::default().checksum(contents.as_bytes()),
        }
    }

    fn statuses(records: &[ComparisonRecord]) -> Vec<(&str, ComparisonStatus)> {
        records.iter().map(|r| (r.file.as_str(), r.status)).collect()
    }

    #[test]
    fn test_match_and_only_in_second() {
        let first = vec![record("uploads/", "a.txt", "hello")];
        let second = vec![
            record("uploads/", "a.txt", "hello"),
            record("uploads/", "b.txt", "world"),
        ];

        let records = reconcile(&first, &second).unwrap();
        assert_eq!(
            statuses(&records),
            vec![
                ("a.txt", ComparisonStatus::Match),
                ("b.txt", ComparisonStatus::OnlyInSecond),
            ]
        );
        assert!(records[1].checksum1.is_none());
        assert_eq!(records[1].checksum2, Some(second[1].checksum.clone()));
    }

    #[test]
    fn test_mismatch_keeps_both_checksums() {
        let first = vec![record("uploads/", "x.txt", "1")];
        let second = vec![record("uploads/", "x.txt", "2")];

        let records = reconcile(&first, &second).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, ComparisonStatus::Mismatch);
        assert_ne!(records[0].checksum1, records[0].checksum2);
        assert!(records[0].checksum1.is_some() && records[0].checksum2.is_some());
    }

    #[test]
    fn test_same_file_name_in_different_folders() {
        let first = vec![record("uploads/", "app.ini", "a")];
        let second = vec![record("uploads/Cfg/", "app.ini", "a")];

        let records = reconcile(&first, &second).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].folder, "uploads/");
        assert_eq!(records[0].status, ComparisonStatus::OnlyInFirst);
        assert_eq!(records[1].folder, "uploads/Cfg/");
        assert_eq!(records[1].status, ComparisonStatus::OnlyInSecond);
    }

    #[test]
    fn test_self_comparison_all_match() {
        let set = vec![
            record("uploads/", "a.txt", "1"),
            record("uploads/d/", "b.txt", "2"),
            record("uploads/d/e/", "c.txt", "3"),
        ];

        let records = reconcile(&set, &set).unwrap();
        assert_eq!(records.len(), set.len());
        assert!(records.iter().all(|r| r.status == ComparisonStatus::Match));
    }

    #[test]
    fn test_symmetry() {
        let a = vec![
            record("uploads/", "both.txt", "same"),
            record("uploads/", "changed.txt", "v1"),
            record("uploads/a/", "left.txt", "l"),
        ];
        let b = vec![
            record("uploads/", "both.txt", "same"),
            record("uploads/", "changed.txt", "v2"),
            record("uploads/b/", "right.txt", "r"),
        ];

        let forward: Vec<ComparisonRecord> = reconcile(&a, &b)
            .unwrap()
            .iter()
            .map(ComparisonRecord::swapped)
            .collect();
        let backward = reconcile(&b, &a).unwrap();
        assert_eq!(forward, backward);
    }

    #[test]
    fn test_empty_sides() {
        assert!(reconcile(&[], &[]).unwrap().is_empty());

        let only = vec![record("uploads/", "a.txt", "1")];
        let records = reconcile(&only, &[]).unwrap();
        assert_eq!(records[0].status, ComparisonStatus::OnlyInFirst);
    }

    #[test]
    fn test_duplicate_key_is_rejected() {
        let first = vec![record("uploads/", "a.txt", "1"), record("uploads/", "a.txt", "2")];
        let err = reconcile(&first, &[]).unwrap_err();
        assert!(matches!(err, ZipsumError::InvalidEntry { .. }));
    }

    #[test]
    fn test_summary() {
        let first = vec![record("uploads/", "a", "1"), record("uploads/", "b", "1")];
        let second = vec![record("uploads/", "a", "1"), record("uploads/", "c", "1")];

        let summary = summarize(&reconcile(&first, &second).unwrap());
        assert_eq!(summary.total, 3);
        assert_eq!(summary.matched, 1);
        assert_eq!(summary.only_in_first, 1);
        assert_eq!(summary.only_in_second, 1);
        assert_eq!(summary.differences(), 2);
    }

    #[test]
    fn test_reconcile_reports_names_and_algorithm() {
        let first = ChecksumReport {
            source: "v1.zip".to_string(),
            algorithm: ChecksumAlgorithm::Sha1,
            records: vec![record("uploads/", "a.txt", "1")],
        };
        let second = ChecksumReport {
            source: "v2.zip".to_string(),
            algorithm: ChecksumAlgorithm::Sha1,
            records: vec![record("uploads/", "a.txt", "1")],
        };

        let report = reconcile_reports(&first, &second).unwrap();
        assert_eq!(report.first, "v1.zip");
        assert_eq!(report.second, "v2.zip");
        assert!(report.summary.is_identical());

        let blake = ChecksumReport {
            algorithm: ChecksumAlgorithm::Blake3,
            ..second
        };
        assert!(matches!(
            reconcile_reports(&first, &blake),
            Err(ZipsumError::Config(_))
        ));
    }
}
