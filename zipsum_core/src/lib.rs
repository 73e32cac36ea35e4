pub mod archive;
pub mod checksum;
pub mod collator;
pub mod path;
pub mod processor;
pub mod reconciler;
pub mod report;

pub use archive::{ArchiveEntry, ArchiveReader, EntryReader};
pub use checksum::{ChecksumEngine, ChecksumHasher};
pub use collator::collate;
pub use path::{normalize, PathIssue};
pub use processor::ArchiveProcessor;
pub use reconciler::{reconcile, reconcile_reports, summarize};
pub use report::{
    checksum_csv, checksum_report_name, comparison_csv, comparison_report_name,
    write_checksum_csv, write_comparison_csv,
};
