use crate::ZipsumError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Virtual root every normalized folder lives under
pub const ROOT_FOLDER: &str = "uploads/";

/// Digest algorithm used by the checksum engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChecksumAlgorithm {
    /// 160-bit SHA-1, the format existing reports are compared against
    #[default]
    Sha1,
    /// 256-bit BLAKE3
    Blake3,
}

impl ChecksumAlgorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChecksumAlgorithm::Sha1 => "sha1",
            ChecksumAlgorithm::Blake3 => "blake3",
        }
    }

    /// Length of the hex-encoded digest
    pub fn hex_len(&self) -> usize {
        match self {
            ChecksumAlgorithm::Sha1 => 40,
            ChecksumAlgorithm::Blake3 => 64,
        }
    }
}

impl fmt::Display for ChecksumAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChecksumAlgorithm {
    type Err = ZipsumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sha1" | "sha-1" => Ok(ChecksumAlgorithm::Sha1),
            "blake3" => Ok(ChecksumAlgorithm::Blake3),
            other => Err(ZipsumError::Config(format!(
                "Unknown checksum algorithm '{}' (expected sha1 or blake3)",
                other
            ))),
        }
    }
}

/// Lowercase hex digest of one entry's contents
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Checksum(String);

impl Checksum {
    pub fn from_digest(digest: &[u8]) -> Self {
        Self(hex::encode(digest))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<blake3::Hash> for Checksum {
    fn from(hash: blake3::Hash) -> Self {
        Self::from_digest(hash.as_bytes())
    }
}

/// Folder/file decomposition of an archive entry path
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NormalizedPath {
    /// Always starts with `uploads/` and ends with `/`
    pub folder: String,
    /// Base name, never contains `/`
    pub file: String,
}

/// Checksum record for one file entry of an archive
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveEntryRecord {
    pub folder: String,
    pub file: String,
    pub checksum: Checksum,
}

impl ArchiveEntryRecord {
    pub fn new(path: NormalizedPath, checksum: Checksum) -> Self {
        Self {
            folder: path.folder,
            file: path.file,
            checksum,
        }
    }

    pub fn key(&self) -> String {
        format!("{}/{}", self.folder, self.file)
    }
}

/// Outcome of reconciling one normalized path across two archives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ComparisonStatus {
    /// Present in both with equal checksums
    Match,
    /// Present in both with different checksums
    Mismatch,
    /// Present only in the first archive
    OnlyInFirst,
    /// Present only in the second archive
    OnlyInSecond,
}

impl ComparisonStatus {
    /// Classify a key from the checksums found on each side.
    ///
    /// Returns `None` when neither side has the key.
    pub fn classify(first: Option<&Checksum>, second: Option<&Checksum>) -> Option<Self> {
        match (first, second) {
            (Some(a), Some(b)) if a == b => Some(ComparisonStatus::Match),
            (Some(_), Some(_)) => Some(ComparisonStatus::Mismatch),
            (Some(_), None) => Some(ComparisonStatus::OnlyInFirst),
            (None, Some(_)) => Some(ComparisonStatus::OnlyInSecond),
            (None, None) => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ComparisonStatus::Match => "MATCH",
            ComparisonStatus::Mismatch => "MISMATCH",
            ComparisonStatus::OnlyInFirst => "ONLY_IN_FIRST",
            ComparisonStatus::OnlyInSecond => "ONLY_IN_SECOND",
        }
    }

    /// Status seen from the other side of the comparison
    pub fn swapped(&self) -> Self {
        match self {
            ComparisonStatus::OnlyInFirst => ComparisonStatus::OnlyInSecond,
            ComparisonStatus::OnlyInSecond => ComparisonStatus::OnlyInFirst,
            other => *other,
        }
    }
}

impl fmt::Display for ComparisonStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of a two-archive comparison
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComparisonRecord {
    pub folder: String,
    pub file: String,
    pub checksum1: Option<Checksum>,
    pub checksum2: Option<Checksum>,
    pub status: ComparisonStatus,
}

impl ComparisonRecord {
    /// Build a record from whichever sides carry the key; `None` if neither does
    pub fn from_sides(
        first: Option<&ArchiveEntryRecord>,
        second: Option<&ArchiveEntryRecord>,
    ) -> Option<Self> {
        let status = ComparisonStatus::classify(
            first.map(|r| &r.checksum),
            second.map(|r| &r.checksum),
        )?;
        let named = first.or(second)?;

        Some(Self {
            folder: named.folder.clone(),
            file: named.file.clone(),
            checksum1: first.map(|r| r.checksum.clone()),
            checksum2: second.map(|r| r.checksum.clone()),
            status,
        })
    }

    /// The same record as produced by comparing the archives in reverse order
    pub fn swapped(&self) -> Self {
        Self {
            folder: self.folder.clone(),
            file: self.file.clone(),
            checksum1: self.checksum2.clone(),
            checksum2: self.checksum1.clone(),
            status: self.status.swapped(),
        }
    }
}

/// Per-status tally of a comparison
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComparisonSummary {
    pub total: usize,
    pub matched: usize,
    pub mismatched: usize,
    pub only_in_first: usize,
    pub only_in_second: usize,
}

impl ComparisonSummary {
    pub fn record(&mut self, status: ComparisonStatus) {
        self.total += 1;
        match status {
            ComparisonStatus::Match => self.matched += 1,
            ComparisonStatus::Mismatch => self.mismatched += 1,
            ComparisonStatus::OnlyInFirst => self.only_in_first += 1,
            ComparisonStatus::OnlyInSecond => self.only_in_second += 1,
        }
    }

    /// Number of records that are not `MATCH`
    pub fn differences(&self) -> usize {
        self.total - self.matched
    }

    pub fn is_identical(&self) -> bool {
        self.differences() == 0
    }
}

/// Raw archive image handed to the engine, with the name used in errors and report names
#[derive(Debug, Clone)]
pub struct ArchiveSource {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl ArchiveSource {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }

    /// Read an archive from disk, naming it after its file name
    pub fn from_path(path: &Path) -> Result<Self, ZipsumError> {
        let bytes = std::fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self { name, bytes })
    }
}

/// Checksums of every file entry of a single archive
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChecksumReport {
    pub source: String,
    pub algorithm: ChecksumAlgorithm,
    pub records: Vec<ArchiveEntryRecord>,
}

/// Reconciliation of two archives
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonReport {
    pub first: String,
    pub second: String,
    pub algorithm: ChecksumAlgorithm,
    pub records: Vec<ComparisonRecord>,
    pub summary: ComparisonSummary,
}
