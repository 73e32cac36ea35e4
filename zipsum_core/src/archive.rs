use std::io::{Cursor, Read};
use tracing::debug;
use zip::read::ZipFile;
use zip::ZipArchive;
use zipsum_common::{ArchiveSource, Result, ZipsumError};

const S_IFMT: u32 = 0o170000;
const S_IFDIR: u32 = 0o040000;

/// One entry of an archive, in central-directory order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    pub index: usize,
    /// Raw internal path, `/`-separated
    pub path: String,
    pub is_dir: bool,
    /// Decompressed contents (empty for directories)
    pub contents: Vec<u8>,
}

/// Read-only view over an in-memory ZIP image.
///
/// Cloning is cheap: clones share the parsed central directory, so each
/// worker can decompress its own entries independently.
#[derive(Clone, Debug)]
pub struct ArchiveReader<'a> {
    name: String,
    archive: ZipArchive<Cursor<&'a [u8]>>,
}

impl<'a> ArchiveReader<'a> {
    /// Parse the central directory of `bytes`, failing with `InvalidArchive` if it is not a ZIP image
    pub fn open(name: &str, bytes: &'a [u8]) -> Result<Self> {
        let archive = ZipArchive::new(Cursor::new(bytes))
            .map_err(|e| ZipsumError::invalid_archive(name, e))?;

        debug!("Opened {} with {} entries", name, archive.len());

        Ok(Self {
            name: name.to_string(),
            archive,
        })
    }

    pub fn from_source(source: &'a ArchiveSource) -> Result<Self> {
        Self::open(&source.name, &source.bytes)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of entries, directories included
    pub fn len(&self) -> usize {
        self.archive.len()
    }

    pub fn is_empty(&self) -> bool {
        self.archive.len() == 0
    }

    /// Open the entry at `index` for streaming decompression
    pub fn open_entry(&mut self, index: usize) -> Result<EntryReader<'_>> {
        let Self { name, archive } = self;
        let file = archive
            .by_index(index)
            .map_err(|e| ZipsumError::invalid_archive(name.as_str(), e))?;

        let path = file.name().to_string();
        let is_dir = is_directory(&file, &path);

        Ok(EntryReader {
            archive: name,
            index,
            path,
            is_dir,
            file,
        })
    }

    /// Decompress the entry at `index` fully into memory
    pub fn read_entry(&mut self, index: usize) -> Result<ArchiveEntry> {
        let mut entry = self.open_entry(index)?;
        let mut contents = Vec::new();

        if !entry.is_dir() {
            entry.read_to_end(&mut contents)?;
        }

        Ok(ArchiveEntry {
            index,
            path: entry.path,
            is_dir: entry.is_dir,
            contents,
        })
    }

    /// Lazily iterate over every entry; each item is decompressed on demand
    pub fn entries(&mut self) -> Entries<'_, 'a> {
        Entries {
            reader: self,
            next: 0,
        }
    }
}

/// An entry counts as a directory only when it carries no data and is
/// marked as one, by a trailing `/` or by its directory attribute.
fn is_directory(file: &ZipFile<'_>, path: &str) -> bool {
    let dir_attribute = file
        .unix_mode()
        .map_or(false, |mode| mode & S_IFMT == S_IFDIR);
    file.size() == 0 && (path.ends_with('/') || dir_attribute)
}

/// Streaming view of a single entry; read errors (including CRC failures)
/// surface as `InvalidArchive` naming the archive and entry
pub struct EntryReader<'r> {
    archive: &'r str,
    index: usize,
    path: String,
    is_dir: bool,
    file: ZipFile<'r>,
}

impl EntryReader<'_> {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn is_dir(&self) -> bool {
        self.is_dir
    }

    /// Uncompressed size recorded in the central directory
    pub fn size(&self) -> u64 {
        self.file.size()
    }

    /// Decompress the next chunk into `buffer`; `Ok(0)` marks the end of the entry
    pub fn read_chunk(&mut self, buffer: &mut [u8]) -> Result<usize> {
        loop {
            match self.file.read(buffer) {
                Ok(n) => return Ok(n),
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(self.read_error(e)),
            }
        }
    }

    pub fn read_to_end(&mut self, contents: &mut Vec<u8>) -> Result<usize> {
        self.file
            .read_to_end(contents)
            .map_err(|e| self.read_error(e))
    }

    fn read_error(&self, err: std::io::Error) -> ZipsumError {
        ZipsumError::invalid_archive(self.archive, format!("{}: {}", self.path, err))
    }
}

pub struct Entries<'r, 'a> {
    reader: &'r mut ArchiveReader<'a>,
    next: usize,
}

impl Iterator for Entries<'_, '_> {
    type Item = Result<ArchiveEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.reader.len() {
            return None;
        }
        let index = self.next;
        self.next += 1;
        Some(self.reader.read_entry(index))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.reader.len().saturating_sub(self.next);
        (remaining, Some(remaining))
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::{build_zip, build_zip_files, build_zip_with};
    use super::*;
    use zip::CompressionMethod;

    #[test]
    fn test_entries_in_archive_order() {
        let bytes = build_zip(&[
            ("Cfg/", b""),
            ("Cfg/app.ini", b"[app]\nname=demo\n"),
            ("readme.txt", b"hello"),
        ]);
        let mut reader = ArchiveReader::open("bundle.zip", &bytes).unwrap();

        let entries: Vec<ArchiveEntry> = reader.entries().collect::<Result<_>>().unwrap();
        assert_eq!(entries.len(), 3);

        assert_eq!(entries[0].path, "Cfg/");
        assert!(entries[0].is_dir);
        assert!(entries[0].contents.is_empty());

        assert_eq!(entries[1].path, "Cfg/app.ini");
        assert!(!entries[1].is_dir);
        assert_eq!(entries[1].contents, b"[app]\nname=demo\n");

        assert_eq!(entries[2].index, 2);
        assert_eq!(entries[2].contents, b"hello");
    }

    #[test]
    fn test_stored_entries_are_read() {
        let bytes = build_zip_with(&[("a.txt", b"plain")], CompressionMethod::Stored);
        let mut reader = ArchiveReader::open("stored.zip", &bytes).unwrap();

        let entry = reader.read_entry(0).unwrap();
        assert_eq!(entry.contents, b"plain");
    }

    #[test]
    fn test_clones_read_independently() {
        let bytes = build_zip(&[("a.txt", b"one"), ("b.txt", b"two")]);
        let reader = ArchiveReader::open("pair.zip", &bytes).unwrap();

        let mut left = reader.clone();
        let mut right = reader.clone();
        assert_eq!(right.read_entry(1).unwrap().contents, b"two");
        assert_eq!(left.read_entry(0).unwrap().contents, b"one");
    }

    #[test]
    fn test_empty_archive() {
        let bytes = build_zip(&[]);
        let mut reader = ArchiveReader::open("empty.zip", &bytes).unwrap();
        assert!(reader.is_empty());
        assert_eq!(reader.entries().count(), 0);
    }

    #[test]
    fn test_garbage_is_invalid_archive() {
        let err = ArchiveReader::open("notes.zip", b"definitely not a zip").unwrap_err();
        match err {
            ZipsumError::InvalidArchive { archive, .. } => assert_eq!(archive, "notes.zip"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_truncated_archive_is_invalid() {
        let bytes = build_zip(&[("a.txt", b"hello world")]);
        let truncated = &bytes[..bytes.len() - 10];
        assert!(matches!(
            ArchiveReader::open("cut.zip", truncated),
            Err(ZipsumError::InvalidArchive { .. })
        ));
    }

    #[test]
    fn test_corrupt_contents_fail_on_read() {
        let mut bytes = build_zip_with(&[("a.txt", b"hello")], CompressionMethod::Stored);
        let offset = bytes
            .windows(5)
            .position(|w| w == b"hello")
            .expect("stored contents present");
        bytes[offset] = b'j';

        let mut reader = ArchiveReader::open("crc.zip", &bytes).unwrap();
        let err = reader.read_entry(0).unwrap_err();
        assert!(matches!(err, ZipsumError::InvalidArchive { .. }));
    }

    #[test]
    fn test_slash_named_file_with_data_is_not_a_directory() {
        let bytes = build_zip_files(&[("data/", b"payload"), ("empty/", b"")]);
        let mut reader = ArchiveReader::open("odd.zip", &bytes).unwrap();

        let entry = reader.read_entry(0).unwrap();
        assert_eq!(entry.path, "data/");
        assert!(!entry.is_dir);
        assert_eq!(entry.contents, b"payload");

        assert!(reader.open_entry(1).unwrap().is_dir());
    }

    #[test]
    fn test_directory_entry_is_dir() {
        let bytes = build_zip(&[("Cfg/", b"")]);
        let mut reader = ArchiveReader::open("dirs.zip", &bytes).unwrap();
        let entry = reader.open_entry(0).unwrap();
        assert!(entry.is_dir());
        assert_eq!(entry.size(), 0);
    }

    #[test]
    fn test_read_chunk_streams_whole_entry() {
        let contents: Vec<u8> = (0..10_000u32).map(|i| (i % 13) as u8).collect();
        let bytes = build_zip(&[("big.bin", contents.as_slice())]);
        let mut reader = ArchiveReader::open("big.zip", &bytes).unwrap();
        let mut entry = reader.open_entry(0).unwrap();
        assert_eq!(entry.size(), contents.len() as u64);

        let mut buffer = [0u8; 1024];
        let mut streamed = Vec::new();
        loop {
            let n = entry.read_chunk(&mut buffer).unwrap();
            if n == 0 {
                break;
            }
            assert!(n <= buffer.len());
            streamed.extend_from_slice(&buffer[..n]);
        }
        assert_eq!(streamed, contents);
    }

    #[test]
    fn test_corrupt_contents_fail_on_streaming_read() {
        let mut bytes = build_zip_with(&[("a.txt", b"hello")], CompressionMethod::Stored);
        let offset = bytes
            .windows(5)
            .position(|w| w == b"hello")
            .expect("stored contents present");
        bytes[offset] = b'j';

        let mut reader = ArchiveReader::open("crc.zip", &bytes).unwrap();
        let mut entry = reader.open_entry(0).unwrap();
        let mut buffer = [0u8; 64];
        let err = loop {
            match entry.read_chunk(&mut buffer) {
                Ok(0) => panic!("corrupt entry read to the end"),
                Ok(_) => continue,
                Err(e) => break e,
            }
        };
        match err {
            ZipsumError::InvalidArchive { archive, reason } => {
                assert_eq!(archive, "crc.zip");
                assert!(reason.starts_with("a.txt"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
