use crate::archive::{ArchiveReader, EntryReader};
use crate::checksum::ChecksumEngine;
use crate::collator::collate;
use crate::path::normalize;
use crate::reconciler::reconcile_reports;
use rayon::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, warn};
use zipsum_common::{
    AppConfig, ArchiveEntryRecord, ArchiveSource, Checksum, ChecksumReport, ComparisonReport,
    NormalizedPath, Result, ZipsumError,
};

const CHUNK_SIZE: usize = 64 * 1024;

/// Runs the read -> normalize + hash -> collate pipeline over archive images
pub struct ArchiveProcessor {
    engine: ChecksumEngine,
    threads: Option<usize>,
}

impl ArchiveProcessor {
    pub fn new(engine: ChecksumEngine) -> Self {
        Self {
            engine,
            threads: None,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(ChecksumEngine::new(config.algorithm)).with_threads(config.threads)
    }

    /// Hash on a dedicated pool of `threads` workers instead of the global rayon pool
    pub fn with_threads(mut self, threads: Option<usize>) -> Self {
        self.threads = threads;
        self
    }

    pub fn engine(&self) -> ChecksumEngine {
        self.engine
    }

    /// Checksum every file entry of one archive
    pub fn checksum_archive(&self, source: &ArchiveSource) -> Result<ChecksumReport> {
        let cancel = AtomicBool::new(false);
        let records = self.run(|| self.process(source, &cancel))?;

        Ok(ChecksumReport {
            source: source.name.clone(),
            algorithm: self.engine.algorithm(),
            records,
        })
    }

    /// Process both archives concurrently and reconcile them.
    ///
    /// If either archive fails the other is cancelled and the first real
    /// error is returned; no partial comparison is produced.
    pub fn compare_archives(
        &self,
        first: &ArchiveSource,
        second: &ArchiveSource,
    ) -> Result<ComparisonReport> {
        let cancel = AtomicBool::new(false);

        let (first_records, second_records) = self.run(|| {
            let (first_result, second_result) = rayon::join(
                || self.process_or_cancel(first, &cancel),
                || self.process_or_cancel(second, &cancel),
            );
            pick_error(first_result, second_result)
        })?;

        let algorithm = self.engine.algorithm();
        reconcile_reports(
            &ChecksumReport {
                source: first.name.clone(),
                algorithm,
                records: first_records,
            },
            &ChecksumReport {
                source: second.name.clone(),
                algorithm,
                records: second_records,
            },
        )
    }

    fn run<T, F>(&self, op: F) -> Result<T>
    where
        F: FnOnce() -> Result<T> + Send,
        T: Send,
    {
        match self.threads {
            Some(threads) => {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .build()
                    .map_err(|e| ZipsumError::Config(format!("Failed to build worker pool: {}", e)))?;
                pool.install(op)
            }
            None => op(),
        }
    }

    fn process_or_cancel(
        &self,
        source: &ArchiveSource,
        cancel: &AtomicBool,
    ) -> Result<Vec<ArchiveEntryRecord>> {
        let result = self.process(source, cancel);
        if let Err(ref e) = result {
            if !matches!(e, ZipsumError::Cancelled) {
                warn!("Aborting comparison: {}", e);
            }
            cancel.store(true, Ordering::Relaxed);
        }
        result
    }

    fn process(
        &self,
        source: &ArchiveSource,
        cancel: &AtomicBool,
    ) -> Result<Vec<ArchiveEntryRecord>> {
        let reader = ArchiveReader::from_source(source)?;
        info!("Processing {} ({} entries)", reader.name(), reader.len());

        let results = (0..reader.len())
            .into_par_iter()
            .map_init(
                || (reader.clone(), vec![0u8; CHUNK_SIZE]),
                |(reader, buffer), index| -> Result<Option<(NormalizedPath, Checksum)>> {
                    if cancel.load(Ordering::Relaxed) {
                        return Err(ZipsumError::Cancelled);
                    }

                    let mut entry = reader.open_entry(index)?;
                    if entry.is_dir() {
                        return Ok(None);
                    }

                    let path = normalize(entry.path()).map_err(|issue| {
                        ZipsumError::invalid_entry(
                            source.name.as_str(),
                            entry.path(),
                            issue.to_string(),
                        )
                    })?;
                    let checksum = self.hash_entry(&mut entry, buffer, cancel)?;
                    Ok(Some((path, checksum)))
                },
            )
            .collect::<Result<Vec<_>>>()?;

        let results: Vec<_> = results.into_iter().flatten().collect();
        debug!("Hashed {} file entries in {}", results.len(), source.name);

        collate(&source.name, results)
    }

    /// Stream one entry through the hasher, giving up between chunks once `cancel` is set
    fn hash_entry(
        &self,
        entry: &mut EntryReader<'_>,
        buffer: &mut [u8],
        cancel: &AtomicBool,
    ) -> Result<Checksum> {
        let mut hasher = self.engine.hasher();
        loop {
            if cancel.load(Ordering::Relaxed) {
                debug!("Cancelled while hashing entry {} ({})", entry.index(), entry.path());
                return Err(ZipsumError::Cancelled);
            }
            let n = entry.read_chunk(buffer)?;
            if n == 0 {
                break;
            }
            hasher.update(&buffer[..n]);
        }
        Ok(hasher.finalize())
    }
}

/// Join two sides, preferring a root-cause error over a `Cancelled` one
fn pick_error<A, B>(first: Result<A>, second: Result<B>) -> Result<(A, B)> {
    match (first, second) {
        (Ok(a), Ok(b)) => Ok((a, b)),
        (Err(e), _) if !matches!(e, ZipsumError::Cancelled) => Err(e),
        (_, Err(e)) if !matches!(e, ZipsumError::Cancelled) => Err(e),
        (Err(e), _) | (_, Err(e)) => Err(e),
    }
}
