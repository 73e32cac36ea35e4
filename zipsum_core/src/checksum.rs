use sha1::{Digest, Sha1};
use zipsum_common::{Checksum, ChecksumAlgorithm};

/// Stateless digest of entry contents; safe to share across workers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChecksumEngine {
    algorithm: ChecksumAlgorithm,
}

impl ChecksumEngine {
    pub fn new(algorithm: ChecksumAlgorithm) -> Self {
        Self { algorithm }
    }

    pub fn algorithm(&self) -> ChecksumAlgorithm {
        self.algorithm
    }

    /// Hex digest of `contents`
    pub fn checksum(&self, contents: &[u8]) -> Checksum {
        match self.algorithm {
            ChecksumAlgorithm::Sha1 => Checksum::from_digest(&Sha1::digest(contents)),
            ChecksumAlgorithm::Blake3 => blake3::hash(contents).into(),
        }
    }

    /// Incremental hasher for contents that arrive in chunks
    pub fn hasher(&self) -> ChecksumHasher {
        match self.algorithm {
            ChecksumAlgorithm::Sha1 => ChecksumHasher::Sha1(Sha1::new()),
            ChecksumAlgorithm::Blake3 => ChecksumHasher::Blake3(Box::new(blake3::Hasher::new())),
        }
    }
}

/// Running digest state; `finalize` yields the same `Checksum` as a one-shot
/// `ChecksumEngine::checksum` over the concatenated chunks
pub enum ChecksumHasher {
    Sha1(Sha1),
    Blake3(Box<blake3::Hasher>),
}

impl ChecksumHasher {
    pub fn update(&mut self, chunk: &[u8]) {
        match self {
            ChecksumHasher::Sha1(hasher) => hasher.update(chunk),
            ChecksumHasher::Blake3(hasher) => {
                hasher.update(chunk);
            }
        }
    }

    pub fn finalize(self) -> Checksum {
        match self {
            ChecksumHasher::Sha1(hasher) => Checksum::from_digest(&hasher.finalize()),
            ChecksumHasher::Blake3(hasher) => hasher.finalize().into(),
        }
    }
}
