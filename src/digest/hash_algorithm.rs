use std::str::FromStr;

use clap::ValueEnum;
use derive_more::Display;
use sha2::{Digest as _, Sha256, Sha512};
use snafu::Snafu;

/// Hash functions a snapshot can be built with. A snapshot never mixes them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, ValueEnum)]
pub enum HashAlgorithm {
    #[default]
    #[display("sha256")]
    Sha256,
    #[display("sha512")]
    Sha512,
    #[display("blake3")]
    Blake3,
}

impl HashAlgorithm {
    /// Length of the lowercase hex encoding of a digest.
    pub fn hex_len(&self) -> usize {
        match self {
            HashAlgorithm::Sha256 => 64,
            HashAlgorithm::Sha512 => 128,
            HashAlgorithm::Blake3 => 64,
        }
    }

    pub(crate) fn hasher(&self) -> DigestHasher {
        match self {
            HashAlgorithm::Sha256 => DigestHasher::Sha256(Sha256::new()),
            HashAlgorithm::Sha512 => DigestHasher::Sha512(Sha512::new()),
            HashAlgorithm::Blake3 => DigestHasher::Blake3(Box::new(blake3::Hasher::new())),
        }
    }
}

impl FromStr for HashAlgorithm {
    type Err = UnknownAlgorithmError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name.to_ascii_lowercase().as_str() {
            "sha256" | "sha-256" => Ok(HashAlgorithm::Sha256),
            "sha512" | "sha-512" => Ok(HashAlgorithm::Sha512),
            "blake3" => Ok(HashAlgorithm::Blake3),
            _ => UnknownAlgorithmSnafu { name }.fail(),
        }
    }
}

#[derive(Debug, Snafu)]
#[snafu(display("Unknown hash algorithm '{}'", name))]
pub struct UnknownAlgorithmError {
    name: String,
}

/// Incremental hashing state, fed chunk by chunk.
pub(crate) enum DigestHasher {
    Sha256(Sha256),
    Sha512(Sha512),
    Blake3(Box<blake3::Hasher>),
}

impl DigestHasher {
    pub(crate) fn update(&mut self, bytes: &[u8]) {
        match self {
            DigestHasher::Sha256(hasher) => hasher.update(bytes),
            DigestHasher::Sha512(hasher) => hasher.update(bytes),
            DigestHasher::Blake3(hasher) => {
                hasher.update(bytes);
            }
        }
    }

    pub(crate) fn finalize_hex(self) -> String {
        match self {
            DigestHasher::Sha256(hasher) => format!("{:x}", hasher.finalize()),
            DigestHasher::Sha512(hasher) => format!("{:x}", hasher.finalize()),
            DigestHasher::Blake3(hasher) => hasher.finalize().to_hex().to_string(),
        }
    }
}
