//! Content digests of individual files.

mod digest;
mod hash_algorithm;

pub use digest::{CHUNK_SIZE, Digest, DigestUnavailable, InvalidDigestError};
pub use hash_algorithm::{HashAlgorithm, UnknownAlgorithmError};
