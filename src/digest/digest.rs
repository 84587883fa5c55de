use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use compio::BufResult;
use compio::fs::File;
use compio::io::AsyncReadAt;
use snafu::{ResultExt, Snafu};

use crate::digest::HashAlgorithm;
use crate::ext::PathExt;

/// Bytes read per positional read while streaming a file through a hasher.
pub const CHUNK_SIZE: usize = 64 * 1024;

/// Content digest of a single file, tagged with the algorithm that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Digest {
    algorithm: HashAlgorithm,
    hex: String,
}

impl Digest {
    /// Wraps an already computed hex digest, e.g. one read back from disk.
    pub fn from_hex(
        algorithm: HashAlgorithm,
        hex: impl Into<String>,
    ) -> Result<Self, InvalidDigestError> {
        let hex = hex.into();
        let well_formed = hex.len() == algorithm.hex_len()
            && hex
                .bytes()
                .all(|byte| byte.is_ascii_digit() || (b'a'..=b'f').contains(&byte));
        if !well_formed {
            return InvalidDigestSnafu { algorithm, hex }.fail();
        }
        Ok(Self { algorithm, hex })
    }

    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    pub fn as_hex(&self) -> &str {
        &self.hex
    }

    /// Streams the file at `path` through `algorithm`. Opening the file and
    /// every single read must finish within `read_timeout`; the file as a
    /// whole may take as long as it needs.
    pub async fn compute(
        path: &Path,
        algorithm: HashAlgorithm,
        read_timeout: Duration,
    ) -> Result<Self, DigestUnavailable> {
        Self::compute_chunked(path, algorithm, CHUNK_SIZE, read_timeout).await
    }

    pub(crate) async fn compute_chunked(
        path: &Path,
        algorithm: HashAlgorithm,
        chunk_size: usize,
        read_timeout: Duration,
    ) -> Result<Self, DigestUnavailable> {
        let file = compio::time::timeout(read_timeout, File::open(path))
            .await
            .map_err(|_| timeout_error(path, read_timeout))?
            .context(OpenSnafu { path })?;

        let mut hasher = algorithm.hasher();
        let mut buffer = Vec::with_capacity(chunk_size);
        let mut offset = 0u64;
        loop {
            buffer.clear();
            let BufResult(result, returned) =
                compio::time::timeout(read_timeout, file.read_at(buffer, offset))
                    .await
                    .map_err(|_| timeout_error(path, read_timeout))?;
            buffer = returned;
            let read = result.context(ReadSnafu { path })?;
            if read == 0 {
                break;
            }
            hasher.update(&buffer[..read]);
            offset += read as u64;
        }

        Ok(Self {
            algorithm,
            hex: hasher.finalize_hex(),
        })
    }
}

fn timeout_error(path: &Path, timeout: Duration) -> DigestUnavailable {
    DigestUnavailable::TimeoutError {
        path: path.to_path_buf(),
        timeout,
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.hex)
    }
}

#[derive(Debug, Snafu)]
#[snafu(display("'{}' is not a valid {} digest", hex, algorithm))]
pub struct InvalidDigestError {
    algorithm: HashAlgorithm,
    hex: String,
}

/// A file whose digest could not be produced. The file is left out of the snapshot.
#[derive(Debug, Snafu)]
pub enum DigestUnavailable {
    #[snafu(display("Failed to open {}", path.best_effort_path_display()))]
    OpenError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("Failed to read {}", path.best_effort_path_display()))]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("Reading {} took longer than {:?}", path.best_effort_path_display(), timeout))]
    TimeoutError { path: PathBuf, timeout: Duration },
    #[snafu(display("Digest worker for {} was dropped", path.best_effort_path_display()))]
    CanceledError {
        path: PathBuf,
        source: futures_channel::oneshot::Canceled,
    },
    #[snafu(display("Failed to dispatch digest of {}: {}", path.best_effort_path_display(), message))]
    DispatchError { path: PathBuf, message: String },
}

impl DigestUnavailable {
    pub fn path(&self) -> &Path {
        match self {
            DigestUnavailable::OpenError { path, .. }
            | DigestUnavailable::ReadError { path, .. }
            | DigestUnavailable::TimeoutError { path, .. }
            | DigestUnavailable::CanceledError { path, .. }
            | DigestUnavailable::DispatchError { path, .. } => path,
        }
    }
}
