pub mod client;
pub use self::client::{Failure, MockClient};

use bytes::Bytes;
use multipart_file_upload::retry::{ExponentialBackoff, RetryPolicy};
use std::io::Write as _;
use std::sync::LazyLock;
use std::time::Duration;
use tempfile::NamedTempFile;
use tracing_subscriber::EnvFilter;

pub const KIB: u64 = 1024;
pub const MIB: u64 = 1024 * KIB;

pub static TRACER: LazyLock<()> = LazyLock::new(|| {
    let filter = EnvFilter::try_from_env("LOG_LEVEL").unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
});

/// Deterministic, non-repeating-looking content of `len` bytes.
pub fn content(len: u64) -> Bytes {
    (0..len).map(|n| (n.wrapping_mul(31) % 251) as u8).collect()
}

/// A temporary file holding `len` bytes of [`content`].
pub fn temp_file(len: u64) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(&content(len)).unwrap();
    file.flush().unwrap();
    file
}

/// Retries without waiting long between attempts.
pub fn fast_retry() -> RetryPolicy {
    RetryPolicy::default().backoff(ExponentialBackoff::new(
        Duration::from_millis(1),
        Duration::from_millis(5),
        2.0,
    ))
}
