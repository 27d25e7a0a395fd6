use std::io::{self, SeekFrom};

use pan123_verify::{ContentDigest, Hasher, Md5Hasher};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncSeek, AsyncSeekExt};
use tracing::debug;

use crate::error::UploadError;

/// Block size for the digest pass.
pub const DIGEST_READ_SIZE: usize = 4 * 1024 * 1024;

/// Readable, seekable byte source for an upload.
pub trait UploadSource: AsyncRead + AsyncSeek + Unpin + Send {}

impl<T: AsyncRead + AsyncSeek + Unpin + Send + ?Sized> UploadSource for T {}

/// Hash the whole source once and rewind it to offset zero.
///
/// Returns the digest and the source size. Fails with
/// [`UploadError::InvalidInput`] before reading anything when the source is
/// empty, and with an I/O error when the bytes read disagree with the size
/// the source reported.
pub async fn digest_source<S: UploadSource + ?Sized>(
    source: &mut S,
) -> Result<(ContentDigest, u64), UploadError> {
    let size = source.seek(SeekFrom::End(0)).await?;
    if size == 0 {
        return Err(UploadError::InvalidInput("file_size <= 0".into()));
    }
    source.seek(SeekFrom::Start(0)).await?;

    let mut hasher = Md5Hasher::new();
    let mut buf = vec![0u8; DIGEST_READ_SIZE];
    let mut hashed = 0u64;
    loop {
        let n = source.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
        hashed += n as u64;
    }
    if hashed != size {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("source reported {size} bytes but yielded {hashed}"),
        )
        .into());
    }
    source.seek(SeekFrom::Start(0)).await?;

    let digest = hasher.finish();
    debug!(%digest, size, "source digested");
    Ok((digest, size))
}
