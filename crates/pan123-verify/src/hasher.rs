#[cfg(feature = "md5")]
use digest::Digest;

#[cfg(feature = "md5")]
use crate::ContentDigest;

/// Incremental hash state fed by streaming reads.
pub trait Hasher: Send {
    fn update(&mut self, data: &[u8]);
    fn finalize(self) -> Vec<u8>;
}

/// MD5 hasher producing the `etag` the service uses for instant upload.
#[cfg(feature = "md5")]
pub struct Md5Hasher(md5::Md5);

#[cfg(feature = "md5")]
impl Hasher for Md5Hasher {
    fn update(&mut self, data: &[u8]) { self.0.update(data); }
    fn finalize(self) -> Vec<u8> { self.0.finalize().to_vec() }
}

#[cfg(feature = "md5")]
impl Default for Md5Hasher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "md5")]
impl Md5Hasher {
    pub fn new() -> Self { Self(md5::Md5::new()) }

    /// Finalize into a fixed-length digest.
    pub fn finish(self) -> ContentDigest { to_digest(&self.0.finalize()) }

    pub fn digest(data: &[u8]) -> ContentDigest { to_digest(&md5::Md5::digest(data)) }
}

#[cfg(feature = "md5")]
fn to_digest(out: &[u8]) -> ContentDigest {
    let mut bytes = [0u8; crate::DIGEST_LEN];
    bytes.copy_from_slice(out);
    ContentDigest::from_array(bytes)
}
