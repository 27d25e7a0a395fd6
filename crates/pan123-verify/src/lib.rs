//! Content digest primitives for deduplicated uploads.
//!
//! The storage service addresses content by a whole-file checksum submitted
//! before any bytes are sent. This crate provides the incremental hashing
//! needed to compute that checksum while streaming, and a fixed-length
//! [`ContentDigest`] value with the hex encoding used on the wire.
//!
//! # Example
//!
//! ```
//! use pan123_verify::{ContentDigest, Hasher, Md5Hasher};
//!
//! let mut hasher = Md5Hasher::new();
//! hasher.update(b"hello ");
//! hasher.update(b"world");
//! let digest = hasher.finish();
//!
//! assert_eq!(digest, Md5Hasher::digest(b"hello world"));
//! assert_eq!(digest.to_hex(), "5eb63bbbe01eeed093cb22bb8f5acdc3");
//! assert_eq!("5eb63bbbe01eeed093cb22bb8f5acdc3".parse::<ContentDigest>().unwrap(), digest);
//! ```

pub use self::digest::{ContentDigest, DIGEST_LEN};
pub use self::error::{Result, VerificationError};
pub use self::hasher::Hasher;

#[cfg(feature = "md5")]
pub use self::hasher::Md5Hasher;

mod digest;
mod error;
mod hasher;
