use std::ops::Range;

use crate::error::{ApiError, UploadError};

/// Slice layout of one upload, fixed once the server declares a slice size.
///
/// Slice numbers are 1-based. Every slice is `slice_size` bytes except the
/// last, which holds the remainder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlicePlan {
    total_size: u64,
    slice_size: u64,
    count:      u32,
}

impl SlicePlan {
    /// Fails with a protocol error if the server declared a zero slice size
    /// or a layout with more slices than fit a slice number.
    pub fn new(total_size: u64, slice_size: u64) -> Result<Self, UploadError> {
        if slice_size == 0 {
            return Err(ApiError::Protocol("server declared sliceSize 0".into()).into());
        }
        let count = u32::try_from(total_size.div_ceil(slice_size)).map_err(|_| {
            ApiError::Protocol(format!(
                "sliceSize {slice_size} yields too many slices for {total_size} bytes"
            ))
        })?;
        Ok(Self { total_size, slice_size, count })
    }

    pub fn total_size(&self) -> u64 { self.total_size }

    pub fn slice_size(&self) -> u64 { self.slice_size }

    /// `ceil(total_size / slice_size)`.
    pub fn slice_count(&self) -> u32 { self.count }

    /// Byte range of `slice_no`, empty when out of range.
    pub fn range(&self, slice_no: u32) -> Range<u64> {
        if slice_no == 0 || slice_no > self.count {
            return 0..0;
        }
        let start = u64::from(slice_no - 1) * self.slice_size;
        let end = (start + self.slice_size).min(self.total_size);
        start..end
    }

    /// Expected length of `slice_no`.
    pub fn slice_len(&self, slice_no: u32) -> u64 {
        let range = self.range(slice_no);
        range.end - range.start
    }

    /// Part verification applies only to true multi-part uploads: the slice
    /// size is below the file size and more than one slice went out.
    pub fn needs_verification(&self, slices_sent: usize) -> bool {
        self.slice_size < self.total_size && slices_sent > 1
    }
}
