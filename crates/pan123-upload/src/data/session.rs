use std::collections::BTreeMap;

use pan123_verify::ContentDigest;

/// Server-side state of one upload attempt, as negotiated by `create`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadSession {
    /// Opaque pre-upload handle. Empty when the server reused existing content.
    pub preupload_id: String,
    /// Slice size declared by the server. Zero when `reuse` is set.
    pub slice_size:   u64,
    pub total_size:   u64,
    pub digest:       ContentDigest,
    pub reuse:        bool,
}

/// Bytes actually read and sent per slice, keyed by 1-based slice number.
///
/// Slice numbers are recorded in strictly increasing read order and never
/// reused; the ledger is only consulted when verifying against the server's
/// part list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SliceLedger {
    slices: BTreeMap<u32, u64>,
}

impl SliceLedger {
    pub fn new() -> Self { Self::default() }

    /// Record the length of the slice just read.
    pub fn record(&mut self, slice_no: u32, len: u64) {
        debug_assert!(
            self.slices.keys().next_back().is_none_or(|&last| slice_no > last),
            "slice numbers must increase"
        );
        self.slices.insert(slice_no, len);
    }

    pub fn get(&self, slice_no: u32) -> Option<u64> { self.slices.get(&slice_no).copied() }

    pub fn len(&self) -> usize { self.slices.len() }

    pub fn is_empty(&self) -> bool { self.slices.is_empty() }

    pub fn total_bytes(&self) -> u64 { self.slices.values().sum() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ledger_records_in_order() {
        let mut ledger = SliceLedger::new();
        ledger.record(1, 100);
        ledger.record(2, 100);
        ledger.record(3, 50);

        assert_eq!(ledger.len(), 3);
        assert_eq!(ledger.total_bytes(), 250);
        assert_eq!(ledger.get(2), Some(100));
        assert_eq!(ledger.get(4), None);
        assert_eq!(ledger.get(3), Some(50));
    }

    #[test]
    fn test_empty_ledger() {
        let ledger = SliceLedger::new();
        assert!(ledger.is_empty());
        assert_eq!(ledger.total_bytes(), 0);
    }
}
