use crate::data::SliceLedger;
use crate::data::wire::UploadedPart;
use crate::error::UploadError;

/// Filenames must be strictly shorter than this many characters.
pub const MAX_FILENAME_CHARS: usize = 128;

/// Characters the service refuses in filenames.
pub const RESERVED_FILENAME_CHARS: &[char] = &['\\', '/', ':', '*', '?', '|', '>', '<'];

pub fn validate_filename(filename: &str) -> Result<(), UploadError> {
    if filename.is_empty() {
        return Err(UploadError::InvalidInput("filename is empty".into()));
    }
    let chars = filename.chars().count();
    if chars >= MAX_FILENAME_CHARS {
        return Err(UploadError::InvalidInput(format!(
            "filename has {chars} characters, limit is {}",
            MAX_FILENAME_CHARS - 1
        )));
    }
    if let Some(c) = filename.chars().find(|c| RESERVED_FILENAME_CHARS.contains(c)) {
        return Err(UploadError::InvalidInput(format!(
            "filename contains reserved character {c:?}"
        )));
    }
    Ok(())
}

/// Compare the server's part list with what was sent.
///
/// A part the ledger does not know is treated as a local size of zero.
/// Parts missing from the server's list are not checked.
pub fn verify_parts(
    preupload_id: &str,
    ledger: &SliceLedger,
    parts: &[UploadedPart],
) -> Result<(), UploadError> {
    for part in parts {
        let local = ledger.get(part.part_number).unwrap_or(0);
        if local != part.size {
            return Err(UploadError::PartSizeMismatch {
                preupload_id: preupload_id.to_string(),
                slice_no: part.part_number,
                local,
                remote: part.size,
            });
        }
    }
    Ok(())
}
