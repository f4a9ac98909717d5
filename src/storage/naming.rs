//! File name mapping
//!
//! File names carry their catalog index as a numeric suffix ("file3" is
//! index 2). These helpers convert both ways.

use anyhow::Result;

use crate::error::SwarmError;
use crate::protocol::FileId;

/// Extract the catalog index from a file name
pub fn file_index_from_name(name: &str) -> Result<FileId> {
    let digits: String = name.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return Err(SwarmError::parse_error_with_source(
            "File name carries no numeric suffix",
            name.to_string(),
        )
        .into());
    }
    let number: u32 = digits.parse().map_err(|_| {
        SwarmError::parse_error_with_source("File number out of range", name.to_string())
    })?;
    if number == 0 {
        return Err(SwarmError::parse_error_with_source(
            "File numbering starts at 1",
            name.to_string(),
        )
        .into());
    }
    Ok(FileId(number - 1))
}

/// Reconstruct the file name for a catalog index
pub fn file_name_for(file: FileId) -> String {
    format!("file{}", file.0 + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_to_index() {
        assert_eq!(file_index_from_name("file1").unwrap(), FileId(0));
        assert_eq!(file_index_from_name("file3").unwrap(), FileId(2));
        assert_eq!(file_index_from_name("file12").unwrap(), FileId(11));
    }

    #[test]
    fn test_index_to_name_round_trip() {
        for n in [0u32, 1, 9, 41] {
            let name = file_name_for(FileId(n));
            assert_eq!(file_index_from_name(&name).unwrap(), FileId(n));
        }
    }

    #[test]
    fn test_name_without_digits_rejected() {
        assert!(file_index_from_name("file").is_err());
        assert!(file_index_from_name("").is_err());
    }

    #[test]
    fn test_zero_numbered_name_rejected() {
        assert!(file_index_from_name("file0").is_err());
    }
}
