//! Peer input parsing
//!
//! Reads a peer's input file: the files it owns in full (with every segment
//! identifier) and the names of the files it wants to download.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::SwarmError;
use crate::protocol::{FileId, ProcessId, SegmentId};
use crate::storage::naming::file_index_from_name;

/// A fully-owned file listed in a peer's input
#[derive(Debug, Clone)]
pub struct OwnedFile {
    pub file: FileId,
    pub segments: Vec<SegmentId>,
}

/// Everything a peer knows at startup
#[derive(Debug, Clone)]
pub struct PeerInput {
    pub peer: ProcessId,
    pub owned: Vec<OwnedFile>,
    pub requested: Vec<FileId>,
}

/// Path of a peer's input file inside the input directory
pub fn input_path(dir: &Path, peer: ProcessId) -> PathBuf {
    dir.join(format!("in{}.txt", peer.0))
}

/// Load and parse one peer's input file
pub async fn load_peer_input(dir: &Path, peer: ProcessId) -> Result<PeerInput> {
    let path = input_path(dir, peer);
    debug!("Loading input for {}: {}", peer, path.display());
    let text = tokio::fs::read_to_string(&path).await.map_err(|e| {
        SwarmError::storage_error_full("Failed to read peer input", path.display().to_string(), e.to_string())
    })?;
    let input = parse_peer_input(peer, &text)
        .with_context(|| format!("while parsing {}", path.display()))?;
    info!(
        "{}: {} owned files, {} requested",
        peer,
        input.owned.len(),
        input.requested.len()
    );
    Ok(input)
}

/// Parse a peer input from its text form
pub fn parse_peer_input(peer: ProcessId, text: &str) -> Result<PeerInput> {
    let mut tokens = text.split_whitespace();

    let num_owned = next_count(&mut tokens, "owned file count")?;
    let mut owned: Vec<OwnedFile> = Vec::with_capacity(num_owned);
    for _ in 0..num_owned {
        let name = next_token(&mut tokens, "file name")?;
        let file = file_index_from_name(name)?;
        if owned.iter().any(|f| f.file == file) {
            return Err(SwarmError::parse_error_with_source(
                "File listed twice in owned section",
                name.to_string(),
            )
            .into());
        }
        let num_segments = next_count(&mut tokens, "segment count")?;
        if num_segments == 0 {
            return Err(SwarmError::parse_error_with_source(
                "Owned file with zero segments",
                name.to_string(),
            )
            .into());
        }
        let mut segments = Vec::with_capacity(num_segments);
        for _ in 0..num_segments {
            let id = next_token(&mut tokens, "segment identifier")?;
            segments.push(id.parse::<SegmentId>()?);
        }
        owned.push(OwnedFile { file, segments });
    }

    let num_requested = next_count(&mut tokens, "requested file count")?;
    let mut requested = Vec::with_capacity(num_requested);
    for _ in 0..num_requested {
        let name = next_token(&mut tokens, "requested file name")?;
        let file = file_index_from_name(name)?;
        if requested.contains(&file) {
            return Err(SwarmError::parse_error_with_source(
                "File listed twice in requested section",
                name.to_string(),
            )
            .into());
        }
        requested.push(file);
    }

    if tokens.next().is_some() {
        return Err(SwarmError::parse_error("Trailing tokens after requested file list").into());
    }

    Ok(PeerInput { peer, owned, requested })
}

fn next_token<'a>(tokens: &mut impl Iterator<Item = &'a str>, what: &str) -> Result<&'a str> {
    tokens.next().ok_or_else(|| {
        SwarmError::parse_error_with_source("Unexpected end of input", what.to_string()).into()
    })
}

fn next_count<'a>(tokens: &mut impl Iterator<Item = &'a str>, what: &str) -> Result<usize> {
    let token = next_token(tokens, what)?;
    token.parse().map_err(|_| {
        SwarmError::parse_error_with_source(
            format!("Expected a number for {}", what),
            token.to_string(),
        )
        .into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(fill: char) -> String {
        fill.to_string().repeat(crate::protocol::SEGMENT_ID_LEN)
    }

    #[test]
    fn test_parse_full_input() {
        let text = format!(
            "2\nfile1 2 {} {}\nfile3 1 {}\n2\nfile2\nfile4\n",
            id('a'),
            id('b'),
            id('c')
        );
        let input = parse_peer_input(ProcessId(1), &text).unwrap();

        assert_eq!(input.owned.len(), 2);
        assert_eq!(input.owned[0].file, FileId(0));
        assert_eq!(input.owned[0].segments.len(), 2);
        assert_eq!(input.owned[0].segments[1].as_str(), id('b'));
        assert_eq!(input.owned[1].file, FileId(2));
        assert_eq!(input.requested, vec![FileId(1), FileId(3)]);
    }

    #[test]
    fn test_parse_empty_sections() {
        let input = parse_peer_input(ProcessId(2), "0\n0\n").unwrap();
        assert!(input.owned.is_empty());
        assert!(input.requested.is_empty());
    }

    #[test]
    fn test_parse_rejects_short_segment_list() {
        let text = format!("1\nfile1 2 {}\n0\n", id('a'));
        assert!(parse_peer_input(ProcessId(1), &text).is_err());
    }

    #[test]
    fn test_parse_rejects_bad_identifier_length() {
        let text = "1\nfile1 1 tooshort\n0\n";
        assert!(parse_peer_input(ProcessId(1), text).is_err());
    }

    #[test]
    fn test_parse_rejects_duplicate_files() {
        let text = format!("2\nfile1 1 {}\nfile1 1 {}\n0\n", id('a'), id('b'));
        assert!(parse_peer_input(ProcessId(1), &text).is_err());

        let text = "0\n2\nfile1\nfile1\n";
        assert!(parse_peer_input(ProcessId(1), text).is_err());
    }

    #[test]
    fn test_parse_rejects_trailing_tokens() {
        assert!(parse_peer_input(ProcessId(1), "0\n0\nextra\n").is_err());
    }

    #[test]
    fn test_input_path() {
        let path = input_path(Path::new("/tmp/run"), ProcessId(3));
        assert_eq!(path, PathBuf::from("/tmp/run/in3.txt"));
    }
}
