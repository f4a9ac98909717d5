//! Peer-local segment store
//!
//! The owned-segment record shared by a peer's two workers. The download
//! worker is the only writer; the upload worker only reads. Ownership only
//! ever grows, so a reader at worst misses a just-added segment and never
//! sees one retracted.

use anyhow::Result;
use std::collections::BTreeMap;
use tracing::trace;

use crate::error::SwarmError;
use crate::protocol::{FileId, SegmentId};

/// Per-file segment slots held by one peer
#[derive(Debug, Default)]
pub struct SegmentStore {
    files: BTreeMap<FileId, Vec<Option<SegmentId>>>,
}

impl SegmentStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a fully-owned file read from the peer's input
    pub fn insert_owned_file(&mut self, file: FileId, segments: Vec<SegmentId>) -> Result<()> {
        if self.files.contains_key(&file) {
            return Err(SwarmError::validation_error_with_field(
                format!("{} listed more than once in input", file),
                "file_index",
            )
            .into());
        }
        self.files.insert(file, segments.into_iter().map(Some).collect());
        Ok(())
    }

    /// Allocate empty slots for a requested file at its catalog size
    ///
    /// A file already present (owned from the start) is left untouched.
    pub fn prepare_requested(&mut self, file: FileId, size: u32) {
        self.files.entry(file).or_insert_with(|| vec![None; size as usize]);
    }

    /// The files this store holds in full, with their segment counts
    pub fn owned_report(&self) -> Vec<(FileId, u32)> {
        self.files
            .iter()
            .filter(|(_, slots)| !slots.is_empty() && slots.iter().all(Option::is_some))
            .map(|(file, slots)| (*file, slots.len() as u32))
            .collect()
    }

    /// Lowest-indexed segment of a file not yet owned
    pub fn first_missing(&self, file: FileId) -> Result<Option<u32>> {
        let slots = self.slots(file)?;
        Ok(slots.iter().position(Option::is_none).map(|i| i as u32))
    }

    /// Record a newly-acquired segment
    ///
    /// Ownership is monotonic: overwriting an occupied slot is rejected.
    pub fn record(&mut self, file: FileId, segment: u32, id: SegmentId) -> Result<()> {
        let slots = self.files.get_mut(&file).ok_or_else(|| unknown_file(file))?;
        let count = slots.len();
        let slot = slots.get_mut(segment as usize).ok_or_else(|| {
            anyhow::Error::from(SwarmError::validation_error_with_field(
                format!("Segment {} out of range for {} ({} slots)", segment, file, count),
                "segment_index",
            ))
        })?;
        if slot.is_some() {
            return Err(SwarmError::validation_error_with_field(
                format!("Segment {} of {} recorded twice", segment, file),
                "segment_index",
            )
            .into());
        }
        *slot = Some(id);
        trace!("Recorded {} segment {}", file, segment);
        Ok(())
    }

    /// Look up one owned segment identifier
    pub fn segment(&self, file: FileId, segment: u32) -> Option<SegmentId> {
        self.files
            .get(&file)
            .and_then(|slots| slots.get(segment as usize))
            .copied()
            .flatten()
    }

    /// Check whether a file is fully owned
    pub fn is_complete(&self, file: FileId) -> bool {
        self.files
            .get(&file)
            .map(|slots| slots.iter().all(Option::is_some))
            .unwrap_or(false)
    }

    /// Ordered identifier sequence of a fully-owned file
    pub fn segments_of(&self, file: FileId) -> Result<Vec<SegmentId>> {
        let slots = self.slots(file)?;
        slots
            .iter()
            .map(|slot| {
                (*slot).ok_or_else(|| {
                    anyhow::Error::from(SwarmError::validation_error_with_field(
                        format!("{} is not fully owned", file),
                        "file_index",
                    ))
                })
            })
            .collect()
    }

    /// Segment count of a file known to this store
    pub fn segment_count(&self, file: FileId) -> Option<u32> {
        self.files.get(&file).map(|slots| slots.len() as u32)
    }

    fn slots(&self, file: FileId) -> Result<&Vec<Option<SegmentId>>> {
        self.files.get(&file).ok_or_else(|| unknown_file(file))
    }
}

fn unknown_file(file: FileId) -> anyhow::Error {
    SwarmError::validation_error_with_field(format!("{} not known to this peer", file), "file_index")
        .into()
}
