//! Swarm ownership state
//!
//! The tracker-owned table recording, for every (file, peer, segment)
//! triple, whether that peer currently holds that segment. The tracker is
//! the only mutator; ownership flags are monotonic and segment counts are
//! fixed once registration completes.

use anyhow::Result;
use std::collections::BTreeMap;
use tracing::{debug, trace};

use crate::error::SwarmError;
use crate::protocol::{FileId, OwnershipTable, ProcessId};

/// Tracker-side ownership state for every file in the swarm
#[derive(Debug, Clone)]
pub struct SwarmState {
    num_peers: usize,
    files: BTreeMap<FileId, FileSwarm>,
}

#[derive(Debug, Clone)]
struct FileSwarm {
    segments: u32,
    owned: OwnershipTable,
}

impl SwarmState {
    /// Create empty state for the given peer count
    pub fn new(num_peers: usize) -> Self {
        Self {
            num_peers,
            files: BTreeMap::new(),
        }
    }

    /// Number of peers in the swarm
    pub fn num_peers(&self) -> usize {
        self.num_peers
    }

    /// Number of files registered so far
    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    /// Record one peer's registration report
    ///
    /// Every reported file is recorded with its segment count and the
    /// reporting peer is marked as owning all of its segments. A report
    /// that disagrees with an already-registered size is rejected.
    pub fn record_registration(&mut self, peer: ProcessId, files: &[(FileId, u32)]) -> Result<()> {
        let offset = self.validate_peer(peer)?;

        for (file, size) in files {
            if *size == 0 {
                return Err(SwarmError::validation_error_with_field(
                    format!("{} registered {} with zero segments", peer, file),
                    "segment_count",
                )
                .into());
            }

            let entry = self.files.entry(*file).or_insert_with(|| FileSwarm {
                segments: *size,
                owned: OwnershipTable::new(self.num_peers, *size as usize),
            });
            if entry.segments != *size {
                return Err(SwarmError::validation_error_with_field(
                    format!(
                        "{} registered {} with {} segments, already registered with {}",
                        peer, file, size, entry.segments
                    ),
                    "segment_count",
                )
                .into());
            }

            for segment in 0..*size {
                entry.owned.set(offset, segment);
            }
            debug!("{} registered {} ({} segments)", peer, file, size);
        }

        Ok(())
    }

    /// The finalized per-file segment counts, in file order
    pub fn catalog(&self) -> Vec<(FileId, u32)> {
        self.files.iter().map(|(file, swarm)| (*file, swarm.segments)).collect()
    }

    /// Segment count of a registered file
    pub fn segment_count(&self, file: FileId) -> Option<u32> {
        self.files.get(&file).map(|swarm| swarm.segments)
    }

    /// Mark one segment as owned by a peer
    pub fn mark_owned(&mut self, file: FileId, peer: ProcessId, segment: u32) -> Result<()> {
        let offset = self.validate_peer(peer)?;
        let swarm = self.file_mut(file)?;
        if segment >= swarm.segments {
            return Err(SwarmError::validation_error_with_field(
                format!("Segment {} out of range for {} ({} segments)", segment, file, swarm.segments),
                "segment_index",
            )
            .into());
        }
        swarm.owned.set(offset, segment);
        trace!("{} now owns {} segment {}", peer, file, segment);
        Ok(())
    }

    /// Mark every segment of a file as owned by a peer
    ///
    /// Closure runs over the file's registered segment count, so a peer
    /// reporting completion is recorded in full regardless of which
    /// individual acquisitions were seen.
    pub fn mark_file_complete(&mut self, file: FileId, peer: ProcessId) -> Result<()> {
        let offset = self.validate_peer(peer)?;
        let swarm = self.file_mut(file)?;
        for segment in 0..swarm.segments {
            swarm.owned.set(offset, segment);
        }
        debug!("{} now owns all of {}", peer, file);
        Ok(())
    }

    /// Snapshot of the per-peer ownership table for a file
    pub fn ownership_table(&self, file: FileId) -> Result<OwnershipTable> {
        Ok(self.file_ref(file)?.owned.clone())
    }

    /// Check whether a peer owns a segment
    pub fn peer_owns(&self, file: FileId, peer: ProcessId, segment: u32) -> bool {
        if peer.is_tracker() {
            return false;
        }
        self.files
            .get(&file)
            .map(|swarm| swarm.owned.has(peer.peer_offset(), segment))
            .unwrap_or(false)
    }

    fn validate_peer(&self, peer: ProcessId) -> Result<usize> {
        if peer.is_tracker() || peer.peer_offset() >= self.num_peers {
            return Err(SwarmError::validation_error_with_field(
                format!("{} is not a registered peer (swarm has {} peers)", peer, self.num_peers),
                "peer_id",
            )
            .into());
        }
        Ok(peer.peer_offset())
    }

    fn file_ref(&self, file: FileId) -> Result<&FileSwarm> {
        self.files.get(&file).ok_or_else(|| {
            SwarmError::tracker_error_with_source("Unknown file", file.to_string()).into()
        })
    }

    fn file_mut(&mut self, file: FileId) -> Result<&mut FileSwarm> {
        self.files.get_mut(&file).ok_or_else(|| {
            SwarmError::tracker_error_with_source("Unknown file", file.to_string()).into()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registration_marks_all_segments() {
        let mut state = SwarmState::new(2);
        state.record_registration(ProcessId(1), &[(FileId(0), 3)]).unwrap();

        for segment in 0..3 {
            assert!(state.peer_owns(FileId(0), ProcessId(1), segment));
            assert!(!state.peer_owns(FileId(0), ProcessId(2), segment));
        }
        assert_eq!(state.segment_count(FileId(0)), Some(3));
        assert_eq!(state.catalog(), vec![(FileId(0), 3)]);
    }

    #[test]
    fn test_registration_rejects_conflicting_size() {
        let mut state = SwarmState::new(2);
        state.record_registration(ProcessId(1), &[(FileId(0), 3)]).unwrap();
        assert!(state.record_registration(ProcessId(2), &[(FileId(0), 5)]).is_err());
    }

    #[test]
    fn test_registration_rejects_zero_size() {
        let mut state = SwarmState::new(1);
        assert!(state.record_registration(ProcessId(1), &[(FileId(0), 0)]).is_err());
    }

    #[test]
    fn test_registration_rejects_unknown_peer() {
        let mut state = SwarmState::new(1);
        assert!(state.record_registration(ProcessId(2), &[(FileId(0), 3)]).is_err());
        assert!(state.record_registration(ProcessId::TRACKER, &[(FileId(0), 3)]).is_err());
    }

    #[test]
    fn test_mark_owned_is_monotonic() {
        let mut state = SwarmState::new(2);
        state.record_registration(ProcessId(1), &[(FileId(0), 4)]).unwrap();

        state.mark_owned(FileId(0), ProcessId(2), 2).unwrap();
        assert!(state.peer_owns(FileId(0), ProcessId(2), 2));

        // Re-marking and completing never clears anything.
        state.mark_owned(FileId(0), ProcessId(2), 2).unwrap();
        state.mark_file_complete(FileId(0), ProcessId(2)).unwrap();
        for segment in 0..4 {
            assert!(state.peer_owns(FileId(0), ProcessId(2), segment));
            assert!(state.peer_owns(FileId(0), ProcessId(1), segment));
        }
    }

    #[test]
    fn test_mark_owned_validates_ranges() {
        let mut state = SwarmState::new(1);
        state.record_registration(ProcessId(1), &[(FileId(0), 2)]).unwrap();

        assert!(state.mark_owned(FileId(0), ProcessId(1), 2).is_err());
        assert!(state.mark_owned(FileId(1), ProcessId(1), 0).is_err());
        assert!(state.mark_owned(FileId(0), ProcessId(9), 0).is_err());
    }

    #[test]
    fn test_mark_file_complete_uses_own_file_size() {
        let mut state = SwarmState::new(2);
        // Two files of different sizes; closure must run over the target
        // file's size, not any other bound.
        state
            .record_registration(ProcessId(1), &[(FileId(0), 5), (FileId(1), 2)])
            .unwrap();

        state.mark_file_complete(FileId(0), ProcessId(2)).unwrap();
        for segment in 0..5 {
            assert!(state.peer_owns(FileId(0), ProcessId(2), segment));
        }
        assert!(!state.peer_owns(FileId(1), ProcessId(2), 0));
    }

    #[test]
    fn test_ownership_table_snapshot() {
        let mut state = SwarmState::new(2);
        state.record_registration(ProcessId(1), &[(FileId(0), 3)]).unwrap();

        let table = state.ownership_table(FileId(0)).unwrap();
        assert_eq!(table.peers(), 2);
        assert_eq!(table.segments(), 3);
        assert!(table.has(0, 0));
        assert!(!table.has(1, 0));

        assert!(state.ownership_table(FileId(7)).is_err());
    }
}
