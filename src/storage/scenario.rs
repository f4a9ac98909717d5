//! Scenario generation
//!
//! Fabricates a consistent set of peer inputs so a swarm run can be
//! exercised without hand-written files: every file is fully owned by
//! exactly one peer and requested by all the others.

use anyhow::Result;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::Path;
use tokio::fs;
use tracing::info;

use crate::error::SwarmError;
use crate::protocol::{FileId, ProcessId, SegmentId};
use crate::storage::input::{input_path, OwnedFile, PeerInput};
use crate::storage::naming::file_name_for;

/// Parameters for a generated scenario
#[derive(Debug, Clone)]
pub struct ScenarioSpec {
    /// Number of peers
    pub peers: u32,
    /// Number of files spread across the peers
    pub files: u32,
    /// Maximum segments per file (actual counts vary per file)
    pub max_segments: u32,
    /// RNG seed; equal seeds produce equal scenarios
    pub seed: u64,
}

/// Build the peer inputs for a scenario
pub fn build_inputs(spec: &ScenarioSpec) -> Result<Vec<PeerInput>> {
    if spec.peers == 0 {
        return Err(SwarmError::config_error_with_field("At least one peer required", "peers").into());
    }
    if spec.files == 0 {
        return Err(SwarmError::config_error_with_field("At least one file required", "gen_files").into());
    }
    if spec.max_segments == 0 {
        return Err(
            SwarmError::config_error_with_field("At least one segment per file required", "gen_segments")
                .into(),
        );
    }

    let mut rng = StdRng::seed_from_u64(spec.seed);
    let mut inputs: Vec<PeerInput> = (0..spec.peers)
        .map(|offset| PeerInput {
            peer: ProcessId::from_peer_offset(offset as usize),
            owned: Vec::new(),
            requested: Vec::new(),
        })
        .collect();

    for index in 0..spec.files {
        let file = FileId(index);
        let owner = (index % spec.peers) as usize;
        let size = rng.gen_range(1..=spec.max_segments);
        let segments = (0..size)
            .map(|_| {
                let mut raw = [0u8; 16];
                rng.fill(&mut raw[..]);
                SegmentId::from_bytes(hex::encode(raw).as_bytes())
            })
            .collect::<Result<Vec<_>>>()?;

        inputs[owner].owned.push(OwnedFile { file, segments });
        for (offset, input) in inputs.iter_mut().enumerate() {
            if offset != owner {
                input.requested.push(file);
            }
        }
    }

    Ok(inputs)
}

/// Render one peer input in the on-disk schema
pub fn render_input(input: &PeerInput) -> String {
    let mut out = String::new();
    out.push_str(&format!("{}\n", input.owned.len()));
    for owned in &input.owned {
        out.push_str(&format!("{} {}", file_name_for(owned.file), owned.segments.len()));
        for segment in &owned.segments {
            out.push(' ');
            out.push_str(segment.as_str());
        }
        out.push('\n');
    }
    out.push_str(&format!("{}\n", input.requested.len()));
    for file in &input.requested {
        out.push_str(&format!("{}\n", file_name_for(*file)));
    }
    out
}

/// Write a scenario's input files into a directory
pub async fn write_inputs(dir: &Path, inputs: &[PeerInput]) -> Result<()> {
    if !dir.exists() {
        fs::create_dir_all(dir).await.map_err(|e| {
            SwarmError::storage_error_full(
                "Failed to create input directory",
                dir.display().to_string(),
                e.to_string(),
            )
        })?;
    }
    for input in inputs {
        let path = input_path(dir, input.peer);
        fs::write(&path, render_input(input)).await.map_err(|e| {
            SwarmError::storage_error_full(
                "Failed to write generated input",
                path.display().to_string(),
                e.to_string(),
            )
        })?;
    }
    info!("Generated {} peer inputs in {}", inputs.len(), dir.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::input::parse_peer_input;

    fn spec() -> ScenarioSpec {
        ScenarioSpec { peers: 3, files: 4, max_segments: 5, seed: 7 }
    }

    #[test]
    fn test_every_file_has_one_owner_and_other_requesters() {
        let inputs = build_inputs(&spec()).unwrap();
        assert_eq!(inputs.len(), 3);

        for index in 0..4 {
            let file = FileId(index);
            let owners = inputs.iter().filter(|i| i.owned.iter().any(|o| o.file == file)).count();
            let requesters = inputs.iter().filter(|i| i.requested.contains(&file)).count();
            assert_eq!(owners, 1);
            assert_eq!(requesters, 2);
        }
    }

    #[test]
    fn test_same_seed_same_scenario() {
        let first = build_inputs(&spec()).unwrap();
        let second = build_inputs(&spec()).unwrap();
        for (a, b) in first.iter().zip(&second) {
            assert_eq!(a.requested, b.requested);
            for (fa, fb) in a.owned.iter().zip(&b.owned) {
                assert_eq!(fa.file, fb.file);
                assert_eq!(fa.segments, fb.segments);
            }
        }
    }

    #[test]
    fn test_rendered_input_parses_back() {
        let inputs = build_inputs(&spec()).unwrap();
        for input in &inputs {
            let parsed = parse_peer_input(input.peer, &render_input(input)).unwrap();
            assert_eq!(parsed.requested, input.requested);
            assert_eq!(parsed.owned.len(), input.owned.len());
            for (a, b) in parsed.owned.iter().zip(&input.owned) {
                assert_eq!(a.file, b.file);
                assert_eq!(a.segments, b.segments);
            }
        }
    }

    #[test]
    fn test_rejects_degenerate_specs() {
        assert!(build_inputs(&ScenarioSpec { peers: 0, ..spec() }).is_err());
        assert!(build_inputs(&ScenarioSpec { files: 0, ..spec() }).is_err());
        assert!(build_inputs(&ScenarioSpec { max_segments: 0, ..spec() }).is_err());
    }
}
