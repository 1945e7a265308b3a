use anyhow::Context;

use std::path::PathBuf;

use config::Snapshot;

use crate::core::dataset::{Dataset, PmfMode};
use crate::core::group::DataGroup;

/// Loads one group's snapshots into a pooled DataGroup, in the order
/// the files were given
pub fn load_group(name: &str, paths: &[PathBuf], mode: PmfMode) -> anyhow::Result<DataGroup> {
    let mut members = Vec::with_capacity(paths.len());

    for path in paths {
        let snapshot = Snapshot::read(path)
            .with_context(|| format!("could not load snapshot {}", path.display()))?;

        log::info!(
            "Group {}: loaded replicate {} from {}",
            name,
            snapshot.name,
            path.display()
        );

        members.push(Dataset::from_snapshot(snapshot, mode));
    }

    DataGroup::new(name, members)
}
