//! Test helpers for seeding a cache directory the CLI commands can open.

use super::*;
use camino::{Utf8Path, Utf8PathBuf};
use rooftally_core::test_support::{StubFootprintSource, square_footprint};
use rooftally_core::{Bbox, CacheRequest, CachedArea};
use rooftally_data::{AreaStore, NoProgress};
use tempfile::TempDir;

/// A temporary cache directory.
#[derive(Debug)]
pub(super) struct CacheDir {
    _temp: TempDir,
    root: Utf8PathBuf,
}

impl CacheDir {
    pub(super) fn new() -> Self {
        let temp = TempDir::new().expect("tempdir");
        let root = Utf8PathBuf::from_path_buf(temp.path().join("cache")).expect("utf-8 path");
        Self { _temp: temp, root }
    }

    pub(super) fn root(&self) -> &Utf8Path {
        &self.root
    }

    pub(super) fn store(&self) -> AreaStore {
        AreaStore::open(&self.root).expect("open store")
    }

    /// Register an area holding `buildings` squares near Stockholm.
    pub(super) fn seed_area(&self, name: &str, buildings: usize) -> CachedArea {
        let bbox = sample_bbox();
        let footprints = (0..buildings)
            .map(|i| {
                let offset = f64::from(u32::try_from(i).expect("small index")) * 0.001;
                square_footprint(&format!("{name}-{i}"), 18.061 + offset, 59.331)
            })
            .collect();
        let source = StubFootprintSource::with_footprints(footprints);
        self.store()
            .add(&CacheRequest::new(bbox, name), &source, &NoProgress)
            .expect("add area")
            .expect("area has footprints")
    }
}

pub(super) fn sample_bbox() -> Bbox {
    Bbox::new(18.06, 59.33, 18.08, 59.34).expect("valid bbox")
}

/// Run `command` and return what it wrote as JSON.
pub(super) fn run_json(command: Command) -> Result<serde_json::Value, CliError> {
    let mut out = Vec::new();
    let mut progress = Vec::new();
    run_command(command, &mut out, &mut progress)?;
    Ok(serde_json::from_slice(&out).expect("command output is JSON"))
}

/// Parse `args` as if typed after the binary name.
pub(super) fn parse(args: &[&str]) -> Result<Command, clap::Error> {
    let argv = std::iter::once("rooftally").chain(args.iter().copied());
    Cli::try_parse_from(argv).map(|cli| cli.command)
}
