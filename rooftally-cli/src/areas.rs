//! `areas` commands: inspect and manage the durable store.

use std::io::Write;

use camino::{Utf8Path, Utf8PathBuf};
use clap::{Parser, Subcommand};
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use rooftally_core::{AreaId, CachedArea};
use serde::{Deserialize, Serialize};

use crate::settings::{DEFAULT_CACHE_DIR, open_store, write_json};
use crate::{ARG_AREA_ID, ARG_CACHE_DIR, CliError, ENV_DELETE_ID};

#[derive(Debug, Subcommand)]
pub(crate) enum AreasCommand {
    /// List every cached area.
    List(StoreArgs),
    /// Print totals over every cached area.
    Stats(StoreArgs),
    /// Delete one cached area.
    Delete(DeleteArgs),
    /// Delete every cached area.
    Clear(StoreArgs),
    /// Drop index entries whose data file is missing.
    Prune(StoreArgs),
}

/// Store location shared by `areas list|stats|clear|prune`.
///
/// Layered values come from the `[cmds.areas]` configuration section and
/// `ROOFTALLY_CMDS_AREAS_*` environment variables.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(name = "areas", about = "Locate the cached area store")]
#[ortho_config(prefix = "ROOFTALLY")]
pub(crate) struct StoreArgs {
    /// Directory holding cached areas.
    #[arg(long = ARG_CACHE_DIR, value_name = "dir")]
    #[serde(default)]
    pub(crate) cache_dir: Option<Utf8PathBuf>,
}

impl StoreArgs {
    /// Merge configuration layers and resolve the store directory.
    fn into_cache_dir(self) -> Result<Utf8PathBuf, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        Ok(merged.resolved_cache_dir())
    }

    fn resolved_cache_dir(self) -> Utf8PathBuf {
        self.cache_dir
            .unwrap_or_else(|| Utf8PathBuf::from(DEFAULT_CACHE_DIR))
    }
}

#[cfg(test)]
pub(crate) fn cache_dir_from_layers_for_test(
    layers: Vec<ortho_config::MergeLayer<'static>>,
) -> Result<Utf8PathBuf, CliError> {
    let merged = StoreArgs::merge_from_layers(layers).map_err(CliError::from)?;
    Ok(merged.resolved_cache_dir())
}

/// A store-wide `areas` action with its arguments stripped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StoreAction {
    List,
    Stats,
    Clear,
    Prune,
}

/// CLI arguments for `areas delete`.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(name = "delete", about = "Delete one cached area")]
#[ortho_config(prefix = "ROOFTALLY")]
pub(crate) struct DeleteArgs {
    /// Identifier of the area to delete.
    #[arg(value_name = ARG_AREA_ID)]
    #[serde(default)]
    pub(crate) id: Option<String>,
    /// Directory holding cached areas.
    #[arg(long = ARG_CACHE_DIR, value_name = "dir")]
    #[serde(default)]
    pub(crate) cache_dir: Option<Utf8PathBuf>,
}

/// Resolved `areas delete` configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct DeleteConfig {
    pub(crate) id: AreaId,
    pub(crate) cache_dir: Utf8PathBuf,
}

impl TryFrom<DeleteArgs> for DeleteConfig {
    type Error = CliError;

    fn try_from(args: DeleteArgs) -> Result<Self, Self::Error> {
        let id = args.id.ok_or(CliError::MissingArgument {
            field: ARG_AREA_ID,
            env: ENV_DELETE_ID,
        })?;
        Ok(Self {
            id: AreaId::from(id),
            cache_dir: StoreArgs {
                cache_dir: args.cache_dir,
            }
            .resolved_cache_dir(),
        })
    }
}

#[derive(Debug, Serialize)]
struct AreaListing {
    count: usize,
    areas: Vec<CachedArea>,
}

#[derive(Debug, Serialize)]
struct Deleted {
    deleted: AreaId,
}

#[derive(Debug, Serialize)]
struct Removed {
    removed: usize,
}

pub(crate) fn run_areas(command: AreasCommand, out: &mut dyn Write) -> Result<(), CliError> {
    let (action, args) = match command {
        AreasCommand::Delete(args) => {
            let merged = args.load_and_merge().map_err(CliError::Configuration)?;
            return run_delete(&DeleteConfig::try_from(merged)?, out);
        }
        AreasCommand::List(args) => (StoreAction::List, args),
        AreasCommand::Stats(args) => (StoreAction::Stats, args),
        AreasCommand::Clear(args) => (StoreAction::Clear, args),
        AreasCommand::Prune(args) => (StoreAction::Prune, args),
    };
    run_store_action(action, &args.into_cache_dir()?, out)
}

/// Run `action` against the store rooted at `cache_dir`.
pub(crate) fn run_store_action(
    action: StoreAction,
    cache_dir: &Utf8Path,
    out: &mut dyn Write,
) -> Result<(), CliError> {
    let store = open_store(cache_dir)?;
    match action {
        StoreAction::List => {
            let areas = store.list();
            write_json(
                out,
                &AreaListing {
                    count: areas.len(),
                    areas,
                },
            )
        }
        StoreAction::Stats => write_json(out, &store.stats()),
        StoreAction::Clear => {
            let removed = store.clear()?;
            write_json(out, &Removed { removed })
        }
        StoreAction::Prune => {
            let removed = store.prune_dangling()?;
            write_json(out, &Removed { removed })
        }
    }
}

pub(crate) fn run_delete(config: &DeleteConfig, out: &mut dyn Write) -> Result<(), CliError> {
    let store = open_store(&config.cache_dir)?;
    if !store.delete(&config.id)? {
        return Err(CliError::AreaNotFound {
            id: config.id.to_string(),
        });
    }
    write_json(
        out,
        &Deleted {
            deleted: config.id.clone(),
        },
    )
}
