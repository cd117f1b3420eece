use clap::{Args, Parser, Subcommand};
use hydromap_core::config::{CacheBackend, CliConfigOverrides};
use std::path::PathBuf;

/// Hydromap - Watershed delineation over precomputed terrain rasters
#[derive(Parser, Debug)]
#[command(name = "hydromap")]
#[command(about = "Watershed delineation over precomputed terrain rasters", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Output results in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    #[command(flatten)]
    pub overrides: OverrideArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Settings that take precedence over the config file and environment
#[derive(Args, Debug, Default)]
pub struct OverrideArgs {
    /// Filled elevation raster
    #[arg(long, global = true, value_name = "PATH")]
    pub dem: Option<PathBuf>,

    /// D8 flow direction raster
    #[arg(long, global = true, value_name = "PATH")]
    pub flow_dir: Option<PathBuf>,

    /// Flow accumulation raster
    #[arg(long, global = true, value_name = "PATH")]
    pub flow_acc: Option<PathBuf>,

    /// Result cache directory
    #[arg(long, global = true, value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Result cache backend
    #[arg(long, global = true)]
    pub cache_backend: Option<CacheBackendArg>,

    /// Disable the result cache
    #[arg(long, global = true)]
    pub no_cache: bool,
}

impl From<OverrideArgs> for CliConfigOverrides {
    fn from(args: OverrideArgs) -> Self {
        CliConfigOverrides {
            dem_path: args.dem,
            flow_dir_path: args.flow_dir,
            flow_acc_path: args.flow_acc,
            cache_enabled: args.no_cache.then_some(false),
            cache_backend: args.cache_backend.map(CacheBackend::from),
            cache_dir: args.cache_dir,
        }
    }
}

/// Cache backend selection
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum CacheBackendArg {
    /// JSON files under the cache directory
    File,
    /// Redis server
    Redis,
}

impl From<CacheBackendArg> for CacheBackend {
    fn from(arg: CacheBackendArg) -> Self {
        match arg {
            CacheBackendArg::File => CacheBackend::File,
            CacheBackendArg::Redis => CacheBackend::Redis,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show whether the input rasters are present
    Status,

    /// Delineate the watershed draining to a point
    Delineate(DelineateArgs),

    /// Manage the result cache
    Cache(CacheArgs),

    /// Show effective configuration and where each value came from
    Config,
}

#[derive(Parser, Debug)]
pub struct DelineateArgs {
    /// Latitude of the pour point (WGS84)
    #[arg(long, allow_hyphen_values = true)]
    pub lat: f64,

    /// Longitude of the pour point (WGS84)
    #[arg(long, allow_hyphen_values = true)]
    pub lon: f64,

    /// Use the point as given instead of snapping to the nearest stream
    #[arg(long)]
    pub no_snap: bool,

    /// Snap search radius in meters (0-1000)
    #[arg(long, value_name = "METERS")]
    pub snap_radius: Option<i64>,

    /// Write the full response to a file instead of stdout
    #[arg(long, short = 'o', value_name = "FILE")]
    pub output: Option<PathBuf>,
}

#[derive(Parser, Debug)]
pub struct CacheArgs {
    #[command(subcommand)]
    pub command: CacheCommand,
}

#[derive(Subcommand, Debug)]
pub enum CacheCommand {
    /// Remove every cached watershed
    Clear,
}
