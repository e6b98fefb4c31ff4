//! Runtime configuration for the HTTP service.

use anyhow::{Context, Result};
use clap::Args;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

pub const DEFAULT_PORT: u16 = 3000;

/// Name of the data directory next to the executable.
pub const DATA_DIR_NAME: &str = "data";

#[derive(Debug, Clone, Args)]
pub struct ServeConfig {
    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Address to bind
    #[arg(long, env = "HOST", default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
    pub host: IpAddr,

    #[command(flatten)]
    pub data: DataConfig,

    /// Do not create or seed the data directory before loading
    #[arg(long, default_value_t = false)]
    pub no_bootstrap: bool,
}

impl ServeConfig {
    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

#[derive(Debug, Clone, Args)]
pub struct DataConfig {
    /// Directory holding the GTFS text files [default: data/ next to the executable]
    #[arg(short, long, env = "GTFS_DATA_DIR", value_name = "DIR")]
    pub data_dir: Option<PathBuf>,
}

impl DataConfig {
    /// The configured directory, or `data/` beside the running executable.
    pub fn resolve(&self) -> Result<PathBuf> {
        match &self.data_dir {
            Some(dir) => Ok(dir.clone()),
            None => default_data_dir(),
        }
    }
}

fn default_data_dir() -> Result<PathBuf> {
    let exe = std::env::current_exe().context("failed to locate the running executable")?;
    let parent = exe
        .parent()
        .with_context(|| format!("{} has no parent directory", exe.display()))?;
    Ok(parent.join(DATA_DIR_NAME))
}
