pub mod init;
pub mod judge;

use std::path::PathBuf;
use std::process::ExitCode;

use localjudge_core::Config;

use crate::util;

#[derive(Debug, clap::Parser)]
#[command(author, version, about, long_about = None)]
pub struct GlobalArgs {
    #[command(subcommand)]
    pub subcmd: Subcommand,

    /// Use this config file instead of searching for judge.toml
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Debug, clap::Subcommand)]
pub enum Subcommand {
    Init(init::Args),

    #[command(alias("j"))]
    Judge(judge::Args),
}

pub type SubcmdResult = anyhow::Result<ExitCode>;

impl GlobalArgs {
    pub async fn exec_subcmd(&self) -> SubcmdResult {
        use Subcommand::*;
        match &self.subcmd {
            Init(args) => init::exec(args, self),
            Judge(args) => judge::exec(args, self).await,
        }
    }

    pub fn load_config(&self) -> anyhow::Result<Config> {
        let cfg = match &self.config {
            Some(path) => Config::from_toml_file(path.clone())?,
            None => Config::load(util::current_dir())?,
        };
        match &cfg.source_config_file {
            Some(path) => log::debug!("Loaded config from {}", path.to_string_lossy()),
            None => log::debug!("No {} found, using defaults", Config::FILENAME),
        }
        Ok(cfg)
    }
}
