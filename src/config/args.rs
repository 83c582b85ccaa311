//! Command-line argument parsing
//!
//! Flags override values loaded from the config file and environment.

use clap::Parser;

use super::StaticConfig;

#[derive(Debug, Clone, Parser, Default)]
#[command(name = "sumatra_website", version, about = "Sumatra PDF website server")]
pub struct CliArgs {
    /// HTTP server address
    #[arg(long)]
    pub addr: Option<String>,

    /// Run in production mode (binds :80/:443, enables TLS and startup mail)
    #[arg(long)]
    pub production: bool,

    /// Path to the TOML configuration file
    #[arg(short = 'c', long = "config")]
    pub config: Option<String>,

    /// Always redirect /dl/ requests to remote storage
    #[arg(long)]
    pub disable_local_downloads: bool,

    /// Print a sample configuration and exit
    #[arg(long)]
    pub print_sample_config: bool,
}

impl CliArgs {
    /// 把命令行参数合并进配置（命令行优先）
    pub fn apply_to(&self, config: &mut StaticConfig) {
        if let Some(ref addr) = self.addr {
            config.server.addr = addr.clone();
        }
        if self.production {
            config.server.production = true;
        }
        if self.disable_local_downloads {
            config.site.disable_local_downloads = true;
        }
        config.apply_production_overrides();
    }
}
