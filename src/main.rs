use clap::Parser;
use colored::Colorize;

use sumatra_website::config::{CliArgs, StaticConfig};
use sumatra_website::errors::SiteError;
use sumatra_website::runtime::modes::run_server;
use sumatra_website::system::logging::init_logging;

#[actix_web::main]
async fn main() {
    dotenvy::dotenv().ok();
    let args = CliArgs::parse();

    if args.print_sample_config {
        println!("{}", StaticConfig::generate_sample_config());
        return;
    }

    let mut config = match StaticConfig::load(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => exit_with(&e),
    };
    args.apply_to(&mut config);

    // 日志 guard 必须存活到进程结束
    let _log_guard = init_logging(&config.logging);

    if let Err(e) = run_server(config).await {
        match e.downcast_ref::<SiteError>() {
            Some(site_err) => exit_with(site_err),
            None => {
                eprintln!("{} {:#}", "[ERROR]".red().bold(), e);
                std::process::exit(1);
            }
        }
    }
}

fn exit_with(err: &SiteError) -> ! {
    eprintln!("{}", err.format_colored());
    std::process::exit(1);
}
