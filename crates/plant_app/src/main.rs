use clap::Parser;
use plant_app::app::{describe_error, run, AppConfig};
use plant_app::cli::Cli;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let mut config = AppConfig::from_env().unwrap_or_default();
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }
    if let Err(err) = run(config, cli.command.unwrap_or_default()) {
        tracing::error!(error = %err, "command failed");
        eprintln!("{}", describe_error(&err));
        std::process::exit(1);
    }
}
