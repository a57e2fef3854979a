use clap::Parser;
use glasomat_lib::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging (reads RUST_LOG env var)
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    glasomat_lib::run(Cli::parse()).await
}
