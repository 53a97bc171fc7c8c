use anyhow::Result;
use wordquizzle_server::cli::Config;
use wordquizzle_server::cli::Opts;
use wordquizzle_server::logger;

#[tokio::main]
async fn main() -> Result<()> {
    let opts = Opts::read();
    let config = Config::try_from(opts)?;

    logger::init_tracing(config.verbose, config.json_logs)?;

    wordquizzle_server::run(config).await
}
