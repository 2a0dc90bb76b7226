use anyhow::Result;
use ir_quarterly_reports::utils::logging;
use ir_quarterly_reports::{App, Config};

#[tokio::main]
async fn main() -> Result<()> {
    logging::init();

    let config = Config::from_env();

    let summary = App::initialize(config).await?.run().await?;
    if summary.total() > 0 && summary.succeeded().count() == 0 {
        anyhow::bail!("every company failed");
    }

    Ok(())
}
