use std::sync::Arc;

use lmb_core::config::Config;

#[tokio::main]
async fn main() -> Result<(), lmb_core::Error> {
    lmb_core::logging::init("lmb")?;

    let cfg = Arc::new(Config::load()?);

    lmb_telegram::router::run_polling(cfg)
        .await
        .map_err(|e| lmb_core::Error::External(format!("telegram bot failed: {e}")))?;

    tracing::info!("lmb stopped");
    Ok(())
}
