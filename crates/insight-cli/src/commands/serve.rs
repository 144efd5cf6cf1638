//! Serve command implementation.

use anyhow::Result;

use insight_service::Config;

pub async fn cmd_serve(mut config: Config, bind: Option<String>, no_cycle: bool) -> Result<()> {
    if let Some(bind) = bind {
        config.server.bind = bind;
    }
    if no_cycle {
        tracing::info!("Update cycle disabled");
        config.cycle.autostart = false;
    }
    insight_service::serve(config).await
}
