use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod app;

use app::MonitorApp;

fn main() -> anyhow::Result<()> {
    setup_logging();

    info!("Starting Xtrike Monitor v{}", env!("CARGO_PKG_VERSION"));

    let app = MonitorApp::new()?;
    app.run()?;

    info!("Xtrike Monitor stopped");
    Ok(())
}

fn setup_logging() {
    // No CLI flags or environment variables: fixed INFO level.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_level(true),
        )
        .with(tracing_subscriber::filter::LevelFilter::INFO)
        .init();
}
