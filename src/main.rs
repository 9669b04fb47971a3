use clap::Parser;
use miette::Result;
use switcher_core::settings::Settings;
use switcher_core::web::{self, AppState};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(
    name = "switcher",
    version,
    about = "Feature switch evaluation and access policy service"
)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    // logging
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(env_filter).init();

    let cli = Cli::parse();

    // load settings
    let settings = Settings::load(&cli.config)?;
    tracing::info!(?settings, "Loaded configuration");

    // store, cache, evaluator and verifier
    let state = AppState::build(settings)?;

    web::serve(state).await?;
    Ok(())
}
