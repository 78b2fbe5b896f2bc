use tracing_subscriber::EnvFilter;

use wallet_credit_score::config::Config;
use wallet_credit_score::pipeline::ScoringPipeline;

fn main() -> eyre::Result<()> {
    color_eyre::install()?;

    // Initialize structured logging (set RUST_LOG=debug for model details)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    tracing::info!("Wallet credit scorer starting");

    let config_path = std::env::args().nth(1);
    let config = Config::from_arg(config_path.as_deref())?;
    tracing::info!(
        input = %config.input.path,
        scores = %config.output.scores_path,
        seed = config.model.seed,
        "Configuration loaded"
    );

    let pipeline = ScoringPipeline::new(&config);
    let summary = pipeline.run(&config.input.path)?;

    tracing::info!(
        wallets = summary.wallets_scored,
        skipped_lines = summary.skipped_lines,
        "Scores saved to {}, analysis saved to {}",
        config.output.scores_path,
        config.output.analysis_path
    );
    Ok(())
}
