use std::sync::Arc;
use strategy_rewards::domain::TimeSec;
use strategy_rewards::{
    init_db, AppError, Config, DataSource, FileDataSource, Orchestrator, Repository,
};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing_subscriber::filter::LevelFilter::INFO.into()),
        )
        .init();

    if let Err(e) = run().await {
        eprintln!("{}", e);
        std::process::exit(e.exit_code());
    }
}

async fn run() -> Result<(), AppError> {
    let config = Config::from_env()?;
    let pool = init_db(&config.database_path).await?;

    let repo = Arc::new(Repository::new(pool));
    let datasource: Arc<dyn DataSource> = Arc::new(FileDataSource::new(
        config.data_dir.clone(),
        config.reward_token_decimals,
    ));
    let orchestrator = Orchestrator::new(datasource, repo, config.schedule_settings());

    let as_of = TimeSec::new(chrono::Utc::now().timestamp());
    let run = orchestrator.run_all(as_of).await?;

    tracing::info!(
        completed = run.reports.len(),
        skipped = run.skipped.len(),
        failed = run.failed.len(),
        "reward run finished"
    );
    if !run.failed.is_empty() {
        for (campaign_id, reason) in &run.failed {
            eprintln!("campaign {} failed: {}", campaign_id, reason);
        }
        std::process::exit(1);
    }
    Ok(())
}
