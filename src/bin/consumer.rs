use todo_backend::logger::*;
use todo_backend::server::*;
use todo_backend::settings::*;
use tokio::signal;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let logger = Logger::new_bootstrap();

    let project_settings = parse_settings(cli.settings.as_deref())?;
    logger.reload_from_config(&LogConfig::from(&project_settings.log))?;

    let runtime = ConsumerRuntime::try_new(&project_settings).await?;
    runtime
        .run_until(async {
            if let Err(e) = signal::ctrl_c().await {
                error!("could not listen for SIGINT: {e}");
            }
        })
        .await?;

    info!("consumer stopped");
    Ok(())
}
