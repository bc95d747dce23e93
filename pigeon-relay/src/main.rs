use pigeon_relay::core::server::ctrl_c;
use pigeon_relay::{BackgroundTasks, Server, ServerState, print_banner, setup_environment};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. dotenv, config, logging
    let config = setup_environment()?;

    print_banner();

    tracing::info!(
        backend = ?config.printer_backend,
        printer = config.printer_name.as_deref().unwrap_or("<default>"),
        width = config.printer_width,
        max_text_length = config.max_text_length,
        "Pigeon relay starting..."
    );

    // 2. Printer, font, queue and print worker
    let mut tasks = BackgroundTasks::new();
    let state = ServerState::initialize(&config, &mut tasks).await?;
    tasks.log_summary();

    // 3. Intake until Ctrl-C
    let result = Server::new(state).run(ctrl_c()).await;

    // 4. Stop the worker after the job in flight
    tasks.shutdown().await;

    if let Err(e) = result {
        tracing::error!("Server error: {}", e);
        return Err(e.into());
    }
    Ok(())
}
