use std::sync::Arc;

use futures::StreamExt;
use tokio::sync::broadcast::error::RecvError;
use tracing_appender::non_blocking::WorkerGuard;

use loan_assist::channels::command::HELP;
use loan_assist::channels::{Channel, ChatCommand, CliChannel};
use loan_assist::config::DialogConfig;
use loan_assist::dialog::{spawn_conversation, DialogEngine};

/// Log to stderr by default, or to `$LOAN_ASSIST_LOG_DIR/loan-assist.log`
/// so the REPL output stays readable.
fn init_tracing() -> Option<WorkerGuard> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    match std::env::var("LOAN_ASSIST_LOG_DIR") {
        Ok(dir) => {
            let appender = tracing_appender::rolling::never(dir, "loan-assist.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(writer)
                .with_ansi(false)
                .init();
            Some(guard)
        }
        Err(_) => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .with_target(false)
                .init();
            None
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let log_guard = init_tracing();

    let config = DialogConfig::from_env()?;

    eprintln!("🏦 Loan Assist v{}", env!("CARGO_PKG_VERSION"));
    eprintln!(
        "   Ceilings: existing customers ₹{}, new customers ₹{}",
        loan_assist::emi::format_amount(config.existing_customer_ceiling),
        loan_assist::emi::format_amount(config.new_customer_ceiling),
    );
    eprintln!("   Type /help for commands.\n");

    let engine = DialogEngine::new(config);
    let (conversation, task) = spawn_conversation(engine);
    let channel: Arc<dyn Channel> = Arc::new(CliChannel::new());

    // Renderer: prints updates in the order the conversation publishes them.
    let mut updates = conversation.subscribe();
    let render_channel = Arc::clone(&channel);
    let renderer = tokio::spawn(async move {
        loop {
            match updates.recv().await {
                Ok(update) => {
                    if let Err(e) = render_channel.render(&update).await {
                        tracing::error!("Render failed: {}", e);
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Renderer lagged behind");
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    let mut commands = channel.start().await?;
    tracing::info!(channel = channel.name(), "Channel started");
    while let Some(command) = commands.next().await {
        match command {
            ChatCommand::Quit => break,
            ChatCommand::Reset => conversation.reset()?,
            ChatCommand::Help => channel.notice(HELP).await?,
            ChatCommand::ShowLog => {
                let session = conversation.snapshot().await;
                channel
                    .notice(&serde_json::to_string_pretty(&session)?)
                    .await?;
            }
            other => {
                let prompt = conversation.snapshot().await.pending_prompt();
                if let Some(event) = other.into_event(&prompt) {
                    conversation.send(event)?;
                }
            }
        }
    }

    conversation.close()?;
    task.await?;
    drop(conversation);
    renderer.await?;

    // The stdin reader sits in a blocking read that cannot be cancelled.
    drop(log_guard);
    std::process::exit(0)
}
