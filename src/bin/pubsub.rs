//! pubsub CLI: run a queue consumer or publish a notification.

use pubsub_common::config::Config;
use pubsub_common::publish::{SnsNotification, SnsPublisher};
use pubsub_common::queue::SqsQueue;
use pubsub_common::subscriber::{Subscriber, SubscriberConfig, SubscriberSettings, handler_fn};
use pubsub_common::telemetry::{TelemetryConfig, init_telemetry};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "pubsub", about = "Queue consumer and topic publisher")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Consume a queue until Ctrl-C, logging every message
    Consume {
        /// Logical queue name (environment prefix is added)
        #[arg(long)]
        queue: String,
        /// Number of poll workers
        #[arg(long, default_value_t = 10)]
        workers: usize,
        /// TOML file overriding pool settings
        #[arg(long)]
        settings: Option<PathBuf>,
    },
    /// Publish a notification to a topic
    Publish {
        /// Logical topic name (environment prefix is added)
        #[arg(long)]
        topic: String,
        #[arg(long)]
        message: String,
        #[arg(long)]
        subject: Option<String>,
        /// Notification type attribute
        #[arg(long = "type")]
        notification_type: Option<String>,
        #[arg(long)]
        type_id: Option<String>,
        /// Recipients as JSON
        #[arg(long)]
        recipients: Option<String>,
        /// Extra body as JSON
        #[arg(long)]
        body: Option<String>,
        /// Publish without recipients
        #[arg(long)]
        service_to_service: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let config = Config::from_env()?;

    let guard = Arc::new(init_telemetry(TelemetryConfig::from_config(&config))?);

    match cli.command {
        Command::Consume {
            queue,
            workers,
            settings,
        } => cmd_consume(&config, guard, queue, workers, settings).await,
        Command::Publish {
            topic,
            message,
            subject,
            notification_type,
            type_id,
            recipients,
            body,
            service_to_service,
        } => {
            let mut notification = SnsNotification::new(topic, message);
            if let Some(s) = subject {
                notification = notification.with_subject(s);
            }
            if let Some(t) = notification_type {
                notification = notification.with_type(t);
            }
            if let Some(id) = type_id {
                notification = notification.with_type_id(id);
            }
            if let Some(json) = recipients {
                notification = notification.with_recipients(serde_json::from_str(&json)?);
            }
            if let Some(json) = body {
                notification = notification.with_body(serde_json::from_str(&json)?);
            }
            if service_to_service {
                notification = notification.service_to_service();
            }

            let publisher = SnsPublisher::from_config(&config.aws).await;
            let id = notification.send(&publisher, &config.naming()).await?;
            println!("Published: {id}");
            Ok(())
        }
    }
}

async fn cmd_consume(
    config: &Config,
    guard: Arc<pubsub_common::telemetry::TelemetryGuard>,
    queue: String,
    workers: usize,
    settings: Option<PathBuf>,
) -> anyhow::Result<()> {
    let mut pool_config = SubscriberConfig::new(workers);
    if let Some(path) = settings {
        pool_config = SubscriberSettings::load(path)?.apply(pool_config);
    }

    let client = SqsQueue::from_config(&config.aws).await;
    let mut subscriber =
        Subscriber::new(Arc::new(client), &config.naming(), &queue, pool_config).await?;

    subscriber.add_handler(handler_fn("log", |msg| {
        tracing::info!(
            message_id = %msg.id,
            bytes = msg.body.len(),
            attributes = msg.metadata.len(),
            "message received"
        );
        Ok(())
    }))?;
    subscriber.on_close(move || {
        guard.force_flush();
        Ok(())
    });

    subscriber.start()?;
    println!(
        "Consuming {} with {} workers (Ctrl-C to stop)",
        subscriber.queue_name(),
        subscriber.config().worker_count
    );

    tokio::signal::ctrl_c().await?;
    subscriber.close().await?;
    Ok(())
}
