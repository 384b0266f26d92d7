//! claimq CLI: run the poller and inspect the work collection.

use claimq::config::Config;
use claimq::config::secrets::ExposeSecret;
use claimq::db::Db;
use claimq::engine::ControlPlane;
use claimq::handler::{DefaultTranslator, NoopHandler};
use claimq::model::{NewWorkItem, Status, WorkId};
use claimq::telemetry::{TelemetryConfig, init_telemetry};
use clap::{Parser, Subcommand};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "claimq", about = "Document work queue with atomic claims")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the poller until Ctrl-C
    Serve,
    /// Work item operations
    Work {
        #[command(subcommand)]
        action: WorkAction,
    },
}

#[derive(Subcommand)]
enum WorkAction {
    /// Insert a new work item in the ready status
    Submit {
        /// Correlation key (e.g. an order number)
        correlation_key: String,
        /// JSON document body
        #[arg(long)]
        payload: Option<String>,
    },
    /// List work items
    List {
        /// Filter by status literal
        #[arg(long)]
        status: Option<String>,
        /// Maximum items to show
        #[arg(long, default_value_t = 20)]
        limit: i64,
    },
    /// Show a work item
    Show {
        /// Work item ID (UUID)
        id: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let config = Config::from_env()?;

    match cli.command {
        Command::Serve => cmd_serve(config).await,
        Command::Work { action } => {
            let db = Db::connect(
                config.database_url.expose_secret(),
                config.poll.collection.clone(),
            )
            .await?;
            db.ensure_collection().await?;

            match action {
                WorkAction::Submit {
                    correlation_key,
                    payload,
                } => cmd_work_submit(&db, &config, correlation_key, payload).await,
                WorkAction::List { status, limit } => cmd_work_list(&db, status, limit).await,
                WorkAction::Show { id } => cmd_work_show(&db, id).await,
            }
        }
    }
}

async fn cmd_serve(config: Config) -> anyhow::Result<()> {
    let _guard = init_telemetry(TelemetryConfig {
        endpoint: config.otel_endpoint.clone(),
        service_name: "claimq".to_string(),
        log_level: config.log_level.clone(),
    })?;

    let db = Db::connect(
        config.database_url.expose_secret(),
        config.poll.collection.clone(),
    )
    .await?;
    db.health_check().await?;
    db.ensure_collection().await?;

    let control = ControlPlane::new(
        Arc::new(db),
        Arc::new(DefaultTranslator),
        Arc::new(NoopHandler),
        config.poll,
    );

    let ctrl = control.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        ctrl.shutdown();
    });

    control.run().await;
    Ok(())
}

async fn cmd_work_submit(
    db: &Db,
    config: &Config,
    correlation_key: String,
    payload: Option<String>,
) -> anyhow::Result<()> {
    let payload: serde_json::Value = match payload {
        Some(json) => serde_json::from_str(&json)?,
        None => serde_json::json!({}),
    };

    let item = db
        .submit_work(
            NewWorkItem::new(correlation_key).payload(payload),
            &config.poll.ready_status,
        )
        .await?;

    println!("Created: {} (status: {})", item.id, item.status);
    Ok(())
}

async fn cmd_work_list(db: &Db, status: Option<String>, limit: i64) -> anyhow::Result<()> {
    let status = status.map(Status::new);
    let items = db.list_work_items(status.as_ref(), limit).await?;

    if items.is_empty() {
        println!("No work items found.");
        return Ok(());
    }

    println!(
        "{:<36}  {:<20}  {:<12}  {:<4}  MODIFIED",
        "ID", "CORRELATION_KEY", "STATUS", "VER"
    );
    println!("{}", "-".repeat(100));

    for item in &items {
        let key: String = item.correlation_key.chars().take(20).collect();
        println!(
            "{:<36}  {:<20}  {:<12}  {:<4}  {}",
            item.id,
            key,
            item.status,
            item.version,
            item.last_modified_at.format("%Y-%m-%d %H:%M:%S")
        );
    }

    println!("\n{} item(s)", items.len());
    Ok(())
}

async fn cmd_work_show(db: &Db, id: String) -> anyhow::Result<()> {
    let id: WorkId = id
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid work item id {id:?}: {e}"))?;
    let item = db.get_work_item(id).await?;

    println!("ID:          {}", item.id);
    println!("Correlation: {}", item.correlation_key);
    println!("Status:      {}", item.status);
    println!("Version:     {}", item.version);
    println!("Created:     {}", item.created_at);
    println!("Modified:    {}", item.last_modified_at);
    println!(
        "Payload:     {}",
        serde_json::to_string_pretty(&item.payload)?
    );

    Ok(())
}
