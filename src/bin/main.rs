use pipedrive_connector::config::raw_from_env;
use pipedrive_connector::{create_default_registry, Message, Snapshot};
use serde_json::Value;
use tokio::io::AsyncReadExt;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Usage: `pipedrive-action <action>` with the message body as JSON on stdin.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    // Load environment variables
    dotenv::dotenv().ok();

    let registry = create_default_registry();

    let action_name = match std::env::args().nth(1) {
        Some(name) => name,
        None => {
            eprintln!("usage: pipedrive-action <{}>", registry.list().join("|"));
            std::process::exit(2);
        }
    };
    let action = registry.require(&action_name)?;

    info!(action = action.name(), "Running action");

    let mut raw = String::new();
    tokio::io::stdin().read_to_string(&mut raw).await?;
    let body: Value = if raw.trim().is_empty() {
        Value::Null
    } else {
        serde_json::from_str(&raw)?
    };

    // Validated by the action, after its own pre-checks.
    let cfg = raw_from_env();

    let output = action
        .process(Message::from_body(body), Some(&cfg), &Snapshot::default())
        .await?;

    println!("{}", serde_json::to_string_pretty(&output.body)?);
    Ok(())
}
