use anyhow::Result;
use clap::Parser;
use transfer_monitor::bootstrap::{cancel_on_ctrl_c, init_tracing, prepare};
use transfer_monitor::config::{Config, Mode, parse_address};
use transfer_monitor::{ConsoleReporter, LiveSubscription, Monitor, OutputFormat, ReconnectPolicy};
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "watch")]
#[command(about = "Stream ERC20 transfers of a token as new blocks arrive", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "text")]
    format: String,

    /// Token contract, overrides TOKEN_CONTRACT_ADDRESS
    #[arg(long)]
    token: Option<String>,

    /// Event signature, overrides TRANSFER_EVENT_SIGNATURE
    #[arg(long)]
    signature: Option<String>,

    /// Reconnect attempts after the subscription drops, 0 exits on the first error
    #[arg(long)]
    max_reconnects: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let mut config = Config::from_env(Mode::Live)?;
    if let Some(token) = &cli.token {
        config.token_address = parse_address(token)?;
    }
    if let Some(signature) = cli.signature {
        config.event_signature = signature;
    }
    if let Some(max_reconnects) = cli.max_reconnects {
        config.max_reconnects = max_reconnects;
    }
    info!("Configuration loaded");

    let pipeline = prepare(&config).await?;
    info!("Token decimal places: {}", pipeline.metadata.decimals.0);
    info!("Starting to monitor transfers...");

    let source = LiveSubscription::new(
        pipeline.client.clone(),
        ReconnectPolicy::default().with_max_attempts(config.max_reconnects),
    );
    let reporter = ConsoleReporter::stdout(
        OutputFormat::from(cli.format.as_str()),
        pipeline.metadata.symbol.clone(),
    );
    let mut monitor = Monitor::new(pipeline.decoder, reporter);

    if let Err(e) = monitor
        .run(&source, &pipeline.filter, cancel_on_ctrl_c())
        .await
    {
        error!("Monitor error: {}", e);
        return Err(e.into());
    }

    Ok(())
}
