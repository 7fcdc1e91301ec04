use anyhow::Result;
use clap::Parser;
use transfer_monitor::bootstrap::{cancel_on_ctrl_c, init_tracing, prepare};
use transfer_monitor::config::{Config, Mode, parse_address};
use transfer_monitor::{ConsoleReporter, HistoricalRange, Monitor, OutputFormat};
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "backfill")]
#[command(about = "Report ERC20 transfers of a token in the most recent blocks", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "text")]
    format: String,

    /// Token contract, overrides TOKEN_CONTRACT_ADDRESS
    #[arg(long)]
    token: Option<String>,

    /// Event signature, overrides TRANSFER_EVENT_SIGNATURE
    #[arg(long)]
    signature: Option<String>,

    /// Number of blocks to look back from the chain head, overrides LOOKBACK_BLOCKS
    #[arg(long)]
    lookback: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let mut config = Config::from_env(Mode::Historical)?;
    if let Some(token) = &cli.token {
        config.token_address = parse_address(token)?;
    }
    if let Some(signature) = cli.signature {
        config.event_signature = signature;
    }
    if let Some(lookback) = cli.lookback {
        anyhow::ensure!(lookback > 0, "--lookback must be at least 1");
        config.lookback_blocks = lookback;
    }
    info!("Configuration loaded");

    let pipeline = prepare(&config).await?;
    info!("Token decimal places: {}", pipeline.metadata.decimals.0);

    let source = HistoricalRange::new(pipeline.client.clone(), config.lookback_blocks);
    let reporter = ConsoleReporter::stdout(
        OutputFormat::from(cli.format.as_str()),
        pipeline.metadata.symbol.clone(),
    );
    let mut monitor = Monitor::new(pipeline.decoder, reporter);

    match monitor
        .run(&source, &pipeline.filter, cancel_on_ctrl_c())
        .await
    {
        Ok(summary) => {
            info!(
                "Backfill complete: {} transfers, {} skipped",
                summary.reported, summary.skipped
            );
            Ok(())
        }
        Err(e) => {
            error!("Backfill error: {}", e);
            Err(e.into())
        }
    }
}
