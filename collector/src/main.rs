use clap::{Parser, Subcommand};
use log::{error, info};
use num_bigint::BigUint;
use std::time::Duration;
use telemetry_collector::CollectorClient;
use telemetry_common::encryption::{decode_envelope, DhGroup, DhParams, TelemetryCipher};
use telemetry_common::logging::setup_logger;
use telemetry_common::Result;

#[derive(Parser, Debug)]
#[command(author, version, about = "Collects and decrypts telemetry from a node")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Handshake with a node, then fetch telemetry periodically
    Poll {
        #[arg(long, default_value = "http://127.0.0.1:8080")]
        node_url: String,

        /// Seconds between fetches
        #[arg(long, default_value_t = 10)]
        interval: u64,

        /// Stop after this many records; runs forever when omitted
        #[arg(long)]
        count: Option<u64>,

        #[arg(long, default_value = "modp2048")]
        dh_group: DhGroup,
    },
    /// Decrypt one captured /sensor body offline
    Decrypt {
        /// Shared secret as a decimal integer
        #[arg(long)]
        secret: BigUint,

        /// Base64 body returned by /sensor
        #[arg(long)]
        data: String,
    },
}

async fn poll(node_url: &str, interval: u64, count: Option<u64>, group: DhGroup) -> Result<()> {
    let client = CollectorClient::new(node_url, DhParams::from_group(group)?)?;

    let mut ticker = tokio::time::interval(Duration::from_secs(interval.max(1)));
    let mut received = 0u64;
    while count.map_or(true, |n| received < n) {
        ticker.tick().await;
        match client.fetch_or_rekey().await {
            Ok(payload) => {
                received += 1;
                println!("{}", serde_json::to_string(&payload)?);
            }
            Err(e) => error!("Failed to fetch telemetry, retrying next tick: {}", e),
        }
    }

    info!("Received {} telemetry records", received);
    Ok(())
}

fn decrypt(secret: &BigUint, data: &str) -> Result<()> {
    let cipher = TelemetryCipher::from_shared_secret(secret)?;
    info!("Derived key fingerprint {}", cipher.key_fingerprint());
    let plaintext = cipher.decrypt(&decode_envelope(data)?)?;
    println!("{}", String::from_utf8_lossy(&plaintext));
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    setup_logger();
    let args = Args::parse();

    match args.command {
        Command::Poll { node_url, interval, count, dh_group } => {
            poll(&node_url, interval, count, dh_group).await
        }
        Command::Decrypt { secret, data } => decrypt(&secret, &data),
    }
}
