use clap::Parser;
use log::{info, warn};
use std::sync::Arc;
use telemetry_common::encryption::{DhGroup, DhParams, KeyAgreement};
use telemetry_common::logging::setup_logger;
use telemetry_common::{NodeConfig, Result, SensorFailurePolicy};
use telemetry_node::clock::{ClockTasks, SystemClock};
use telemetry_node::sampler::Sampler;
use telemetry_node::sensors::SimulatedSensors;
use telemetry_node::{NodeServer, TelemetryState};

const BANNER: &str = r#"
╔═══════════════════════════════════════════════════════════════╗
║                                                               ║
║    ████████╗███████╗██╗     ███████╗███╗   ███╗               ║
║    ╚══██╔══╝██╔════╝██║     ██╔════╝████╗ ████║               ║
║       ██║   █████╗  ██║     █████╗  ██╔████╔██║               ║
║       ██║   ██╔══╝  ██║     ██╔══╝  ██║╚██╔╝██║               ║
║       ██║   ███████╗███████╗███████╗██║ ╚═╝ ██║               ║
║       ╚═╝   ╚══════╝╚══════╝╚══════╝╚═╝     ╚═╝               ║
║                                                               ║
║    Secure Telemetry Node v0.1.0                               ║
╚═══════════════════════════════════════════════════════════════╝
"#;

#[derive(Parser, Debug)]
#[command(author, version, about = "Encrypted sensor telemetry over HTTP")]
struct Args {
    /// Address to listen on, overrides BIND_ADDRESS
    #[arg(long)]
    bind: Option<String>,

    /// fatal or degraded, overrides SENSOR_FAILURE_POLICY
    #[arg(long)]
    failure_policy: Option<SensorFailurePolicy>,

    /// modp2048 or demo, overrides DH_GROUP
    #[arg(long)]
    dh_group: Option<DhGroup>,
}

#[actix_web::main]
async fn main() -> Result<()> {
    setup_logger();
    println!("{}", BANNER);

    let args = Args::parse();
    let mut config = NodeConfig::load()?;
    if let Some(bind) = args.bind {
        config.bind_address = bind;
    }
    if let Some(policy) = args.failure_policy {
        config.sensor_failure_policy = policy;
    }
    if let Some(group) = args.dh_group {
        config.dh_params = DhParams::from_group(group)?;
    }
    info!(
        "Configuration: bind={} workers={} sample={:?} policy={:?} dh={} bits",
        config.bind_address,
        config.http_workers,
        config.sample_interval,
        config.sensor_failure_policy,
        config.dh_params.bits()
    );

    let state = Arc::new(TelemetryState::new());
    let key_agreement = Arc::new(KeyAgreement::generate(config.dh_params.clone()));
    info!("Generated node key pair");

    let mut sampler = Sampler::new(SimulatedSensors::new(), state.clone(), &config);
    sampler.initialise().await?;

    let clock = Arc::new(ClockTasks::new(
        Arc::new(SystemClock::new(config.utc_offset_secs)?),
        state.clone(),
    ));
    if let Err(e) = clock.refresh_local() {
        warn!("Initial clock read failed: {}", e);
    }

    NodeServer::new(config, state, key_agreement)
        .start(sampler, clock)
        .await
}
