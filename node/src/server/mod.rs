//! HTTP surface of the telemetry node and the supervisor for its periodic tasks.

use crate::clock::ClockTasks;
use crate::pipeline::TelemetryPipeline;
use crate::sampler::Sampler;
use crate::sensors::SensorSource;
use crate::state::TelemetryState;
use actix_web::{web, App, HttpServer};
use log::{error, info};
use std::sync::Arc;
use telemetry_common::encryption::KeyAgreement;
use telemetry_common::{NodeConfig, Result, TelemetryError};
use uuid::Uuid;

pub mod handlers;

/// Everything a request handler needs. Cheap to clone.
#[derive(Clone)]
pub struct NodeContext {
    pub node_id: Uuid,
    pub state: Arc<TelemetryState>,
    pub key_agreement: Arc<KeyAgreement>,
    pub pipeline: TelemetryPipeline,
}

impl NodeContext {
    pub fn new(state: Arc<TelemetryState>, key_agreement: Arc<KeyAgreement>) -> Self {
        Self {
            node_id: Uuid::new_v4(),
            pipeline: TelemetryPipeline::new(state.clone(), key_agreement.clone()),
            state,
            key_agreement,
        }
    }
}

/// Registers the node's routes.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/sensor").route(web::get().to(handlers::get_sensor)))
        .service(
            web::resource("/dh-key-exchange")
                .route(web::get().to(handlers::key_exchange))
                .route(web::post().to(handlers::key_exchange)),
        )
        .service(web::resource("/status").route(web::get().to(handlers::get_status)));
}

pub struct NodeServer {
    config: NodeConfig,
    context: NodeContext,
}

impl NodeServer {
    pub fn new(config: NodeConfig, state: Arc<TelemetryState>, key_agreement: Arc<KeyAgreement>) -> Self {
        Self {
            config,
            context: NodeContext::new(state, key_agreement),
        }
    }

    pub fn context(&self) -> &NodeContext {
        &self.context
    }

    /// Serves HTTP and drives the sampler and clock tasks until one of them stops.
    pub async fn start<S>(self, sampler: Sampler<S>, clock: Arc<ClockTasks>) -> Result<()>
    where
        S: SensorSource + 'static,
    {
        info!("Node {} starting", self.context.node_id);

        let context = web::Data::new(self.context.clone());
        let http_server = HttpServer::new(move || {
            App::new()
                .app_data(context.clone())
                .configure(configure)
                .wrap(actix_cors::Cors::permissive())
        })
        .workers(self.config.http_workers)
        .bind(&self.config.bind_address)?;

        let server_handle = http_server.run();
        info!("HTTP server listening on {}", self.config.bind_address);

        let sampler_handle = tokio::spawn(sampler.run());

        let local_clock_handle = {
            let clock = clock.clone();
            let period = self.config.clock_interval;
            tokio::spawn(clock.run_local(period))
        };

        let resync_handle = {
            let period = self.config.resync_interval;
            let settle = self.config.resync_settle;
            tokio::spawn(clock.run_resync(period, settle))
        };

        info!("All services started, waiting for completion...");

        tokio::select! {
            result = server_handle => {
                info!("HTTP server stopped: {:?}", result);
                result?;
            }
            result = sampler_handle => {
                error!("Sensor sampler stopped: {:?}", result);
                return Err(TelemetryError::InternalError("sensor sampler stopped".to_string()));
            }
            _ = local_clock_handle => {
                error!("Local clock task stopped");
                return Err(TelemetryError::InternalError("local clock task stopped".to_string()));
            }
            _ = resync_handle => {
                error!("Time resync task stopped");
                return Err(TelemetryError::InternalError("time resync task stopped".to_string()));
            }
        }

        Ok(())
    }
}
