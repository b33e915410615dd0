//! HTTP request handlers for the telemetry node.

use super::NodeContext;
use crate::state::SensorHealth;
use actix_web::http::header::ContentType;
use actix_web::{web, HttpResponse, Responder};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use telemetry_common::encryption::parse_public_value;
use telemetry_common::Result;
use uuid::Uuid;

#[derive(Debug, Default, Deserialize)]
pub struct KeyExchangeParams {
    pub public_key: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NodeStatus {
    pub node_id: Uuid,
    pub key_established: bool,
    pub session_generation: Option<u64>,
    pub sensor_health: SensorHealth,
    pub samples: u64,
    pub current_time: String,
}

/// Encrypts the current snapshot and returns it as base64 text.
pub async fn get_sensor(ctx: web::Data<NodeContext>) -> Result<HttpResponse> {
    let body = ctx.pipeline.run().map_err(|e| {
        warn!("Refusing telemetry request: {}", e);
        e
    })?;

    Ok(HttpResponse::Ok()
        .content_type(ContentType::plaintext())
        .body(body))
}

/// Accepts the collector's public value and answers with the node's own.
///
/// `public_key` is read from the query string, or from an urlencoded form body
/// on POST.
pub async fn key_exchange(
    query: web::Query<KeyExchangeParams>,
    form: Option<web::Form<KeyExchangeParams>>,
    ctx: web::Data<NodeContext>,
) -> Result<HttpResponse> {
    let raw = query
        .public_key
        .as_deref()
        .or_else(|| form.as_ref().and_then(|f| f.public_key.as_deref()));

    let peer_public = parse_public_value(raw).map_err(|e| {
        warn!("Rejected key exchange: {}", e);
        e
    })?;

    ctx.key_agreement.accept_peer_value(&peer_public).map_err(|e| {
        warn!("Rejected key exchange: {}", e);
        e
    })?;
    info!("Key exchange completed, answering with node public value");

    Ok(HttpResponse::Ok()
        .content_type(ContentType::plaintext())
        .body(ctx.key_agreement.public_value().to_string()))
}

pub async fn get_status(ctx: web::Data<NodeContext>) -> impl Responder {
    let session = ctx.key_agreement.session();
    HttpResponse::Ok().json(NodeStatus {
        node_id: ctx.node_id,
        key_established: session.is_some(),
        session_generation: session.map(|s| s.generation),
        sensor_health: ctx.state.health(),
        samples: ctx.state.samples(),
        current_time: ctx.state.current_timestamp(),
    })
}
