use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::cache::ModelCache;
use crate::http::resolve::load_model;
use crate::http::AppState;
use crate::routing::{Blueprint, Channel, VirtualHosts};

#[derive(Debug, Serialize)]
pub struct ModelStatus {
    pub version: &'static str,
    pub generation: u64,
    pub change_sequence: u64,
    pub pending_changes: usize,
    pub hosts: Vec<HostStatus>,
    pub sites: Vec<SiteStatus>,
    pub unavailable_roots: Vec<String>,
    pub shared_components: usize,
    pub handler_instances: usize,
}

#[derive(Debug, Serialize)]
pub struct HostStatus {
    pub name: String,
    pub group: String,
    pub ports: Vec<u16>,
}

#[derive(Debug, Serialize)]
pub struct SiteStatus {
    pub configuration_path: String,
    pub chain: Vec<String>,
    pub fingerprint: String,
    pub components_fingerprint: String,
    pub sitemap_items: usize,
    pub templates: usize,
}

/// Summary of a published model and the cache holding it.
pub fn model_status(cache: &ModelCache, model: &VirtualHosts) -> ModelStatus {
    let mut hosts: Vec<HostStatus> = model
        .hosts()
        .map(|h| HostStatus {
            name: h.name().to_string(),
            group: h.group().to_string(),
            ports: h.ports().collect(),
        })
        .collect();
    hosts.sort_by(|a, b| a.name.cmp(&b.name));

    let sites = model
        .sites()
        .values()
        .map(|site| SiteStatus {
            configuration_path: site.configuration_path().to_string(),
            chain: site.key().chain.clone(),
            fingerprint: site.key().fingerprint.clone(),
            components_fingerprint: site.components().key().fingerprint.clone(),
            sitemap_items: site.sitemap().len(),
            templates: site.components().templates().len(),
        })
        .collect();

    ModelStatus {
        version: env!("CARGO_PKG_VERSION"),
        generation: model.generation(),
        change_sequence: cache.change_sequence(),
        pending_changes: cache.pending_changes(),
        hosts,
        sites,
        unavailable_roots: model.unavailable_roots().iter().cloned().collect(),
        shared_components: cache.shared_components(),
        handler_instances: cache.site_map_item_handler_factory().instance_count(),
    }
}

pub async fn get_status(State(state): State<AppState>) -> Response {
    match load_model(&state, false).await {
        Ok(model) => Json(model_status(&state.cache, &model)).into_response(),
        Err(response) => response,
    }
}

pub async fn get_channels(State(state): State<AppState>) -> Response {
    match load_model(&state, false).await {
        Ok(model) => Json(model.channels().into_iter().cloned().collect::<Vec<Channel>>()).into_response(),
        Err(response) => response,
    }
}

pub async fn get_blueprints(State(state): State<AppState>) -> Response {
    match load_model(&state, false).await {
        Ok(model) => Json(model.blueprints().into_iter().cloned().collect::<Vec<Blueprint>>()).into_response(),
        Err(response) => response,
    }
}
