//! `/resolve`: run a request through the published model.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::error::{ModelResult, ResolutionError};
use crate::http::server::AppState;
use crate::observability::metrics;
use crate::routing::{Mount, ResolvedMount, VirtualHosts};
use crate::sitemap::{HandlerOutcome, ResolvedSiteMapItem};

#[derive(Debug, Deserialize)]
pub struct ResolveQuery {
    /// Host header value, optionally with a port.
    pub host: String,
    #[serde(default)]
    pub context_path: String,
    #[serde(default)]
    pub path: String,
    /// Apply pending changes before resolving.
    #[serde(default)]
    pub fresh: bool,
}

#[derive(Debug, Serialize)]
pub struct ResolveResponse {
    pub generation: u64,
    pub mount: MountSummary,
    pub item: ItemSummary,
}

#[derive(Debug, Serialize)]
pub struct MountSummary {
    pub name: String,
    pub host_name: String,
    pub port: u16,
    pub mount_path: String,
    pub resolved_mount_path: String,
    pub remaining_path: String,
    pub context_path: Option<String>,
    pub preview: bool,
    pub mapped: bool,
    pub content_path: Option<String>,
    pub configuration_path: Option<String>,
    pub matching_ignored_prefix: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ItemSummary {
    pub id: String,
    pub path_info: String,
    pub page_not_found: bool,
    pub relative_content_path: Option<String>,
    pub component: Option<String>,
    pub named_pipeline: Option<String>,
    pub locale: Option<String>,
    pub parameters: BTreeMap<String, String>,
    pub handlers: Vec<HandlerSummary>,
}

#[derive(Debug, Serialize)]
pub struct HandlerSummary {
    pub id: String,
    pub handler_type: String,
    #[serde(flatten)]
    pub outcome: Option<HandlerOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub kind: &'static str,
    pub error: String,
}

fn error_response(status: StatusCode, kind: &'static str, error: String) -> Response {
    (status, Json(ErrorBody { kind, error })).into_response()
}

fn resolution_error(error: &ResolutionError) -> (StatusCode, &'static str) {
    match error {
        ResolutionError::HostNotFound(_) => (StatusCode::NOT_FOUND, "host_not_found"),
        ResolutionError::MountNotFound { .. } => (StatusCode::NOT_FOUND, "mount_not_found"),
        ResolutionError::UnmappedMount(_) => (StatusCode::NOT_FOUND, "unmapped_mount"),
        ResolutionError::SiteUnavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, "site_unavailable"),
        ResolutionError::SiteMapItemNotFound(_) => (StatusCode::NOT_FOUND, "sitemap_item_not_found"),
    }
}

/// Load the model off the async executor; the first build blocks.
pub(crate) async fn load_model(state: &AppState, fresh: bool) -> Result<Arc<VirtualHosts>, Response> {
    let cache = state.cache.clone();
    let loaded: Result<ModelResult<Arc<VirtualHosts>>, _> = tokio::task::spawn_blocking(move || {
        if fresh {
            cache.get_virtual_hosts_fresh()
        } else {
            cache.get_virtual_hosts()
        }
    })
    .await;

    match loaded {
        Ok(Ok(model)) => Ok(model),
        Ok(Err(error)) => {
            tracing::warn!(error = %error, "No model available");
            Err(error_response(StatusCode::SERVICE_UNAVAILABLE, "model_unavailable", error.to_string()))
        }
        Err(error) => {
            tracing::error!(error = %error, "Model load task failed");
            Err(error_response(StatusCode::INTERNAL_SERVER_ERROR, "internal", error.to_string()))
        }
    }
}

pub async fn resolve(State(state): State<AppState>, Query(query): Query<ResolveQuery>) -> Response {
    let model = match load_model(&state, query.fresh).await {
        Ok(model) => model,
        Err(response) => {
            metrics::record_resolution("unavailable");
            return response;
        }
    };

    if model.is_excluded(&query.path) {
        metrics::record_resolution("excluded");
        return error_response(StatusCode::NOT_FOUND, "excluded", format!("'{}' is excluded", query.path));
    }

    let resolved = match model
        .match_mount(&query.host, &query.context_path, &query.path)
        .and_then(|mount| mount.match_site_map_item(mount.remaining_path()).map(|item| (mount, item)))
    {
        Ok(resolved) => resolved,
        Err(error) => {
            let (status, kind) = resolution_error(&error);
            tracing::debug!(host = %query.host, path = %query.path, kind, "Resolution failed");
            metrics::record_resolution(kind);
            return error_response(status, kind, error.to_string());
        }
    };
    let (mount, item) = resolved;

    let handlers = run_handlers(&state, &item);
    metrics::record_resolution(if item.is_page_not_found() { "page_not_found" } else { "matched" });

    Json(ResolveResponse {
        generation: model.generation(),
        mount: summarize_mount(&mount),
        item: summarize_item(&item, handlers),
    })
    .into_response()
}

fn run_handlers(state: &AppState, item: &ResolvedSiteMapItem) -> Vec<HandlerSummary> {
    let factory = state.cache.site_map_item_handler_factory();
    item.handlers()
        .iter()
        .map(|handler| {
            let outcome = factory
                .get_handler(&handler.configuration)
                .and_then(|instance| instance.process(handler, item));
            let (outcome, error) = match outcome {
                Ok(outcome) => (Some(outcome), None),
                Err(error) => {
                    tracing::warn!(handler = %handler.id(), error = %error, "Sitemap item handler failed");
                    (None, Some(error.to_string()))
                }
            };
            HandlerSummary {
                id: handler.id().to_string(),
                handler_type: handler.handler_type().to_string(),
                outcome,
                error,
            }
        })
        .collect()
}

fn summarize_mount(resolved: &ResolvedMount) -> MountSummary {
    let mount: &dyn Mount = resolved.mount().as_ref();
    MountSummary {
        name: mount.name().to_string(),
        host_name: resolved.host_name().to_string(),
        port: resolved.port(),
        mount_path: mount.mount_path().to_string(),
        resolved_mount_path: resolved.resolved_mount_path().to_string(),
        remaining_path: resolved.remaining_path().to_string(),
        context_path: mount.context_path().map(str::to_string),
        preview: mount.is_preview(),
        mapped: mount.is_mapped(),
        content_path: mount.content_path().map(str::to_string),
        configuration_path: mount.site().map(|s| s.configuration_path().to_string()),
        matching_ignored_prefix: resolved.matching_ignored_prefix().map(str::to_string),
    }
}

fn summarize_item(item: &ResolvedSiteMapItem, handlers: Vec<HandlerSummary>) -> ItemSummary {
    ItemSummary {
        id: item.site_map_item().id().to_string(),
        path_info: item.path_info().to_string(),
        page_not_found: item.is_page_not_found(),
        relative_content_path: item.relative_content_path().map(str::to_string),
        component: item.component_configuration().map(|c| c.id().to_string()),
        named_pipeline: item.named_pipeline().map(str::to_string),
        locale: item.locale().map(str::to_string),
        parameters: item.parameters().clone(),
        handlers,
    }
}
