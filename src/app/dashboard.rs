use crate::humanize;
use crate::state;
use crate::templates;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use time::OffsetDateTime;

pub(crate) async fn dashboard(State(state): State<state::AppState>) -> Response {
    let now = OffsetDateTime::now_utc();
    let service = &state.service;
    if service.is_maintenance() {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            templates::MaintenanceTemplate {
                app_name: state.config.app_name.clone(),
                current_time: humanize::timestamp(now),
            },
        )
            .into_response();
    }

    let gateway = service.gateway();
    let history = gateway.latency_history();
    let latency_ms = match gateway.latest_latency() {
        Some(latency) => format!("{latency:.2} ms"),
        None => "n/a".to_string(),
    };
    let latency_json = serde_json::to_string(&history).unwrap_or_else(|_| "[]".to_string());

    templates::DashboardTemplate {
        app_name: state.config.app_name.clone(),
        uptime: humanize::uptime(service.uptime(now)),
        server_count: gateway.guild_count(),
        latency_ms,
        latency_json,
        tracked: service.tracked_count(),
        sleep_banner: service.is_sleep_banner(),
        current_time: humanize::timestamp(now),
    }
    .into_response()
}
