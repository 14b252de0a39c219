use crate::auth::Realm;
use crate::humanize;
use crate::state;
use crate::templates;
use crate::types::{EntryKey, Registration};

use axum::extract::State;
use axum::response::Redirect;
use std::collections::HashMap;
use time::OffsetDateTime;
use tracing::error;

pub(crate) async fn backend_dashboard(
    State(state): State<state::AppState>,
) -> templates::BackendTemplate {
    let now = OffsetDateTime::now_utc();
    let service = &state.service;
    let mut store_errors = Vec::new();

    let registrations = match service.store().list().await {
        Ok(registrations) => registrations,
        Err(err) => {
            error!("failed to list registrations: {err}");
            store_errors.push("registrations");
            Vec::new()
        }
    };
    let completions = match service.store().completion_count().await {
        Ok(count) => count.to_string(),
        Err(err) => {
            error!("failed to count completed parties: {err}");
            store_errors.push("party history");
            "n/a".to_string()
        }
    };

    let names: HashMap<EntryKey, String> = registrations
        .iter()
        .map(|registration| {
            (
                EntryKey::new(registration.community, registration.user),
                registration.label(),
            )
        })
        .collect();
    let entries = service
        .entries(now)
        .into_iter()
        .map(|entry| templates::EntryRow {
            community: entry.key.community.to_string(),
            label: names
                .get(&entry.key)
                .cloned()
                .unwrap_or_else(|| entry.key.user.to_string()),
            status: entry.label,
            next_due: entry
                .state
                .next_due_at
                .map(humanize::timestamp)
                .unwrap_or_else(|| "-".to_string()),
            is_test: entry.is_test,
        })
        .collect();

    let store_error = if store_errors.is_empty() {
        String::new()
    } else {
        format!("Database unavailable, could not load {}.", store_errors.join(" or "))
    };

    templates::BackendTemplate {
        app_name: state.config.app_name.clone(),
        maintenance: service.is_maintenance(),
        sleep_banner: service.is_sleep_banner(),
        uptime: humanize::uptime(service.uptime(now)),
        admin_sessions: service.sessions().count(Realm::Admin),
        entries,
        registrations: registrations.iter().map(registration_row).collect(),
        completions,
        store_error,
        current_time: humanize::timestamp(now),
    }
}

fn registration_row(registration: &Registration) -> templates::RegistrationRow {
    templates::RegistrationRow {
        community: registration.community.to_string(),
        label: registration.label(),
        channel: registration
            .channel
            .map(|channel| channel.to_string())
            .unwrap_or_else(|| "not set".to_string()),
        is_active: registration.is_active,
        added_at: humanize::timestamp(registration.added_at),
    }
}

pub(crate) async fn toggle_maintenance(State(state): State<state::AppState>) -> Redirect {
    state.service.toggle_maintenance();
    Redirect::to(Realm::Backend.home_path())
}

pub(crate) async fn toggle_sleep_banner(State(state): State<state::AppState>) -> Redirect {
    state.service.toggle_sleep_banner();
    Redirect::to(Realm::Backend.home_path())
}
