use crate::auth::Realm;
use crate::state;
use crate::templates;

use axum::body::Body;
use axum::extract::{ConnectInfo, Form, Query, State};
use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, HeaderValue, Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use serde::Deserialize;
use std::net::{IpAddr, SocketAddr};
use time::OffsetDateTime;
use tracing::{info, warn};

pub(crate) async fn auth_middleware(
    State(state): State<state::AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let path = req.uri().path();
    let realm = Realm::for_path(path);

    if realm == Realm::Backend {
        let ip = client_ip(&req);
        if !state.config.is_backend_ip_allowed(ip) {
            warn!(path, ip = ?ip, "backend request from disallowed address");
            return forbidden(&state);
        }
    }

    if is_auth_bypass_path(path) {
        return next.run(req).await;
    }

    if let Some(token) = session_cookie(req.headers(), realm.cookie_name())
        && state.service.sessions().is_authenticated(realm, token)
    {
        return next.run(req).await;
    }

    Redirect::to(realm.login_path()).into_response()
}

fn is_auth_bypass_path(path: &str) -> bool {
    path == "/login"
        || path == "/logout"
        || path == "/STBS/login"
        || path == "/STBS/logout"
        || path == "/health"
        || path == "/favicon.svg"
        || path.starts_with("/static/")
}

/// First `X-Forwarded-For` hop, else the socket peer.
fn client_ip(req: &Request<Body>) -> Option<IpAddr> {
    let forwarded = req
        .headers()
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|raw| raw.split(',').next())
        .and_then(|first| first.trim().parse::<IpAddr>().ok());
    forwarded.or_else(|| {
        req.extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip())
    })
}

fn forbidden(state: &state::AppState) -> Response {
    (
        StatusCode::FORBIDDEN,
        templates::ForbiddenTemplate {
            app_name: state.config.app_name.clone(),
        },
    )
        .into_response()
}

fn session_cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    for header in headers.get_all(COOKIE).iter() {
        if let Ok(raw) = header.to_str()
            && let Some(value) = cookie_from_header(raw, name)
        {
            return Some(value);
        }
    }
    None
}

fn cookie_from_header<'a>(header: &'a str, name: &str) -> Option<&'a str> {
    for part in header.split(';') {
        let trimmed = part.trim();
        if let Some((cookie_name, cookie_value)) = trimmed.split_once('=')
            && cookie_name == name
            && !cookie_value.is_empty()
        {
            return Some(cookie_value);
        }
    }
    None
}

#[derive(Debug, Deserialize)]
pub(crate) struct LoginQuery {
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LoginForm {
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
}

pub(crate) async fn admin_login_form(
    State(state): State<state::AppState>,
    Query(query): Query<LoginQuery>,
) -> templates::LoginTemplate {
    login_form(&state, Realm::Admin, &query)
}

pub(crate) async fn backend_login_form(
    State(state): State<state::AppState>,
    Query(query): Query<LoginQuery>,
) -> templates::LoginTemplate {
    login_form(&state, Realm::Backend, &query)
}

fn login_form(state: &state::AppState, realm: Realm, query: &LoginQuery) -> templates::LoginTemplate {
    templates::LoginTemplate {
        app_name: state.config.app_name.clone(),
        title: realm.title(),
        action: realm.login_path(),
        error: query.error.is_some(),
    }
}

pub(crate) async fn admin_login_submit(
    State(state): State<state::AppState>,
    Form(form): Form<LoginForm>,
) -> Response {
    login_submit(&state, Realm::Admin, &form)
}

pub(crate) async fn backend_login_submit(
    State(state): State<state::AppState>,
    Form(form): Form<LoginForm>,
) -> Response {
    login_submit(&state, Realm::Backend, &form)
}

fn login_submit(state: &state::AppState, realm: Realm, form: &LoginForm) -> Response {
    if !state
        .config
        .credentials(realm)
        .matches(&form.username, &form.password)
    {
        info!(?realm, username = %form.username, "rejected login");
        return Redirect::to(&format!("{}?error=invalid", realm.login_path())).into_response();
    }

    let sessions = state.service.sessions();
    let token = sessions.create(realm, OffsetDateTime::now_utc());
    info!(?realm, username = %form.username, "login succeeded");
    let mut response = Redirect::to(realm.home_path()).into_response();
    response.headers_mut().append(
        SET_COOKIE,
        HeaderValue::from_str(&sessions.session_cookie(realm, &token)).expect("session cookie header"),
    );
    response
}

pub(crate) async fn admin_logout(State(state): State<state::AppState>, headers: HeaderMap) -> Response {
    logout(&state, Realm::Admin, &headers)
}

pub(crate) async fn backend_logout(
    State(state): State<state::AppState>,
    headers: HeaderMap,
) -> Response {
    logout(&state, Realm::Backend, &headers)
}

fn logout(state: &state::AppState, realm: Realm, headers: &HeaderMap) -> Response {
    let sessions = state.service.sessions();
    if let Some(token) = session_cookie(headers, realm.cookie_name()) {
        sessions.revoke(realm, token);
    }
    let mut response = Redirect::to(realm.login_path()).into_response();
    response.headers_mut().append(
        SET_COOKIE,
        HeaderValue::from_str(&sessions.clear_cookie(realm)).expect("logout cookie header"),
    );
    response
}
