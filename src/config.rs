use crate::auth::Realm;
use crate::types::UserId;

use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

pub const DEFAULT_OWNER_ID: u64 = 447_812_883_158_532_106;

#[derive(Clone, PartialEq, Eq)]
pub struct PanelCredentials {
    pub username: String,
    pub password: String,
}

impl PanelCredentials {
    /// Plaintext comparison; the panels do not store hashed secrets.
    pub fn matches(&self, username: &str, password: &str) -> bool {
        self.username == username && self.password == password
    }
}

impl fmt::Debug for PanelCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PanelCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub app_name: String,
    pub discord_token: String,
    pub database_url: String,
    pub bind_addr: SocketAddr,
    pub admin: PanelCredentials,
    pub backend: PanelCredentials,
    /// Empty disables the `/STBS` source-address check.
    pub backend_allowed_ips: Vec<IpAddr>,
    pub owner_id: UserId,
    pub dispatch_interval: Duration,
    pub cookie_secure: bool,
}

impl AppConfig {
    pub fn credentials(&self, realm: Realm) -> &PanelCredentials {
        match realm {
            Realm::Admin => &self.admin,
            Realm::Backend => &self.backend,
        }
    }

    pub fn is_backend_ip_allowed(&self, ip: Option<IpAddr>) -> bool {
        if self.backend_allowed_ips.is_empty() {
            return true;
        }
        ip.is_some_and(|ip| self.backend_allowed_ips.contains(&ip))
    }
}

#[cfg(test)]
impl Default for AppConfig {
    fn default() -> Self {
        Self {
            app_name: "SorynTech Bot Suite".to_string(),
            discord_token: "token".to_string(),
            database_url: "postgres://localhost/robo_party".to_string(),
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 10000)),
            admin: PanelCredentials {
                username: "admin".to_string(),
                password: "hunter2".to_string(),
            },
            backend: PanelCredentials {
                username: "root".to_string(),
                password: "backend-secret".to_string(),
            },
            backend_allowed_ips: Vec::new(),
            owner_id: UserId(DEFAULT_OWNER_ID),
            dispatch_interval: Duration::from_secs(60),
            cookie_secure: false,
        }
    }
}
