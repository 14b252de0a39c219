use base64::{URL_SAFE_NO_PAD, encode_config};
use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore};
use serde::Serialize;
use time::{Duration, OffsetDateTime};

use std::collections::HashMap;
use std::sync::Mutex;

/// Advisory cookie lifetime; the server never expires sessions itself.
pub const SESSION_MAX_AGE: Duration = Duration::hours(24);

/// Which panel a session belongs to. Sessions never cross realms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Realm {
    Admin,
    Backend,
}

impl Realm {
    pub fn for_path(path: &str) -> Self {
        if path == "/STBS" || path.starts_with("/STBS/") {
            Realm::Backend
        } else {
            Realm::Admin
        }
    }

    pub fn cookie_name(self) -> &'static str {
        match self {
            Realm::Admin => "session_id",
            Realm::Backend => "stbs_session",
        }
    }

    pub fn login_path(self) -> &'static str {
        match self {
            Realm::Admin => "/login",
            Realm::Backend => "/STBS/login",
        }
    }

    pub fn home_path(self) -> &'static str {
        match self {
            Realm::Admin => "/dashboard",
            Realm::Backend => "/STBS",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Realm::Admin => "Admin Panel",
            Realm::Backend => "Backend Control",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Session {
    pub created_at: OffsetDateTime,
    pub authenticated: bool,
}

#[derive(Debug)]
pub struct SessionStore {
    sessions: Mutex<HashMap<(Realm, String), Session>>,
    cookie_secure: bool,
}

impl SessionStore {
    pub fn new(cookie_secure: bool) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            cookie_secure,
        }
    }

    pub fn create(&self, realm: Realm, now: OffsetDateTime) -> String {
        let mut rng = OsRng;
        self.create_with_rng(realm, now, &mut rng)
    }

    pub(crate) fn create_with_rng<R: RngCore + CryptoRng>(
        &self,
        realm: Realm,
        now: OffsetDateTime,
        rng: &mut R,
    ) -> String {
        let token = generate_session_token_with_rng(rng);
        let session = Session {
            created_at: now,
            authenticated: true,
        };
        self.sessions
            .lock()
            .expect("sessions lock")
            .insert((realm, token.clone()), session);
        token
    }

    pub fn is_authenticated(&self, realm: Realm, token: &str) -> bool {
        self.sessions
            .lock()
            .expect("sessions lock")
            .get(&(realm, token.to_string()))
            .is_some_and(|session| session.authenticated)
    }

    pub fn revoke(&self, realm: Realm, token: &str) -> bool {
        self.sessions
            .lock()
            .expect("sessions lock")
            .remove(&(realm, token.to_string()))
            .is_some()
    }

    pub fn count(&self, realm: Realm) -> usize {
        self.sessions
            .lock()
            .expect("sessions lock")
            .keys()
            .filter(|(session_realm, _)| *session_realm == realm)
            .count()
    }

    pub fn session_cookie(&self, realm: Realm, token: &str) -> String {
        let max_age = SESSION_MAX_AGE.whole_seconds();
        let mut cookie = format!(
            "{}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age}",
            realm.cookie_name()
        );
        if self.cookie_secure {
            cookie.push_str("; Secure");
        }
        cookie
    }

    pub fn clear_cookie(&self, realm: Realm) -> String {
        let mut cookie = format!(
            "{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0",
            realm.cookie_name()
        );
        if self.cookie_secure {
            cookie.push_str("; Secure");
        }
        cookie
    }
}

pub(crate) fn generate_session_token_with_rng<R: RngCore + CryptoRng>(rng: &mut R) -> String {
    let mut bytes = [0u8; 32];
    rng.fill_bytes(&mut bytes);
    encode_config(bytes, URL_SAFE_NO_PAD)
}
