use askama::Template;
use askama_web::WebTemplate;

#[derive(Template, WebTemplate)]
#[template(path = "login.html")]
pub(crate) struct LoginTemplate {
    pub(crate) app_name: String,
    pub(crate) title: &'static str,
    pub(crate) action: &'static str,
    pub(crate) error: bool,
}

#[derive(Template, WebTemplate)]
#[template(path = "dashboard.html")]
pub(crate) struct DashboardTemplate {
    pub(crate) app_name: String,
    pub(crate) uptime: String,
    pub(crate) server_count: usize,
    pub(crate) latency_ms: String,
    /// JSON array of recent samples, fed straight into the graph script.
    pub(crate) latency_json: String,
    pub(crate) tracked: usize,
    pub(crate) sleep_banner: bool,
    pub(crate) current_time: String,
}

#[derive(Template, WebTemplate)]
#[template(path = "maintenance.html")]
pub(crate) struct MaintenanceTemplate {
    pub(crate) app_name: String,
    pub(crate) current_time: String,
}

#[derive(Template, WebTemplate)]
#[template(path = "backend.html")]
pub(crate) struct BackendTemplate {
    pub(crate) app_name: String,
    pub(crate) maintenance: bool,
    pub(crate) sleep_banner: bool,
    pub(crate) uptime: String,
    pub(crate) admin_sessions: usize,
    pub(crate) entries: Vec<EntryRow>,
    pub(crate) registrations: Vec<RegistrationRow>,
    pub(crate) completions: String,
    pub(crate) store_error: String,
    pub(crate) current_time: String,
}

pub(crate) struct EntryRow {
    pub(crate) community: String,
    pub(crate) label: String,
    pub(crate) status: String,
    pub(crate) next_due: String,
    pub(crate) is_test: bool,
}

pub(crate) struct RegistrationRow {
    pub(crate) community: String,
    pub(crate) label: String,
    pub(crate) channel: String,
    pub(crate) is_active: bool,
    pub(crate) added_at: String,
}

#[derive(Template, WebTemplate)]
#[template(path = "forbidden.html")]
pub(crate) struct ForbiddenTemplate {
    pub(crate) app_name: String,
}
