use clap::Parser;
use robo_party::config::{AppConfig, DEFAULT_OWNER_ID, PanelCredentials};
use robo_party::types::UserId;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

pub(crate) enum RunOutcome {
    Serve(AppConfig),
    Exit(u8),
}

pub(crate) fn run() -> RunOutcome {
    let cli = Cli::parse();
    match resolve_config(cli) {
        Ok(config) => RunOutcome::Serve(config),
        Err(err) => {
            tracing::error!("{err}");
            RunOutcome::Exit(2)
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "robo-party",
    version,
    about = "Discord bot that pings registered users when their Robo Party cooldown ends"
)]
struct Cli {
    #[arg(long, default_value = "SorynTech Bot Suite")]
    app_name: String,
    #[arg(long, env = "DISCORD_TOKEN", hide_env_values = true)]
    discord_token: Option<String>,
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    database_url: Option<String>,
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    host: IpAddr,
    #[arg(long, env = "PORT", default_value_t = 10000)]
    port: u16,
    #[arg(long, env = "ADMIN_USERNAME")]
    admin_username: Option<String>,
    #[arg(long, env = "ADMIN_PASSWORD", hide_env_values = true)]
    admin_password: Option<String>,
    #[arg(long, env = "STBS_USERNAME")]
    stbs_username: Option<String>,
    #[arg(long, env = "STBS_PASSWORD", hide_env_values = true)]
    stbs_password: Option<String>,
    #[arg(long, env = "STBS_ALLOWED_IPS")]
    stbs_allowed_ips: Option<String>,
    #[arg(long, env = "OWNER_ID", default_value_t = DEFAULT_OWNER_ID)]
    owner_id: u64,
    #[arg(long, env = "DISPATCH_INTERVAL_SECS", default_value_t = 60)]
    dispatch_interval_secs: u64,
    #[arg(long, env = "COOKIE_SECURE")]
    cookie_secure: bool,
}

fn resolve_config(cli: Cli) -> Result<AppConfig, String> {
    let discord_token = required(cli.discord_token, "DISCORD_TOKEN")?;
    let database_url = required(cli.database_url, "DATABASE_URL")?;
    let admin = PanelCredentials {
        username: required(cli.admin_username, "ADMIN_USERNAME")?,
        password: required(cli.admin_password, "ADMIN_PASSWORD")?,
    };
    let backend = resolve_backend_credentials(cli.stbs_username, cli.stbs_password, &admin);
    let backend_allowed_ips = match cli.stbs_allowed_ips.as_deref() {
        Some(raw) => parse_ip_list(raw)?,
        None => Vec::new(),
    };
    if cli.dispatch_interval_secs == 0 {
        return Err("DISPATCH_INTERVAL_SECS must be greater than 0".to_string());
    }

    Ok(AppConfig {
        app_name: cli.app_name,
        discord_token,
        database_url,
        bind_addr: SocketAddr::new(cli.host, cli.port),
        admin,
        backend,
        backend_allowed_ips,
        owner_id: UserId(cli.owner_id),
        dispatch_interval: Duration::from_secs(cli.dispatch_interval_secs),
        cookie_secure: cli.cookie_secure,
    })
}

fn required(value: Option<String>, name: &str) -> Result<String, String> {
    match value.map(|value| value.trim().to_string()) {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(format!("{name} is required (set it in the environment or .env)")),
    }
}

fn resolve_backend_credentials(
    username: Option<String>,
    password: Option<String>,
    admin: &PanelCredentials,
) -> PanelCredentials {
    let username = username.filter(|value| !value.trim().is_empty());
    let password = password.filter(|value| !value.trim().is_empty());
    match (username, password) {
        (Some(username), Some(password)) => PanelCredentials {
            username: username.trim().to_string(),
            password,
        },
        (None, None) => admin.clone(),
        _ => {
            tracing::warn!(
                "only one of STBS_USERNAME / STBS_PASSWORD is set; backend panel uses admin credentials"
            );
            admin.clone()
        }
    }
}

fn parse_ip_list(raw: &str) -> Result<Vec<IpAddr>, String> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            entry
                .parse()
                .map_err(|_| format!("invalid address '{entry}' in STBS_ALLOWED_IPS"))
        })
        .collect()
}
