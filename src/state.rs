use crate::config::AppConfig;
use crate::service::BotService;

use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub service: Arc<BotService>,
}
