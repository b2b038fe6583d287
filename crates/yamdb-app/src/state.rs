use std::sync::Arc;

use url::Url;
use yamdb_auth::{MailDispatcher, TokenManager, VerificationCodes};
use yamdb_dal::Pool;

use crate::error::{ApiError, ApiResult};

#[derive(Clone)]
pub struct AppState {
    state: Arc<AppStateInner>,
}

impl AppState {
    pub fn new(
        app_config: AppConfig,
        pool: Pool,
        tokens: TokenManager,
        codes: VerificationCodes,
        mailer: Arc<dyn MailDispatcher>,
    ) -> Self {
        AppState {
            state: Arc::new(AppStateInner {
                pool,
                app_config,
                tokens,
                codes,
                mailer,
            }),
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.state.app_config
    }

    pub fn build_url(&self, relative_url: &str) -> ApiResult<Url> {
        self.config().base_url.join(relative_url).map_err(|e| {
            ApiError::Internal(format!("Cannot build URL for {relative_url}: {e}"))
        })
    }

    pub fn pool(&self) -> &Pool {
        &self.state.pool
    }

    pub fn tokens(&self) -> &TokenManager {
        &self.state.tokens
    }

    pub fn codes(&self) -> &VerificationCodes {
        &self.state.codes
    }

    pub fn mailer(&self) -> Arc<dyn MailDispatcher> {
        self.state.mailer.clone()
    }
}

struct AppStateInner {
    pool: Pool,
    app_config: AppConfig,
    tokens: TokenManager,
    codes: VerificationCodes,
    mailer: Arc<dyn MailDispatcher>,
}

pub struct AppConfig {
    pub base_url: Url,
    pub default_page_size: u32,
}
