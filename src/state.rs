use std::sync::Arc;

use tracing::{info, warn};

use crate::auth::jwt::TokenCodec;
use crate::auth::memory::MemoryUserStore;
use crate::auth::repo::{PgUserStore, UserStore};
use crate::auth::services::AccountService;
use crate::clock::SystemClock;
use crate::config::AppConfig;
use crate::db;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub accounts: Arc<AccountService>,
}

/// Everything `main` needs besides the router state.
pub struct Bootstrap {
    pub state: AppState,
    pub pool: Option<sqlx::PgPool>,
}

impl AppState {
    pub async fn init(config: AppConfig) -> anyhow::Result<Bootstrap> {
        let config = Arc::new(config);

        let (store, pool) = match &config.database_url {
            Some(url) => {
                let pool = db::connect(url, config.db_max_connections).await?;
                info!("using postgres user store");
                (Arc::new(PgUserStore::new(pool.clone())) as Arc<dyn UserStore>, Some(pool))
            }
            None => {
                warn!("DATABASE_URL not set; users are kept in memory and lost on restart");
                (Arc::new(MemoryUserStore::new()) as Arc<dyn UserStore>, None)
            }
        };

        Ok(Bootstrap {
            state: Self::from_parts(config, store),
            pool,
        })
    }

    pub fn from_parts(config: Arc<AppConfig>, store: Arc<dyn UserStore>) -> Self {
        let tokens = TokenCodec::from_config(&config.jwt);
        let accounts = Arc::new(AccountService::new(store, tokens, Arc::new(SystemClock)));
        Self { config, accounts }
    }

    #[cfg(test)]
    pub fn for_tests() -> Self {
        let config = Arc::new(AppConfig {
            database_url: None,
            db_max_connections: 1,
            jwt: crate::config::JwtConfig {
                secret: "test".into(),
                issuer: "test-issuer".into(),
                audience: "test-aud".into(),
                ttl_minutes: 5,
            },
            token_header: "authorization".into(),
            host: "127.0.0.1".into(),
            port: 0,
        });
        Self::from_parts(config, Arc::new(MemoryUserStore::new()))
    }
}
