use config::ConfigError;
use config::builder::{ConfigBuilder, DefaultState};
use serde::Deserialize;

pub const BACKEND_MEMORY: &str = "memory";
pub const BACKEND_SURREAL: &str = "surreal";

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub app_env: String,
    pub log_level: String,
    pub data_backend: String,
    pub surreal_endpoint: String,
    pub surreal_ns: String,
    pub surreal_db: String,
    pub surreal_user: String,
    pub surreal_pass: String,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::builder()?
            .add_source(config::Environment::default().separator("__"))
            .build()?
            .try_deserialize()
    }

    /// Defaults only, without `.env` or process environment.
    pub fn defaults() -> Result<Self, ConfigError> {
        Self::builder()?.build()?.try_deserialize()
    }

    fn builder() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        config::Config::builder()
            .set_default("app_env", "development")?
            .set_default("log_level", "info")?
            .set_default("data_backend", BACKEND_MEMORY)?
            .set_default("surreal_endpoint", "ws://127.0.0.1:8000")?
            .set_default("surreal_ns", "lingua")?
            .set_default("surreal_db", "progression")?
            .set_default("surreal_user", "root")?
            .set_default("surreal_pass", "root")
    }

    pub fn is_production(&self) -> bool {
        self.app_env.eq_ignore_ascii_case("production")
    }

    pub fn uses_surreal(&self) -> bool {
        self.data_backend.eq_ignore_ascii_case(BACKEND_SURREAL)
    }
}
