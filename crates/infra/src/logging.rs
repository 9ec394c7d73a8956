use crate::config::AppConfig;
use anyhow::Result;
use tracing_subscriber::{EnvFilter, fmt};

pub fn env_filter(config: &AppConfig) -> EnvFilter {
    EnvFilter::try_new(config.log_level.clone()).unwrap_or_else(|_| EnvFilter::new("info"))
}

pub fn init_tracing(config: &AppConfig) -> Result<()> {
    let filter = env_filter(config);

    if config.is_production() {
        fmt()
            .with_env_filter(filter)
            .json()
            .with_target(false)
            .try_init()
            .map_err(|err| anyhow::anyhow!("tracing init failed: {err}"))?;
    } else {
        fmt()
            .with_env_filter(filter)
            .with_target(false)
            .compact()
            .try_init()
            .map_err(|err| anyhow::anyhow!("tracing init failed: {err}"))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_log_level_falls_back_to_info() {
        let mut config = AppConfig::defaults().expect("defaults");
        config.log_level = "lingua_domain=debug".to_string();
        assert_eq!(env_filter(&config).to_string(), "lingua_domain=debug");

        config.log_level = "lingua_domain=loud".to_string();
        assert_eq!(env_filter(&config).to_string(), "info");
    }
}
