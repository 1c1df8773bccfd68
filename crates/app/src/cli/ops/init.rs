use clap::Args;

use crate::state::{AppConfig, AppState};

#[derive(Args, Debug, Clone)]
pub struct Init {
    /// Subscription the synced resources live in
    #[arg(long, default_value = "")]
    pub subscription_id: String,

    /// Also write logs to a daily rolling file in this directory
    #[arg(long)]
    pub log_dir: Option<std::path::PathBuf>,
}

#[derive(Debug, thiserror::Error)]
pub enum InitError {
    #[error("init failed: {0}")]
    StateFailed(#[from] crate::state::StateError),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Init {
    type Error = InitError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let config = AppConfig {
            subscription_id: self.subscription_id.clone(),
            log_dir: self.log_dir.clone(),
            ..AppConfig::default()
        };

        let state = AppState::init(ctx.config_path.clone(), config)?;

        Ok(format!(
            "Initialized grantsync directory at: {}\n\
             - Config: {}\n\
             - Subscription: {}\n\
             - Known roles: {}",
            state.app_dir.display(),
            state.config_path.display(),
            if state.config.subscription_id.is_empty() {
                "(unset)"
            } else {
                state.config.subscription_id.as_str()
            },
            state.config.directory.roles.len()
        ))
    }
}
