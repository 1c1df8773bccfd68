use std::path::PathBuf;

use clap::Args;
use common::binding::ScopeBinding;
use common::directory::{CacheError, LookupCache};
use common::import::import_grants;
use common::target::{BindingTarget, TargetError};

use crate::state::load_target;

#[derive(Args, Debug, Clone)]
pub struct Import {
    /// Target state file to read existing bindings from
    #[arg(long)]
    pub state: PathBuf,

    /// JSON list of bindings created by earlier syncs; these are skipped
    #[arg(long)]
    pub managed: Option<PathBuf>,
}

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("import failed: {0}")]
    StateFailed(#[from] crate::state::StateError),
    #[error("failed to read managed bindings: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{0}")]
    Cache(#[from] CacheError),
    #[error("failed to list bindings: {0}")]
    Target(#[from] TargetError),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Import {
    type Error = ImportError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let state = ctx.state()?;
        let target = load_target(&self.state)?;
        let managed: Vec<ScopeBinding> = match &self.managed {
            Some(path) => serde_json::from_str(&std::fs::read_to_string(path)?)?,
            None => Vec::new(),
        };

        let cache = LookupCache::load(&state.config.directory).await?;
        let existing = target.list_bindings().await?;
        let grants = import_grants(&existing, &managed, &state.config.subscription_id, &cache);

        Ok(serde_json::to_string_pretty(&grants)?)
    }
}
