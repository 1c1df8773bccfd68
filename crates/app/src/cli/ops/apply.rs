use std::path::PathBuf;

use clap::Args;
use common::feedback::CollectingHandler;
use common::grant::{Grant, GrantError};
use common::sync::{AccessSync, SyncError};

use crate::state::{load_target, save_target};

#[derive(Args, Debug, Clone)]
pub struct Apply {
    /// JSON file holding one grant or a list of grants
    pub grants: PathBuf,

    /// Target state file; created when missing and rewritten afterwards
    #[arg(long)]
    pub state: PathBuf,
}

#[derive(Debug, thiserror::Error)]
pub enum ApplyError {
    #[error("apply failed: {0}")]
    StateFailed(#[from] crate::state::StateError),
    #[error("failed to read grants: {0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Grants(#[from] GrantError),
    #[error("sync failed: {0}")]
    Sync(#[from] SyncError),
    #[error("failed to render feedback: {0}")]
    Render(#[from] serde_json::Error),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Apply {
    type Error = ApplyError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let state = ctx.state()?;
        let grants = Grant::parse_many(&std::fs::read_to_string(&self.grants)?)?;
        let target = load_target(&self.state)?;

        let handler = CollectingHandler::new();
        let report = AccessSync::new(&state.config.directory, &target)
            .with_config((&state.config.reconcile).into())
            .sync(&grants, &handler)
            .await?;

        save_target(&self.state, &target)?;
        tracing::info!(
            created = report.bindings.created,
            deleted = report.bindings.deleted,
            acl_items = report.acls.items.len(),
            "target state saved"
        );

        Ok(serde_json::to_string_pretty(&handler.records())?)
    }
}
