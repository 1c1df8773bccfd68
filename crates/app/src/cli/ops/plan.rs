use std::fmt::Write;
use std::path::PathBuf;

use clap::Args;
use common::catalog::PermissionCatalog;
use common::directory::{CacheError, LookupCache};
use common::feedback::FeedbackSink;
use common::grant::{Grant, GrantError};
use common::reconcile::plan_items;
use common::sync::resolve_all;

#[derive(Args, Debug, Clone)]
pub struct Plan {
    /// JSON file holding one grant or a list of grants
    pub grants: PathBuf,
}

#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    #[error("plan failed: {0}")]
    StateFailed(#[from] crate::state::StateError),
    #[error("failed to read grants: {0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Grants(#[from] GrantError),
    #[error("{0}")]
    Cache(#[from] CacheError),
    #[error("failed to render plan: {0}")]
    Render(#[from] std::fmt::Error),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Plan {
    type Error = PlanError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let state = ctx.state()?;
        let grants = Grant::parse_many(&std::fs::read_to_string(&self.grants)?)?;
        let cache = LookupCache::load(&state.config.directory).await?;

        let sink = FeedbackSink::new();
        for grant in &grants {
            sink.register(&grant.id);
        }
        let catalog = PermissionCatalog::storage_default();
        let (changes, _) = resolve_all(&grants, &cache, &catalog, &sink);

        let mut out = String::new();
        writeln!(out, "Bindings to create ({}):", changes.bindings_to_add.len())?;
        for binding in &changes.bindings_to_add {
            writeln!(out, "  + {}", binding)?;
        }
        writeln!(out, "Bindings to delete ({}):", changes.bindings_to_remove.len())?;
        for binding in &changes.bindings_to_remove {
            writeln!(out, "  - {}", binding)?;
        }

        let items = plan_items(&changes.acl_changes);
        writeln!(out, "ACL changes ({} items, in order):", items.len())?;
        for item in &items {
            writeln!(out, "  {}", item.item)?;
            if !item.remove.is_empty() {
                writeln!(out, "    remove: {}", item.remove)?;
            }
            if !item.add.is_empty() {
                writeln!(out, "    update: {}", item.add)?;
            }
        }

        for feedback in sink.records().iter().filter(|f| !f.is_clean()) {
            writeln!(out, "Grant {}:", feedback.grant_id)?;
            for error in &feedback.errors {
                writeln!(out, "  error: {}", error)?;
            }
            for warning in &feedback.warnings {
                writeln!(out, "  warning: {}", warning)?;
            }
        }

        Ok(out.trim_end().to_string())
    }
}
