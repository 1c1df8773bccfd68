//! End-to-end synchronisation of a batch of grants
//!
//! [`AccessSync::sync`] drives one run:
//!
//! 1. a feedback record is registered for every grant
//! 2. the lookup cache is loaded from the directory
//! 3. every grant is resolved and the results aggregated
//! 4. the binding delta is applied, then the ACL changes
//! 5. feedback is flushed to the handler, whether or not the run failed

use crate::aggregate::{AggregatedChanges, Aggregator};
use crate::apply::{BindingApplier, BindingReport};
use crate::catalog::PermissionCatalog;
use crate::directory::{CacheError, DirectoryProvider, LookupCache};
use crate::feedback::{FeedbackError, FeedbackHandler, FeedbackSink};
use crate::grant::Grant;
use crate::reconcile::{AclReconciler, ReconcileReport, ReconcilerConfig};
use crate::resolver::GrantResolver;
use crate::target::{AclTarget, BindingTarget};

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("lookup cache: {0}")]
    Cache(#[from] CacheError),
    #[error("feedback: {0}")]
    Feedback(#[from] FeedbackError),
    #[error("lookup cache: {run}; feedback: {flush}")]
    CacheAndFeedback {
        run: CacheError,
        flush: FeedbackError,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub grants: usize,
    /// Grants that failed resolution and were left out
    pub rejected: Vec<String>,
    pub bindings: BindingReport,
    pub acls: ReconcileReport,
}

/// Resolve every grant and aggregate the results.
///
/// Grants that fail to resolve are reported on `sink` and left out; soft
/// errors become warnings. Returns the delta and the ids of rejected grants.
pub fn resolve_all(
    grants: &[Grant],
    cache: &LookupCache,
    catalog: &PermissionCatalog,
    sink: &FeedbackSink,
) -> (AggregatedChanges, Vec<String>) {
    let resolver = GrantResolver::new(cache, catalog);
    let mut aggregator = Aggregator::new();
    let mut rejected = Vec::new();

    for grant in grants {
        match resolver.resolve(grant) {
            Ok(resolved) => {
                for soft in &resolved.soft_errors {
                    sink.warning(&soft.to_string(), [&grant.id]);
                }
                aggregator.add(&resolved);
            }
            Err(err) => {
                tracing::error!("{}", err);
                sink.error(&err.to_string(), [&grant.id]);
                rejected.push(grant.id.clone());
            }
        }
    }

    (aggregator.finish(), rejected)
}

pub struct AccessSync<'a, D, T> {
    directory: &'a D,
    target: &'a T,
    catalog: PermissionCatalog,
    config: ReconcilerConfig,
}

impl<'a, D, T> AccessSync<'a, D, T>
where
    D: DirectoryProvider,
    T: BindingTarget + AclTarget,
{
    pub fn new(directory: &'a D, target: &'a T) -> Self {
        Self {
            directory,
            target,
            catalog: PermissionCatalog::storage_default(),
            config: ReconcilerConfig::default(),
        }
    }

    pub fn with_catalog(mut self, catalog: PermissionCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn with_config(mut self, config: ReconcilerConfig) -> Self {
        self.config = config;
        self
    }

    pub async fn sync<H: FeedbackHandler + ?Sized>(
        &self,
        grants: &[Grant],
        handler: &H,
    ) -> Result<SyncReport, SyncError> {
        tracing::info!(grants = grants.len(), "starting access sync");

        let sink = FeedbackSink::new();
        for grant in grants {
            sink.register(&grant.id);
        }

        let outcome = self.run(grants, &sink).await;
        let flushed = sink.flush(handler).await;

        match (outcome, flushed) {
            (Ok(report), Ok(())) => {
                tracing::info!(
                    grants = report.grants,
                    rejected = report.rejected.len(),
                    binding_failures = report.bindings.failed.len(),
                    acl_failures = report.acls.failed_count(),
                    "access sync finished"
                );
                Ok(report)
            }
            (Ok(_), Err(flush)) => Err(SyncError::Feedback(flush)),
            (Err(run), Ok(())) => Err(SyncError::Cache(run)),
            (Err(run), Err(flush)) => Err(SyncError::CacheAndFeedback { run, flush }),
        }
    }

    async fn run(&self, grants: &[Grant], sink: &FeedbackSink) -> Result<SyncReport, CacheError> {
        let cache = LookupCache::load(self.directory).await?;
        let (changes, rejected) = resolve_all(grants, &cache, &self.catalog, sink);

        let bindings = BindingApplier::new(self.target).apply(&changes, sink).await;
        let acls = AclReconciler::new(self.target, self.config.clone())
            .reconcile(&changes.acl_changes, sink)
            .await;

        Ok(SyncReport {
            grants: grants.len(),
            rejected,
            bindings,
            acls,
        })
    }
}
