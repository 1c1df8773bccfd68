//! Application of the flat binding delta

use crate::aggregate::AggregatedChanges;
use crate::binding::ScopeBinding;
use crate::feedback::FeedbackSink;
use crate::target::{BindingTarget, TargetError};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BindingReport {
    pub created: usize,
    /// Create calls answered with "already exists"
    pub existing: usize,
    pub deleted: usize,
    pub failed: Vec<(ScopeBinding, TargetError)>,
}

/// Removes every binding of the remove-set, then creates the add-set.
pub struct BindingApplier<'a, T> {
    target: &'a T,
}

impl<'a, T: BindingTarget> BindingApplier<'a, T> {
    pub fn new(target: &'a T) -> Self {
        Self { target }
    }

    pub async fn apply(&self, changes: &AggregatedChanges, sink: &FeedbackSink) -> BindingReport {
        let mut report = BindingReport::default();

        for binding in &changes.bindings_to_remove {
            match self.target.delete_binding(binding).await {
                Ok(()) => {
                    tracing::info!(binding = %binding, "binding deleted");
                    report.deleted += 1;
                }
                Err(err) => Self::fail(&mut report, changes, sink, "delete", binding, err),
            }
        }

        for binding in &changes.bindings_to_add {
            match self.target.create_binding(binding).await {
                Ok(()) => {
                    tracing::info!(binding = %binding, "binding created");
                    report.created += 1;
                }
                Err(TargetError::AlreadyExists(_)) => {
                    tracing::debug!(binding = %binding, "binding already present");
                    report.existing += 1;
                }
                Err(err) => Self::fail(&mut report, changes, sink, "create", binding, err),
            }
        }

        report
    }

    fn fail(
        report: &mut BindingReport,
        changes: &AggregatedChanges,
        sink: &FeedbackSink,
        action: &str,
        binding: &ScopeBinding,
        err: TargetError,
    ) {
        tracing::error!(binding = %binding, "failed to {} binding: {}", action, err);
        sink.error(
            &format!("failed to {} binding {}: {}", action, binding, err),
            changes.grants_for(binding),
        );
        report.failed.push((binding.clone(), err));
    }
}
