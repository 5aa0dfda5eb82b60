//! Sync pass orchestration.
//!
//! One pass reads every configured parent once, then builds, plans and
//! applies each child's diff. A failure is confined to the event or child
//! it happened in; the caller always gets a `PassSummary` back.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::StreamExt;
use futures::future::join_all;
use tokio::sync::{Semaphore, SemaphorePermit};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::backend::CalendarBackend;
use crate::config::{ChildConfig, EngineSettings, SyncConfig};
use crate::desired::{self, ParentEvents};
use crate::diff::ChildDiff;
use crate::error::{SyncError, SyncResult};
use crate::event::CalendarId;
use crate::reconcile;
use crate::summary::{ChildSummary, PassSummary, SyncFailure};
use crate::window::{EventFilter, SyncWindow};

/// What a dry run would do to one child.
#[derive(Debug, Clone)]
pub struct ChildPlan {
    pub child: CalendarId,
    /// None when the child was skipped, failed or cancelled (see `summary`)
    pub diff: Option<ChildDiff>,
    /// Failures found while planning; no write counts
    pub summary: ChildSummary,
}

#[derive(Debug, Clone)]
pub struct PassPlan {
    pub now: DateTime<Utc>,
    pub children: Vec<ChildPlan>,
}

/// Everything read up front and shared read-only by all children of a pass.
struct PassContext<'a> {
    config: &'a SyncConfig,
    filter: EventFilter<'a>,
    parent_events: ParentEvents,
    unavailable_parents: HashMap<CalendarId, SyncError>,
    managed_parents: HashSet<CalendarId>,
}

/// A child that is ready to be written to.
struct PreparedChild {
    diff: ChildDiff,
    failures: Vec<SyncFailure>,
}

pub struct SyncEngine<B> {
    backend: B,
    limiter: Semaphore,
    max_concurrent_children: usize,
}

impl<B: CalendarBackend> SyncEngine<B> {
    pub fn new(backend: B) -> Self {
        Self::with_settings(backend, EngineSettings::default())
    }

    pub fn with_settings(backend: B, settings: EngineSettings) -> Self {
        SyncEngine {
            backend,
            limiter: Semaphore::new(settings.max_in_flight.max(1)),
            max_concurrent_children: settings.max_concurrent_children.max(1),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Run one full pass: read, plan and write for every child.
    ///
    /// Only an invalid configuration fails the call; everything else ends
    /// up in the returned summary.
    pub async fn run_pass(
        &self,
        config: &SyncConfig,
        now: DateTime<Utc>,
        cancel: &CancellationToken,
    ) -> SyncResult<PassSummary> {
        validate(config)?;
        info!(
            children = config.children.len(),
            parents = config.parents.len(),
            %now,
            "Starting sync pass"
        );

        let ctx = self.read_parents(config, now).await;

        let mut results: Vec<(usize, ChildSummary)> =
            futures::stream::iter(config.children.iter().enumerate())
                .map(|(index, child)| {
                    let ctx = &ctx;
                    async move { (index, self.sync_child(child, ctx, cancel).await) }
                })
                .buffer_unordered(self.max_concurrent_children)
                .collect()
                .await;
        results.sort_by_key(|(index, _)| *index);

        let summary = PassSummary {
            now,
            children: results.into_iter().map(|(_, summary)| summary).collect(),
            cancelled: cancel.is_cancelled(),
        };

        let (created, updated, deleted) = summary.counts();
        info!(
            created,
            updated,
            deleted,
            errors = summary.error_count(),
            cancelled = summary.cancelled,
            "Sync pass finished"
        );

        Ok(summary)
    }

    /// Compute every child's diff without writing anything.
    pub async fn plan_pass(
        &self,
        config: &SyncConfig,
        now: DateTime<Utc>,
        cancel: &CancellationToken,
    ) -> SyncResult<PassPlan> {
        validate(config)?;
        let ctx = self.read_parents(config, now).await;

        let mut results: Vec<(usize, ChildPlan)> =
            futures::stream::iter(config.children.iter().enumerate())
                .map(|(index, child)| {
                    let ctx = &ctx;
                    async move {
                        let plan = match self.prepare_child(child, ctx, cancel).await {
                            Ok(prepared) => {
                                let mut summary = ChildSummary::new(&child.id);
                                summary.unchanged = prepared.diff.unchanged;
                                summary.failures = prepared.failures;
                                summary.finish(false);
                                ChildPlan {
                                    child: child.id.clone(),
                                    diff: Some(prepared.diff),
                                    summary,
                                }
                            }
                            Err(summary) => ChildPlan {
                                child: child.id.clone(),
                                diff: None,
                                summary,
                            },
                        };
                        (index, plan)
                    }
                })
                .buffer_unordered(self.max_concurrent_children)
                .collect()
                .await;
        results.sort_by_key(|(index, _)| *index);

        Ok(PassPlan {
            now,
            children: results.into_iter().map(|(_, plan)| plan).collect(),
        })
    }

    async fn permit(&self) -> SyncResult<SemaphorePermit<'_>> {
        self.limiter
            .acquire()
            .await
            .map_err(|_| SyncError::unavailable("backend", "limiter closed"))
    }

    /// Read every configured parent once, concurrently.
    async fn read_parents<'a>(&self, config: &'a SyncConfig, now: DateTime<Utc>) -> PassContext<'a> {
        let window = SyncWindow::from_options(now, &config.options);
        let filter = EventFilter::new(window, &config.options.ignore_title_prefix);

        let mut parent_events = ParentEvents::new();
        let mut unavailable_parents = HashMap::new();

        if !config.children.is_empty() {
            let reads = config.parents.iter().map(|parent| async move {
                let _permit = self.permit().await?;
                self.backend.list_events(parent, &window).await
            });

            for (parent, result) in config.parents.iter().zip(join_all(reads).await) {
                match result {
                    Ok(events) => {
                        debug!(parent = %parent, events = events.len(), "Read parent");
                        parent_events.insert(parent.clone(), Arc::new(events));
                    }
                    Err(error) => {
                        warn!(parent = %parent, %error, "Parent unavailable, its synced events are left as they are");
                        unavailable_parents.insert(parent.clone(), error);
                    }
                }
            }
        }

        PassContext {
            config,
            filter,
            parent_events,
            unavailable_parents,
            managed_parents: config.parents.iter().cloned().collect(),
        }
    }

    /// Read the child's owned events and plan its diff.
    ///
    /// Returns the child's final summary as the error when it cannot be
    /// written to at all.
    async fn prepare_child(
        &self,
        child: &ChildConfig,
        ctx: &PassContext<'_>,
        cancel: &CancellationToken,
    ) -> Result<PreparedChild, ChildSummary> {
        if cancel.is_cancelled() {
            return Err(ChildSummary::cancelled(&child.id));
        }

        if let Err(error) = desired::check_child(child, ctx.config) {
            warn!(child = %child.id, %error, "Skipping child");
            return Err(ChildSummary::skipped(
                &child.id,
                SyncFailure::for_child(&child.id, error),
            ));
        }

        let current = async {
            let _permit = self.permit().await?;
            self.backend.list_owned_events(&child.id).await
        }
        .await;

        let current = match current {
            Ok(current) => current,
            Err(error) => {
                warn!(child = %child.id, %error, "Child unavailable");
                return Err(ChildSummary::failed(
                    &child.id,
                    vec![SyncFailure::for_child(&child.id, error)],
                ));
            }
        };

        let desired = desired::build_filtered(child, &ctx.parent_events, &ctx.filter);

        let mut frozen = HashSet::new();
        let mut failures = Vec::new();
        for (parent, error) in &ctx.unavailable_parents {
            if !child.draws_from(parent) {
                continue;
            }
            frozen.insert(parent.clone());
            failures.push(SyncFailure::for_parent(&child.id, parent, error.clone()));
        }

        let diff = reconcile::plan(&child.id, &desired, current, &ctx.managed_parents, &frozen);
        debug!(
            child = %child.id,
            desired = desired.len(),
            changes = diff.diffs.len(),
            unchanged = diff.unchanged,
            "Planned child"
        );

        Ok(PreparedChild { diff, failures })
    }

    async fn sync_child(
        &self,
        child: &ChildConfig,
        ctx: &PassContext<'_>,
        cancel: &CancellationToken,
    ) -> ChildSummary {
        let prepared = match self.prepare_child(child, ctx, cancel).await {
            Ok(prepared) => prepared,
            Err(summary) => return summary,
        };

        let mut summary = ChildSummary::new(&child.id);
        summary.unchanged = prepared.diff.unchanged;
        summary.failures = prepared.failures;

        let cancelled =
            reconcile::apply(&prepared.diff, &self.backend, &self.limiter, cancel, &mut summary)
                .await;
        summary.finish(cancelled);

        info!(
            child = %child.id,
            created = summary.created,
            updated = summary.updated,
            deleted = summary.deleted,
            unchanged = summary.unchanged,
            errors = summary.errors(),
            "Synced child"
        );

        summary
    }
}

/// Each child id may appear only once per pass.
fn validate(config: &SyncConfig) -> SyncResult<()> {
    let mut seen = HashSet::new();
    for child in &config.children {
        if !seen.insert(&child.id) {
            return Err(SyncError::InvalidConfiguration(format!(
                "child '{}' is configured more than once",
                child.id
            )));
        }
    }
    Ok(())
}
