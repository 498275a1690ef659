//! Keeps a live Stage 1 session consistent when the active set changes.

use super::round::Phase;
use super::scheduler::Stage1Scheduler;
use crate::catalog::{Symbol, SymbolCatalog};
use crate::error::{GlyphError, GlyphResult};
use crate::feedback::Hooks;
use crate::working_set::WorkingSetBuilder;
use serde::Serialize;
use std::collections::BTreeSet;
use std::time::Duration;

/// What a reconcile pass did to the live round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReconcileOutcome {
    /// Practice was not finished; Stage 1 restarted from scratch.
    FullReset,
    /// The override put the whole pool on screen.
    ShowAll,
    /// The override was switched off and the saved rows came back.
    RestoredSnapshot,
    /// Rows were added or removed in place.
    Patched {
        added: Vec<String>,
        removed: Vec<String>,
    },
    /// Nothing on screen needed to change.
    Unchanged,
}

/// Applies active-set edits to a live [`Stage1Scheduler`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionReconciler;

impl SessionReconciler {
    /// Rebuild the working set from `new_active` and patch the round.
    ///
    /// Stats are never dropped: only the row layout changes. Fails when the
    /// scheduler has already promoted or the new set is too small.
    #[allow(clippy::too_many_arguments)]
    pub fn reconcile(
        scheduler: &mut Stage1Scheduler,
        old_active: &BTreeSet<String>,
        new_active: &BTreeSet<String>,
        catalog: &SymbolCatalog,
        show_all: bool,
        now: Duration,
        hooks: &mut Hooks<'_>,
    ) -> GlyphResult<ReconcileOutcome> {
        if scheduler.is_promoted() {
            return Err(GlyphError::wrong_stage(
                "Cannot reconcile Stage 1 after promotion",
            ));
        }
        let working_set = WorkingSetBuilder::new(catalog).build(new_active, scheduler.order);
        let minimum = scheduler.tuning.min_working_set;
        if working_set.len() < minimum {
            tracing::warn!(size = working_set.len(), minimum, "Refusing to shrink working set");
            return Err(GlyphError::set_too_small(working_set.len(), minimum));
        }

        scheduler.rebuild_pool(working_set);
        let was_show_all = scheduler.show_all;
        scheduler.show_all = show_all;

        if scheduler.phase == Phase::Practice {
            scheduler.reset_practice(hooks);
            tracing::info!(pool = scheduler.pool.len(), "Reconcile: practice restarted");
            return Ok(ReconcileOutcome::FullReset);
        }

        if show_all {
            if scheduler.override_snapshot.is_none() {
                scheduler.override_snapshot = Some(scheduler.round.rows.clone());
            }
            let rows = scheduler.pool.clone();
            if !was_show_all || !same_codes(&rows, &scheduler.round.rows) {
                scheduler.apply_layout(rows, now, hooks)?;
            } else {
                scheduler.render(hooks);
            }
            tracing::info!(rows = scheduler.round.rows.len(), "Reconcile: showing all symbols");
            return Ok(ReconcileOutcome::ShowAll);
        }

        if let Some(snapshot) = scheduler.override_snapshot.take() {
            let rows: Vec<Symbol> = snapshot
                .into_iter()
                .filter(|s| scheduler.working_set.contains(s.code))
                .collect();
            let rows = if rows.is_empty() {
                fallback_rows(scheduler)
            } else {
                rows
            };
            scheduler.apply_layout(rows, now, hooks)?;
            tracing::info!(rows = scheduler.round.rows.len(), "Reconcile: snapshot restored");
            return Ok(ReconcileOutcome::RestoredSnapshot);
        }

        let on_screen: BTreeSet<&str> = scheduler.round.rows.iter().map(|s| s.code).collect();
        if on_screen.len() == new_active.len()
            && new_active.iter().all(|c| on_screen.contains(c.as_str()))
        {
            scheduler.render(hooks);
            return Ok(ReconcileOutcome::Unchanged);
        }

        let added: BTreeSet<&str> = new_active
            .difference(old_active)
            .map(String::as_str)
            .collect();
        let removed: BTreeSet<&str> = old_active
            .difference(new_active)
            .map(String::as_str)
            .collect();

        // Additions are held back until seen; removals always apply.
        let mut rows: Vec<Symbol> = scheduler
            .pool
            .iter()
            .filter(|s| on_screen.contains(s.code) || added.contains(s.code))
            .filter(|s| !removed.contains(s.code))
            .filter(|s| scheduler.show_new_immediately || scheduler.seen.contains(s.code))
            .copied()
            .collect();
        if rows.is_empty() {
            rows = fallback_rows(scheduler);
        }

        let final_codes: BTreeSet<&str> = rows.iter().map(|s| s.code).collect();
        if final_codes == on_screen {
            scheduler.render(hooks);
            return Ok(ReconcileOutcome::Unchanged);
        }

        let added_rows: Vec<String> = final_codes
            .difference(&on_screen)
            .map(|c| c.to_string())
            .collect();
        let removed_rows: Vec<String> = on_screen
            .difference(&final_codes)
            .map(|c| c.to_string())
            .collect();

        scheduler.apply_layout(rows, now, hooks)?;
        tracing::info!(
            added = ?added_rows,
            removed = ?removed_rows,
            rows = scheduler.round.rows.len(),
            "Reconcile: rows patched"
        );
        Ok(ReconcileOutcome::Patched {
            added: added_rows,
            removed: removed_rows,
        })
    }
}

fn same_codes(a: &[Symbol], b: &[Symbol]) -> bool {
    a.len() == b.len() && a.iter().all(|s| b.iter().any(|o| o.code == s.code))
}

/// Seen pool symbols, capped at the first recall round's size.
fn fallback_rows(scheduler: &Stage1Scheduler) -> Vec<Symbol> {
    let cap = scheduler.tuning.initial_recall_rows.max(1);
    let seen: Vec<Symbol> = scheduler
        .pool
        .iter()
        .filter(|s| scheduler.seen.contains(s.code))
        .take(cap)
        .copied()
        .collect();
    if seen.is_empty() {
        scheduler.pool.iter().take(cap).copied().collect()
    } else {
        seen
    }
}
