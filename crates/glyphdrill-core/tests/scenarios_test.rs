//! End-to-end walkthroughs of small sessions.

mod common;

use common::{sequential_config, session, Learner};
use glyphdrill_core::{
    ItemStatsTracker, Phase, PromotionQuota, SchedulerTuning, Stage2Handoff, StageKind, TaskKind,
    Transition,
};

/// Three symbols: two practice passes over the whole pool, then recall rounds
/// that never grow past the pool.
#[test]
fn test_three_symbol_pool() {
    let mut s = session(3, sequential_config(false), 1);
    let mut learner = Learner::new(1);

    let view = s.round_view().unwrap();
    // Practice shuffles the display order, never the membership.
    let mut codes: Vec<&str> = view.rows.iter().map(|r| r.symbol.code).collect();
    codes.sort_unstable();
    assert_eq!(codes, vec!["03B1", "03B2", "03B3"]);
    assert!(view.rows.iter().all(|r| !r.is_masked));

    learner.finish_practice(&mut s);
    let stage1 = s.stage1().unwrap();
    assert_eq!(stage1.phase(), Phase::Recall);
    assert_eq!(stage1.practice_passes_done(), 2);
    assert_eq!(stage1.display_round(), 3);
    assert_eq!(stage1.view().rows.len(), 3);

    let mut guard = 0;
    while s.stage_kind() == StageKind::Stage1 {
        let stage1 = s.stage1().unwrap();
        if stage1.phase() == Phase::Recall {
            assert_eq!(stage1.view().rows.len(), 3);
        }
        learner.step(&mut s);
        guard += 1;
        assert!(guard < 500, "never promoted");
    }
    assert_eq!(s.stage_kind(), StageKind::Stage2);
}

/// Six symbols: the first recall round masks exactly one row, and it is
/// the first task offered.
#[test]
fn test_first_recall_round_masks_one_row() {
    let mut s = session(6, sequential_config(false), 2);
    let mut learner = Learner::new(2);
    learner.finish_practice(&mut s);

    let stage1 = s.stage1().unwrap();
    assert_eq!(stage1.display_round(), 3);
    assert_eq!(stage1.hidden_rows().len(), 1);

    let view = s.round_view().unwrap();
    assert_eq!(view.rows.iter().filter(|r| r.is_masked).count(), 1);
    let active = view.highlight_row.unwrap();
    assert_eq!(view.rows[active].task, Some(TaskKind::Hidden));
}

/// Turning off a finished row mid-recall drops just that row and keeps
/// both its statistics and everyone else's progress.
#[test]
fn test_toggle_off_completed_row() {
    let mut s = session(6, sequential_config(false), 3);
    let mut learner = Learner::new(3);
    learner.finish_practice(&mut s);
    let total = s.stage1().unwrap().total_rounds();
    // Finish the hidden row and land on the next task.
    learner.step(&mut s);
    assert_eq!(s.round_view().unwrap().transition, Transition::Idle);

    let before = s.round_view().unwrap();
    let done = before.rows.iter().find(|r| r.completed).unwrap().symbol.code;
    let stat = s.stage1().unwrap().stats().get(done).cloned().unwrap();

    assert!(!s.toggle_symbol(learner.now, done).unwrap());

    let after = s.round_view().unwrap();
    assert_eq!(after.rows.len(), before.rows.len() - 1);
    assert!(after.rows.iter().all(|r| r.symbol.code != done));
    for row in &after.rows {
        let old = before
            .rows
            .iter()
            .find(|r| r.symbol.code == row.symbol.code)
            .unwrap();
        assert_eq!(row.completed, old.completed, "{}", row.symbol.code);
    }
    assert_eq!(s.stage1().unwrap().stats().get(done), Some(&stat));
    assert!(!s.active_codes().contains(done));
    assert!(s.stage1().unwrap().total_rounds() >= total);
}

/// A symbol switched back on mid-recall is shown straight away but stays
/// visible for the rest of the round, repeat pass included.
#[test]
fn test_reenabled_symbol_is_not_masked() {
    let mut s = session(6, sequential_config(false), 4);
    let mut learner = Learner::new(4);
    learner.finish_practice(&mut s);
    assert!(s.config().preferences.show_new_immediately);

    let stage1 = s.stage1().unwrap();
    let fresh = stage1
        .working_set()
        .symbols()
        .iter()
        .map(|sym| sym.code)
        .find(|code| !stage1.seen_codes().contains(*code))
        .unwrap();
    let total = stage1.total_rounds();

    assert!(!s.toggle_symbol(learner.now, fresh).unwrap());
    assert!(s.toggle_symbol(learner.now, fresh).unwrap());
    assert!(s.stage1().unwrap().total_rounds() >= total);

    let masked_on_return = |s: &common::Session| {
        let view = s.round_view().unwrap();
        let row = view
            .rows
            .iter()
            .position(|r| r.symbol.code == fresh)
            .expect("re-enabled symbol is on screen");
        assert!(!s.stage1().unwrap().hidden_rows().contains(&row));
        view.rows[row].is_masked
    };
    assert!(!masked_on_return(&s));

    let round = s.stage1().unwrap().display_round();
    let mut guard = 0;
    while s.stage1().unwrap().display_round() == round || !s.is_settled() {
        learner.step(&mut s);
        guard += 1;
        assert!(guard < 100, "round never repeated");
    }
    assert_eq!(s.stage1().unwrap().display_round(), round + 1);
    assert!(!masked_on_return(&s));
}

/// Two masked failures put a symbol on the remedial path: one hidden
/// success is no longer enough.
#[test]
fn test_remedial_quota() {
    let quota = PromotionQuota::from_tuning(&SchedulerTuning::default());
    let mut stats = ItemStatsTracker::new();
    for code in ["03B1", "03B2", "03B3"] {
        stats.ensure(code).visible_successes = 2;
        stats.record_hidden_success(code, 3);
    }
    let pool = || ["03B1", "03B2", "03B3"];
    assert!(Stage2Handoff::is_ready(&stats, pool(), &quota));

    stats.record_hidden_failure("03B2", 4);
    stats.record_hidden_failure("03B2", 5);
    assert!(!stats.meets_quota("03B2", &quota));
    assert!(!Stage2Handoff::is_ready(&stats, pool(), &quota));

    stats.record_hidden_success("03B2", 6);
    assert_eq!(stats.get("03B2").unwrap().hidden_successes, 2);
    assert!(stats.meets_quota("03B2", &quota));
    assert!(Stage2Handoff::is_ready(&stats, pool(), &quota));
}

/// A remedial symbol only reaches quota after its second hidden success.
#[test]
fn test_remedial_after_failures_first() {
    let quota = PromotionQuota::from_tuning(&SchedulerTuning::default());
    let mut stats = ItemStatsTracker::new();
    stats.record_hidden_failure("0394", 3);
    stats.record_hidden_failure("0394", 4);
    stats.record_hidden_success("0394", 5);
    assert!(!stats.meets_quota("0394", &quota));
    stats.record_hidden_success("0394", 6);
    assert!(stats.meets_quota("0394", &quota));
}
