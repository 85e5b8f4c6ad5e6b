// Copyright 2025 the Barstack Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

extern crate std;

use alloc::format;
use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;
use core::cell::RefCell;

use barstack_core::{
    Accessors, ElementState, FrameStatus, Identity, JoinKey, PassId, Phase, Row, SettleHooks,
    Settled,
};
use barstack_transforms::{StackOffset, StackOptions};
use kurbo::Rect;

use crate::{
    Anchor, AnimationConfig, BarLayoutEngine, CollisionMode, ConfigError, EngineConfig,
    LabelConfig, LabelPosition, LabelUpdate, Layout, ScaleOptions, Size,
};

#[derive(Clone, Default)]
struct Recorder {
    log: Rc<RefCell<Vec<String>>>,
}

impl Recorder {
    fn entries(&self) -> Vec<String> {
        self.log.borrow().clone()
    }
}

impl SettleHooks for Recorder {
    fn refresh_interaction(&mut self, settled: &Settled) {
        self.log
            .borrow_mut()
            .push(format!("refresh {}", settled.superseded));
    }

    fn update_counts(&mut self, live: usize) {
        self.log.borrow_mut().push(format!("counts {live}"));
    }

    fn retain_focus(&mut self, _focus: Option<Identity>, lost: bool) {
        self.log.borrow_mut().push(format!("focus {lost}"));
    }

    fn transitions_complete(&mut self, pass: PassId) {
        self.log.borrow_mut().push(format!("complete {}", pass.get()));
    }
}

fn row(cat: &str, v: f64) -> Row {
    Row::new().with("cat", cat).with("v", v)
}

fn grouped(cat: &str, grp: &str, v: f64) -> Row {
    row(cat, v).with("grp", grp)
}

fn plain_config() -> EngineConfig {
    EngineConfig::new(Accessors::new("cat", "v"), Size::new(400.0, 300.0))
        .with_scale(ScaleOptions::default().with_include_zero(true))
}

fn stacked_config() -> EngineConfig {
    EngineConfig::new(
        Accessors::new("cat", "v").with_group("grp"),
        Size::new(400.0, 300.0),
    )
}

fn engine(config: EngineConfig, rows: Vec<Row>) -> (BarLayoutEngine, Recorder) {
    let mut engine = BarLayoutEngine::new(config).expect("valid config");
    let recorder = Recorder::default();
    engine.set_hooks(recorder.clone());
    engine.set_data(rows);
    (engine, recorder)
}

fn abc() -> Vec<Row> {
    vec![row("a", 10.0), row("b", 20.0), row("c", 5.0)]
}

fn rect_of(engine: &BarLayoutEngine, key: &str) -> Rect {
    engine.layout().unwrap().get(key).unwrap().rect
}

fn assert_rect_close(a: Rect, b: Rect) {
    let eps = 1e-9;
    assert!((a.x0 - b.x0).abs() <= eps, "x0 {a:?} != {b:?}");
    assert!((a.y0 - b.y0).abs() <= eps, "y0 {a:?} != {b:?}");
    assert!((a.x1 - b.x1).abs() <= eps, "x1 {a:?} != {b:?}");
    assert!((a.y1 - b.y1).abs() <= eps, "y1 {a:?} != {b:?}");
}

#[test]
fn first_render_runs_every_step_and_settles_synchronously() {
    let (mut engine, recorder) = engine(plain_config(), abc());
    let report = engine.render(0.0);
    assert_eq!(
        report.steps,
        vec![
            "prepare_data",
            "prepare_scales",
            "reconcile",
            "draw",
            "place_labels"
        ]
    );
    assert!(!engine.is_animating());
    assert_eq!(engine.last_settled(), report.pass);
    assert_eq!(
        recorder.entries(),
        vec!["refresh 0", "counts 3", "focus false", "complete 0"]
    );

    assert_rect_close(rect_of(&engine, "a"), Rect::new(25.0, 150.0, 125.0, 300.0));
    assert_rect_close(rect_of(&engine, "b"), Rect::new(150.0, 0.0, 250.0, 300.0));
    assert_eq!(engine.live_count(), 3);
}

#[test]
fn stacked_rows_follow_the_diverging_rule() {
    let rows = vec![
        grouped("A", "g", -30.0),
        grouped("B", "g", -5.0),
        grouped("C", "g", 22.0),
    ];
    let (mut engine, _) = engine(stacked_config(), rows);
    engine.render(0.0);

    assert_eq!(engine.scales().unwrap().value.domain(), (-35.0, 22.0));
    let sums = engine.group_sums();
    assert_eq!(sums.len(), 1);
    assert_eq!((sums[0].positive_sum, sums[0].negative_sum), (22.0, -35.0));
    assert_eq!(sums[0].sum, -13.0);

    let a = rect_of(&engine, "A-g");
    let b = rect_of(&engine, "B-g");
    let c = rect_of(&engine, "C-g");
    assert_eq!(a.y0, c.y1, "A and C both start at the baseline");
    assert_eq!(b.y0, a.y1, "B continues below A");
    assert_eq!(c.y0, 0.0);
    assert_eq!(b.y1, 300.0);
}

#[test]
fn identities_survive_rerenders() {
    let config = plain_config().with_animation(AnimationConfig::default().with_disabled(true));
    let (mut engine, _) = engine(config, vec![row("a", 10.0), row("b", 20.0)]);
    engine.render(0.0);
    let a = engine.layout().unwrap().get("a").unwrap().identity;

    engine.set_data(abc());
    engine.render(100.0);
    let layout = engine.layout().unwrap();
    assert_eq!(layout.get("a").unwrap().identity, a);
    assert_eq!(layout.get("a").unwrap().phase, Phase::Update);
    assert_eq!(layout.get("c").unwrap().phase, Phase::Enter);
}

#[test]
fn animated_pass_settles_once_after_its_tweens() {
    let (mut engine, recorder) = engine(plain_config(), vec![row("a", 10.0), row("b", 20.0)]);
    engine.render(0.0);
    assert_eq!(recorder.entries().len(), 4);

    engine.set_data(vec![row("a", 10.0)]);
    let report = engine.render(100.0);
    assert!(engine.is_animating());
    assert_eq!(engine.state("b"), Some(ElementState::PendingRemoval));
    assert_eq!(engine.layout().unwrap().get("b").unwrap().phase, Phase::Exit);
    assert_eq!(recorder.entries().len(), 4);

    assert_eq!(engine.tick(400.0), FrameStatus::Running);
    let pass = report.pass.unwrap();
    assert_eq!(engine.tick(850.0), FrameStatus::Settled(pass));
    let entries = recorder.entries();
    assert_eq!(entries.len(), 8);
    assert_eq!(entries[5], "counts 1");
    assert_eq!(engine.state("b"), None);
    assert_eq!(engine.last_settled(), Some(pass));

    assert_eq!(engine.tick(900.0), FrameStatus::Idle);
    assert_eq!(recorder.entries().len(), 8);
}

#[test]
fn new_pass_supersedes_the_running_one() {
    let (mut engine, recorder) = engine(plain_config(), abc());
    engine.render(0.0);

    engine.set_data(vec![row("a", 5.0), row("b", 20.0)]);
    engine.render(100.0);
    engine.set_data(vec![row("a", 15.0), row("b", 20.0)]);
    let second = engine.render(200.0).pass.unwrap();
    assert_eq!(engine.tick(2000.0), FrameStatus::Settled(second));

    let entries = recorder.entries();
    assert_eq!(entries.len(), 8, "the superseded pass never reports");
    assert_eq!(entries[4], "refresh 1");
    assert_eq!(entries[7], format!("complete {}", second.get()));
    assert_eq!(engine.state("c"), None);
}

#[test]
fn interrupted_tween_restarts_from_its_sampled_value() {
    let config = plain_config().with_animation(
        AnimationConfig::default()
            .with_easing(barstack_core::Easing::Linear)
            .with_duration(100.0),
    );
    let (mut engine, _) = engine(config, vec![row("a", 10.0), row("b", 20.0)]);
    engine.render(0.0);

    engine.set_data(vec![row("a", 20.0), row("b", 20.0)]);
    engine.render(1000.0);
    let midway = engine.visual_at("a", 1050.0).unwrap();

    engine.set_data(vec![row("a", 5.0), row("b", 20.0)]);
    engine.render(1050.0);
    let restart = engine.visual_at("a", 1050.0).unwrap();
    assert_rect_close(restart.rect, midway.rect);
}

#[test]
fn size_change_skips_data_preparation() {
    let (mut engine, _) = engine(plain_config(), abc());
    engine.render(0.0);
    let before = engine.layout().unwrap().get("b").unwrap().identity;

    engine.set_size(Size::new(200.0, 300.0)).unwrap();
    let report = engine.render(10.0);
    assert_eq!(
        report.steps,
        vec!["prepare_scales", "reconcile", "draw", "place_labels"]
    );
    let b = engine.layout().unwrap().get("b").unwrap();
    assert_eq!(b.identity, before);
    assert_eq!(b.phase, Phase::Update);

    assert!(engine.render(20.0).steps.is_empty(), "clean pass runs nothing");
}

#[test]
fn hiding_a_label_reruns_only_placement() {
    let (mut engine, _) = engine(plain_config(), abc());
    engine.render(0.0);
    assert!(engine.labels().all(|l| l.is_visible()));

    engine.set_label_hidden("b", true);
    let report = engine.render(10.0);
    assert_eq!(report.steps, vec!["place_labels"]);
    assert_eq!(
        report.labels,
        Some(LabelUpdate {
            kept: 2,
            searched: 0,
            cleared: 1,
        })
    );
    assert!(!engine.label("b").unwrap().is_visible());
    assert!(engine.label("a").unwrap().is_visible());

    engine.set_label_hidden("b", false);
    let report = engine.render(20.0);
    assert_eq!(report.labels.map(|u| u.searched), Some(1));
    assert!(engine.label("b").unwrap().is_visible());
}

#[test]
fn duplicate_keys_keep_the_last_row() {
    let rows = vec![row("a", 1.0), row("a", 4.0), row("b", 2.0)];
    let (mut engine, _) = engine(plain_config(), rows);
    let report = engine.render(0.0);
    assert_eq!(report.duplicates, vec![JoinKey::from("a")]);
    let layout = engine.layout().unwrap();
    assert_eq!(layout.data.len(), 2);
    assert_eq!(layout.get("a").unwrap().value, 4.0);
}

#[test]
fn dropped_duplicates_do_not_widen_the_domain() {
    let rows = vec![row("a", 40.0), row("a", 4.0), row("b", 2.0)];
    let (mut engine, _) = engine(plain_config(), rows);
    engine.render(0.0);
    assert_eq!(engine.scales().unwrap().value.domain(), (0.0, 4.0));
    let a = rect_of(&engine, "a");
    assert_eq!((a.y0, a.y1), (0.0, 300.0));
}

#[test]
fn missing_values_render_flat_with_hidden_labels() {
    let rows = vec![row("a", 10.0), Row::new().with("cat", "b")];
    let (mut engine, _) = engine(plain_config(), rows);
    engine.render(0.0);
    let b = rect_of(&engine, "b");
    assert_eq!(b.height(), 0.0);
    assert_eq!(b.y0, 300.0);
    assert!(!engine.label("b").unwrap().is_visible());
    assert!(engine.label("a").unwrap().is_visible());
}

#[test]
fn invalid_configuration_is_rejected() {
    let padded = plain_config().with_scale(ScaleOptions::default().with_band_padding(1.0));
    assert!(matches!(
        BarLayoutEngine::new(padded),
        Err(ConfigError::BandPadding(_))
    ));

    let (mut engine, _) = engine(plain_config(), abc());
    assert!(matches!(
        engine.set_size(Size::new(f64::NAN, 1.0)),
        Err(ConfigError::Size { .. })
    ));
    assert_eq!(engine.config().size, Size::new(400.0, 300.0));
    assert!(matches!(
        engine.set_animation(AnimationConfig::default().with_duration(-1.0)),
        Err(ConfigError::Duration(_))
    ));
}

#[test]
fn empty_data_still_settles() {
    let (mut engine, recorder) = engine(plain_config(), Vec::new());
    let report = engine.render(0.0);
    assert_eq!(engine.last_settled(), report.pass);
    assert_eq!(recorder.entries()[1], "counts 0");
    assert!(engine.layout().unwrap().data.is_empty());
    assert_eq!(engine.labels().count(), 0);
    assert_eq!(engine.scales().unwrap().value.domain(), (0.0, 0.0));
}

#[test]
fn stacked_totals_share_the_label_grid() {
    let rows = vec![
        grouped("x", "g1", 10.0),
        grouped("y", "g1", 5.0),
        grouped("x", "g2", 3.0),
        grouped("y", "g2", 4.0),
    ];
    let config = stacked_config()
        .with_scale(ScaleOptions::default().with_max_override(30.0))
        .with_labels(LabelConfig::default().with_visible(false).with_totals(true));
    let (mut engine, _) = engine(config, rows);
    engine.render(0.0);

    let totals = engine.totals();
    assert_eq!(totals.len(), 2);
    assert!(totals.iter().all(|t| t.is_visible()));
    assert_eq!(totals[0].key, JoinKey::from("g1"));
    let g1 = totals[0].placed.unwrap().rect;
    assert!(g1.y1 <= 150.0, "total sits above the stack end");
    assert!(engine.labels().all(|l| !l.is_visible()));
}

#[test]
fn visible_labels_never_overlap() {
    let rows: Vec<Row> = (0..60)
        .map(|i| row(&format!("k{i}"), f64::from((i * 37) % 23) + 1.0))
        .collect();
    let (mut engine, _) = engine(plain_config(), rows);
    engine.render(0.0);

    let visible: Vec<Rect> = engine
        .labels()
        .filter_map(|l| l.placed.map(|p| p.rect))
        .collect();
    assert!(!visible.is_empty());
    for (i, a) in visible.iter().enumerate() {
        for b in &visible[i + 1..] {
            let overlap = a.intersect(*b);
            assert!(
                overlap.width() <= 0.0 || overlap.height() <= 0.0,
                "{a:?} overlaps {b:?}"
            );
        }
    }
}

#[test]
fn entering_segment_starts_at_its_sibling_edge() {
    let (mut engine, _) = engine(
        stacked_config(),
        vec![grouped("A", "g", 10.0), grouped("C", "g", 5.0)],
    );
    engine.render(0.0);

    engine.set_data(vec![
        grouped("A", "g", 10.0),
        grouped("B", "g", 4.0),
        grouped("C", "g", 5.0),
    ]);
    engine.render(100.0);
    assert_eq!(engine.layout().unwrap().get("B-g").unwrap().phase, Phase::Enter);
    let start = engine.visual_at("B-g", 100.0).unwrap();
    assert!((start.rect.y0 - 100.0).abs() < 1e-9, "{:?}", start.rect);
    assert_eq!(start.rect.height(), 0.0);
    assert_eq!(start.opacity, 1.0);
}

#[test]
fn removing_the_focused_element_reports_focus_lost() {
    let config = plain_config().with_animation(AnimationConfig::default().with_disabled(true));
    let (mut engine, recorder) = engine(config, abc());
    engine.render(0.0);
    engine.set_focus(Some("b"));
    engine.set_data(vec![row("a", 10.0), row("c", 5.0)]);
    engine.render(10.0);
    assert_eq!(recorder.entries()[6], "focus true");
    assert_eq!(engine.state("b"), None);
}

#[test]
fn infinite_stacked_values_are_left_out() {
    let rows = vec![
        grouped("a", "g1", 5.0),
        grouped("b", "g1", f64::INFINITY),
        Row::new().with("cat", "c").with("grp", "g1").with("v", "inf"),
        grouped("a", "g2", 3.0),
    ];
    let (mut engine, _) = engine(stacked_config(), rows);
    engine.render(0.0);

    assert_eq!(engine.scales().unwrap().value.domain(), (0.0, 5.0));
    let a = rect_of(&engine, "a-g2");
    assert!((a.y0 - 120.0).abs() < 1e-9, "{a:?}");
    assert_eq!(a.y1, 300.0);
    let b = rect_of(&engine, "b-g1");
    assert_eq!(b.height(), 0.0);
    assert!(!engine.label("b-g1").unwrap().is_visible());
    assert!(!engine.label("c-g1").unwrap().is_visible());
}

#[test]
fn horizontal_bars_grow_rightward() {
    let (mut engine, _) = engine(plain_config().with_layout(Layout::Horizontal), abc());
    engine.render(0.0);

    assert_rect_close(rect_of(&engine, "a"), Rect::new(0.0, 18.75, 200.0, 93.75));
    assert_rect_close(rect_of(&engine, "b"), Rect::new(0.0, 112.5, 400.0, 187.5));

    let a = engine.label("a").unwrap().placed.unwrap();
    assert_eq!(a.candidate.anchor, Anchor::Right);
    assert!((a.rect.x0 - 204.0).abs() < 1e-9, "{:?}", a.rect);

    // No room past the plot edge, so the label moves inside the bar end.
    let b = engine.label("b").unwrap().placed.unwrap();
    assert_eq!(b.candidate.anchor, Anchor::Left);
    assert!((b.rect.x1 - 392.0).abs() < 1e-9, "{:?}", b.rect);
}

#[test]
fn normalized_stacks_fill_the_unit_domain() {
    let config = stacked_config()
        .with_stack(StackOptions::default().with_offset(StackOffset::Normalize))
        .with_scale(ScaleOptions::default().with_max_override(2.0))
        .with_labels(LabelConfig::default().with_visible(false).with_totals(true));
    let (mut engine, _) = engine(
        config,
        vec![grouped("x", "g1", 10.0), grouped("y", "g1", 30.0)],
    );
    engine.render(0.0);

    assert_eq!(engine.scales().unwrap().value.domain(), (0.0, 2.0));
    let x = rect_of(&engine, "x-g1");
    let y = rect_of(&engine, "y-g1");
    assert_rect_close(x, Rect::new(x.x0, 262.5, x.x1, 300.0));
    assert_rect_close(y, Rect::new(y.x0, 150.0, y.x1, 262.5));

    let total = engine.totals()[0].placed.unwrap();
    assert_rect_close(total.rect, Rect::new(total.rect.x0, 135.0, total.rect.x1, 146.0));

    engine.set_data(vec![
        grouped("x", "g1", 10.0),
        grouped("z", "g1", 20.0),
        grouped("y", "g1", 30.0),
    ]);
    engine.render(100.0);
    let start = engine.visual_at("z-g1", 100.0).unwrap();
    assert!((start.rect.y0 - 275.0).abs() < 1e-9, "{:?}", start.rect);
    assert_eq!(start.rect.height(), 0.0);
}

#[test]
fn hide_only_labels_stay_put_or_hide() {
    let labels = LabelConfig::default()
        .with_position(LabelPosition::Middle)
        .with_collision(CollisionMode::HideOnly)
        .with_format(|v| {
            if v > 15.0 {
                String::from("far too wide for its bar")
            } else {
                format!("{v}")
            }
        });
    let (mut engine, _) = engine(plain_config().with_labels(labels), abc());
    engine.render(0.0);

    let a = engine.label("a").unwrap().placed.unwrap();
    assert_eq!(a.candidate.anchor, Anchor::Middle);
    assert!((a.point.y - 225.0).abs() < 1e-9);
    assert!(engine.label("c").unwrap().is_visible());
    assert!(!engine.label("b").unwrap().is_visible(), "crosses its bar outline");
}

#[test]
fn fixed_labels_need_room_inside_their_bar() {
    let labels = LabelConfig::default()
        .with_position(LabelPosition::Bottom)
        .with_collision(CollisionMode::Fixed);
    let rows = vec![row("a", 10.0), row("b", 20.0), row("c", 0.5)];
    let (mut engine, _) = engine(plain_config().with_labels(labels.clone()), rows.clone());
    engine.render(0.0);
    assert!(engine.label("a").unwrap().is_visible());
    assert!(engine.label("b").unwrap().is_visible());
    assert!(!engine.label("c").unwrap().is_visible(), "7.5 units tall");

    let (mut engine, _) = self::engine(
        plain_config().with_labels(labels.with_small_labels(true)),
        rows,
    );
    engine.render(0.0);
    assert!(engine.label("c").unwrap().is_visible());
}

#[test]
fn centered_baseline_splits_bars_around_the_middle() {
    let config = plain_config().with_scale(
        ScaleOptions::default()
            .with_include_zero(true)
            .with_center_baseline(Layout::Vertical),
    );
    let (mut engine, _) = engine(config, abc());
    engine.render(0.0);
    assert_eq!(engine.scales().unwrap().value.domain(), (-10.0, 10.0));
    assert_rect_close(rect_of(&engine, "a"), Rect::new(25.0, 75.0, 125.0, 225.0));
    assert_rect_close(rect_of(&engine, "b"), Rect::new(150.0, 0.0, 250.0, 300.0));

    engine.set_data(vec![row("a", -5.0), row("b", 20.0)]);
    engine.render(10.0);
    assert_eq!(engine.scales().unwrap().value.domain(), (-5.0, 20.0));
}
