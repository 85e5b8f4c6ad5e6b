// Copyright 2025 the Barstack Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The render-pass orchestrator.
//!
//! [`BarLayoutEngine`] owns the rows, the configuration and all state carried between passes.
//! Setters only mark dirty bits; [`BarLayoutEngine::render`] walks a fixed step table:
//!
//! | step             | runs on                              | marks      |
//! |------------------|--------------------------------------|------------|
//! | `prepare_data`   | data                                 | geometry   |
//! | `prepare_scales` | data, size, scale options            | geometry   |
//! | `reconcile`      | geometry                             |            |
//! | `draw`           | geometry                             | labels     |
//! | `place_labels`   | labels, label visibility             |            |
//!
//! The layout of the previous pass is kept as the interpolation source and swapped out once the
//! pass has been computed.

use alloc::boxed::Box;
use alloc::rc::Rc;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::cell::RefCell;
use core::fmt;

use barstack_core::{
    AttributeTargets, Bound, Dirty, ElementState, Exiting, FrameStatus, Identity, JoinKey, PassId,
    Phase, Reconciler, RenderSet, Row, SettleHooks, Settled, Step, TransitionCoordinator, Visual,
    run_steps,
};
use barstack_transforms::{StackOffset, StackOutput, StackSnapshot, group_rows, stack};
use hashbrown::{HashMap, HashSet};
use kurbo::Rect;

use crate::bitmap::OccupancyBitmap;
use crate::config::{AnimationConfig, EngineConfig, Layout, Size, validate_size};
use crate::error::ConfigError;
use crate::geometry::{bar_rect, collapse_ordinal, collapse_value, plain_span};
use crate::label::{
    Anchor, BoundsScope, CollisionMode, LabelCandidate, LabelLayer, LabelPlacement, LabelPosition,
    LabelRequest, LabelUpdate, Obstacle, PlacementOptions,
};
use crate::log::debug;
use crate::measure::{HeuristicTextMeasurer, TextMeasurer, label_height, text_fits};
use crate::scale::{ScaleManager, ScaleOptions, Scales, natural_extent};

const DATA: Dirty = Dirty::bit(0);
const SIZE: Dirty = Dirty::bit(1);
const SCALE_OPTIONS: Dirty = Dirty::bit(2);
const LABEL_VISIBILITY: Dirty = Dirty::bit(3);
const GEOMETRY: Dirty = Dirty::bit(4);
const LABELS: Dirty = Dirty::bit(5);

/// Offset of a stacked group's total label from the end of its positive stack.
const TOTAL_OFFSET: f64 = 4.0;

const STEPS: [Step<BarLayoutEngine>; 5] = [
    Step {
        name: "prepare_data",
        triggers: DATA,
        marks: GEOMETRY,
        run: prepare_data,
    },
    Step {
        name: "prepare_scales",
        triggers: DATA.union(SIZE).union(SCALE_OPTIONS),
        marks: GEOMETRY,
        run: prepare_scales,
    },
    Step {
        name: "reconcile",
        triggers: GEOMETRY,
        marks: Dirty::NONE,
        run: reconcile,
    },
    Step {
        name: "draw",
        triggers: GEOMETRY,
        marks: LABELS,
        run: draw,
    },
    Step {
        name: "place_labels",
        triggers: LABELS.union(LABEL_VISIBILITY),
        marks: Dirty::NONE,
        run: place_labels,
    },
];

/// The engine's working copy of one row.
#[derive(Clone, Debug, PartialEq)]
pub struct Datum {
    /// Join key.
    pub key: JoinKey,
    /// Band category: the ordinal for plain bars, the group for stacked ones.
    pub category: Arc<str>,
    /// Ordinal key.
    pub ordinal: Arc<str>,
    /// Group key (stacked layouts only).
    pub group: Option<Arc<str>>,
    /// Coerced value (`NaN` when missing or malformed).
    pub value: f64,
    /// Value-space span the bar covers.
    pub span: (f64, f64),
    /// Value-space position a stacked segment enters from.
    pub entering: Option<f64>,
    /// The source row.
    pub row: Row,
}

impl Datum {
    /// Returns `true` if the value is a finite number.
    pub fn is_valid(&self) -> bool {
        self.value.is_finite()
    }
}

/// Final layout of one element in a pass.
#[derive(Clone, Debug, PartialEq)]
pub struct DatumLayout {
    /// Join key.
    pub key: JoinKey,
    /// Element identity.
    pub identity: Identity,
    /// Set the element belongs to in this pass.
    pub phase: Phase,
    /// Target rectangle once the pass settles.
    pub rect: Rect,
    /// Band category.
    pub category: Arc<str>,
    /// Coerced value (`NaN` for exiting elements).
    pub value: f64,
}

/// Per-group totals of a stacked pass.
#[derive(Clone, Debug, PartialEq)]
pub struct GroupSum {
    /// Group key.
    pub key: Arc<str>,
    /// Positive running total.
    pub positive_sum: f64,
    /// Negative running total.
    pub negative_sum: f64,
    /// Signed total.
    pub sum: f64,
    /// Positive total only.
    pub sum_above_zero: f64,
}

/// Everything computed for one pass.
#[derive(Clone, Debug, PartialEq)]
pub struct LayoutSnapshot {
    /// Scales of the pass.
    pub scales: Scales,
    /// Stack state (stacked layouts only), used to place entering segments next pass.
    pub stack: Option<StackSnapshot>,
    /// Elements in draw order: exiting first, then bound elements in input order.
    pub data: Vec<DatumLayout>,
    /// Per-group totals (stacked layouts only).
    pub sums: Vec<GroupSum>,
}

impl LayoutSnapshot {
    /// Looks up an element by key.
    pub fn get(&self, key: &str) -> Option<&DatumLayout> {
        self.data.iter().find(|d| d.key.as_str() == key)
    }
}

/// What one [`BarLayoutEngine::render`] call did.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderReport {
    /// Transition pass started, if geometry was recomputed.
    pub pass: Option<PassId>,
    /// Names of the steps that ran, in order.
    pub steps: Vec<&'static str>,
    /// Keys that appeared more than once in the rows.
    pub duplicates: Vec<JoinKey>,
    /// Outcome of an incremental label update, when labels were not placed from scratch.
    pub labels: Option<LabelUpdate>,
}

#[derive(Default)]
struct Shared {
    reconciler: Reconciler,
    hooks: Option<Box<dyn SettleHooks>>,
    last_settled: Option<PassId>,
}

#[derive(Default)]
struct PassState {
    data: Vec<Datum>,
    stack: Option<StackOutput>,
    scales: Option<Scales>,
    set: Option<RenderSet<Datum>>,
    pass: Option<PassId>,
    duplicates: Vec<JoinKey>,
    labels: Option<LabelUpdate>,
}

/// Computes bar layouts pass by pass.
pub struct BarLayoutEngine {
    config: EngineConfig,
    rows: Vec<Row>,
    dirty: Dirty,
    measurer: Box<dyn TextMeasurer>,
    work: PassState,
    current: Option<LayoutSnapshot>,
    next: Option<LayoutSnapshot>,
    shared: Rc<RefCell<Shared>>,
    transitions: TransitionCoordinator,
    labels: LabelLayer,
    full_labels: bool,
    hidden_labels: HashSet<JoinKey>,
    focus: Option<JoinKey>,
    rendered: bool,
    now: f64,
}

impl fmt::Debug for BarLayoutEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BarLayoutEngine")
            .field("config", &self.config)
            .field("rows", &self.rows.len())
            .field("dirty", &self.dirty)
            .field("current", &self.current)
            .field("transitions", &self.transitions)
            .field("labels", &self.labels)
            .field("hidden_labels", &self.hidden_labels)
            .field("focus", &self.focus)
            .field("rendered", &self.rendered)
            .finish_non_exhaustive()
    }
}

impl BarLayoutEngine {
    /// Creates an engine with no rows.
    pub fn new(config: EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            rows: Vec::new(),
            dirty: Dirty::ALL,
            measurer: Box::new(HeuristicTextMeasurer),
            work: PassState::default(),
            current: None,
            next: None,
            shared: Rc::new(RefCell::new(Shared::default())),
            transitions: TransitionCoordinator::new(),
            labels: LabelLayer::new(),
            full_labels: true,
            hidden_labels: HashSet::new(),
            focus: None,
            rendered: false,
            now: 0.0,
        })
    }

    /// Replaces the text measurer.
    pub fn with_measurer(mut self, measurer: impl TextMeasurer + 'static) -> Self {
        self.measurer = Box::new(measurer);
        self.full_labels = true;
        self.dirty |= LABELS;
        self
    }

    /// Replaces the rows.
    pub fn set_data(&mut self, rows: Vec<Row>) {
        self.rows = rows;
        self.dirty |= DATA;
    }

    /// Resizes the plot.
    pub fn set_size(&mut self, size: Size) -> Result<(), ConfigError> {
        validate_size(size)?;
        if size != self.config.size {
            self.config.size = size;
            self.dirty |= SIZE;
        }
        Ok(())
    }

    /// Replaces the scale options.
    pub fn set_scale_options(&mut self, options: ScaleOptions) -> Result<(), ConfigError> {
        options.validate()?;
        if options != self.config.scale {
            self.config.scale = options;
            self.dirty |= SCALE_OPTIONS;
        }
        Ok(())
    }

    /// Replaces the animation settings. They apply from the next geometry pass.
    pub fn set_animation(&mut self, animation: AnimationConfig) -> Result<(), ConfigError> {
        if let Some(duration) = animation.duration {
            if !duration.is_finite() || duration < 0.0 {
                return Err(ConfigError::Duration(duration));
            }
        }
        self.config.animation = animation;
        Ok(())
    }

    /// Replaces the whole configuration, marking only what changed.
    pub fn set_config(&mut self, config: EngineConfig) -> Result<(), ConfigError> {
        config.validate()?;
        let old = &self.config;
        if config.accessors != old.accessors
            || config.layout != old.layout
            || config.stack != old.stack
        {
            self.dirty |= DATA;
        }
        if config.size != old.size {
            self.dirty |= SIZE;
        }
        if config.scale != old.scale {
            self.dirty |= SCALE_OPTIONS;
        }
        self.dirty |= LABELS;
        self.full_labels = true;
        self.config = config;
        Ok(())
    }

    /// Installs the collaborators notified when a pass settles.
    pub fn set_hooks(&mut self, hooks: impl SettleHooks + 'static) {
        self.shared.borrow_mut().hooks = Some(Box::new(hooks));
    }

    /// Records which element holds focus, by key.
    pub fn set_focus(&mut self, key: Option<&str>) {
        self.focus = key.map(JoinKey::from);
    }

    /// Hides or shows the label of one element.
    ///
    /// Only label placement reruns, incrementally.
    pub fn set_label_hidden(&mut self, key: &str, hidden: bool) {
        let changed = if hidden {
            self.hidden_labels.insert(JoinKey::from(key))
        } else {
            self.hidden_labels.remove(key)
        };
        if changed {
            self.dirty |= LABEL_VISIBILITY;
        }
    }

    /// Runs every pending step. `now` is the current time in milliseconds.
    pub fn render(&mut self, now: f64) -> RenderReport {
        self.now = now;
        let dirty = core::mem::replace(&mut self.dirty, Dirty::NONE);
        self.work.pass = None;
        self.work.duplicates.clear();
        self.work.labels = None;
        let steps = run_steps(self, &STEPS, dirty);
        if let Some(next) = self.next.take() {
            self.current = Some(next);
        }
        RenderReport {
            pass: self.work.pass,
            steps,
            duplicates: core::mem::take(&mut self.work.duplicates),
            labels: self.work.labels.take(),
        }
    }

    /// Advances running transitions to `now`.
    pub fn tick(&mut self, now: f64) -> FrameStatus {
        self.now = now;
        self.transitions.tick(now)
    }

    /// Visual state of the element keyed `key` at `now`.
    pub fn visual_at(&self, key: &str, now: f64) -> Option<Visual> {
        let id = self.shared.borrow().reconciler.identity(key)?;
        self.transitions.visual_at(id, now)
    }

    /// Layout of the latest pass.
    pub fn layout(&self) -> Option<&LayoutSnapshot> {
        self.current.as_ref()
    }

    /// Scales of the latest pass.
    pub fn scales(&self) -> Option<&Scales> {
        self.current.as_ref().map(|s| &s.scales)
    }

    /// Per-group totals of the latest pass.
    pub fn group_sums(&self) -> &[GroupSum] {
        self.current.as_ref().map_or(&[], |s| &s.sums)
    }

    /// Data-label placements in draw order.
    pub fn labels(&self) -> impl Iterator<Item = &LabelPlacement> + '_ {
        self.labels.placements()
    }

    /// Placement of the label keyed `key`.
    pub fn label(&self, key: &str) -> Option<&LabelPlacement> {
        self.labels.placement(key)
    }

    /// Total-label placements, one per stacked group.
    pub fn totals(&self) -> &[LabelPlacement] {
        self.labels.totals()
    }

    /// Occupancy grid after the latest label placement.
    pub fn occupancy(&self) -> Option<&OccupancyBitmap> {
        self.labels.bitmap()
    }

    /// Lifecycle state of the element keyed `key`.
    pub fn state(&self, key: &str) -> Option<ElementState> {
        self.shared.borrow().reconciler.state(key)
    }

    /// Number of live (not exiting) elements.
    pub fn live_count(&self) -> usize {
        self.shared.borrow().reconciler.live_count()
    }

    /// The most recently settled pass.
    pub fn last_settled(&self) -> Option<PassId> {
        self.shared.borrow().last_settled
    }

    /// Returns `true` while a pass is waiting to settle.
    pub fn is_animating(&self) -> bool {
        self.transitions.is_animating()
    }

    /// The active configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}

fn prepare_data(e: &mut BarLayoutEngine) {
    let accessors = &e.config.accessors;
    if !e.config.is_stacked() {
        e.work.stack = None;
        e.work.data = e
            .rows
            .iter()
            .map(|row| {
                let ordinal = accessors.ordinal_key(row).unwrap_or_else(|| Arc::from(""));
                let value = accessors.value_of(row);
                Datum {
                    key: accessors.join_key(row),
                    category: ordinal.clone(),
                    ordinal,
                    group: None,
                    value,
                    span: plain_span(value, false),
                    entering: None,
                    row: row.clone(),
                }
            })
            .collect();
        return;
    }

    let groups = group_rows(&e.rows, accessors);
    let previous = e.current.as_ref().and_then(|s| s.stack.as_ref());
    let out = stack(&groups, accessors, &e.config.stack, previous);
    let offset = e.config.stack.offset;
    e.work.data = out
        .series
        .iter()
        .flat_map(|group| {
            group.rows.iter().map(move |r| Datum {
                key: accessors.join_key(&r.row),
                category: group.key.clone(),
                ordinal: r.ordinal.clone(),
                group: Some(group.key.clone()),
                value: r.value,
                span: group.span(r, offset),
                entering: group.entering_position(r, offset),
                row: r.row.clone(),
            })
        })
        .collect();
    e.work.stack = Some(out);
}

fn prepare_scales(e: &mut BarLayoutEngine) {
    let cfg = &e.config;
    let mut options = cfg.scale;
    let scales = match &e.work.stack {
        Some(out) => {
            options.center_baseline = None;
            ScaleManager::new(cfg.layout, options).build_from_extent(
                out.series.iter().map(|g| g.key.clone()),
                Some(out.extent),
                cfg.size,
            )
        }
        None => {
            // Duplicate keys resolve last-wins in the reconciler; only the survivor counts.
            let extent = {
                let mut values: HashMap<&str, f64> = HashMap::new();
                for d in &e.work.data {
                    values.insert(d.key.as_str(), d.value);
                }
                natural_extent(values.values().copied())
            };
            let centered = options.center_baseline == Some(cfg.layout)
                && extent.is_some_and(|(min, _)| min >= 0.0);
            for d in &mut e.work.data {
                d.span = plain_span(d.value, centered);
            }
            ScaleManager::new(cfg.layout, options).build_from_extent(
                e.work
                    .data
                    .iter()
                    .filter(|d| !d.category.is_empty())
                    .map(|d| d.category.clone()),
                extent,
                cfg.size,
            )
        }
    };
    debug!(
        bands = scales.band.count(),
        domain_min = scales.value.domain().0,
        domain_max = scales.value.domain().1,
        "scales rebuilt"
    );
    e.work.scales = Some(scales);
}

fn reconcile(e: &mut BarLayoutEngine) {
    let set = e
        .shared
        .borrow_mut()
        .reconciler
        .reconcile(e.work.data.iter().cloned(), |d: &Datum| d.key.clone());
    e.work.duplicates.clone_from(&set.duplicates);
    e.work.set = Some(set);
}

/// Enter/update/exit targets for bars.
struct BarTargets<'a> {
    scales: &'a Scales,
    previous: Option<&'a LayoutSnapshot>,
    stacked: bool,
}

impl BarTargets<'_> {
    fn rect(&self, d: &Datum) -> Rect {
        bar_rect(self.scales, &d.category, d.span)
    }

    fn band_extent(&self) -> f64 {
        self.scales.band.extent()
    }

    fn baseline_position(&self, scales: &Scales) -> f64 {
        scales.value.map(scales.value.baseline())
    }
}

impl AttributeTargets<Datum> for BarTargets<'_> {
    fn entering(&self, item: &Bound<Datum>) -> (Visual, Visual) {
        let rect = self.rect(&item.datum);
        let target = Visual::new(rect, 1.0);
        if self.stacked {
            let from = self.previous.map_or(self.scales, |p| &p.scales);
            let position = match item.datum.entering {
                Some(offset) => from.value.map(offset),
                None => self.baseline_position(from),
            };
            let layout = self.scales.layout;
            (Visual::new(collapse_value(rect, layout, position), 1.0), target)
        } else {
            let layout = self.scales.layout;
            (
                Visual::new(collapse_ordinal(rect, layout, self.band_extent()), 0.0),
                target,
            )
        }
    }

    fn updating(&self, item: &Bound<Datum>) -> Visual {
        Visual::new(self.rect(&item.datum), 1.0)
    }

    fn exiting(&self, item: &Exiting, current: Option<Visual>) -> Visual {
        let rect = current.map(|v| v.rect).or_else(|| {
            self.previous
                .and_then(|p| p.get(item.key.as_str()))
                .map(|d| d.rect)
        });
        let rect = rect.unwrap_or_default();
        let layout = self.scales.layout;
        let collapsed = if self.stacked {
            collapse_value(rect, layout, self.baseline_position(self.scales))
        } else {
            collapse_ordinal(rect, layout, self.band_extent())
        };
        Visual::new(collapsed, 0.0)
    }
}

fn draw(e: &mut BarLayoutEngine) {
    let (Some(set), Some(scales)) = (e.work.set.as_ref(), e.work.scales.as_ref()) else {
        return;
    };
    let focus = e
        .focus
        .as_ref()
        .and_then(|k| e.shared.borrow().reconciler.identity(k.as_str()));
    e.transitions.set_focus(focus);

    let targets = BarTargets {
        scales,
        previous: e.current.as_ref(),
        stacked: e.work.stack.is_some(),
    };
    let timing = e.config.animation.timing(!e.rendered);
    let shared = Rc::clone(&e.shared);
    let pass = e
        .transitions
        .apply_and_notify(set, &targets, timing, e.now, move |settled: &Settled| {
            let mut guard = shared.borrow_mut();
            let state = &mut *guard;
            state.reconciler.finish_exit(&settled.removed);
            debug!(
                pass = settled.pass.get(),
                superseded = settled.superseded,
                "pass settled"
            );
            if let Some(hooks) = state.hooks.as_mut() {
                settled.dispatch(hooks.as_mut());
            }
            state.last_settled = Some(settled.pass);
        });
    e.work.pass = Some(pass);
    e.rendered = true;
    e.full_labels = true;

    let mut bound: HashMap<Identity, DatumLayout> = HashMap::new();
    for (items, phase) in [(&set.entering, Phase::Enter), (&set.updating, Phase::Update)] {
        for item in items {
            bound.insert(
                item.identity,
                DatumLayout {
                    key: item.key.clone(),
                    identity: item.identity,
                    phase,
                    rect: targets.rect(&item.datum),
                    category: item.datum.category.clone(),
                    value: item.datum.value,
                },
            );
        }
    }
    for item in &set.exiting {
        let rect = e
            .transitions
            .target(item.identity)
            .map(|v| v.rect)
            .unwrap_or_default();
        bound.insert(
            item.identity,
            DatumLayout {
                key: item.key.clone(),
                identity: item.identity,
                phase: Phase::Exit,
                rect,
                category: Arc::from(""),
                value: f64::NAN,
            },
        );
    }
    let data = set.order.iter().filter_map(|id| bound.remove(id)).collect();

    let (stack_snapshot, sums) = match &e.work.stack {
        Some(out) => (
            Some(out.snapshot.clone()),
            out.series
                .iter()
                .map(|g| GroupSum {
                    key: g.key.clone(),
                    positive_sum: g.positive_sum,
                    negative_sum: g.negative_sum,
                    sum: g.sum,
                    sum_above_zero: g.sum_above_zero,
                })
                .collect(),
        ),
        None => (None, Vec::new()),
    };
    e.next = Some(LayoutSnapshot {
        scales: scales.clone(),
        stack: stack_snapshot,
        data,
        sums,
    });
}

/// Whether a fixed label fits beside its bar.
///
/// `Left` and `Bottom` labels sit on the bar, so they must fit inside it. Other positions only
/// need the band step across the ordinal axis.
fn has_room(
    text: Size,
    font_size: f64,
    bar: Rect,
    step: f64,
    layout: Layout,
    position: LabelPosition,
) -> bool {
    let bar = bar.abs();
    let (width, height) = match (position, layout) {
        (LabelPosition::Left | LabelPosition::Bottom, _) => (Some(bar.width()), Some(bar.height())),
        (_, Layout::Vertical) => (Some(step), None),
        (_, Layout::Horizontal) => (None, Some(step)),
    };
    text_fits(text, font_size, width, height)
}

fn place_labels(e: &mut BarLayoutEngine) {
    let Some(layout) = e.next.as_ref().or(e.current.as_ref()) else {
        return;
    };
    let cfg = &e.config;
    let labels = &cfg.labels;
    let stacked = cfg.is_stacked();
    let scales = &layout.scales;
    let baseline = scales.value.map(scales.value.baseline());
    let font_size = labels.font_size;
    let position = labels.resolved_position(cfg.layout);
    let check_room = labels.collision == CollisionMode::Fixed && !labels.show_small_labels;
    let step = scales.band.step();

    let mut requests = Vec::with_capacity(layout.data.len());
    let mut geometry = Vec::with_capacity(layout.data.len());
    for d in layout.data.iter().filter(|d| d.phase != Phase::Exit) {
        geometry.push(Obstacle::outline(d.rect));
        let valid = d.value.is_finite();
        let size = if valid {
            e.measurer.measure(&labels.text(d.value), font_size)
        } else {
            Size::default()
        };
        let eligible = labels.visible
            && valid
            && !e.hidden_labels.contains(d.key.as_str())
            && (!check_room || has_room(size, font_size, d.rect, step, cfg.layout, position));
        let (scope, flip) = if stacked || !valid {
            (BoundsScope::All, false)
        } else if d.value < 0.0 {
            (BoundsScope::Negative { baseline }, true)
        } else {
            (BoundsScope::Positive { baseline }, false)
        };
        requests.push(
            LabelRequest::new(d.key.clone(), d.rect, size)
                .with_eligible(eligible)
                .with_scope(scope)
                .with_flip(flip),
        );
    }

    let options = PlacementOptions::for_position(
        cfg.layout,
        position,
        labels.collision,
        label_height(font_size),
    );
    if e.full_labels {
        e.labels.place_all(&requests, &geometry, &options, cfg.size);
    } else {
        e.work.labels = Some(e.labels.update(&requests, &geometry, &options, cfg.size));
    }

    if stacked && labels.show_totals {
        let offset = cfg.stack.offset;
        let totals: Vec<LabelRequest> = layout
            .sums
            .iter()
            .map(|g| {
                let end = match offset {
                    StackOffset::Zero => g.sum_above_zero,
                    StackOffset::Normalize if g.sum == 0.0 || !g.sum.is_finite() => {
                        g.sum_above_zero
                    }
                    StackOffset::Normalize => g.sum_above_zero / g.sum,
                };
                let rect = bar_rect(scales, &g.key, (0.0, end));
                let size = e.measurer.measure(&labels.text(g.sum), font_size);
                LabelRequest::new(JoinKey::new(g.key.clone()), rect, size)
                    .with_eligible(g.sum.is_finite())
            })
            .collect();
        let anchor = match cfg.layout {
            Layout::Vertical => Anchor::Top,
            Layout::Horizontal => Anchor::Right,
        };
        e.labels.place_totals(
            &totals,
            LabelCandidate::new(anchor, TOTAL_OFFSET),
            cfg.layout,
            cfg.size,
        );
    }
    e.full_labels = false;
}
