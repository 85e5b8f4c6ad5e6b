// Copyright 2025 the Barstack Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Frame-driven enter/update/exit transitions with a single settled callback per pass.
//!
//! The coordinator never reads a clock: [`TransitionCoordinator::apply_and_notify`] and
//! [`TransitionCoordinator::tick`] both take the current time in milliseconds.
//!
//! Guarantees:
//! - a pass with an immediate [`Timing`] (or nothing to animate) has settled, and its callback has
//!   run, before `apply_and_notify` returns;
//! - otherwise the callback runs exactly once, from the first `tick` at or after the pass's end;
//! - starting a new pass interrupts every in-flight tween at its current sampled value and drops
//!   the superseded pass's callback.

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::fmt;

use hashbrown::HashMap;
use kurbo::Rect;

#[cfg(not(feature = "std"))]
use crate::float::FloatExt;

use crate::key::Identity;
use crate::log::debug;
use crate::reconcile::{Bound, Exiting, RenderSet};

/// Easing curves shared by all tweens of a pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Easing {
    /// Constant speed.
    Linear,
    /// Circular ease-in: slow start, fast finish.
    #[default]
    CircleIn,
    /// Cubic ease-in-out.
    CubicInOut,
}

impl Easing {
    /// Maps normalized time `t` in `[0, 1]` to eased progress.
    pub fn apply(self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Self::Linear => t,
            Self::CircleIn => 1.0 - (1.0 - t * t).sqrt(),
            Self::CubicInOut => {
                let t2 = t * 2.0;
                if t2 <= 1.0 {
                    t2 * t2 * t2 / 2.0
                } else {
                    let u = t2 - 2.0;
                    (u * u * u + 2.0) / 2.0
                }
            }
        }
    }
}

/// Duration and easing for one pass.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Timing {
    /// Duration in milliseconds.
    pub duration: f64,
    /// Easing applied to every tween of the pass.
    pub easing: Easing,
}

impl Timing {
    /// Timing that applies everything synchronously.
    pub const IMMEDIATE: Self = Self {
        duration: 0.0,
        easing: Easing::Linear,
    };

    /// Creates a timing with the default easing.
    pub fn new(duration: f64) -> Self {
        Self {
            duration,
            easing: Easing::default(),
        }
    }

    /// Sets the easing.
    pub fn with_easing(mut self, easing: Easing) -> Self {
        self.easing = easing;
        self
    }

    /// Returns `true` if the duration is zero, negative or not finite.
    pub fn is_immediate(&self) -> bool {
        !(self.duration.is_finite() && self.duration > 0.0)
    }
}

/// The animated attributes of one element.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Visual {
    /// Bounds in chart coordinates.
    pub rect: Rect,
    /// Opacity in `[0, 1]`.
    pub opacity: f64,
}

impl Visual {
    /// Creates a visual.
    pub fn new(rect: Rect, opacity: f64) -> Self {
        Self { rect, opacity }
    }

    /// Linear interpolation towards `other`.
    pub fn lerp(&self, other: &Self, t: f64) -> Self {
        let mix = |a: f64, b: f64| a + (b - a) * t;
        Self {
            rect: Rect::new(
                mix(self.rect.x0, other.rect.x0),
                mix(self.rect.y0, other.rect.y0),
                mix(self.rect.x1, other.rect.x1),
                mix(self.rect.y1, other.rect.y1),
            ),
            opacity: mix(self.opacity, other.opacity),
        }
    }
}

/// Which set an element belongs to in the current pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    /// Newly created.
    Enter,
    /// Matched to a prior element.
    Update,
    /// Animating out before destruction.
    Exit,
}

/// Supplies initial and target visuals for each set of a pass.
pub trait AttributeTargets<T> {
    /// Returns `(initial, target)` for a newly created element.
    fn entering(&self, item: &Bound<T>) -> (Visual, Visual);
    /// Returns the target for a matched element.
    fn updating(&self, item: &Bound<T>) -> Visual;
    /// Returns the final visual of an exiting element, given its current visual if known.
    fn exiting(&self, item: &Exiting, current: Option<Visual>) -> Visual;
}

/// Identifies one `apply_and_notify` call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PassId(u64);

impl PassId {
    /// Returns the raw pass counter.
    pub const fn get(self) -> u64 {
        self.0
    }
}

/// What a settled pass hands to its callback.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Settled {
    /// The pass that settled.
    pub pass: PassId,
    /// Identities whose exit finished; they are no longer tracked by the coordinator.
    pub removed: Vec<Identity>,
    /// Number of elements still tracked after removal.
    pub live: usize,
    /// Focus captured at pass start, if that element is still live.
    pub focus: Option<Identity>,
    /// Whether the focused element was removed by this pass.
    pub focus_lost: bool,
    /// Passes superseded since the previous settle.
    pub superseded: u32,
}

impl Settled {
    /// Invokes the settle collaborators in order: interaction refresh, counts, focus retention,
    /// then the completion notification.
    pub fn dispatch(&self, hooks: &mut dyn SettleHooks) {
        hooks.refresh_interaction(self);
        hooks.update_counts(self.live);
        hooks.retain_focus(self.focus, self.focus_lost);
        hooks.transitions_complete(self.pass);
    }
}

/// Collaborators notified once a pass has settled.
///
/// All methods default to doing nothing.
pub trait SettleHooks {
    /// Re-evaluates interaction/highlight state against the settled elements.
    fn refresh_interaction(&mut self, _settled: &Settled) {}
    /// Receives the number of live elements after exits were destroyed.
    fn update_counts(&mut self, _live: usize) {}
    /// Reasserts focus on the element that held it before the pass.
    fn retain_focus(&mut self, _focus: Option<Identity>, _lost: bool) {}
    /// Emitted last.
    fn transitions_complete(&mut self, _pass: PassId) {}
}

/// Result of advancing the coordinator to a point in time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameStatus {
    /// Nothing is animating and nothing is waiting to settle.
    Idle,
    /// Tweens are still in flight.
    Running,
    /// The given pass settled during this tick.
    Settled(PassId),
}

#[derive(Clone, Copy, Debug)]
struct Tween {
    from: Visual,
    to: Visual,
    start: f64,
    duration: f64,
    easing: Easing,
}

impl Tween {
    fn sample(&self, now: f64) -> Visual {
        let t = if self.duration > 0.0 {
            (now - self.start) / self.duration
        } else {
            1.0
        };
        self.from.lerp(&self.to, self.easing.apply(t))
    }
}

type SettleCallback = Box<dyn FnOnce(&Settled)>;

struct PendingSettle {
    pass: PassId,
    end: f64,
    removed: Vec<Identity>,
    focus: Option<Identity>,
    on_settled: SettleCallback,
}

impl fmt::Debug for PendingSettle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingSettle")
            .field("pass", &self.pass)
            .field("end", &self.end)
            .field("removed", &self.removed)
            .field("focus", &self.focus)
            .field("on_settled", &"<fn>")
            .finish()
    }
}

/// Sequences enter/update/exit attribute changes and reports one settle per pass.
#[derive(Debug, Default)]
pub struct TransitionCoordinator {
    current: HashMap<Identity, Visual>,
    phases: HashMap<Identity, Phase>,
    tweens: HashMap<Identity, Tween>,
    pending: Option<PendingSettle>,
    next_pass: u64,
    superseded: u32,
    focus: Option<Identity>,
}

impl TransitionCoordinator {
    /// Creates an idle coordinator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the element that currently holds focus.
    ///
    /// The value is captured when a pass starts and reported back when it settles.
    pub fn set_focus(&mut self, focus: Option<Identity>) {
        self.focus = focus;
    }

    /// Applies a render set and arranges for `on_settled` to run exactly once.
    ///
    /// Any in-flight tween is interrupted at its value at `now` and becomes the starting point of
    /// the new tween for that element.
    pub fn apply_and_notify<T, A>(
        &mut self,
        set: &RenderSet<T>,
        targets: &A,
        timing: Timing,
        now: f64,
        on_settled: impl FnOnce(&Settled) + 'static,
    ) -> PassId
    where
        A: AttributeTargets<T> + ?Sized,
    {
        let pass = PassId(self.next_pass);
        self.next_pass += 1;

        if self.pending.take().is_some() {
            debug!(pass = pass.get(), "interrupting in-flight transition");
            self.superseded += 1;
        }
        self.interrupt(now);

        let mut planned = Vec::with_capacity(
            set.entering.len() + set.updating.len() + set.exiting.len(),
        );
        for item in &set.entering {
            let (initial, target) = targets.entering(item);
            planned.push((item.identity, initial, target, Phase::Enter));
        }
        for item in &set.updating {
            let target = targets.updating(item);
            let from = self.current.get(&item.identity).copied().unwrap_or(target);
            planned.push((item.identity, from, target, Phase::Update));
        }
        for item in &set.exiting {
            let current = self.current.get(&item.identity).copied();
            let target = targets.exiting(item, current);
            planned.push((item.identity, current.unwrap_or(target), target, Phase::Exit));
        }

        let immediate = timing.is_immediate();
        for (id, from, to, phase) in planned {
            self.phases.insert(id, phase);
            if immediate || from == to {
                self.current.insert(id, to);
                continue;
            }
            self.current.insert(id, from);
            self.tweens.insert(
                id,
                Tween {
                    from,
                    to,
                    start: now,
                    duration: timing.duration,
                    easing: timing.easing,
                },
            );
        }

        let pending = PendingSettle {
            pass,
            end: now + if immediate { 0.0 } else { timing.duration },
            removed: set.exiting.iter().map(|e| e.identity).collect(),
            focus: self.focus,
            on_settled: Box::new(on_settled),
        };
        if self.tweens.is_empty() {
            self.settle(pending);
        } else {
            self.pending = Some(pending);
        }
        pass
    }

    /// Advances to `now`, settling the pending pass if its tweens have all finished.
    pub fn tick(&mut self, now: f64) -> FrameStatus {
        match self.pending.take() {
            Some(pending) if now >= pending.end => {
                let pass = pending.pass;
                self.settle(pending);
                FrameStatus::Settled(pass)
            }
            Some(pending) => {
                self.pending = Some(pending);
                FrameStatus::Running
            }
            None if self.tweens.is_empty() => FrameStatus::Idle,
            None => FrameStatus::Running,
        }
    }

    /// Returns the visual of `id` at time `now`.
    pub fn visual_at(&self, id: Identity, now: f64) -> Option<Visual> {
        match self.tweens.get(&id) {
            Some(tween) => Some(tween.sample(now)),
            None => self.current.get(&id).copied(),
        }
    }

    /// Returns the final visual of `id` once the current pass settles.
    pub fn target(&self, id: Identity) -> Option<Visual> {
        match self.tweens.get(&id) {
            Some(tween) => Some(tween.to),
            None => self.current.get(&id).copied(),
        }
    }

    /// Returns the phase `id` was given by the latest pass.
    pub fn phase(&self, id: Identity) -> Option<Phase> {
        self.phases.get(&id).copied()
    }

    /// Returns `true` while a pass is waiting to settle.
    pub fn is_animating(&self) -> bool {
        self.pending.is_some()
    }

    /// Number of elements the coordinator tracks.
    pub fn len(&self) -> usize {
        self.current.len()
    }

    /// Returns `true` if no elements are tracked.
    pub fn is_empty(&self) -> bool {
        self.current.is_empty()
    }

    fn interrupt(&mut self, now: f64) {
        for (id, tween) in self.tweens.drain() {
            self.current.insert(id, tween.sample(now));
        }
    }

    fn settle(&mut self, pending: PendingSettle) {
        for (id, tween) in self.tweens.drain() {
            self.current.insert(id, tween.to);
        }
        for id in &pending.removed {
            self.current.remove(id);
            self.phases.remove(id);
        }
        let focus_lost = pending
            .focus
            .is_some_and(|f| pending.removed.contains(&f));
        let settled = Settled {
            pass: pending.pass,
            removed: pending.removed,
            live: self.current.len(),
            focus: if focus_lost { None } else { pending.focus },
            focus_lost,
            superseded: core::mem::take(&mut self.superseded),
        };
        (pending.on_settled)(&settled);
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use alloc::rc::Rc;
    use alloc::vec;
    use core::cell::{Cell, RefCell};

    use super::*;
    use crate::key::JoinKey;
    use crate::reconcile::Reconciler;

    struct Grow;

    impl AttributeTargets<f64> for Grow {
        fn entering(&self, item: &Bound<f64>) -> (Visual, Visual) {
            let target = self.updating(item);
            (Visual::new(Rect::new(0.0, 0.0, 10.0, 0.0), 0.0), target)
        }

        fn updating(&self, item: &Bound<f64>) -> Visual {
            Visual::new(Rect::new(0.0, 0.0, 10.0, item.datum), 1.0)
        }

        fn exiting(&self, _item: &Exiting, current: Option<Visual>) -> Visual {
            let rect = current.map_or(Rect::ZERO, |c| c.rect);
            Visual::new(rect, 0.0)
        }
    }

    fn pass(r: &mut Reconciler, rows: &[(&'static str, f64)]) -> RenderSet<f64> {
        r.reconcile(rows.iter().copied(), |(k, _)| JoinKey::from(*k))
            .map_data()
    }

    trait MapData {
        fn map_data(self) -> RenderSet<f64>;
    }

    impl MapData for RenderSet<(&'static str, f64)> {
        fn map_data(self) -> RenderSet<f64> {
            let map = |b: Bound<(&'static str, f64)>| Bound {
                identity: b.identity,
                key: b.key,
                datum: b.datum.1,
            };
            RenderSet {
                entering: self.entering.into_iter().map(map).collect(),
                updating: self.updating.into_iter().map(map).collect(),
                exiting: self.exiting,
                order: self.order,
                duplicates: self.duplicates,
            }
        }
    }

    fn counter() -> (Rc<Cell<u32>>, impl FnOnce(&Settled) + 'static) {
        let calls = Rc::new(Cell::new(0));
        let c = calls.clone();
        (calls, move |_: &Settled| c.set(c.get() + 1))
    }

    #[test]
    fn circle_in_endpoints() {
        assert_eq!(Easing::CircleIn.apply(0.0), 0.0);
        assert!((Easing::CircleIn.apply(1.0) - 1.0).abs() < 1e-12);
        assert!(Easing::CircleIn.apply(0.5) < 0.5, "ease-in starts slow");
        assert!((Easing::CubicInOut.apply(0.5) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn zero_duration_settles_before_returning() {
        let mut r = Reconciler::new();
        let mut tc = TransitionCoordinator::new();
        let set = pass(&mut r, &[("a", 5.0), ("b", 7.0)]);
        let (calls, cb) = counter();
        tc.apply_and_notify(&set, &Grow, Timing::IMMEDIATE, 0.0, cb);
        assert_eq!(calls.get(), 1);
        assert!(!tc.is_animating());
        let a = set.entering[0].identity;
        assert_eq!(tc.visual_at(a, 0.0).unwrap().rect.y1, 5.0);
    }

    #[test]
    fn settles_once_after_the_longest_set() {
        let mut r = Reconciler::new();
        let mut tc = TransitionCoordinator::new();
        let first = pass(&mut r, &[("a", 5.0)]);
        tc.apply_and_notify(&first, &Grow, Timing::IMMEDIATE, 0.0, |_| {});

        let second = pass(&mut r, &[("a", 8.0), ("b", 2.0)]);
        assert!(second.exiting.is_empty());
        let (calls, cb) = counter();
        tc.apply_and_notify(&second, &Grow, Timing::new(100.0), 0.0, cb);
        assert_eq!(calls.get(), 0, "must not fire before motion ends");
        assert_eq!(tc.tick(50.0), FrameStatus::Running);
        assert_eq!(calls.get(), 0);
        assert!(matches!(tc.tick(100.0), FrameStatus::Settled(_)));
        assert_eq!(calls.get(), 1);
        assert_eq!(tc.tick(200.0), FrameStatus::Idle);
        assert_eq!(calls.get(), 1, "callback fires exactly once");
    }

    #[test]
    fn exits_are_removed_before_the_callback() {
        let mut r = Reconciler::new();
        let mut tc = TransitionCoordinator::new();
        let first = pass(&mut r, &[("a", 5.0), ("b", 3.0)]);
        tc.apply_and_notify(&first, &Grow, Timing::IMMEDIATE, 0.0, |_| {});

        let second = pass(&mut r, &[("a", 5.0)]);
        let b = second.exiting[0].identity;
        let seen = Rc::new(RefCell::new(None));
        let s = seen.clone();
        tc.apply_and_notify(&second, &Grow, Timing::new(10.0), 0.0, move |settled| {
            *s.borrow_mut() = Some(settled.clone());
        });
        assert_eq!(tc.phase(b), Some(Phase::Exit));
        assert!(tc.visual_at(b, 5.0).is_some(), "exiting element still visible");
        tc.tick(10.0);
        let settled = seen.borrow().clone().unwrap();
        assert_eq!(settled.removed, vec![b]);
        assert_eq!(settled.live, 1);
        assert!(tc.visual_at(b, 10.0).is_none());
    }

    #[test]
    fn nothing_to_animate_settles_synchronously() {
        let mut r = Reconciler::new();
        let mut tc = TransitionCoordinator::new();
        let set = pass(&mut r, &[]);
        let (calls, cb) = counter();
        tc.apply_and_notify(&set, &Grow, Timing::new(750.0), 0.0, cb);
        assert_eq!(calls.get(), 1);

        let first = pass(&mut r, &[("a", 1.0)]);
        tc.apply_and_notify(&first, &Grow, Timing::IMMEDIATE, 0.0, |_| {});
        let same = pass(&mut r, &[("a", 1.0)]);
        let (calls, cb) = counter();
        tc.apply_and_notify(&same, &Grow, Timing::new(750.0), 0.0, cb);
        assert_eq!(calls.get(), 1, "unchanged targets do not wait");
    }

    #[test]
    fn new_pass_interrupts_and_drops_superseded_callback() {
        let mut r = Reconciler::new();
        let mut tc = TransitionCoordinator::new();
        let first = pass(&mut r, &[("a", 0.0)]);
        tc.apply_and_notify(&first, &Grow, Timing::IMMEDIATE, 0.0, |_| {});
        let a = first.entering[0].identity;

        let grow = pass(&mut r, &[("a", 100.0)]);
        let (stale, cb) = counter();
        tc.apply_and_notify(&grow, &Grow, Timing::new(100.0).with_easing(Easing::Linear), 0.0, cb);
        let mid = tc.visual_at(a, 50.0).unwrap().rect.y1;
        assert!((mid - 50.0).abs() < 1e-9);

        let shrink = pass(&mut r, &[("a", 10.0)]);
        let seen = Rc::new(Cell::new(0_u32));
        let s = seen.clone();
        tc.apply_and_notify(
            &shrink,
            &Grow,
            Timing::new(100.0).with_easing(Easing::Linear),
            50.0,
            move |settled| s.set(settled.superseded),
        );
        let restart = tc.visual_at(a, 50.0).unwrap().rect.y1;
        assert!((restart - 50.0).abs() < 1e-9, "resumes from the sampled value");
        tc.tick(150.0);
        assert_eq!(stale.get(), 0, "superseded callback never runs");
        assert_eq!(seen.get(), 1);
        assert_eq!(tc.target(a).unwrap().rect.y1, 10.0);
    }

    #[test]
    fn focus_is_reported_and_lost_on_removal() {
        let mut r = Reconciler::new();
        let mut tc = TransitionCoordinator::new();
        let first = pass(&mut r, &[("a", 1.0), ("b", 2.0)]);
        tc.apply_and_notify(&first, &Grow, Timing::IMMEDIATE, 0.0, |_| {});
        let b = first.entering[1].identity;
        tc.set_focus(Some(b));

        let second = pass(&mut r, &[("a", 1.0)]);
        let seen = Rc::new(RefCell::new(None));
        let s = seen.clone();
        tc.apply_and_notify(&second, &Grow, Timing::IMMEDIATE, 0.0, move |settled| {
            *s.borrow_mut() = Some((settled.focus, settled.focus_lost));
        });
        assert_eq!(*seen.borrow(), Some((None, true)));
    }

    #[test]
    fn dispatch_runs_hooks_in_order() {
        #[derive(Default)]
        struct Log(Vec<&'static str>);

        impl SettleHooks for Log {
            fn refresh_interaction(&mut self, _settled: &Settled) {
                self.0.push("interaction");
            }
            fn update_counts(&mut self, _live: usize) {
                self.0.push("counts");
            }
            fn retain_focus(&mut self, _focus: Option<Identity>, _lost: bool) {
                self.0.push("focus");
            }
            fn transitions_complete(&mut self, _pass: PassId) {
                self.0.push("complete");
            }
        }

        let settled = Settled {
            pass: PassId(0),
            removed: Vec::new(),
            live: 0,
            focus: None,
            focus_lost: false,
            superseded: 0,
        };
        let mut log = Log::default();
        settled.dispatch(&mut log);
        assert_eq!(log.0, vec!["interaction", "counts", "focus", "complete"]);
    }
}
