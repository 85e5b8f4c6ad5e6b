// Copyright 2025 the Barstack Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Collision-aware label placement.
//!
//! Each label is tried against an ordered list of [`LabelCandidate`]s. A candidate names one of
//! nine anchors around the label's mark and a pixel offset:
//! - the anchor picks an edge or the centre of the mark on each axis,
//! - a positive offset pushes the label away from the mark, a negative offset pulls it inside,
//! - diagonal anchors scale the offset by `1/sqrt(2)`.
//!
//! The first candidate that stays on the grid and touches no occupied cell wins and is stamped
//! into the [`OccupancyBitmap`]; when none fits the label is hidden, never drawn overlapping.

use alloc::vec::Vec;

use barstack_core::JoinKey;
use hashbrown::HashMap;
use kurbo::{Point, Rect};
use smallvec::{SmallVec, smallvec};

use crate::bitmap::{OccupancyBitmap, StampStyle};
use crate::config::{Layout, Size};
use crate::log::debug;

const DIAGONAL_FACTOR: f64 = core::f64::consts::FRAC_1_SQRT_2;

/// Inset from a mark's far edge used by [`AnchorEdge::Bottom`].
pub const BOTTOM_INSET: f64 = 6.0;

/// One of nine positions around a mark.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Anchor {
    /// Above and left.
    TopLeft,
    /// Above.
    Top,
    /// Above and right.
    TopRight,
    /// Left.
    Left,
    /// Centred.
    Middle,
    /// Right.
    Right,
    /// Below and left.
    BottomLeft,
    /// Below.
    Bottom,
    /// Below and right.
    BottomRight,
}

impl Anchor {
    /// Direction as `(dx, dy)`, each in `-1..=1`. `dy = -1` is up.
    pub const fn direction(self) -> (i8, i8) {
        match self {
            Self::TopLeft => (-1, -1),
            Self::Top => (0, -1),
            Self::TopRight => (1, -1),
            Self::Left => (-1, 0),
            Self::Middle => (0, 0),
            Self::Right => (1, 0),
            Self::BottomLeft => (-1, 1),
            Self::Bottom => (0, 1),
            Self::BottomRight => (1, 1),
        }
    }

    const fn from_direction(dx: i8, dy: i8) -> Self {
        match (dx, dy) {
            (-1, -1) => Self::TopLeft,
            (0, -1) => Self::Top,
            (1, -1) => Self::TopRight,
            (-1, 0) => Self::Left,
            (1, 0) => Self::Right,
            (-1, 1) => Self::BottomLeft,
            (0, 1) => Self::Bottom,
            (1, 1) => Self::BottomRight,
            _ => Self::Middle,
        }
    }

    /// Mirrors the anchor across the value axis of `layout`.
    pub const fn mirrored(self, layout: Layout) -> Self {
        let (dx, dy) = self.direction();
        match layout {
            Layout::Vertical => Self::from_direction(dx, -dy),
            Layout::Horizontal => Self::from_direction(-dx, dy),
        }
    }
}

/// An anchor plus offset, tried in list order.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LabelCandidate {
    /// Anchor around the mark.
    pub anchor: Anchor,
    /// Offset in chart units. Negative values place the label inside the mark.
    pub offset: f64,
}

impl LabelCandidate {
    /// Creates a candidate.
    pub const fn new(anchor: Anchor, offset: f64) -> Self {
        Self { anchor, offset }
    }
}

/// Up to four candidates inline.
pub type Candidates = SmallVec<[LabelCandidate; 4]>;

/// Collision policy.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CollisionMode {
    /// Search every candidate; hide the label if none fits.
    #[default]
    Auto,
    /// Try only the first candidate; hide the label if it collides.
    HideOnly,
    /// Always use the first candidate, without collision tests.
    ///
    /// The engine still hides labels whose text has no room at their bar; see
    /// `LabelConfig::show_small_labels`.
    Fixed,
}

/// Where a label sits relative to its bar.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LabelPosition {
    /// Above the bar end (vertical layouts).
    Top,
    /// Centred in the bar.
    Middle,
    /// Near the bar's far edge (vertical layouts).
    Bottom,
    /// Near the bar start (horizontal layouts).
    Left,
    /// Beyond the bar end (horizontal layouts).
    Right,
}

impl LabelPosition {
    /// Mark edge the candidate offsets are measured from.
    pub fn edge(self) -> AnchorEdge {
        match self {
            Self::Top => AnchorEdge::Top,
            Self::Middle => AnchorEdge::Center,
            Self::Bottom => AnchorEdge::Bottom,
            Self::Left => AnchorEdge::Left,
            Self::Right => AnchorEdge::Right,
        }
    }
}

/// Collapses a mark's bounds before candidate offsets are applied.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AnchorEdge {
    /// The whole mark.
    #[default]
    Full,
    /// The top edge.
    Top,
    /// A line [`BOTTOM_INSET`] above the bottom edge.
    Bottom,
    /// The left edge.
    Left,
    /// The right edge.
    Right,
    /// The centre point.
    Center,
}

impl AnchorEdge {
    /// Mirrors the edge across the value axis of `layout`.
    pub fn mirrored(self, layout: Layout) -> Self {
        match (layout, self) {
            (Layout::Vertical, Self::Top) => Self::Bottom,
            (Layout::Vertical, Self::Bottom) => Self::Top,
            (Layout::Horizontal, Self::Left) => Self::Right,
            (Layout::Horizontal, Self::Right) => Self::Left,
            (_, other) => other,
        }
    }

    /// `[x0, xc, x1, y0, yc, y1]` of the collapsed bounds.
    fn bounds(self, mark: Rect) -> [f64; 6] {
        let m = mark.abs();
        let xc = (m.x0 + m.x1) / 2.0;
        let yc = (m.y0 + m.y1) / 2.0;
        match self {
            Self::Full => [m.x0, xc, m.x1, m.y0, yc, m.y1],
            Self::Top => [m.x0, xc, m.x1, m.y0, m.y0, m.y0],
            Self::Bottom => {
                let y = (m.y1 - BOTTOM_INSET).max(m.y0);
                [m.x0, xc, m.x1, y, y, y]
            }
            Self::Left => [m.x0, m.x0, m.x0, m.y0, yc, m.y1],
            Self::Right => [m.x1, m.x1, m.x1, m.y0, yc, m.y1],
            Self::Center => [xc, xc, xc, yc, yc, yc],
        }
    }
}

/// Restricts candidates to one side of the value baseline.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum BoundsScope {
    /// No restriction.
    #[default]
    All,
    /// Keep the label on the positive side of `baseline` (a range coordinate).
    Positive {
        /// Baseline position in chart coordinates.
        baseline: f64,
    },
    /// Keep the label on the negative side of `baseline` (a range coordinate).
    Negative {
        /// Baseline position in chart coordinates.
        baseline: f64,
    },
}

impl BoundsScope {
    /// Returns `true` if `rect` lies on the allowed side.
    ///
    /// Vertical values grow upward, so the positive side is above the baseline; horizontal values
    /// grow rightward.
    pub fn admits(self, rect: Rect, layout: Layout) -> bool {
        let r = rect.abs();
        match (self, layout) {
            (Self::All, _) => true,
            (Self::Positive { baseline }, Layout::Vertical) => r.y1 <= baseline,
            (Self::Negative { baseline }, Layout::Vertical) => r.y0 >= baseline,
            (Self::Positive { baseline }, Layout::Horizontal) => r.x0 >= baseline,
            (Self::Negative { baseline }, Layout::Horizontal) => r.x1 <= baseline,
        }
    }
}

/// Horizontal text alignment at [`Placed::point`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HAlign {
    /// Text starts at the point.
    Left,
    /// Text is centred on the point.
    Center,
    /// Text ends at the point.
    Right,
}

/// Vertical text alignment at [`Placed::point`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VAlign {
    /// Text hangs below the point.
    Top,
    /// Text is centred on the point.
    Middle,
    /// Text sits above the point.
    Bottom,
}

/// Geometry to keep labels away from.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Obstacle {
    /// Bounds in chart coordinates.
    pub rect: Rect,
    /// How it is stamped.
    pub style: StampStyle,
}

impl Obstacle {
    /// An outlined obstacle (labels may sit inside it).
    pub fn outline(rect: Rect) -> Self {
        Self {
            rect,
            style: StampStyle::Outline,
        }
    }

    /// A filled obstacle.
    pub fn filled(rect: Rect) -> Self {
        Self {
            rect,
            style: StampStyle::Filled,
        }
    }
}

/// A label to place.
#[derive(Clone, Debug, PartialEq)]
pub struct LabelRequest {
    /// Key of the datum (or group, for totals) the label belongs to.
    pub key: JoinKey,
    /// Bounds of the labelled mark.
    pub mark: Rect,
    /// Measured text extent.
    pub size: Size,
    /// Ineligible labels are hidden without a search.
    pub eligible: bool,
    /// Half-plane restriction.
    pub scope: BoundsScope,
    /// Mirror anchors and edge across the value axis (for bars growing the other way).
    pub flip: bool,
}

impl LabelRequest {
    /// Creates an eligible, unscoped request.
    pub fn new(key: JoinKey, mark: Rect, size: Size) -> Self {
        Self {
            key,
            mark,
            size,
            eligible: true,
            scope: BoundsScope::All,
            flip: false,
        }
    }

    /// Sets eligibility.
    pub fn with_eligible(mut self, eligible: bool) -> Self {
        self.eligible = eligible;
        self
    }

    /// Sets the half-plane restriction.
    pub fn with_scope(mut self, scope: BoundsScope) -> Self {
        self.scope = scope;
        self
    }

    /// Mirrors anchors across the value axis.
    pub fn with_flip(mut self, flip: bool) -> Self {
        self.flip = flip;
        self
    }
}

/// Settings shared by every label of a call.
#[derive(Clone, Debug, PartialEq)]
pub struct PlacementOptions {
    /// Orientation (for scopes and mirroring).
    pub layout: Layout,
    /// Collision policy.
    pub mode: CollisionMode,
    /// Mark edge offsets are measured from.
    pub edge: AnchorEdge,
    /// Candidates in priority order.
    pub candidates: Candidates,
}

impl PlacementOptions {
    /// Layout defaults for `position`, measured with `text_height`.
    pub fn for_position(
        layout: Layout,
        position: LabelPosition,
        mode: CollisionMode,
        text_height: f64,
    ) -> Self {
        let candidates = match mode {
            CollisionMode::HideOnly => hide_only_candidates(),
            CollisionMode::Auto | CollisionMode::Fixed => {
                default_candidates(layout, position, text_height)
            }
        };
        Self {
            layout,
            mode,
            edge: position.edge(),
            candidates,
        }
    }
}

/// Default candidate lists per layout and position.
///
/// Vertical: `Top` tries above the bar then just inside its top; `Middle`/`Bottom` try centred
/// then half a line higher. Horizontal: `Right` tries beyond the end then inside it; `Middle`
/// tries centred then to the right; `Left` tries just left then further right.
pub fn default_candidates(layout: Layout, position: LabelPosition, text_height: f64) -> Candidates {
    use Anchor::{Bottom, Left, Middle, Right, Top};
    match (layout, position) {
        (Layout::Vertical, LabelPosition::Top) => {
            smallvec![LabelCandidate::new(Top, 5.0), LabelCandidate::new(Bottom, 1.0)]
        }
        (Layout::Vertical, _) => smallvec![
            LabelCandidate::new(Middle, 1.0),
            LabelCandidate::new(Top, text_height / 2.0)
        ],
        (Layout::Horizontal, LabelPosition::Middle) => {
            smallvec![LabelCandidate::new(Middle, 1.0), LabelCandidate::new(Right, 15.0)]
        }
        (Layout::Horizontal, LabelPosition::Left) => {
            smallvec![LabelCandidate::new(Left, 4.0), LabelCandidate::new(Right, 20.0)]
        }
        (Layout::Horizontal, _) => {
            smallvec![LabelCandidate::new(Right, 4.0), LabelCandidate::new(Left, 8.0)]
        }
    }
}

/// The single candidate used in hide-only mode.
pub fn hide_only_candidates() -> Candidates {
    smallvec![LabelCandidate::new(Anchor::Middle, 1.0)]
}

/// A visible label's final geometry.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Placed {
    /// Winning candidate.
    pub candidate: LabelCandidate,
    /// Occupied bounds.
    pub rect: Rect,
    /// Text anchor point.
    pub point: Point,
    /// Horizontal alignment at `point`.
    pub align: HAlign,
    /// Vertical alignment at `point`.
    pub baseline: VAlign,
}

/// Placement result for one label.
#[derive(Clone, Debug, PartialEq)]
pub struct LabelPlacement {
    /// Key of the label.
    pub key: JoinKey,
    /// Geometry when visible, `None` when hidden.
    pub placed: Option<Placed>,
}

impl LabelPlacement {
    /// Returns `true` if the label is shown.
    pub fn is_visible(&self) -> bool {
        self.placed.is_some()
    }

    fn hidden(key: JoinKey) -> Self {
        Self { key, placed: None }
    }
}

fn pick(values: &[f64], d: i8) -> f64 {
    match d {
        -1 => values[0],
        0 => values[1],
        _ => values[2],
    }
}

fn candidate_geometry(bounds: &[f64; 6], size: Size, candidate: LabelCandidate) -> Placed {
    let (dx, dy) = candidate.anchor.direction();
    let inside: i8 = if candidate.offset < 0.0 { -1 } else { 1 };
    let factor = if dx != 0 && dy != 0 {
        DIAGONAL_FACTOR
    } else {
        1.0
    };
    let (fdx, fdy, fin) = (f64::from(dx), f64::from(dy), f64::from(inside));
    let (w, h) = (size.width, size.height);

    let yc = pick(&bounds[3..], dy) + fin * h * fdy / 2.0 + candidate.offset * fdy * factor;
    let x = pick(&bounds[..3], dx) + candidate.offset * fdx * factor;
    let xc = x + fin * w * fdx / 2.0;
    let rect = Rect::new(xc - w / 2.0, yc - h / 2.0, xc + w / 2.0, yc + h / 2.0);

    let sx = dx * inside;
    let sy = dy * inside;
    let point = Point::new(
        match sx {
            0 => xc,
            s if s < 0 => rect.x1,
            _ => rect.x0,
        },
        match sy {
            0 => yc,
            s if s < 0 => rect.y1,
            _ => rect.y0,
        },
    );
    let align = match sx {
        -1 => HAlign::Right,
        0 => HAlign::Center,
        _ => HAlign::Left,
    };
    let baseline = match sy {
        -1 => VAlign::Bottom,
        0 => VAlign::Middle,
        _ => VAlign::Top,
    };
    Placed {
        candidate,
        rect,
        point,
        align,
        baseline,
    }
}

/// Searches one label against `bitmap`, stamping the winner.
fn place_one(
    request: &LabelRequest,
    options: &PlacementOptions,
    bitmap: &mut OccupancyBitmap,
) -> Option<Placed> {
    if !request.eligible {
        return None;
    }
    let layout = options.layout;
    let (edge, flip) = if request.flip {
        (options.edge.mirrored(layout), true)
    } else {
        (options.edge, false)
    };
    let bounds = edge.bounds(request.mark);
    let limit = match options.mode {
        CollisionMode::HideOnly => 1,
        CollisionMode::Auto | CollisionMode::Fixed => options.candidates.len(),
    };
    let admitted: SmallVec<[Placed; 4]> = options
        .candidates
        .iter()
        .take(limit)
        .map(|c| {
            let anchor = if flip {
                c.anchor.mirrored(layout)
            } else {
                c.anchor
            };
            candidate_geometry(&bounds, request.size, LabelCandidate::new(anchor, c.offset))
        })
        .filter(|p| request.scope.admits(p.rect, layout))
        .collect();

    if options.mode == CollisionMode::Fixed {
        let placed = admitted.into_iter().next()?;
        bitmap.stamp(placed.rect, StampStyle::Filled);
        return Some(placed);
    }
    if !bitmap.overlaps_bounds(request.mark) {
        debug!(key = request.key.as_str(), "mark outside the plot; label hidden");
        return None;
    }
    for placed in admitted {
        if !bitmap.out_of_bounds(placed.rect) && !bitmap.collides(placed.rect) {
            bitmap.stamp(placed.rect, StampStyle::Filled);
            return Some(placed);
        }
    }
    debug!(key = request.key.as_str(), "no free candidate; label hidden");
    None
}

/// Places `labels` in order.
///
/// `geometry` is stamped into `bitmap` (or a fresh grid of `bounds`) before the search. Returns
/// the placements, in input order, and the updated grid.
pub fn place_labels(
    labels: &[LabelRequest],
    geometry: &[Obstacle],
    options: &PlacementOptions,
    bitmap: Option<OccupancyBitmap>,
    bounds: Size,
) -> (Vec<LabelPlacement>, OccupancyBitmap) {
    let mut bitmap = bitmap.unwrap_or_else(|| OccupancyBitmap::new(bounds.width, bounds.height));
    for obstacle in geometry {
        bitmap.stamp(obstacle.rect, obstacle.style);
    }
    let placements = labels
        .iter()
        .map(|request| LabelPlacement {
            key: request.key.clone(),
            placed: place_one(request, options, &mut bitmap),
        })
        .collect();
    (placements, bitmap)
}

/// Counts reported by [`LabelLayer::update`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LabelUpdate {
    /// Labels whose placement was kept as is.
    pub kept: usize,
    /// Labels searched because they became eligible.
    pub searched: usize,
    /// Visible labels un-stamped because they were removed or became ineligible.
    pub cleared: usize,
}

#[derive(Clone, Debug, PartialEq)]
struct Entry {
    eligible: bool,
    placement: LabelPlacement,
}

/// Placement state carried between passes.
///
/// [`LabelLayer::place_all`] starts from a fresh grid. [`LabelLayer::update`] reuses the grid:
/// removed labels are un-stamped first, then only labels that became eligible are searched.
#[derive(Clone, Debug, Default)]
pub struct LabelLayer {
    bitmap: Option<OccupancyBitmap>,
    entries: Vec<Entry>,
    index: HashMap<JoinKey, usize>,
    totals: Vec<LabelPlacement>,
}

impl LabelLayer {
    /// Creates an empty layer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Places every label against a fresh grid holding `geometry`.
    pub fn place_all(
        &mut self,
        labels: &[LabelRequest],
        geometry: &[Obstacle],
        options: &PlacementOptions,
        bounds: Size,
    ) {
        let (placements, bitmap) = place_labels(labels, geometry, options, None, bounds);
        self.bitmap = Some(bitmap);
        self.totals.clear();
        self.set_entries(
            labels
                .iter()
                .zip(placements)
                .map(|(request, placement)| Entry {
                    eligible: request.eligible,
                    placement,
                })
                .collect(),
        );
    }

    /// Re-evaluates only labels whose eligibility changed.
    ///
    /// Removed labels are un-stamped, then `geometry` is stamped into the kept grid before newly
    /// eligible labels are searched. Falls back to [`LabelLayer::place_all`] when there is no grid yet. Total labels are cleared;
    /// place them again with [`LabelLayer::place_totals`].
    pub fn update(
        &mut self,
        labels: &[LabelRequest],
        geometry: &[Obstacle],
        options: &PlacementOptions,
        bounds: Size,
    ) -> LabelUpdate {
        let Some(mut bitmap) = self.bitmap.take() else {
            self.place_all(labels, geometry, options, bounds);
            return LabelUpdate {
                searched: labels.iter().filter(|l| l.eligible).count(),
                ..LabelUpdate::default()
            };
        };
        let mut report = LabelUpdate::default();

        for total in self.totals.drain(..) {
            if let Some(placed) = total.placed {
                bitmap.unstamp(placed.rect);
            }
        }

        let incoming: HashMap<&JoinKey, bool> =
            labels.iter().map(|l| (&l.key, l.eligible)).collect();
        let mut previous: HashMap<JoinKey, Entry> = HashMap::new();
        for entry in self.entries.drain(..) {
            let still_eligible = incoming.get(&entry.placement.key).copied().unwrap_or(false);
            if !still_eligible {
                if let Some(placed) = entry.placement.placed {
                    bitmap.unstamp(placed.rect);
                    report.cleared += 1;
                }
            }
            previous.insert(entry.placement.key.clone(), entry);
        }
        // Un-stamping may have cleared cells under current geometry.
        for obstacle in geometry {
            bitmap.stamp(obstacle.rect, obstacle.style);
        }

        let mut entries = Vec::with_capacity(labels.len());
        for request in labels {
            match previous.remove(&request.key) {
                Some(old) if old.eligible == request.eligible => {
                    report.kept += 1;
                    entries.push(old);
                }
                _ if request.eligible => {
                    report.searched += 1;
                    entries.push(Entry {
                        eligible: true,
                        placement: LabelPlacement {
                            key: request.key.clone(),
                            placed: place_one(request, options, &mut bitmap),
                        },
                    });
                }
                _ => entries.push(Entry {
                    eligible: false,
                    placement: LabelPlacement::hidden(request.key.clone()),
                }),
            }
        }
        self.bitmap = Some(bitmap);
        self.set_entries(entries);
        report
    }

    /// Places one total label per request using a single candidate, hiding on collision.
    ///
    /// Previously placed totals are un-stamped first.
    pub fn place_totals(
        &mut self,
        totals: &[LabelRequest],
        candidate: LabelCandidate,
        layout: Layout,
        bounds: Size,
    ) -> &[LabelPlacement] {
        let bitmap = self
            .bitmap
            .get_or_insert_with(|| OccupancyBitmap::new(bounds.width, bounds.height));
        for total in self.totals.drain(..) {
            if let Some(placed) = total.placed {
                bitmap.unstamp(placed.rect);
            }
        }
        let options = PlacementOptions {
            layout,
            mode: CollisionMode::HideOnly,
            edge: AnchorEdge::Full,
            candidates: smallvec![candidate],
        };
        self.totals = totals
            .iter()
            .map(|request| LabelPlacement {
                key: request.key.clone(),
                placed: place_one(request, &options, bitmap),
            })
            .collect();
        &self.totals
    }

    fn set_entries(&mut self, entries: Vec<Entry>) {
        self.index = entries
            .iter()
            .enumerate()
            .map(|(i, e)| (e.placement.key.clone(), i))
            .collect();
        self.entries = entries;
    }

    /// Placement of the label keyed `key`.
    pub fn placement(&self, key: &str) -> Option<&LabelPlacement> {
        self.index.get(key).map(|&i| &self.entries[i].placement)
    }

    /// All data-label placements in request order.
    pub fn placements(&self) -> impl Iterator<Item = &LabelPlacement> + '_ {
        self.entries.iter().map(|e| &e.placement)
    }

    /// Total-label placements.
    pub fn totals(&self) -> &[LabelPlacement] {
        &self.totals
    }

    /// The occupancy grid after the latest placement.
    pub fn bitmap(&self) -> Option<&OccupancyBitmap> {
        self.bitmap.as_ref()
    }

    /// Drops every placement and the grid.
    pub fn clear(&mut self) {
        self.bitmap = None;
        self.entries.clear();
        self.index.clear();
        self.totals.clear();
    }
}
