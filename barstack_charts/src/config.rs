// Copyright 2025 the Barstack Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Engine configuration.

use alloc::string::String;
use alloc::sync::Arc;

use barstack_core::{Accessors, Easing, Timing};
use barstack_transforms::StackOptions;

use crate::error::ConfigError;
use crate::label::{CollisionMode, LabelPosition};
use crate::scale::ScaleOptions;

/// Bar orientation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Layout {
    /// Categories along x, values along y (bars grow upward).
    #[default]
    Vertical,
    /// Categories along y, values along x (bars grow rightward).
    Horizontal,
}

/// A width/height pair in chart coordinate units.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Size {
    /// Width in chart coordinate units.
    pub width: f64,
    /// Height in chart coordinate units.
    pub height: f64,
}

impl Size {
    /// Creates a size.
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Animation settings.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct AnimationConfig {
    /// Apply every pass synchronously.
    pub disabled: bool,
    /// Duration override in milliseconds ([`AnimationConfig::DEFAULT_DURATION`] otherwise).
    pub duration: Option<f64>,
    /// Easing shared by every tween of a pass.
    pub easing: Easing,
}

impl AnimationConfig {
    /// Duration used when no override is set.
    pub const DEFAULT_DURATION: f64 = 750.0;

    /// Disables or enables animation.
    pub fn with_disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }

    /// Overrides the duration.
    pub fn with_duration(mut self, duration: f64) -> Self {
        self.duration = Some(duration);
        self
    }

    /// Sets the easing.
    pub fn with_easing(mut self, easing: Easing) -> Self {
        self.easing = easing;
        self
    }

    /// Timing for a pass. The first render never animates.
    pub fn timing(&self, first_render: bool) -> Timing {
        if self.disabled || first_render {
            return Timing::IMMEDIATE;
        }
        Timing::new(self.duration.unwrap_or(Self::DEFAULT_DURATION)).with_easing(self.easing)
    }
}

/// Formats a label value into display text.
pub type LabelFormat = Arc<dyn Fn(f64) -> String>;

/// Label settings.
#[derive(Clone)]
pub struct LabelConfig {
    /// Whether data labels are placed at all.
    pub visible: bool,
    /// Placement relative to the bar. `None` uses the layout default (top / right).
    pub position: Option<LabelPosition>,
    /// Collision policy.
    pub collision: CollisionMode,
    /// Font size used for measurement.
    pub font_size: f64,
    /// Place one total label per stacked group.
    pub show_totals: bool,
    /// Keep [`CollisionMode::Fixed`] labels whose text does not fit the room around their bar.
    pub show_small_labels: bool,
    /// Optional formatter. Values use their display form otherwise.
    pub format: Option<LabelFormat>,
}

impl core::fmt::Debug for LabelConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("LabelConfig")
            .field("visible", &self.visible)
            .field("position", &self.position)
            .field("collision", &self.collision)
            .field("font_size", &self.font_size)
            .field("show_totals", &self.show_totals)
            .field("show_small_labels", &self.show_small_labels)
            .field("format", &self.format.as_ref().map(|_| "<fn>"))
            .finish()
    }
}

impl Default for LabelConfig {
    fn default() -> Self {
        Self {
            visible: true,
            position: None,
            collision: CollisionMode::Auto,
            font_size: 12.0,
            show_totals: false,
            show_small_labels: false,
            format: None,
        }
    }
}

impl LabelConfig {
    /// Shows or hides data labels.
    pub fn with_visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }

    /// Sets the label position.
    pub fn with_position(mut self, position: LabelPosition) -> Self {
        self.position = Some(position);
        self
    }

    /// Sets the collision policy.
    pub fn with_collision(mut self, collision: CollisionMode) -> Self {
        self.collision = collision;
        self
    }

    /// Sets the font size.
    pub fn with_font_size(mut self, font_size: f64) -> Self {
        self.font_size = font_size;
        self
    }

    /// Enables per-group total labels.
    pub fn with_totals(mut self, show_totals: bool) -> Self {
        self.show_totals = show_totals;
        self
    }

    /// Keeps fixed labels that do not fit their bar.
    pub fn with_small_labels(mut self, show_small_labels: bool) -> Self {
        self.show_small_labels = show_small_labels;
        self
    }

    /// Sets the value formatter.
    pub fn with_format(mut self, format: impl Fn(f64) -> String + 'static) -> Self {
        self.format = Some(Arc::new(format));
        self
    }

    /// Resolves the position for `layout`.
    pub fn resolved_position(&self, layout: Layout) -> LabelPosition {
        self.position.unwrap_or(match layout {
            Layout::Vertical => LabelPosition::Top,
            Layout::Horizontal => LabelPosition::Right,
        })
    }

    /// Formats a value.
    pub fn text(&self, value: f64) -> String {
        match &self.format {
            Some(format) => format(value),
            None => alloc::format!("{value}"),
        }
    }
}

/// Everything a [`crate::BarLayoutEngine`] needs besides the rows.
///
/// Setting a group accessor switches the engine to the stacked layout: groups become the band
/// categories and ordinals become segments within each stack.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Field accessors.
    pub accessors: Accessors,
    /// Orientation.
    pub layout: Layout,
    /// Plot size.
    pub size: Size,
    /// Scale options.
    pub scale: ScaleOptions,
    /// Stack options (stacked layout only).
    pub stack: StackOptions,
    /// Animation settings.
    pub animation: AnimationConfig,
    /// Label settings.
    pub labels: LabelConfig,
}

impl EngineConfig {
    /// Creates a vertical configuration with defaults.
    pub fn new(accessors: Accessors, size: Size) -> Self {
        Self {
            accessors,
            layout: Layout::Vertical,
            size,
            scale: ScaleOptions::default(),
            stack: StackOptions::default(),
            animation: AnimationConfig::default(),
            labels: LabelConfig::default(),
        }
    }

    /// Sets the orientation.
    pub fn with_layout(mut self, layout: Layout) -> Self {
        self.layout = layout;
        self
    }

    /// Sets the scale options.
    pub fn with_scale(mut self, scale: ScaleOptions) -> Self {
        self.scale = scale;
        self
    }

    /// Sets the stack options.
    pub fn with_stack(mut self, stack: StackOptions) -> Self {
        self.stack = stack;
        self
    }

    /// Sets the animation settings.
    pub fn with_animation(mut self, animation: AnimationConfig) -> Self {
        self.animation = animation;
        self
    }

    /// Sets the label settings.
    pub fn with_labels(mut self, labels: LabelConfig) -> Self {
        self.labels = labels;
        self
    }

    /// Returns `true` when a group accessor is set.
    pub fn is_stacked(&self) -> bool {
        self.accessors.group.is_some()
    }

    /// Checks every numeric setting.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.accessors.ordinal.is_empty() {
            return Err(ConfigError::EmptyAccessor("ordinal"));
        }
        if self.accessors.value.is_empty() {
            return Err(ConfigError::EmptyAccessor("value"));
        }
        if self.accessors.group.as_deref().is_some_and(str::is_empty) {
            return Err(ConfigError::EmptyAccessor("group"));
        }
        validate_size(self.size)?;
        self.scale.validate()?;
        if let Some(duration) = self.animation.duration {
            if !duration.is_finite() || duration < 0.0 {
                return Err(ConfigError::Duration(duration));
            }
        }
        let fs = self.labels.font_size;
        if !fs.is_finite() || fs <= 0.0 {
            return Err(ConfigError::FontSize(fs));
        }
        Ok(())
    }
}

pub(crate) fn validate_size(size: Size) -> Result<(), ConfigError> {
    let ok = |v: f64| v.is_finite() && v >= 0.0;
    if ok(size.width) && ok(size.height) {
        Ok(())
    } else {
        Err(ConfigError::Size {
            width: size.width,
            height: size.height,
        })
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;

    fn base() -> EngineConfig {
        EngineConfig::new(Accessors::new("cat", "v"), Size::new(400.0, 300.0))
    }

    #[test]
    fn defaults_validate() {
        assert_eq!(base().validate(), Ok(()));
    }

    #[test]
    fn rejects_bad_numbers() {
        let padded = base().with_scale(ScaleOptions::default().with_band_padding(1.0));
        assert_eq!(padded.validate(), Err(ConfigError::BandPadding(1.0)));

        let mut sized = base();
        sized.size = Size::new(-1.0, 10.0);
        assert!(matches!(sized.validate(), Err(ConfigError::Size { .. })));

        let over = base().with_scale(ScaleOptions::default().with_max_override(f64::NAN));
        assert!(matches!(
            over.validate(),
            Err(ConfigError::Override { which: "max", .. })
        ));

        let empty = EngineConfig::new(Accessors::new("", "v"), Size::new(1.0, 1.0));
        assert_eq!(empty.validate(), Err(ConfigError::EmptyAccessor("ordinal")));
    }

    #[test]
    fn first_render_and_disabled_are_immediate() {
        let anim = AnimationConfig::default();
        assert!(anim.timing(true).is_immediate());
        assert_eq!(anim.timing(false).duration, 750.0);
        assert!(anim.with_disabled(true).timing(false).is_immediate());
        assert_eq!(anim.with_duration(200.0).timing(false).duration, 200.0);
    }

    #[test]
    fn label_text_uses_formatter() {
        let plain = LabelConfig::default();
        assert_eq!(plain.text(3.0), "3");
        let fmt = LabelConfig::default().with_format(|v| alloc::format!("{v:.1}%"));
        assert_eq!(fmt.text(12.0), "12.0%");
    }
}
