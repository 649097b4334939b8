//! Distance to brightness decision policy.
//!
//! The policy picks the dim level while the user is closer than the
//! threshold and the normal level otherwise. The last applied level is kept
//! in an explicit [`BrightnessState`] so identical decisions do not reach the
//! backend twice.

use crate::{brightness::BrightnessBackend, Error, Result};
use log::debug;
use std::fmt;

/// Brightness as an integer percentage in `[0, 100]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BrightnessLevel(u8);

impl BrightnessLevel {
    /// Full brightness
    pub const MAX: Self = Self(100);

    /// Create a level from a percentage
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if `percent` is above 100.
    pub fn new(percent: u8) -> Result<Self> {
        if percent > 100 {
            return Err(Error::InvalidInput(format!(
                "Brightness {percent}% is outside 0..=100"
            )));
        }
        Ok(Self(percent))
    }

    /// Create a level, clamping to 100
    #[must_use]
    pub fn saturating(percent: u32) -> Self {
        Self(u8::try_from(percent.min(100)).unwrap_or(100))
    }

    #[must_use]
    pub const fn percent(self) -> u8 {
        self.0
    }
}

impl fmt::Display for BrightnessLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}

/// Map a distance to a level: `close` strictly below the threshold, `normal` otherwise
#[must_use]
pub fn decide(
    distance: f64,
    threshold: f64,
    close: BrightnessLevel,
    normal: BrightnessLevel,
) -> BrightnessLevel {
    if distance < threshold {
        close
    } else {
        normal
    }
}

/// Last level successfully applied to the backend
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BrightnessState {
    last_applied: Option<BrightnessLevel>,
}

impl BrightnessState {
    /// State with nothing applied yet
    #[must_use]
    pub const fn new() -> Self {
        Self { last_applied: None }
    }

    #[must_use]
    pub const fn last_applied(&self) -> Option<BrightnessLevel> {
        self.last_applied
    }

    fn record(&mut self, level: BrightnessLevel) {
        self.last_applied = Some(level);
    }
}

/// Result of one policy application
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// The backend was called and accepted the level
    Applied(BrightnessLevel),
    /// The level was already applied, backend not called
    Unchanged(BrightnessLevel),
}

impl ApplyOutcome {
    #[must_use]
    pub const fn level(self) -> BrightnessLevel {
        match self {
            Self::Applied(level) | Self::Unchanged(level) => level,
        }
    }
}

/// Threshold policy with optional hysteresis and debounce
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BrightnessPolicy {
    threshold_cm: f64,
    hysteresis_cm: f64,
    close: BrightnessLevel,
    normal: BrightnessLevel,
    debounce: bool,
}

impl BrightnessPolicy {
    /// Create a policy without hysteresis, debounce enabled
    #[must_use]
    pub const fn new(threshold_cm: f64, close: BrightnessLevel, normal: BrightnessLevel) -> Self {
        Self {
            threshold_cm,
            hysteresis_cm: 0.0,
            close,
            normal,
            debounce: true,
        }
    }

    /// Keep the dim level until the distance exceeds `threshold + hysteresis_cm`
    #[must_use]
    pub const fn with_hysteresis(mut self, hysteresis_cm: f64) -> Self {
        self.hysteresis_cm = hysteresis_cm;
        self
    }

    /// Enable or disable suppression of repeated identical applies
    #[must_use]
    pub const fn with_debounce(mut self, debounce: bool) -> Self {
        self.debounce = debounce;
        self
    }

    pub const fn threshold_cm(&self) -> f64 {
        self.threshold_cm
    }

    pub const fn close_level(&self) -> BrightnessLevel {
        self.close
    }

    pub const fn normal_level(&self) -> BrightnessLevel {
        self.normal
    }

    /// Level the backend should be at for `distance`, given what is currently applied
    #[must_use]
    pub fn target(&self, distance: f64, state: &BrightnessState) -> BrightnessLevel {
        let dimmed = state.last_applied() == Some(self.close) && self.close != self.normal;
        let threshold = if dimmed && self.hysteresis_cm > 0.0 {
            self.threshold_cm + self.hysteresis_cm
        } else {
            self.threshold_cm
        };
        decide(distance, threshold, self.close, self.normal)
    }

    /// Decide and push the level to the backend unless it is already applied
    ///
    /// # Errors
    ///
    /// Returns the backend error when the apply fails. The state is left
    /// untouched so the next call retries the same level.
    pub fn apply(
        &self,
        distance: f64,
        state: &mut BrightnessState,
        backend: &mut dyn BrightnessBackend,
    ) -> Result<ApplyOutcome> {
        let level = self.target(distance, state);

        if self.debounce && state.last_applied() == Some(level) {
            return Ok(ApplyOutcome::Unchanged(level));
        }

        debug!("Applying brightness {} via {} ({distance:.1} cm)", level, backend.name());
        backend.apply(level)?;
        state.record(level);
        Ok(ApplyOutcome::Applied(level))
    }
}
