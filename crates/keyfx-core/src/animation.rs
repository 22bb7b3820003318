use crate::colors::RGBAColor;
use keyframe::{CanTween, EasingFunction};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Supported easing functions for interpolators.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EasingType {
    #[default]
    Linear,
    EaseIn,
    EaseOut,
    EaseInOut,
    BounceOut,
}

impl EasingFunction for EasingType {
    fn y(&self, x: f64) -> f64 {
        match self {
            EasingType::Linear => keyframe::functions::Linear.y(x),
            EasingType::EaseIn => keyframe::functions::EaseIn.y(x),
            EasingType::EaseOut => keyframe::functions::EaseOut.y(x),
            EasingType::EaseInOut => keyframe::functions::EaseInOut.y(x),
            EasingType::BounceOut => bounce_out(x),
        }
    }
}

impl EasingType {
    /// Evaluates the easing curve at a specific point `x` (0.0 to 1.0).
    pub fn eval(&self, x: f64) -> f64 {
        self.y(x.clamp(0.0, 1.0))
    }

    /// Parses the script-facing name (`"linear"`, `"ease_in"`, ...).
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "linear" => Some(Self::Linear),
            "ease_in" | "easein" => Some(Self::EaseIn),
            "ease_out" | "easeout" => Some(Self::EaseOut),
            "ease_in_out" | "easeinout" => Some(Self::EaseInOut),
            "bounce_out" | "bounceout" => Some(Self::BounceOut),
            _ => None,
        }
    }
}

fn bounce_out(x: f64) -> f64 {
    const N: f64 = 7.5625;
    const D: f64 = 2.75;
    if x < 1.0 / D {
        N * x * x
    } else if x < 2.0 / D {
        let x = x - 1.5 / D;
        N * x * x + 0.75
    } else if x < 2.5 / D {
        let x = x - 2.25 / D;
        N * x * x + 0.9375
    } else {
        let x = x - 2.625 / D;
        N * x * x + 0.984375
    }
}

/// The two ends of an interpolation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Endpoints {
    Color(RGBAColor, RGBAColor),
    Number(f64, f64),
}

/// Value produced by an [`Interpolator`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Interpolated {
    Color(RGBAColor),
    Number(f64),
}

/// A time-bounded transition between two values.
///
/// Evaluation is a pure function of the queried time, so asking twice for the same instant
/// always gives the same answer. Times are in seconds on the environment clock.
#[derive(Clone, Copy, PartialEq)]
pub struct Interpolator {
    pub endpoints: Endpoints,
    pub start: f64,
    pub duration: f64,
    pub easing: EasingType,
}

impl Interpolator {
    pub fn new(endpoints: Endpoints, start: f64, duration: f64, easing: EasingType) -> Self {
        Self {
            endpoints,
            start,
            duration,
            easing,
        }
    }

    /// Progress in `[0, 1]` after `elapsed` seconds, before easing.
    pub fn progress(&self, elapsed: f64) -> f64 {
        if self.duration <= 0.0 || elapsed >= self.duration {
            1.0
        } else if elapsed <= 0.0 {
            0.0
        } else {
            elapsed / self.duration
        }
    }

    /// Value after `elapsed` seconds since the start.
    pub fn value_after(&self, elapsed: f64) -> Interpolated {
        let t = self.easing.eval(self.progress(elapsed));
        match self.endpoints {
            Endpoints::Color(from, to) => Interpolated::Color(RGBAColor::ease(from, to, t)),
            Endpoints::Number(from, to) => Interpolated::Number(from + (to - from) * t),
        }
    }

    /// Value at absolute clock time `now`.
    pub fn value_at(&self, now: f64) -> Interpolated {
        self.value_after(now - self.start)
    }

    /// Whether the transition is complete at clock time `now`.
    pub fn is_done(&self, now: f64) -> bool {
        now - self.start >= self.duration
    }
}

impl fmt::Debug for Interpolator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interpolator")
            .field("endpoints", &self.endpoints)
            .field("start", &self.start)
            .field("duration", &self.duration)
            .finish()
    }
}
