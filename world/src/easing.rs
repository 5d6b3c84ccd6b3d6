/// Easing curve mapping linear progress onto animated progress.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Easing {
    /// Constant velocity.
    Linear,
    /// Quadratic ease-in (slow start).
    QuadIn,
    /// Quadratic ease-out (slow end).
    QuadOut,
    /// Quadratic ease-in-out.
    QuadInOut,
    /// Overshoots the target, then settles back onto it.
    BackOut,
}

const BACK_OVERSHOOT: f32 = 1.701_58;

impl Easing {
    /// Applies the curve to a linear progress value (0.0-1.0).
    ///
    /// Input is clamped; output of [`Easing::BackOut`] exceeds 1.0 mid-flight.
    pub(crate) fn apply(self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);

        match self {
            Self::Linear => t,
            Self::QuadIn => t * t,
            Self::QuadOut => 1.0 - (1.0 - t) * (1.0 - t),
            Self::QuadInOut => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(2) / 2.0
                }
            }
            Self::BackOut => {
                let c1 = BACK_OVERSHOOT;
                let c3 = c1 + 1.0;
                let u = t - 1.0;
                1.0 + c3 * u.powi(3) + c1 * u.powi(2)
            }
        }
    }

    /// Linear progress at which the curve first reaches 1.0.
    pub(crate) fn first_arrival(self) -> f32 {
        match self {
            // Roots of `c3 * u^3 + c1 * u^2`: u = 0 and u = -c1 / c3.
            Self::BackOut => 1.0 / (BACK_OVERSHOOT + 1.0),
            Self::Linear | Self::QuadIn | Self::QuadOut | Self::QuadInOut => 1.0,
        }
    }
}
