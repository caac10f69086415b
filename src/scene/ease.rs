/// Rate functions mapping normalized animation progress to interpolation alpha.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateFunc {
    /// Linear interpolation.
    Linear,
    /// Sigmoid-shaped ease in and out.
    #[default]
    Smooth,
    /// Goes to 1 at the midpoint and back to 0.
    ThereAndBack,
    /// Slow start, fast end.
    RushInto,
    /// Fast start, slow end.
    RushFrom,
    /// Quadratic ease-in.
    InQuad,
    /// Quadratic ease-out.
    OutQuad,
    /// Cubic ease-in/out.
    InOutCubic,
}

impl RateFunc {
    /// Apply this rate function to normalized progress `t` in `[0, 1]`.
    pub fn apply(self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Self::Linear => t,
            Self::Smooth => smooth(t),
            Self::ThereAndBack => {
                let u = if t < 0.5 { 2.0 * t } else { 2.0 * (1.0 - t) };
                smooth(u)
            }
            Self::RushInto => 2.0 * smooth(t / 2.0),
            Self::RushFrom => 2.0 * smooth(t / 2.0 + 0.5) - 1.0,
            Self::InQuad => t * t,
            Self::OutQuad => 1.0 - (1.0 - t) * (1.0 - t),
            Self::InOutCubic => {
                if t < 0.5 {
                    4.0 * t * t * t
                } else {
                    1.0 - ((-2.0 * t + 2.0).powi(3) / 2.0)
                }
            }
        }
    }

    /// Name reported to renderers as the easing function.
    pub fn name(self) -> &'static str {
        match self {
            Self::Linear => "linear",
            Self::Smooth => "smooth",
            Self::ThereAndBack => "there_and_back",
            Self::RushInto => "rush_into",
            Self::RushFrom => "rush_from",
            Self::InQuad => "in_quad",
            Self::OutQuad => "out_quad",
            Self::InOutCubic => "in_out_cubic",
        }
    }
}

// Logistic curve rescaled so that smooth(0) == 0 and smooth(1) == 1.
fn smooth(t: f64) -> f64 {
    const INFLECTION: f64 = 10.0;
    let sigmoid = |x: f64| 1.0 / (1.0 + (-x).exp());
    let error = sigmoid(-INFLECTION / 2.0);
    ((sigmoid(INFLECTION * (t - 0.5)) - error) / (1.0 - 2.0 * error)).clamp(0.0, 1.0)
}
