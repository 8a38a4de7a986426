/// Easing curves applied to normalized transition progress.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum Ease {
    Linear,
    /// Symmetric cubic; the default for attribute transitions.
    #[default]
    CubicInOut,
    /// Decelerating cubic, used for stroke reveals.
    CubicOut,
}

impl Ease {
    pub fn apply(self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Ease::Linear => t,
            Ease::CubicInOut => {
                if t < 0.5 {
                    4.0 * t * t * t
                } else {
                    let u = 2.0 * t - 2.0;
                    0.5 * u * u * u + 1.0
                }
            }
            Ease::CubicOut => {
                let u = t - 1.0;
                u * u * u + 1.0
            }
        }
    }
}
