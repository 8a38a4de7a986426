use foundation::time::Time;

/// Deterministic frame metadata for the host event loop.
///
/// Transitions are advanced once per frame; keeping the timebase explicit
/// lets tests and replays drive animation without a wall clock.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Frame {
    /// 0-based frame index.
    pub index: u64,
    /// Fixed delta time (milliseconds).
    pub dt_ms: f64,
    /// Engine time at the start of the frame.
    pub time: Time,
}

impl Frame {
    pub fn new(index: u64, dt_ms: f64) -> Self {
        Self {
            index,
            dt_ms,
            time: Time(index as f64 * dt_ms),
        }
    }

    /// A 60 Hz frame.
    pub fn at_60hz(index: u64) -> Self {
        Self::new(index, 1000.0 / 60.0)
    }

    pub fn next(self) -> Self {
        Self::new(self.index + 1, self.dt_ms)
    }
}
