/// Engine time in milliseconds.
///
/// All scheduling is expressed against this timebase; the host event loop
/// decides how it maps to wall-clock time.
#[derive(Copy, Clone, Debug, Default, PartialEq, PartialOrd)]
pub struct Time(pub f64);

impl Time {
    pub const ZERO: Time = Time(0.0);

    pub fn from_millis(ms: f64) -> Self {
        Time(ms)
    }

    pub fn millis(self) -> f64 {
        self.0
    }

    pub fn after(self, ms: f64) -> Self {
        Time(self.0 + ms)
    }

    /// Milliseconds elapsed since `earlier` (negative if `earlier` is in the future).
    pub fn since(self, earlier: Time) -> f64 {
        self.0 - earlier.0
    }
}

#[cfg(test)]
mod tests {
    use super::Time;

    #[test]
    fn after_and_since() {
        let t = Time::from_millis(100.0);
        let later = t.after(250.0);
        assert_eq!(later, Time(350.0));
        assert_eq!(later.since(t), 250.0);
        assert!(t < later);
    }
}
