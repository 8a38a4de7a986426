use std::fmt;

use foundation::math::Vec2;

/// Cubic segments are flattened into this many chords when measuring.
const CUBIC_FLATTEN_STEPS: usize = 64;

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum PathCommand {
    MoveTo(Vec2),
    LineTo(Vec2),
    /// SVG `S`: the first control point mirrors the previous cubic's second
    /// control point, or is the current point when there is no previous cubic.
    SmoothCubicTo { ctrl: Vec2, to: Vec2 },
    ClosePath,
}

/// Drawable path descriptor. `Display` renders SVG path data.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PathData {
    commands: Vec<PathCommand>,
}

impl PathData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_commands(commands: Vec<PathCommand>) -> Self {
        Self { commands }
    }

    pub fn move_to(mut self, p: Vec2) -> Self {
        self.commands.push(PathCommand::MoveTo(p));
        self
    }

    pub fn line_to(mut self, p: Vec2) -> Self {
        self.commands.push(PathCommand::LineTo(p));
        self
    }

    pub fn smooth_cubic_to(mut self, ctrl: Vec2, to: Vec2) -> Self {
        self.commands.push(PathCommand::SmoothCubicTo { ctrl, to });
        self
    }

    pub fn close(mut self) -> Self {
        self.commands.push(PathCommand::ClosePath);
        self
    }

    pub fn push(&mut self, command: PathCommand) {
        self.commands.push(command);
    }

    pub fn commands(&self) -> &[PathCommand] {
        &self.commands
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Total stroke length in screen units.
    pub fn length(&self) -> f64 {
        let mut total = 0.0;
        let mut current = Vec2::ZERO;
        let mut subpath_start = Vec2::ZERO;
        let mut last_ctrl: Option<Vec2> = None;

        for cmd in &self.commands {
            match *cmd {
                PathCommand::MoveTo(p) => {
                    current = p;
                    subpath_start = p;
                    last_ctrl = None;
                }
                PathCommand::LineTo(p) => {
                    total += current.distance(p);
                    current = p;
                    last_ctrl = None;
                }
                PathCommand::SmoothCubicTo { ctrl, to } => {
                    let c1 = match last_ctrl {
                        Some(prev) => current + (current - prev),
                        None => current,
                    };
                    total += cubic_length(current, c1, ctrl, to);
                    current = to;
                    last_ctrl = Some(ctrl);
                }
                PathCommand::ClosePath => {
                    total += current.distance(subpath_start);
                    current = subpath_start;
                    last_ctrl = None;
                }
            }
        }

        total
    }

    /// Point-wise interpolation towards `to`.
    ///
    /// Returns `None` when the two paths do not share the same command
    /// structure; callers then switch values instead of interpolating.
    pub fn interpolate(&self, to: &PathData, t: f64) -> Option<PathData> {
        if self.commands.len() != to.commands.len() {
            return None;
        }
        let mut out = Vec::with_capacity(self.commands.len());
        for (a, b) in self.commands.iter().zip(&to.commands) {
            let cmd = match (*a, *b) {
                (PathCommand::MoveTo(p), PathCommand::MoveTo(q)) => PathCommand::MoveTo(p.lerp(q, t)),
                (PathCommand::LineTo(p), PathCommand::LineTo(q)) => PathCommand::LineTo(p.lerp(q, t)),
                (
                    PathCommand::SmoothCubicTo { ctrl: c0, to: p },
                    PathCommand::SmoothCubicTo { ctrl: c1, to: q },
                ) => PathCommand::SmoothCubicTo {
                    ctrl: c0.lerp(c1, t),
                    to: p.lerp(q, t),
                },
                (PathCommand::ClosePath, PathCommand::ClosePath) => PathCommand::ClosePath,
                _ => return None,
            };
            out.push(cmd);
        }
        Some(PathData::from_commands(out))
    }
}

fn cubic_point(p0: Vec2, c1: Vec2, c2: Vec2, p1: Vec2, t: f64) -> Vec2 {
    let u = 1.0 - t;
    p0.scale(u * u * u) + c1.scale(3.0 * u * u * t) + c2.scale(3.0 * u * t * t) + p1.scale(t * t * t)
}

fn cubic_length(p0: Vec2, c1: Vec2, c2: Vec2, p1: Vec2) -> f64 {
    let mut total = 0.0;
    let mut prev = p0;
    for i in 1..=CUBIC_FLATTEN_STEPS {
        let t = i as f64 / CUBIC_FLATTEN_STEPS as f64;
        let p = cubic_point(p0, c1, c2, p1, t);
        total += prev.distance(p);
        prev = p;
    }
    total
}

impl fmt::Display for PathData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for cmd in &self.commands {
            match cmd {
                PathCommand::MoveTo(p) => write!(f, "M{},{}", p.x, p.y)?,
                PathCommand::LineTo(p) => write!(f, "L{},{}", p.x, p.y)?,
                PathCommand::SmoothCubicTo { ctrl, to } => {
                    write!(f, "S{},{},{},{}", ctrl.x, ctrl.y, to.x, to.y)?
                }
                PathCommand::ClosePath => write!(f, "Z")?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::PathData;
    use foundation::math::Vec2;

    fn assert_close(a: f64, b: f64, eps: f64) {
        let diff = (a - b).abs();
        assert!(diff <= eps, "expected {a} ~= {b} (diff {diff})");
    }

    #[test]
    fn renders_svg_path_data() {
        let path = PathData::new()
            .move_to(Vec2::new(1.0, 2.0))
            .smooth_cubic_to(Vec2::new(3.5, -4.0), Vec2::new(5.0, 6.0));
        assert_eq!(path.to_string(), "M1,2S3.5,-4,5,6");
    }

    #[test]
    fn closed_square_length() {
        let square = PathData::new()
            .move_to(Vec2::new(0.0, 0.0))
            .line_to(Vec2::new(10.0, 0.0))
            .line_to(Vec2::new(10.0, 10.0))
            .line_to(Vec2::new(0.0, 10.0))
            .close();
        assert_close(square.length(), 40.0, 1e-9);
    }

    #[test]
    fn straight_cubic_measures_like_a_line() {
        // Control point on the chord: the curve collapses onto the segment.
        let path = PathData::new()
            .move_to(Vec2::new(0.0, 0.0))
            .smooth_cubic_to(Vec2::new(5.0, 0.0), Vec2::new(10.0, 0.0));
        assert_close(path.length(), 10.0, 1e-6);
    }

    #[test]
    fn interpolation_requires_matching_structure() {
        let a = PathData::new().move_to(Vec2::new(0.0, 0.0)).line_to(Vec2::new(2.0, 0.0));
        let b = PathData::new().move_to(Vec2::new(2.0, 2.0)).line_to(Vec2::new(4.0, 2.0));
        let mid = a.interpolate(&b, 0.5).expect("same structure");
        assert_eq!(mid.to_string(), "M1,1L3,1");

        let c = PathData::new().move_to(Vec2::new(0.0, 0.0));
        assert!(a.interpolate(&c, 0.5).is_none());
    }
}
