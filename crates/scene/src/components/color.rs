use std::fmt;

/// RGBA color with 0..=255 channels and 0..=1 alpha.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Rgba {
    pub r: f64,
    pub g: f64,
    pub b: f64,
    pub a: f64,
}

impl Rgba {
    pub const fn new(r: f64, g: f64, b: f64, a: f64) -> Self {
        Self { r, g, b, a }
    }

    /// Parses `#rgb`, `#rrggbb`, `rgb(r, g, b)` and `rgba(r, g, b, a)`.
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        if let Some(hex) = text.strip_prefix('#') {
            return parse_hex(hex);
        }
        let lower = text.to_ascii_lowercase();
        if let Some(body) = lower
            .strip_prefix("rgba(")
            .and_then(|rest| rest.strip_suffix(')'))
        {
            let parts = parse_channels(body)?;
            let [r, g, b, a] = <[f64; 4]>::try_from(parts).ok()?;
            return Some(Self::new(r, g, b, a.clamp(0.0, 1.0)));
        }
        if let Some(body) = lower
            .strip_prefix("rgb(")
            .and_then(|rest| rest.strip_suffix(')'))
        {
            let parts = parse_channels(body)?;
            let [r, g, b] = <[f64; 3]>::try_from(parts).ok()?;
            return Some(Self::new(r, g, b, 1.0));
        }
        None
    }

    pub fn lerp(self, other: Self, t: f64) -> Self {
        let mix = |a: f64, b: f64| a + (b - a) * t;
        Self::new(
            mix(self.r, other.r),
            mix(self.g, other.g),
            mix(self.b, other.b),
            mix(self.a, other.a),
        )
    }
}

impl fmt::Display for Rgba {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let channel = |v: f64| v.round().clamp(0.0, 255.0) as u8;
        if self.a >= 1.0 {
            write!(
                f,
                "#{:02x}{:02x}{:02x}",
                channel(self.r),
                channel(self.g),
                channel(self.b)
            )
        } else {
            write!(
                f,
                "rgba({}, {}, {}, {})",
                channel(self.r),
                channel(self.g),
                channel(self.b),
                self.a.clamp(0.0, 1.0)
            )
        }
    }
}

fn parse_hex(hex: &str) -> Option<Rgba> {
    let digit = |i: usize| u8::from_str_radix(hex.get(i..i + 1)?, 16).ok();
    let pair = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
    match hex.len() {
        3 => Some(Rgba::new(
            f64::from(digit(0)? * 17),
            f64::from(digit(1)? * 17),
            f64::from(digit(2)? * 17),
            1.0,
        )),
        6 => Some(Rgba::new(
            f64::from(pair(0)?),
            f64::from(pair(2)?),
            f64::from(pair(4)?),
            1.0,
        )),
        _ => None,
    }
}

fn parse_channels(body: &str) -> Option<Vec<f64>> {
    body.split(',')
        .map(|part| part.trim().parse::<f64>().ok())
        .collect()
}
