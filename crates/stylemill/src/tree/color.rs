//! RGB colours.

use super::dimension::format_number;
use super::operation::Operator;

/// An RGB colour with alpha.
///
/// Channels are kept as unclamped floats so chained arithmetic does not lose
/// precision; they are clamped to `0..=255` only when rendered.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub rgb: [f64; 3],
    pub alpha: f64,
}

/// Hue (degrees), saturation, lightness and alpha, each of the last three in `0..=1`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hsla {
    pub h: f64,
    pub s: f64,
    pub l: f64,
    pub a: f64,
}

impl Color {
    pub fn new(rgb: [f64; 3], alpha: f64) -> Self {
        Self { rgb, alpha }
    }

    /// Parse 3 or 6 hex digits, without the leading `#`.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let digits: Vec<u8> = hex
            .chars()
            .map(|c| c.to_digit(16).map(|d| d as u8))
            .collect::<Option<_>>()?;
        let rgb = match digits.as_slice() {
            [r, g, b] => [r * 17, g * 17, b * 17],
            [r1, r2, g1, g2, b1, b2] => [r1 * 16 + r2, g1 * 16 + g2, b1 * 16 + b2],
            _ => return None,
        };
        Some(Self::new(rgb.map(f64::from), 1.0))
    }

    /// Build a colour from hue/saturation/lightness.
    pub fn from_hsla(hsla: Hsla) -> Self {
        let h = (hsla.h % 360.0) / 360.0;
        let s = hsla.s.clamp(0.0, 1.0);
        let l = hsla.l.clamp(0.0, 1.0);
        let m2 = if l <= 0.5 { l * (s + 1.0) } else { l + s - l * s };
        let m1 = l * 2.0 - m2;
        let hue = |h: f64| {
            let h = if h < 0.0 {
                h + 1.0
            } else if h > 1.0 {
                h - 1.0
            } else {
                h
            };
            if h * 6.0 < 1.0 {
                m1 + (m2 - m1) * h * 6.0
            } else if h * 2.0 < 1.0 {
                m2
            } else if h * 3.0 < 2.0 {
                m1 + (m2 - m1) * (2.0 / 3.0 - h) * 6.0
            } else {
                m1
            }
        };
        Self::new(
            [
                hue(h + 1.0 / 3.0) * 255.0,
                hue(h) * 255.0,
                hue(h - 1.0 / 3.0) * 255.0,
            ],
            hsla.a.clamp(0.0, 1.0),
        )
    }

    pub fn to_hsla(&self) -> Hsla {
        let [r, g, b] = self.rgb.map(|c| c / 255.0);
        let max = r.max(g).max(b);
        let min = r.min(g).min(b);
        let l = (max + min) / 2.0;
        let d = max - min;

        if d == 0.0 {
            return Hsla {
                h: 0.0,
                s: 0.0,
                l,
                a: self.alpha,
            };
        }

        let s = if l > 0.5 {
            d / (2.0 - max - min)
        } else {
            d / (max + min)
        };
        let h = if max == r {
            (g - b) / d + if g < b { 6.0 } else { 0.0 }
        } else if max == g {
            (b - r) / d + 2.0
        } else {
            (r - g) / d + 4.0
        };
        Hsla {
            h: h * 60.0,
            s,
            l,
            a: self.alpha,
        }
    }

    /// Relative luminance in `0..=1`.
    pub fn luma(&self) -> f64 {
        let [r, g, b] = self.rgb.map(|c| c / 255.0);
        0.2126 * r + 0.7152 * g + 0.0722 * b
    }

    /// Per-channel arithmetic. The alpha of `self` is kept.
    pub fn operate(&self, op: Operator, other: &Color) -> Color {
        let mut rgb = [0.0; 3];
        for (i, channel) in rgb.iter_mut().enumerate() {
            *channel = op.apply(self.rgb[i], other.rgb[i]);
        }
        Color::new(rgb, self.alpha)
    }

    /// Channels rounded and clamped for output.
    pub fn channels(&self) -> [u8; 3] {
        self.rgb.map(|c| c.round().clamp(0.0, 255.0) as u8)
    }

    pub fn to_css(&self, compress: bool) -> String {
        let [r, g, b] = self.channels();
        if self.alpha < 1.0 {
            let alpha = format_number(self.alpha.clamp(0.0, 1.0));
            if compress {
                format!("rgba({r},{g},{b},{alpha})")
            } else {
                format!("rgba({r}, {g}, {b}, {alpha})")
            }
        } else {
            format!("#{r:02x}{g:02x}{b:02x}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_short_and_long_hex() {
        assert_eq!(Color::from_hex("fff").unwrap().rgb, [255.0; 3]);
        assert_eq!(
            Color::from_hex("1a2B3c").unwrap().rgb,
            [26.0, 43.0, 60.0]
        );
        assert!(Color::from_hex("ffff").is_none());
        assert!(Color::from_hex("ggg").is_none());
    }

    #[test]
    fn test_clamps_only_on_output() {
        let white = Color::from_hex("fff").unwrap();
        let sum = white.operate(Operator::Add, &white);
        assert_eq!(sum.rgb, [510.0; 3]);
        assert_eq!(sum.to_css(false), "#ffffff");

        // Chained math keeps the overflow until rendering.
        let back = sum.operate(Operator::Subtract, &white);
        assert_eq!(back.to_css(false), "#ffffff");
        let half = sum.operate(Operator::Divide, &Color::new([4.0; 3], 1.0));
        assert_eq!(half.to_css(false), "#808080");
    }

    #[test]
    fn test_translucent_colors_render_as_rgba() {
        let c = Color::new([255.0, 0.0, 0.0], 0.5);
        assert_eq!(c.to_css(false), "rgba(255, 0, 0, 0.5)");
        assert_eq!(c.to_css(true), "rgba(255,0,0,0.5)");
    }

    #[test]
    fn test_hsl_round_trip() {
        let c = Color::from_hex("336699").unwrap();
        let back = Color::from_hsla(c.to_hsla());
        assert_eq!(back.to_css(false), "#336699");

        let red = Color::from_hsla(Hsla { h: 0.0, s: 1.0, l: 0.5, a: 1.0 });
        assert_eq!(red.to_css(false), "#ff0000");
    }
}
