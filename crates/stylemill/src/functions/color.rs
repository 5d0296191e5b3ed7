//! Colour construction, inspection and manipulation.

use super::{Args, clamp};
use crate::error::Result;
use crate::tree::{Color, Dimension, Entity, Hsla};

fn color(value: Color) -> Option<Entity> {
    Some(Entity::Color(value))
}

fn dimension(value: f64, unit: Option<&str>) -> Option<Entity> {
    Some(Entity::Dimension(Dimension::new(value, unit)))
}

pub(super) fn rgb(args: &Args<'_>) -> Result<Option<Entity>> {
    let rgb = [args.scaled(0, 256.0)?, args.scaled(1, 256.0)?, args.scaled(2, 256.0)?];
    Ok(color(Color::new(rgb, 1.0)))
}

pub(super) fn rgba(args: &Args<'_>) -> Result<Option<Entity>> {
    let rgb = [args.scaled(0, 256.0)?, args.scaled(1, 256.0)?, args.scaled(2, 256.0)?];
    Ok(color(Color::new(rgb, args.number(3)?)))
}

pub(super) fn hsl(args: &Args<'_>) -> Result<Option<Entity>> {
    let hsla = Hsla {
        h: args.number(0)?,
        s: args.number(1)?,
        l: args.number(2)?,
        a: 1.0,
    };
    Ok(color(Color::from_hsla(hsla)))
}

pub(super) fn hsla(args: &Args<'_>) -> Result<Option<Entity>> {
    let hsla = Hsla {
        h: args.number(0)?,
        s: args.number(1)?,
        l: args.number(2)?,
        a: args.number(3)?,
    };
    Ok(color(Color::from_hsla(hsla)))
}

pub(super) fn hsv(args: &Args<'_>) -> Result<Option<Entity>> {
    Ok(color(from_hsv(
        args.number(0)?,
        args.number(1)?,
        args.number(2)?,
        1.0,
    )))
}

pub(super) fn hsva(args: &Args<'_>) -> Result<Option<Entity>> {
    Ok(color(from_hsv(
        args.number(0)?,
        args.number(1)?,
        args.number(2)?,
        args.number(3)?,
    )))
}

fn from_hsv(h: f64, s: f64, v: f64, a: f64) -> Color {
    const PERMUTATIONS: [[usize; 3]; 6] = [
        [0, 3, 1],
        [2, 0, 1],
        [1, 0, 3],
        [1, 2, 0],
        [3, 1, 0],
        [0, 1, 2],
    ];

    let h = h.rem_euclid(360.0);
    let sector = ((h / 60.0).floor() as usize) % 6;
    let f = h / 60.0 - sector as f64;
    let vs = [v, v * (1.0 - s), v * (1.0 - f * s), v * (1.0 - (1.0 - f) * s)];
    let [r, g, b] = PERMUTATIONS[sector];
    Color::new([vs[r] * 255.0, vs[g] * 255.0, vs[b] * 255.0], a)
}

pub(super) fn hue(args: &Args<'_>) -> Result<Option<Entity>> {
    let Some(c) = args.color(0)? else { return Ok(None) };
    Ok(dimension(c.to_hsla().h.round(), None))
}

pub(super) fn saturation(args: &Args<'_>) -> Result<Option<Entity>> {
    let Some(c) = args.color(0)? else { return Ok(None) };
    Ok(dimension((c.to_hsla().s * 100.0).round(), Some("%")))
}

pub(super) fn lightness(args: &Args<'_>) -> Result<Option<Entity>> {
    let Some(c) = args.color(0)? else { return Ok(None) };
    Ok(dimension((c.to_hsla().l * 100.0).round(), Some("%")))
}

fn channel(args: &Args<'_>, i: usize) -> Result<Option<Entity>> {
    let Some(c) = args.color(0)? else { return Ok(None) };
    Ok(dimension(c.rgb[i], None))
}

pub(super) fn red(args: &Args<'_>) -> Result<Option<Entity>> {
    channel(args, 0)
}

pub(super) fn green(args: &Args<'_>) -> Result<Option<Entity>> {
    channel(args, 1)
}

pub(super) fn blue(args: &Args<'_>) -> Result<Option<Entity>> {
    channel(args, 2)
}

pub(super) fn alpha(args: &Args<'_>) -> Result<Option<Entity>> {
    let Some(c) = args.color(0)? else { return Ok(None) };
    Ok(dimension(c.alpha, None))
}

pub(super) fn luma(args: &Args<'_>) -> Result<Option<Entity>> {
    let Some(c) = args.color(0)? else { return Ok(None) };
    Ok(dimension((c.luma() * c.alpha * 100.0).round(), Some("%")))
}

/// Shared shape of the HSL adjusters: take a colour and a percentage amount.
fn adjust(args: &Args<'_>, apply: impl FnOnce(&mut Hsla, f64)) -> Result<Option<Entity>> {
    let Some(c) = args.color(0)? else { return Ok(None) };
    let amount = args.dimension(1)?.value;
    let mut hsla = c.to_hsla();
    apply(&mut hsla, amount);
    Ok(color(Color::from_hsla(hsla)))
}

pub(super) fn saturate(args: &Args<'_>) -> Result<Option<Entity>> {
    adjust(args, |hsla, amount| hsla.s = clamp(hsla.s + amount / 100.0))
}

pub(super) fn desaturate(args: &Args<'_>) -> Result<Option<Entity>> {
    adjust(args, |hsla, amount| hsla.s = clamp(hsla.s - amount / 100.0))
}

pub(super) fn lighten(args: &Args<'_>) -> Result<Option<Entity>> {
    adjust(args, |hsla, amount| hsla.l = clamp(hsla.l + amount / 100.0))
}

pub(super) fn darken(args: &Args<'_>) -> Result<Option<Entity>> {
    adjust(args, |hsla, amount| hsla.l = clamp(hsla.l - amount / 100.0))
}

pub(super) fn fadein(args: &Args<'_>) -> Result<Option<Entity>> {
    adjust(args, |hsla, amount| hsla.a = clamp(hsla.a + amount / 100.0))
}

pub(super) fn fadeout(args: &Args<'_>) -> Result<Option<Entity>> {
    adjust(args, |hsla, amount| hsla.a = clamp(hsla.a - amount / 100.0))
}

pub(super) fn fade(args: &Args<'_>) -> Result<Option<Entity>> {
    adjust(args, |hsla, amount| hsla.a = clamp(amount / 100.0))
}

pub(super) fn spin(args: &Args<'_>) -> Result<Option<Entity>> {
    adjust(args, |hsla, amount| hsla.h = (hsla.h + amount).rem_euclid(360.0))
}

pub(super) fn greyscale(args: &Args<'_>) -> Result<Option<Entity>> {
    let Some(c) = args.color(0)? else { return Ok(None) };
    let mut hsla = c.to_hsla();
    hsla.s = 0.0;
    Ok(color(Color::from_hsla(hsla)))
}

pub(super) fn mix(args: &Args<'_>) -> Result<Option<Entity>> {
    let (Some(c1), Some(c2)) = (args.color(0)?, args.color(1)?) else {
        return Ok(None);
    };
    let weight = match args.get(2) {
        Some(_) => args.dimension(2)?.value,
        None => 50.0,
    };
    Ok(color(mix_colors(c1, c2, weight / 100.0)))
}

fn mix_colors(c1: &Color, c2: &Color, p: f64) -> Color {
    let w = p * 2.0 - 1.0;
    let a = c1.alpha - c2.alpha;
    let weighted = if w * a == -1.0 { w } else { (w + a) / (1.0 + w * a) };
    let w1 = (weighted + 1.0) / 2.0;
    let w2 = 1.0 - w1;

    let mut rgb = [0.0; 3];
    for (i, channel) in rgb.iter_mut().enumerate() {
        *channel = c1.rgb[i] * w1 + c2.rgb[i] * w2;
    }
    Color::new(rgb, c1.alpha * p + c2.alpha * (1.0 - p))
}

pub(super) fn contrast(args: &Args<'_>) -> Result<Option<Entity>> {
    let Some(c) = args.color(0)? else { return Ok(None) };
    let optional = |i| args.get(i).and_then(Entity::as_color).copied();
    let mut dark = optional(1).unwrap_or(Color::new([0.0; 3], 1.0));
    let mut light = optional(2).unwrap_or(Color::new([255.0; 3], 1.0));
    if dark.luma() > light.luma() {
        std::mem::swap(&mut dark, &mut light);
    }
    let threshold = match args.get(3) {
        Some(_) => args.number(3)?,
        None => 0.43,
    };
    Ok(color(if c.luma() * c.alpha < threshold { light } else { dark }))
}

/// Blend two colours channel by channel; the result is opaque.
fn blend(args: &Args<'_>, f: impl Fn(f64, f64) -> f64) -> Result<Option<Entity>> {
    let (Some(c1), Some(c2)) = (args.color(0)?, args.color(1)?) else {
        return Ok(None);
    };
    let mut rgb = [0.0; 3];
    for (i, channel) in rgb.iter_mut().enumerate() {
        *channel = f(c1.rgb[i], c2.rgb[i]);
    }
    Ok(color(Color::new(rgb, 1.0)))
}

pub(super) fn multiply(args: &Args<'_>) -> Result<Option<Entity>> {
    blend(args, |a, b| a * b / 255.0)
}

pub(super) fn screen(args: &Args<'_>) -> Result<Option<Entity>> {
    blend(args, |a, b| 255.0 - (255.0 - a) * (255.0 - b) / 255.0)
}

pub(super) fn average(args: &Args<'_>) -> Result<Option<Entity>> {
    blend(args, |a, b| (a + b) / 2.0)
}

pub(super) fn difference(args: &Args<'_>) -> Result<Option<Entity>> {
    blend(args, |a, b| (a - b).abs())
}

#[cfg(test)]
mod tests {
    use crate::functions::call;
    use crate::tree::{Color, Dimension, Entity};

    fn hex(h: &str) -> Entity {
        Entity::Color(Color::from_hex(h).unwrap())
    }

    fn pct(v: f64) -> Entity {
        Entity::Dimension(Dimension::new(v, Some("%")))
    }

    fn num(v: f64) -> Entity {
        Entity::Dimension(Dimension::number(v))
    }

    fn css(name: &str, args: &[Entity]) -> String {
        call(name, args).unwrap().unwrap().to_css(false)
    }

    #[test]
    fn test_constructors() {
        assert_eq!(css("rgb", &[num(255.0), num(128.0), num(0.0)]), "#ff8000");
        assert_eq!(css("rgba", &[num(0.0), num(0.0), num(0.0), num(0.5)]), "rgba(0, 0, 0, 0.5)");
        assert_eq!(css("rgb", &[pct(100.0), pct(0.0), pct(0.0)]), "#ff0000");
        assert_eq!(css("hsl", &[num(120.0), pct(100.0), pct(50.0)]), "#00ff00");
        assert_eq!(css("hsv", &[num(240.0), pct(100.0), pct(100.0)]), "#0000ff");
    }

    #[test]
    fn test_inspection() {
        assert_eq!(css("hue", &[hex("00ff00")]), "120");
        assert_eq!(css("saturation", &[hex("ff0000")]), "100%");
        assert_eq!(css("lightness", &[hex("ff0000")]), "50%");
        assert_eq!(css("red", &[hex("102030")]), "16");
        assert_eq!(css("luma", &[hex("ffffff")]), "100%");
    }

    #[test]
    fn test_adjusters() {
        assert_eq!(css("lighten", &[hex("000000"), pct(50.0)]), "#808080");
        assert_eq!(css("darken", &[hex("ffffff"), pct(100.0)]), "#000000");
        assert_eq!(css("spin", &[hex("ff0000"), num(120.0)]), "#00ff00");
        assert_eq!(css("spin", &[hex("ff0000"), num(-240.0)]), "#00ff00");
        assert_eq!(css("greyscale", &[hex("ff0000")]), "#808080");
        assert_eq!(css("fade", &[hex("ff0000"), pct(50.0)]), "rgba(255, 0, 0, 0.5)");
    }

    #[test]
    fn test_mixing_and_contrast() {
        assert_eq!(css("mix", &[hex("ff0000"), hex("0000ff")]), "#800080");
        assert_eq!(css("mix", &[hex("ff0000"), hex("0000ff"), pct(100.0)]), "#ff0000");
        assert_eq!(css("contrast", &[hex("222222")]), "#ffffff");
        assert_eq!(css("contrast", &[hex("eeeeee")]), "#000000");
        assert_eq!(css("multiply", &[hex("ff8000"), hex("808080")]), "#804000");
        assert_eq!(css("difference", &[hex("ff0000"), hex("00ff00")]), "#ffff00");
    }

    #[test]
    fn test_non_colours_pass_through() {
        assert!(call("saturate", &[num(3.2)]).unwrap().is_none());
        assert!(call("contrast", &[num(2.0)]).unwrap().is_none());
    }
}
