//! Built-in functions.
//!
//! A call to a name listed here is evaluated at compile time. Any other name,
//! and colour functions applied to something that is not a colour (e.g. the
//! CSS filter `saturate(3.2)`), are left in the output as plain CSS calls.

mod color;

use std::sync::LazyLock;

use regex::Regex;

use crate::error::{Error, Result};
use crate::logging::targets;
use crate::tree::{Color, Dimension, Entity, Quoted};

type Builtin = fn(&Args<'_>) -> Result<Option<Entity>>;

fn lookup(name: &str) -> Option<Builtin> {
    let builtin: Builtin = match name {
        "rgb" => color::rgb,
        "rgba" => color::rgba,
        "hsl" => color::hsl,
        "hsla" => color::hsla,
        "hsv" => color::hsv,
        "hsva" => color::hsva,
        "hue" => color::hue,
        "saturation" => color::saturation,
        "lightness" => color::lightness,
        "red" => color::red,
        "green" => color::green,
        "blue" => color::blue,
        "alpha" => color::alpha,
        "luma" => color::luma,
        "saturate" => color::saturate,
        "desaturate" => color::desaturate,
        "lighten" => color::lighten,
        "darken" => color::darken,
        "fadein" => color::fadein,
        "fadeout" => color::fadeout,
        "fade" => color::fade,
        "spin" => color::spin,
        "mix" => color::mix,
        "greyscale" => color::greyscale,
        "contrast" => color::contrast,
        "multiply" => color::multiply,
        "screen" => color::screen,
        "average" => color::average,
        "difference" => color::difference,
        "e" => e,
        "escape" => escape,
        "%" => format_string,
        "unit" => unit,
        "round" => round,
        "ceil" => |args| math(args, f64::ceil),
        "floor" => |args| math(args, f64::floor),
        "sqrt" => |args| math(args, f64::sqrt),
        "abs" => |args| math(args, f64::abs),
        "percentage" => percentage,
        "pow" => pow,
        "mod" => modulo,
        "pi" => |_| Ok(Some(Entity::Dimension(Dimension::number(std::f64::consts::PI)))),
        "iscolor" => |args| is(args, |v| matches!(v, Entity::Color(_))),
        "isnumber" => |args| is(args, |v| matches!(v, Entity::Dimension(_))),
        "isstring" => |args| is(args, |v| matches!(v, Entity::Quoted(_))),
        "iskeyword" => |args| is(args, |v| matches!(v, Entity::Keyword(_))),
        "isurl" => |args| is(args, |v| matches!(v, Entity::Url(_))),
        "ispixel" => |args| is(args, |v| has_unit(v, "px")),
        "ispercentage" => |args| is(args, |v| has_unit(v, "%")),
        "isem" => |args| is(args, |v| has_unit(v, "em")),
        _ => return None,
    };
    Some(builtin)
}

/// Evaluate a built-in function.
///
/// Returns `Ok(None)` when `name` is not a built-in, or when the built-in
/// declines its arguments and the call should be emitted verbatim.
pub(crate) fn call(name: &str, args: &[Entity]) -> Result<Option<Entity>> {
    let Some(builtin) = lookup(name) else {
        return Ok(None);
    };
    let result = builtin(&Args { name, args })?;
    if result.is_none() {
        tracing::trace!(target: targets::EVAL, function = name, "built-in declined its arguments");
    }
    Ok(result)
}

/// Evaluated arguments of one call, with typed accessors that report
/// misuse against the function name.
pub(crate) struct Args<'a> {
    name: &'a str,
    args: &'a [Entity],
}

impl<'a> Args<'a> {
    fn error(&self, message: impl Into<String>) -> Error {
        Error::argument(self.name, message)
    }

    fn get(&self, i: usize) -> Option<&'a Entity> {
        self.args.get(i)
    }

    fn arg(&self, i: usize) -> Result<&'a Entity> {
        self.get(i)
            .ok_or_else(|| self.error(format!("expected at least {} arguments", i + 1)))
    }

    /// A colour argument, or `None` when the argument is some other value.
    fn color(&self, i: usize) -> Result<Option<&'a Color>> {
        Ok(self.arg(i)?.as_color())
    }

    fn dimension(&self, i: usize) -> Result<&'a Dimension> {
        self.arg(i)?
            .as_dimension()
            .ok_or_else(|| self.error("argument must be a number"))
    }

    /// A number, with percentages as fractions of one.
    fn number(&self, i: usize) -> Result<f64> {
        let d = self
            .arg(i)?
            .as_dimension()
            .ok_or_else(|| self.error("color functions take numbers as parameters"))?;
        Ok(if d.unit() == Some("%") { d.value / 100.0 } else { d.value })
    }

    /// A number, with percentages as fractions of `size`.
    fn scaled(&self, i: usize, size: f64) -> Result<f64> {
        match self.arg(i)?.as_dimension() {
            Some(d) if d.unit() == Some("%") => Ok(d.value * size / 100.0),
            _ => self.number(i),
        }
    }
}

pub(crate) fn clamp(value: f64) -> f64 {
    value.clamp(0.0, 1.0)
}

/// Text content of a string, or the CSS of anything else.
fn text(value: &Entity) -> String {
    match value {
        Entity::Quoted(q) => q.content.clone(),
        other => other.to_css(false),
    }
}

fn e(args: &Args<'_>) -> Result<Option<Entity>> {
    Ok(Some(Entity::Anonymous(text(args.arg(0)?))))
}

fn escape(args: &Args<'_>) -> Result<Option<Entity>> {
    let encoded = percent_encode(&text(args.arg(0)?), |c| "-_.!~*'/?@&+$,".contains(c));
    Ok(Some(Entity::Anonymous(encoded)))
}

static FORMAT_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)%[sda]").expect("valid format token pattern"));

/// `%("%d/%s", a, b)`: substitute arguments into a format string.
///
/// `%s` inserts string content, `%d` and `%a` insert the CSS form.
/// Upper-case tokens URL-encode what they insert.
fn format_string(args: &Args<'_>) -> Result<Option<Entity>> {
    let template = args.arg(0)?;
    let mut out = text(template);
    for arg in &args.args[1..] {
        let Some(token) = FORMAT_TOKEN.find(&out) else {
            break;
        };
        let range = token.range();
        let token_text = token.as_str();
        let value = if token_text.eq_ignore_ascii_case("%s") {
            text(arg)
        } else {
            arg.to_css(false)
        };
        let value = if token_text.ends_with(|c: char| c.is_ascii_uppercase()) {
            percent_encode(&value, |c| "-_.!~*'()".contains(c))
        } else {
            value
        };
        out.replace_range(range, &value);
    }
    let out = out.replace("%%", "%");
    let index = match template {
        Entity::Quoted(q) => q.index,
        _ => 0,
    };
    Ok(Some(Entity::Quoted(Quoted::new(Some('"'), out, index))))
}

/// Percent-encode everything except ASCII alphanumerics and `keep`.
fn percent_encode(text: &str, keep: impl Fn(char) -> bool) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if c.is_ascii_alphanumeric() || keep(c) {
            out.push(c);
        } else {
            let mut buf = [0u8; 4];
            for byte in c.encode_utf8(&mut buf).bytes() {
                out.push_str(&format!("%{byte:02X}"));
            }
        }
    }
    out
}

fn unit(args: &Args<'_>) -> Result<Option<Entity>> {
    let value = args.arg(0)?;
    let Some(d) = value.as_dimension() else {
        let hint = if matches!(value, Entity::Operation(_)) {
            ". Have you forgotten parenthesis?"
        } else {
            ""
        };
        return Err(args.error(format!(
            "the first argument to unit must be a number{hint}"
        )));
    };
    let unit = args.get(1).map(text);
    Ok(Some(Entity::Dimension(Dimension::new(d.value, unit.as_deref()))))
}

fn round(args: &Args<'_>) -> Result<Option<Entity>> {
    let places = match args.get(1) {
        Some(_) => args.dimension(1)?.value.max(0.0),
        None => 0.0,
    };
    let scale = 10f64.powi(places as i32);
    math(args, |v| (v * scale).round() / scale)
}

/// Apply `f` to a number, keeping its unit.
fn math(args: &Args<'_>, f: impl Fn(f64) -> f64) -> Result<Option<Entity>> {
    let d = args.dimension(0)?;
    Ok(Some(Entity::Dimension(Dimension::new(f(d.value), d.unit()))))
}

fn percentage(args: &Args<'_>) -> Result<Option<Entity>> {
    let d = args.dimension(0)?;
    Ok(Some(Entity::Dimension(Dimension::new(d.value * 100.0, Some("%")))))
}

fn pow(args: &Args<'_>) -> Result<Option<Entity>> {
    let (x, y) = (args.dimension(0)?, args.dimension(1)?);
    Ok(Some(Entity::Dimension(Dimension::new(x.value.powf(y.value), x.unit()))))
}

fn modulo(args: &Args<'_>) -> Result<Option<Entity>> {
    let (a, b) = (args.dimension(0)?, args.dimension(1)?);
    if b.value == 0.0 {
        return Err(args.error("division by zero"));
    }
    Ok(Some(Entity::Dimension(Dimension::new(a.value % b.value, a.unit()))))
}

fn has_unit(value: &Entity, unit: &str) -> bool {
    value.as_dimension().is_some_and(|d| d.unit() == Some(unit))
}

fn is(args: &Args<'_>, test: impl Fn(&Entity) -> bool) -> Result<Option<Entity>> {
    let answer = if test(args.arg(0)?) { "true" } else { "false" };
    Ok(Some(Entity::Keyword(answer.to_owned())))
}
