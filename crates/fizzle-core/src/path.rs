//! SVG path data: parser, emitter and extent.
//!
//! Built on `winnow` 0.7. Handles the full command set (`M L H V C S Q T A Z`,
//! absolute and relative, implicit repeats, compact number syntax such as
//! `M0,0L10-5.5.5.5`). Every command is resolved to absolute coordinates;
//! `H`/`V` become `LineTo`, smooth curves get their reflected control point.

use crate::model::Bounds;
use serde_json::Value;
use winnow::combinator::opt;
use winnow::error::{ContextError, ErrMode};
use winnow::prelude::*;
use winnow::token::{one_of, take_while};

/// One absolute path command.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PathCmd {
    MoveTo(f64, f64),
    LineTo(f64, f64),
    QuadTo(f64, f64, f64, f64),
    CubicTo(f64, f64, f64, f64, f64, f64),
    ArcTo {
        rx: f64,
        ry: f64,
        rotation: f64,
        large_arc: bool,
        sweep: bool,
        x: f64,
        y: f64,
    },
    Close,
}

/// Pen position carried between commands.
#[derive(Debug, Default)]
struct Pen {
    x: f64,
    y: f64,
    start_x: f64,
    start_y: f64,
    /// Last cubic control point, for `S`.
    cubic_ctrl: Option<(f64, f64)>,
    /// Last quadratic control point, for `T`.
    quad_ctrl: Option<(f64, f64)>,
}

impl Pen {
    fn offset(&self, relative: bool) -> (f64, f64) {
        if relative { (self.x, self.y) } else { (0.0, 0.0) }
    }

    fn reflect(&self, ctrl: Option<(f64, f64)>) -> (f64, f64) {
        match ctrl {
            Some((cx, cy)) => (2.0 * self.x - cx, 2.0 * self.y - cy),
            None => (self.x, self.y),
        }
    }
}

/// Parse SVG path data into absolute commands.
#[must_use = "parsing result should be used"]
pub fn parse_path_data(input: &str) -> Result<Vec<PathCmd>, String> {
    let mut rest = input;
    let mut pen = Pen::default();
    let mut cmds = Vec::new();

    skip_separators(&mut rest);
    while !rest.is_empty() {
        let letter: char = one_of(|c: char| "MmLlHhVvCcSsQqTtAaZz".contains(c))
            .parse_next(&mut rest)
            .map_err(|e: ErrMode<ContextError>| {
                format!("path parse error near `{}`: {e}", preview(rest))
            })?;
        parse_segments(letter, &mut rest, &mut pen, &mut cmds)
            .map_err(|e| format!("path parse error in `{letter}` near `{}`: {e}", preview(rest)))?;
        skip_separators(&mut rest);
    }

    if !matches!(cmds.first(), None | Some(PathCmd::MoveTo(..))) {
        return Err("path data must start with a moveto".into());
    }
    Ok(cmds)
}

fn preview(rest: &str) -> &str {
    let end = rest.char_indices().nth(12).map_or(rest.len(), |(i, _)| i);
    &rest[..end]
}

fn parse_segments(
    letter: char,
    input: &mut &str,
    pen: &mut Pen,
    cmds: &mut Vec<PathCmd>,
) -> ModalResult<()> {
    let relative = letter.is_ascii_lowercase();

    if letter.eq_ignore_ascii_case(&'z') {
        cmds.push(PathCmd::Close);
        pen.x = pen.start_x;
        pen.y = pen.start_y;
        pen.cubic_ctrl = None;
        pen.quad_ctrl = None;
        return Ok(());
    }

    let mut first = true;
    while first || starts_number(input) {
        let (ox, oy) = pen.offset(relative);
        let mut cubic_ctrl = None;
        let mut quad_ctrl = None;

        let cmd = match letter.to_ascii_uppercase() {
            'M' => {
                let [x, y] = coords(input)?;
                let (x, y) = (ox + x, oy + y);
                if first {
                    pen.start_x = x;
                    pen.start_y = y;
                    PathCmd::MoveTo(x, y)
                } else {
                    // Extra coordinate pairs after a moveto are implicit linetos.
                    PathCmd::LineTo(x, y)
                }
            }
            'L' => {
                let [x, y] = coords(input)?;
                PathCmd::LineTo(ox + x, oy + y)
            }
            'H' => {
                let [x] = coords(input)?;
                PathCmd::LineTo(ox + x, pen.y)
            }
            'V' => {
                let [y] = coords(input)?;
                PathCmd::LineTo(pen.x, oy + y)
            }
            'C' => {
                let [x1, y1, x2, y2, x, y] = coords(input)?;
                cubic_ctrl = Some((ox + x2, oy + y2));
                PathCmd::CubicTo(ox + x1, oy + y1, ox + x2, oy + y2, ox + x, oy + y)
            }
            'S' => {
                let [x2, y2, x, y] = coords(input)?;
                let (x1, y1) = pen.reflect(pen.cubic_ctrl);
                cubic_ctrl = Some((ox + x2, oy + y2));
                PathCmd::CubicTo(x1, y1, ox + x2, oy + y2, ox + x, oy + y)
            }
            'Q' => {
                let [x1, y1, x, y] = coords(input)?;
                quad_ctrl = Some((ox + x1, oy + y1));
                PathCmd::QuadTo(ox + x1, oy + y1, ox + x, oy + y)
            }
            'T' => {
                let [x, y] = coords(input)?;
                let (x1, y1) = pen.reflect(pen.quad_ctrl);
                quad_ctrl = Some((x1, y1));
                PathCmd::QuadTo(x1, y1, ox + x, oy + y)
            }
            'A' => {
                let [rx, ry, rotation] = coords(input)?;
                let large_arc = parse_flag(input)?;
                let sweep = parse_flag(input)?;
                let [x, y] = coords(input)?;
                PathCmd::ArcTo {
                    rx,
                    ry,
                    rotation,
                    large_arc,
                    sweep,
                    x: ox + x,
                    y: oy + y,
                }
            }
            _ => return Err(ErrMode::Backtrack(ContextError::new())),
        };

        if let Some((x, y)) = end_point(&cmd) {
            pen.x = x;
            pen.y = y;
        }
        pen.cubic_ctrl = cubic_ctrl;
        pen.quad_ctrl = quad_ctrl;
        cmds.push(cmd);
        first = false;
    }
    Ok(())
}

fn end_point(cmd: &PathCmd) -> Option<(f64, f64)> {
    match *cmd {
        PathCmd::MoveTo(x, y)
        | PathCmd::LineTo(x, y)
        | PathCmd::QuadTo(_, _, x, y)
        | PathCmd::CubicTo(_, _, _, _, x, y)
        | PathCmd::ArcTo { x, y, .. } => Some((x, y)),
        PathCmd::Close => None,
    }
}

// ─── Lexical helpers ─────────────────────────────────────────────────────

fn skip_separators(input: &mut &str) {
    *input = input.trim_start_matches(|c: char| c.is_whitespace() || c == ',');
}

fn starts_number(input: &mut &str) -> bool {
    skip_separators(input);
    input
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_digit() || matches!(c, '-' | '+' | '.'))
}

fn coords<const N: usize>(input: &mut &str) -> ModalResult<[f64; N]> {
    let mut out = [0.0; N];
    for slot in &mut out {
        *slot = parse_number(input)?;
    }
    Ok(out)
}

fn parse_flag(input: &mut &str) -> ModalResult<bool> {
    skip_separators(input);
    one_of(['0', '1']).map(|c| c == '1').parse_next(input)
}

fn parse_number(input: &mut &str) -> ModalResult<f64> {
    skip_separators(input);
    let matched = number_text(input)?;
    matched
        .parse::<f64>()
        .map_err(|_| ErrMode::Backtrack(ContextError::new()))
}

/// `[+-]digits[.digits][e[+-]digits]`; validity is left to `str::parse`.
fn number_text<'a>(input: &mut &'a str) -> ModalResult<&'a str> {
    let digits = |c: char| c.is_ascii_digit();
    (
        opt(one_of(['+', '-'])),
        take_while(0.., digits),
        opt(('.', take_while(0.., digits))),
        opt((one_of(['e', 'E']), opt(one_of(['+', '-'])), take_while(1.., digits))),
    )
        .take()
        .parse_next(input)
}

// ─── Emitter ─────────────────────────────────────────────────────────────

/// Emit absolute commands as compact SVG path data.
pub fn emit_path_data(cmds: &[PathCmd]) -> String {
    let mut out = Vec::with_capacity(cmds.len());
    for cmd in cmds {
        out.push(match *cmd {
            PathCmd::MoveTo(x, y) => format!("M {x} {y}"),
            PathCmd::LineTo(x, y) => format!("L {x} {y}"),
            PathCmd::QuadTo(x1, y1, x, y) => format!("Q {x1} {y1} {x} {y}"),
            PathCmd::CubicTo(x1, y1, x2, y2, x, y) => format!("C {x1} {y1} {x2} {y2} {x} {y}"),
            PathCmd::ArcTo {
                rx,
                ry,
                rotation,
                large_arc,
                sweep,
                x,
                y,
            } => format!(
                "A {rx} {ry} {rotation} {} {} {x} {y}",
                u8::from(large_arc),
                u8::from(sweep)
            ),
            PathCmd::Close => "Z".to_string(),
        });
    }
    out.join(" ")
}

/// Control-point hull in path coordinates. Curves never leave the hull of
/// their control points, so this never under-reports.
pub fn hull(cmds: &[PathCmd]) -> Option<Bounds> {
    let mut xs = Vec::new();
    let mut ys = Vec::new();
    for cmd in cmds {
        match *cmd {
            PathCmd::MoveTo(x, y) | PathCmd::LineTo(x, y) | PathCmd::ArcTo { x, y, .. } => {
                xs.push(x);
                ys.push(y);
            }
            PathCmd::QuadTo(x1, y1, x, y) => {
                xs.extend([x1, x]);
                ys.extend([y1, y]);
            }
            PathCmd::CubicTo(x1, y1, x2, y2, x, y) => {
                xs.extend([x1, x2, x]);
                ys.extend([y1, y2, y]);
            }
            PathCmd::Close => {}
        }
    }
    if xs.is_empty() {
        return None;
    }
    let min = |v: &[f64]| v.iter().copied().fold(f64::MAX, f64::min);
    let max = |v: &[f64]| v.iter().copied().fold(f64::MIN, f64::max);
    Some(Bounds {
        x: min(&xs),
        y: min(&ys),
        width: max(&xs) - min(&xs),
        height: max(&ys) - min(&ys),
    })
}

/// Width and height of [`hull`].
pub fn extent(cmds: &[PathCmd]) -> (f64, f64) {
    hull(cmds).map_or((0.0, 0.0), |b| (b.width, b.height))
}

/// Read a fabric `path` property: either a path string or fabric's
/// segment array (`[["M", 0, 0], ["L", 10, 10]]`).
pub fn data_from_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(segments) => segments
            .iter()
            .filter_map(Value::as_array)
            .map(|segment| {
                segment
                    .iter()
                    .map(|part| match part {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .collect::<Vec<_>>()
            .join(" "),
        _ => String::new(),
    }
}
