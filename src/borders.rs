//! Cell borders and fills
//!
//! Borders are four independent segments rather than one stroked rectangle,
//! so neighbouring cells with different weights meet at shared edges. Every
//! segment runs half its own width past both ends to close the corners.

use crate::sink::{DrawCommand, LineCommand, Point, Rect};
use crate::style::{BorderSide, CellBorders, Color};
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BorderOptions {
    /// Leave out the top and left sides, drawn by the neighbouring cells
    pub skip_left_top: bool,
    /// Print scale; border widths are divided by it
    pub scale: f32,
}

impl Default for BorderOptions {
    fn default() -> Self {
        Self {
            skip_left_top: false,
            scale: 1.0,
        }
    }
}

impl BorderOptions {
    pub fn scaled(scale: f32) -> Self {
        Self {
            scale,
            ..Self::default()
        }
    }

    pub fn skipping_left_top(mut self) -> Self {
        self.skip_left_top = true;
        self
    }

    fn width(&self, side: &BorderSide) -> f32 {
        if !side.style.is_visible() {
            return 0.0;
        }
        let scale = if self.scale > 0.0 { self.scale } else { 1.0 };
        side.style.width() / scale
    }
}

fn segment(side: &BorderSide, width: f32, from: Point, to: Point) -> DrawCommand {
    DrawCommand::Line(LineCommand {
        from,
        to,
        width,
        color: side.color,
        dash: side.style.dash(),
    })
}

/// Line segments of a cell's visible borders, in top, right, bottom, left order
pub fn border_lines(rect: Rect, borders: &CellBorders, options: BorderOptions) -> Vec<DrawCommand> {
    let mut lines = Vec::with_capacity(4);
    let (left, top, right, bottom) = (rect.x, rect.y, rect.right(), rect.bottom());

    let sides = [&borders.top, &borders.right, &borders.bottom, &borders.left];
    for (index, side) in sides.into_iter().enumerate() {
        if options.skip_left_top && (index == 0 || index == 3) {
            continue;
        }
        let width = options.width(side);
        if width <= 0.0 {
            continue;
        }
        let half = width / 2.0;
        let (from, to) = match index {
            0 => (Point::new(left - half, top), Point::new(right + half, top)),
            1 => (Point::new(right, top - half), Point::new(right, bottom + half)),
            2 => (Point::new(left - half, bottom), Point::new(right + half, bottom)),
            _ => (Point::new(left, top - half), Point::new(left, bottom + half)),
        };
        lines.push(segment(side, width, from, to));
    }
    trace!("Cell border: {} segments", lines.len());
    lines
}

/// Fill inside the borders, inset by half of each side's width.
///
/// Returns `None` when nothing is left to fill.
pub fn fill_rect(
    rect: Rect,
    color: Color,
    borders: &CellBorders,
    options: BorderOptions,
) -> Option<DrawCommand> {
    let inner = rect.inset(
        options.width(&borders.top) / 2.0,
        options.width(&borders.right) / 2.0,
        options.width(&borders.bottom) / 2.0,
        options.width(&borders.left) / 2.0,
    );
    if inner.is_degenerate() {
        return None;
    }
    Some(DrawCommand::FillRect { rect: inner, color })
}

/// Fill first, then borders
pub fn render_cell(
    rect: Rect,
    fill: Option<Color>,
    borders: &CellBorders,
    options: BorderOptions,
) -> Vec<DrawCommand> {
    let mut commands: Vec<DrawCommand> = fill
        .and_then(|color| fill_rect(rect, color, borders, options))
        .into_iter()
        .collect();
    commands.extend(border_lines(rect, borders, options));
    commands
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::{BorderStyle, DashStyle};

    fn lines(commands: &[DrawCommand]) -> Vec<LineCommand> {
        commands
            .iter()
            .filter_map(|c| match c {
                DrawCommand::Line(line) => Some(*line),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_segments_extend_by_half_width() {
        let borders = CellBorders::uniform(BorderSide::new(BorderStyle::Thick, Color::black()));
        let rect = Rect::new(10.0, 20.0, 100.0, 50.0);
        let segments = lines(&border_lines(rect, &borders, BorderOptions::default()));
        assert_eq!(segments.len(), 4);

        let top = segments[0];
        assert_eq!(top.width, 0.75);
        assert_eq!(top.from, Point::new(10.0 - 0.375, 20.0));
        assert_eq!(top.to, Point::new(110.0 + 0.375, 20.0));

        let left = segments[3];
        assert_eq!(left.from, Point::new(10.0, 20.0 - 0.375));
        assert_eq!(left.to, Point::new(10.0, 70.0 + 0.375));
    }

    #[test]
    fn test_mixed_sides() {
        let borders = CellBorders {
            top: BorderSide::thin(),
            right: BorderSide::none(),
            bottom: BorderSide::new(BorderStyle::Dashed, Color::rgb(1.0, 0.0, 0.0)),
            left: BorderSide::new(BorderStyle::Medium, Color::black()),
        };
        let segments = lines(&border_lines(
            Rect::new(0.0, 0.0, 10.0, 10.0),
            &borders,
            BorderOptions::default(),
        ));
        assert_eq!(segments.len(), 3);
        assert_eq!(segments[1].dash, DashStyle::Dashed);
        assert_eq!(segments[2].width, 0.5);
    }

    #[test]
    fn test_none_draws_nothing() {
        let out = render_cell(
            Rect::new(0.0, 0.0, 10.0, 10.0),
            None,
            &CellBorders::none(),
            BorderOptions::default(),
        );
        assert!(out.is_empty());
    }

    #[test]
    fn test_skip_left_top_and_scale() {
        let borders = CellBorders::uniform(BorderSide::new(BorderStyle::Medium, Color::black()));
        let options = BorderOptions::scaled(0.5).skipping_left_top();
        let segments = lines(&border_lines(Rect::new(0.0, 0.0, 10.0, 10.0), &borders, options));
        assert_eq!(segments.len(), 2);
        // right then bottom
        assert_eq!(segments[0].from.x, 10.0);
        assert_eq!(segments[1].from.y, 10.0);
        assert_eq!(segments[0].width, 1.0);
    }

    #[test]
    fn test_fill_is_inset_and_drawn_first() {
        let borders = CellBorders::uniform(BorderSide::new(BorderStyle::Thick, Color::black()));
        let out = render_cell(
            Rect::new(0.0, 0.0, 20.0, 10.0),
            Some(Color::light_gray()),
            &borders,
            BorderOptions::default(),
        );
        assert_eq!(out.len(), 5);
        let DrawCommand::FillRect { rect, .. } = &out[0] else {
            panic!("fill must come first");
        };
        assert_eq!(*rect, Rect::new(0.375, 0.375, 19.25, 9.25));
    }

    #[test]
    fn test_degenerate_fill_is_dropped() {
        let borders = CellBorders::uniform(BorderSide::new(BorderStyle::Thick, Color::black()));
        assert!(
            fill_rect(
                Rect::new(0.0, 0.0, 0.5, 10.0),
                Color::white(),
                &borders,
                BorderOptions::default()
            )
            .is_none()
        );
    }
}
