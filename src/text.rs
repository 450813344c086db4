//! Text flow formatting: word wrapping, line metrics and alignment
//!
//! Styled fragments are split into whitespace-delimited words. A word may
//! span several fragments when no whitespace separates them, so a style
//! change in the middle of a word never opens a break opportunity. Words are
//! placed greedily; a word wider than the line is placed alone and never
//! split.

use crate::constants::*;
use crate::font::{TextMeasurer, TextMetrics};
use crate::sink::{DrawCommand, LineCommand, Point, Rect, TextCommand};
use crate::style::{Alignment, DashStyle, LineSpacing, TextStyle, VerticalAlignment};
use tracing::trace;

/// A styled piece of input
#[derive(Debug, Clone, PartialEq)]
pub enum Fragment {
    Text { text: String, style: TextStyle },
    /// Unbreakable inline box; `key` identifies it to the caller
    Object { key: usize, width: f32, height: f32 },
}

impl Fragment {
    pub fn text(text: impl Into<String>, style: TextStyle) -> Self {
        Self::Text {
            text: text.into(),
            style,
        }
    }

    pub fn object(key: usize, width: f32, height: f32) -> Self {
        Self::Object { key, width, height }
    }
}

/// Line box options
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlowOptions {
    pub max_width: f32,
    pub alignment: Alignment,
    /// Signed offset of the first line; negative hangs it to the left
    pub first_line_indent: f32,
    pub line_spacing: LineSpacing,
}

impl FlowOptions {
    pub fn new(max_width: f32) -> Self {
        Self {
            max_width,
            alignment: Alignment::Left,
            first_line_indent: 0.0,
            line_spacing: LineSpacing::Single,
        }
    }

    pub fn with_alignment(mut self, alignment: Alignment) -> Self {
        self.alignment = alignment;
        self
    }

    pub fn with_first_line_indent(mut self, indent: f32) -> Self {
        self.first_line_indent = indent;
        self
    }

    pub fn with_line_spacing(mut self, spacing: LineSpacing) -> Self {
        self.line_spacing = spacing;
        self
    }
}

/// An item positioned on a line; `x` is relative to the line box start
#[derive(Debug, Clone, PartialEq)]
pub enum PlacedItem {
    Text {
        text: String,
        style: TextStyle,
        x: f32,
        width: f32,
    },
    Object {
        key: usize,
        x: f32,
        width: f32,
        height: f32,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    pub items: Vec<PlacedItem>,
    /// Top of the line relative to the top of the text
    pub y: f32,
    pub height: f32,
    /// Baseline offset from the top of the line
    pub baseline: f32,
    /// Width of the content before alignment
    pub width: f32,
    /// The line was ended by an explicit break
    pub hard_break: bool,
}

impl Line {
    /// Text of the line, with a space wherever items are separated by a gap
    pub fn text(&self) -> String {
        let mut out = String::new();
        let mut end: Option<f32> = None;
        for item in &self.items {
            let (x, width, text) = match item {
                PlacedItem::Text { text, x, width, .. } => (*x, *width, text.as_str()),
                PlacedItem::Object { x, width, .. } => (*x, *width, "\u{fffc}"),
            };
            if end.is_some_and(|e| x > e + LAYOUT_EPSILON) {
                out.push(' ');
            }
            out.push_str(text);
            end = Some(x + width);
        }
        out
    }
}

/// Lines produced for a fragment list
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FormattedText {
    pub lines: Vec<Line>,
    pub height: f32,
}

impl FormattedText {
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn line_texts(&self) -> Vec<String> {
        self.lines.iter().map(Line::text).collect()
    }

    /// Keep the lines that fit in `max_height`; the first line always stays
    pub fn truncate_to_height(mut self, max_height: f32) -> Self {
        let keep = self
            .lines
            .iter()
            .position(|line| line.y + line.height > max_height + LAYOUT_EPSILON)
            .unwrap_or(self.lines.len())
            .max(1)
            .min(self.lines.len());
        if keep < self.lines.len() {
            trace!("Dropping {} lines that do not fit", self.lines.len() - keep);
            self.lines.truncate(keep);
            self.height = self.lines.iter().map(|l| l.height).sum();
        }
        self
    }

    /// Text and underline commands with the text box's top-left at (x, y)
    pub fn draw_commands(&self, x: f32, y: f32) -> Vec<DrawCommand> {
        let mut commands = Vec::new();
        for line in &self.lines {
            let top = y + line.y;
            let baseline = top + line.baseline;
            for item in &line.items {
                let PlacedItem::Text {
                    text,
                    style,
                    x: item_x,
                    width,
                } = item
                else {
                    continue;
                };
                commands.push(DrawCommand::Text(TextCommand {
                    x: x + item_x,
                    y: top,
                    width: *width,
                    height: line.height,
                    baseline,
                    text: text.clone(),
                    style: style.clone(),
                }));
                if style.underline {
                    let underline_y = baseline + style.size * UNDERLINE_OFFSET_RATIO;
                    commands.push(DrawCommand::Line(LineCommand {
                        from: Point::new(x + item_x, underline_y),
                        to: Point::new(x + item_x + width, underline_y),
                        width: style.size * UNDERLINE_WIDTH_RATIO,
                        color: style.color,
                        dash: DashStyle::Solid,
                    }));
                }
            }
        }
        commands
    }

    /// Inline objects as (key, rect) with the text box's top-left at (x, y);
    /// objects sit on the baseline
    pub fn objects(&self, x: f32, y: f32) -> Vec<(usize, Rect)> {
        self.lines
            .iter()
            .flat_map(|line| {
                line.items.iter().filter_map(move |item| match item {
                    PlacedItem::Object {
                        key,
                        x: item_x,
                        width,
                        height,
                    } => Some((
                        *key,
                        Rect::new(x + item_x, y + line.y + line.baseline - height, *width, *height),
                    )),
                    PlacedItem::Text { .. } => None,
                })
            })
            .collect()
    }
}

#[derive(Debug, Clone)]
struct Piece {
    fragment: usize,
    text: String,
    width: f32,
}

#[derive(Debug, Clone)]
struct Word {
    pieces: Vec<Piece>,
    width: f32,
    /// Width of the space that separates this word from the next
    gap: f32,
}

#[derive(Debug)]
enum Token {
    Word(Word),
    Break { fragment: usize },
}

/// Per-fragment metrics measured once per call
struct FragmentMetrics {
    vertical: TextMetrics,
    space: f32,
}

fn fragment_metrics(fragments: &[Fragment], measurer: &dyn TextMeasurer) -> Vec<FragmentMetrics> {
    fragments
        .iter()
        .map(|fragment| match fragment {
            Fragment::Text { style, .. } => FragmentMetrics {
                vertical: measurer.measure("", style),
                space: measurer.space_width(style),
            },
            Fragment::Object { height, .. } => FragmentMetrics {
                vertical: TextMetrics {
                    width: 0.0,
                    ascent: *height,
                    descent: 0.0,
                    leading: 0.0,
                },
                space: 0.0,
            },
        })
        .collect()
}

struct Tokenizer<'a> {
    fragments: &'a [Fragment],
    metrics: &'a [FragmentMetrics],
    measurer: &'a dyn TextMeasurer,
    tokens: Vec<Token>,
    word: Vec<Piece>,
    piece: String,
}

impl<'a> Tokenizer<'a> {
    fn run(
        fragments: &'a [Fragment],
        metrics: &'a [FragmentMetrics],
        measurer: &'a dyn TextMeasurer,
    ) -> Vec<Token> {
        let mut tokenizer = Self {
            fragments,
            metrics,
            measurer,
            tokens: Vec::new(),
            word: Vec::new(),
            piece: String::new(),
        };

        for (index, fragment) in fragments.iter().enumerate() {
            match fragment {
                Fragment::Text { text, .. } => {
                    let mut chars = text.chars().peekable();
                    while let Some(ch) = chars.next() {
                        match ch {
                            '\r' | '\n' => {
                                if ch == '\r' && chars.peek() == Some(&'\n') {
                                    chars.next();
                                }
                                tokenizer.end_word(index);
                                tokenizer.tokens.push(Token::Break { fragment: index });
                            }
                            '\u{a0}' => tokenizer.piece.push(' '),
                            c if c.is_whitespace() => tokenizer.end_word(index),
                            c => tokenizer.piece.push(c),
                        }
                    }
                    tokenizer.end_piece(index);
                }
                Fragment::Object { width, .. } => {
                    tokenizer.word.push(Piece {
                        fragment: index,
                        text: String::new(),
                        width: *width,
                    });
                }
            }
        }
        tokenizer.end_word(fragments.len().saturating_sub(1));
        tokenizer.tokens
    }

    fn end_piece(&mut self, fragment: usize) {
        if self.piece.is_empty() {
            return;
        }
        let text = std::mem::take(&mut self.piece);
        let width = match &self.fragments[fragment] {
            Fragment::Text { style, .. } => self.measurer.measure(&text, style).width,
            Fragment::Object { width, .. } => *width,
        };
        self.word.push(Piece {
            fragment,
            text,
            width,
        });
    }

    fn end_word(&mut self, fragment: usize) {
        self.end_piece(fragment);
        if self.word.is_empty() {
            return;
        }
        let pieces = std::mem::take(&mut self.word);
        let width = pieces.iter().map(|p| p.width).sum();
        let gap = pieces
            .iter()
            .rev()
            .map(|p| self.metrics[p.fragment].space)
            .find(|space| *space > 0.0)
            .unwrap_or(0.0);
        self.tokens.push(Token::Word(Word { pieces, width, gap }));
    }
}

struct LineBuilder {
    words: Vec<(Word, f32)>,
    cursor: f32,
    offset: f32,
}

impl LineBuilder {
    fn new(offset: f32) -> Self {
        Self {
            words: Vec::new(),
            cursor: 0.0,
            offset,
        }
    }

    fn content_width(&self) -> f32 {
        self.words.last().map(|(w, x)| x + w.width).unwrap_or(0.0)
    }

    fn push(&mut self, word: Word) {
        let x = self.cursor;
        self.cursor += word.width + word.gap;
        self.words.push((word, x));
    }
}

/// Break fragments into aligned lines no wider than `options.max_width`.
///
/// Pure: the same fragments, options and measurer always give the same
/// result. Empty or whitespace-only input produces no lines.
pub fn format(
    fragments: &[Fragment],
    options: &FlowOptions,
    measurer: &dyn TextMeasurer,
) -> FormattedText {
    let metrics = fragment_metrics(fragments, measurer);
    let tokens = Tokenizer::run(fragments, &metrics, measurer);

    let mut finished: Vec<(LineBuilder, Option<usize>)> = Vec::new();
    let mut line = LineBuilder::new(options.first_line_indent);

    for token in tokens {
        match token {
            Token::Word(word) => {
                let available = options.max_width - line.offset;
                if !line.words.is_empty() && line.cursor + word.width > available + LAYOUT_EPSILON
                {
                    finished.push((line, None));
                    line = LineBuilder::new(0.0);
                }
                line.push(word);
            }
            Token::Break { fragment } => {
                finished.push((line, Some(fragment)));
                line = LineBuilder::new(0.0);
            }
        }
    }

    let trailing_words = !line.words.is_empty();
    if trailing_words {
        finished.push((line, None));
    }

    let count = finished.len();
    let mut lines = Vec::with_capacity(count);
    let mut y = 0.0;
    for (index, (builder, break_fragment)) in finished.into_iter().enumerate() {
        let last = index + 1 == count && trailing_words;
        let line = finish_line(
            builder,
            break_fragment,
            last,
            y,
            fragments,
            &metrics,
            options,
        );
        y += line.height;
        lines.push(line);
    }

    trace!(
        "Formatted {} fragments into {} lines at width {}",
        fragments.len(),
        lines.len(),
        options.max_width
    );
    FormattedText { lines, height: y }
}

/// Convenience wrapper for a single-style string
pub fn format_text(
    text: &str,
    style: &TextStyle,
    options: &FlowOptions,
    measurer: &dyn TextMeasurer,
) -> FormattedText {
    format(&[Fragment::text(text, style.clone())], options, measurer)
}

fn finish_line(
    builder: LineBuilder,
    break_fragment: Option<usize>,
    last: bool,
    y: f32,
    fragments: &[Fragment],
    metrics: &[FragmentMetrics],
    options: &FlowOptions,
) -> Line {
    let mut used: Vec<usize> = builder
        .words
        .iter()
        .flat_map(|(w, _)| w.pieces.iter().map(|p| p.fragment))
        .collect();
    if used.is_empty() {
        used.extend(break_fragment);
    }
    used.sort_unstable();
    used.dedup();

    let (mut ascent, mut descent, mut natural) = (0.0f32, 0.0f32, 0.0f32);
    for &fragment in &used {
        let m = &metrics[fragment].vertical;
        ascent = ascent.max(m.ascent);
        descent = descent.max(m.descent);
        natural = natural.max(m.line_height());
    }
    let natural = natural.max(ascent + descent);
    let height = options.line_spacing.apply(natural);

    let content_width = builder.content_width();
    let available = options.max_width - builder.offset;
    let slack = (available - content_width).max(0.0);
    let justify = options.alignment == Alignment::Justify
        && break_fragment.is_none()
        && !last
        && builder.words.len() > 1;
    let (dx, extra_gap) = match options.alignment {
        Alignment::Left => (0.0, 0.0),
        Alignment::Center => (slack / 2.0, 0.0),
        Alignment::Right => (slack, 0.0),
        Alignment::Justify if justify => (0.0, slack / (builder.words.len() - 1) as f32),
        Alignment::Justify => (0.0, 0.0),
    };

    let mut items: Vec<(PlacedItem, usize)> = Vec::new();
    for (index, (word, word_x)) in builder.words.iter().enumerate() {
        let mut x = builder.offset + dx + word_x + extra_gap * index as f32;
        for piece in &word.pieces {
            let item = match &fragments[piece.fragment] {
                Fragment::Text { style, .. } => PlacedItem::Text {
                    text: piece.text.clone(),
                    style: style.clone(),
                    x,
                    width: piece.width,
                },
                Fragment::Object { key, width, height } => PlacedItem::Object {
                    key: *key,
                    x,
                    width: *width,
                    height: *height,
                },
            };
            items.push((item, piece.fragment));
            x += piece.width;
        }
    }

    Line {
        items: merge_items(items, metrics),
        y,
        height,
        baseline: ascent,
        width: content_width,
        hard_break: break_fragment.is_some(),
    }
}

/// Join neighbouring text items of one style that touch or are one space apart
fn merge_items(items: Vec<(PlacedItem, usize)>, metrics: &[FragmentMetrics]) -> Vec<PlacedItem> {
    let mut merged: Vec<(PlacedItem, usize)> = Vec::with_capacity(items.len());
    for (item, fragment) in items {
        if let Some((
            PlacedItem::Text {
                text: prev_text,
                style: prev_style,
                x: prev_x,
                width: prev_width,
            },
            prev_fragment,
        )) = merged.last_mut()
        {
            if let PlacedItem::Text {
                text, style, x, width,
            } = &item
            {
                if style == prev_style {
                    let gap = x - (*prev_x + *prev_width);
                    let space = metrics[*prev_fragment].space;
                    let joiner = if gap.abs() <= LAYOUT_EPSILON {
                        Some("")
                    } else if (gap - space).abs() <= LAYOUT_EPSILON {
                        Some(" ")
                    } else {
                        None
                    };
                    if let Some(joiner) = joiner {
                        prev_text.push_str(joiner);
                        prev_text.push_str(text);
                        *prev_width = x + width - *prev_x;
                        *prev_fragment = fragment;
                        continue;
                    }
                }
            }
        }
        merged.push((item, fragment));
    }
    merged.into_iter().map(|(item, _)| item).collect()
}

/// Position content of `needed` height inside `rect`.
///
/// The returned rect is `needed` tall. Middle shrinks the container
/// symmetrically by half the excess; content taller than the container
/// overflows evenly at top and bottom.
pub fn align_vertically(rect: Rect, needed: f32, alignment: VerticalAlignment) -> Rect {
    let excess = rect.height - needed;
    let y = match alignment {
        VerticalAlignment::Top => rect.y,
        VerticalAlignment::Middle => rect.y + excess / 2.0,
        VerticalAlignment::Bottom => rect.y + excess,
    };
    Rect::new(rect.x, y, rect.width, needed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::font::HeuristicMeasurer;

    fn arial(size: f32) -> TextStyle {
        TextStyle::new("Arial", size)
    }

    fn lines_of(text: &str, width: f32) -> Vec<String> {
        format_text(
            text,
            &arial(10.0),
            &FlowOptions::new(width),
            &HeuristicMeasurer::default(),
        )
        .line_texts()
    }

    #[test]
    fn test_hello_world_fits_one_line() {
        let style = arial(12.0);
        let measurer = HeuristicMeasurer::default();
        let text = format_text("Hello world", &style, &FlowOptions::new(200.0), &measurer);
        assert_eq!(text.lines.len(), 1);
        assert_eq!(text.line_texts(), vec!["Hello world"]);
        let one_line = measurer.measure("", &style).line_height();
        assert!((text.height - one_line).abs() < 0.001);
    }

    #[test]
    fn test_narrow_text_is_one_line() {
        for text in ["a", "two words", "a few more words here"] {
            assert_eq!(lines_of(text, 1000.0).len(), 1, "{text}");
        }
    }

    #[test]
    fn test_wraps_greedily() {
        // 5pt per char: "aaaa bbbb" is 45pt wide
        assert_eq!(lines_of("aaaa bbbb cccc", 45.0), vec!["aaaa bbbb", "cccc"]);
        assert_eq!(lines_of("aaaa bbbb cccc", 44.0), vec!["aaaa", "bbbb", "cccc"]);
    }

    #[test]
    fn test_long_word_stays_whole() {
        let lines = lines_of("tiny supercalifragilisticexpialidocious end", 50.0);
        assert_eq!(
            lines,
            vec!["tiny", "supercalifragilisticexpialidocious", "end"]
        );
    }

    #[test]
    fn test_long_word_first_on_line() {
        let lines = lines_of("supercalifragilistic", 10.0);
        assert_eq!(lines, vec!["supercalifragilistic"]);
    }

    #[test]
    fn test_empty_and_whitespace_text() {
        let measurer = HeuristicMeasurer::default();
        for text in ["", "   ", "\t "] {
            let out = format_text(text, &arial(10.0), &FlowOptions::new(100.0), &measurer);
            assert!(out.is_empty());
            assert_eq!(out.height, 0.0);
        }
    }

    #[test]
    fn test_hard_breaks() {
        assert_eq!(lines_of("Line 1\nLine 2\r\nLine 3", 200.0).len(), 3);
        assert_eq!(lines_of("a\n\nb", 200.0), vec!["a", "", "b"]);
        assert_eq!(lines_of("abc\n", 200.0), vec!["abc"]);
        assert_eq!(lines_of("\n", 200.0), vec![""]);
    }

    #[test]
    fn test_empty_line_keeps_style_height() {
        let measurer = HeuristicMeasurer::default();
        let out = format_text("a\n\nb", &arial(10.0), &FlowOptions::new(100.0), &measurer);
        assert_eq!(out.lines[1].height, out.lines[0].height);
        assert!((out.height - 36.0).abs() < 0.001);
    }

    #[test]
    fn test_idempotent() {
        let measurer = HeuristicMeasurer::default();
        let fragments = vec![
            Fragment::text("The quick brown ", arial(10.0)),
            Fragment::text("fox", arial(14.0).bold()),
            Fragment::text(" jumps over the lazy dog", arial(10.0)),
        ];
        let options = FlowOptions::new(80.0).with_alignment(Alignment::Justify);
        let first = format(&fragments, &options, &measurer);
        let second = format(&fragments, &options, &measurer);
        assert_eq!(first, second);
    }

    #[test]
    fn test_word_spanning_fragments_does_not_break() {
        let measurer = HeuristicMeasurer::default();
        let fragments = vec![
            Fragment::text("aa Hel", arial(10.0)),
            Fragment::text("lo", arial(10.0).bold()),
        ];
        // "aa" is 10pt; "Hello" cannot fit after it in 30pt
        let out = format(&fragments, &FlowOptions::new(30.0), &measurer);
        assert_eq!(out.line_texts(), vec!["aa", "Hello"]);
        let second = &out.lines[1].items;
        assert_eq!(second.len(), 2);
        let PlacedItem::Text { style, .. } = &second[1] else {
            panic!("expected text");
        };
        assert!(style.bold);
    }

    #[test]
    fn test_run_styles_stay_on_their_glyphs() {
        let measurer = HeuristicMeasurer::default();
        let red = arial(10.0).with_color(crate::style::Color::rgb(1.0, 0.0, 0.0));
        let fragments = vec![
            Fragment::text("plain ", arial(10.0)),
            Fragment::text("red", red.clone()),
            Fragment::text(" plain", arial(10.0)),
        ];
        let out = format(&fragments, &FlowOptions::new(500.0), &measurer);
        let styles: Vec<_> = out.lines[0]
            .items
            .iter()
            .map(|item| match item {
                PlacedItem::Text { text, style, .. } => (text.clone(), style.color),
                PlacedItem::Object { .. } => unreachable!(),
            })
            .collect();
        assert_eq!(styles.len(), 3);
        assert_eq!(styles[1], ("red".to_string(), red.color));
        assert_eq!(styles[0].1, crate::style::Color::black());
    }

    #[test]
    fn test_line_height_is_max_of_styles() {
        let measurer = HeuristicMeasurer::default();
        let fragments = vec![
            Fragment::text("small ", arial(10.0)),
            Fragment::text("BIG", arial(20.0)),
        ];
        let out = format(&fragments, &FlowOptions::new(500.0), &measurer);
        assert_eq!(out.lines.len(), 1);
        assert!((out.lines[0].height - 24.0).abs() < 0.001);
        assert!((out.lines[0].baseline - 16.0).abs() < 0.001);
    }

    #[test]
    fn test_alignment_offsets() {
        let measurer = HeuristicMeasurer::default();
        let first_x = |alignment| {
            let out = format_text(
                "abcd",
                &arial(10.0),
                &FlowOptions::new(100.0).with_alignment(alignment),
                &measurer,
            );
            match &out.lines[0].items[0] {
                PlacedItem::Text { x, .. } => *x,
                PlacedItem::Object { .. } => unreachable!(),
            }
        };
        assert_eq!(first_x(Alignment::Left), 0.0);
        assert_eq!(first_x(Alignment::Center), 40.0);
        assert_eq!(first_x(Alignment::Right), 80.0);
        // single last line of a justified paragraph stays left
        assert_eq!(first_x(Alignment::Justify), 0.0);
    }

    #[test]
    fn test_justify_fills_all_but_last_line() {
        let measurer = HeuristicMeasurer::default();
        let out = format_text(
            "aa bb cc dd ee",
            &arial(10.0),
            &FlowOptions::new(45.0).with_alignment(Alignment::Justify),
            &measurer,
        );
        assert_eq!(out.lines.len(), 2);
        let ends = |line: &Line| match line.items.last() {
            Some(PlacedItem::Text { x, width, .. }) => x + width,
            _ => 0.0,
        };
        assert!((ends(&out.lines[0]) - 45.0).abs() < 0.001);
        assert!(ends(&out.lines[1]) < 45.0);
        // justified words are not merged
        assert_eq!(out.lines[0].items.len(), 3);
    }

    #[test]
    fn test_justify_skips_hard_broken_lines() {
        let measurer = HeuristicMeasurer::default();
        let out = format_text(
            "aa bb\ncc dd",
            &arial(10.0),
            &FlowOptions::new(100.0).with_alignment(Alignment::Justify),
            &measurer,
        );
        assert!(out.lines[0].hard_break);
        assert_eq!(out.lines[0].items.len(), 1);
    }

    #[test]
    fn test_first_line_indent_and_hanging() {
        let measurer = HeuristicMeasurer::default();
        let indented = format_text(
            "aaaa bbbb",
            &arial(10.0),
            &FlowOptions::new(50.0).with_first_line_indent(10.0),
            &measurer,
        );
        // 45pt of content does not fit in 40pt after the indent
        assert_eq!(indented.line_texts(), vec!["aaaa", "bbbb"]);
        assert!(matches!(indented.lines[0].items[0], PlacedItem::Text { x, .. } if x == 10.0));
        assert!(matches!(indented.lines[1].items[0], PlacedItem::Text { x, .. } if x == 0.0));

        let hanging = format_text(
            "aaaa bbbb",
            &arial(10.0),
            &FlowOptions::new(40.0).with_first_line_indent(-10.0),
            &measurer,
        );
        assert_eq!(hanging.lines.len(), 1);
        assert!(matches!(hanging.lines[0].items[0], PlacedItem::Text { x, .. } if x == -10.0));
    }

    #[test]
    fn test_line_spacing_applies() {
        let measurer = HeuristicMeasurer::default();
        let out = format_text(
            "a\nb",
            &arial(10.0),
            &FlowOptions::new(100.0).with_line_spacing(LineSpacing::Exactly(20.0)),
            &measurer,
        );
        assert_eq!(out.height, 40.0);
        assert_eq!(out.lines[1].y, 20.0);
    }

    #[test]
    fn test_inline_object_sets_line_height() {
        let measurer = HeuristicMeasurer::default();
        let fragments = vec![
            Fragment::text("see ", arial(10.0)),
            Fragment::object(7, 30.0, 40.0),
        ];
        let out = format(&fragments, &FlowOptions::new(500.0), &measurer);
        assert_eq!(out.lines.len(), 1);
        assert!((out.lines[0].height - 42.0).abs() < 0.001);
        let objects = out.objects(0.0, 100.0);
        assert_eq!(objects.len(), 1);
        assert_eq!(objects[0].0, 7);
        assert!((objects[0].1.bottom() - 140.0).abs() < 0.001);
    }

    #[test]
    fn test_draw_commands_positions_and_underline() {
        let measurer = HeuristicMeasurer::default();
        let out = format_text(
            "under",
            &arial(10.0).underline(),
            &FlowOptions::new(100.0),
            &measurer,
        );
        let commands = out.draw_commands(5.0, 50.0);
        assert_eq!(commands.len(), 2);
        let DrawCommand::Text(text) = &commands[0] else {
            panic!("expected text first");
        };
        assert_eq!((text.x, text.y, text.baseline), (5.0, 50.0, 58.0));
        assert!(matches!(commands[1], DrawCommand::Line(_)));
    }

    #[test]
    fn test_truncate_keeps_first_line() {
        let measurer = HeuristicMeasurer::default();
        let out = format_text("a\nb\nc", &arial(10.0), &FlowOptions::new(100.0), &measurer);
        assert_eq!(out.clone().truncate_to_height(25.0).lines.len(), 2);
        assert_eq!(out.clone().truncate_to_height(1.0).lines.len(), 1);
        assert_eq!(out.truncate_to_height(100.0).lines.len(), 3);
    }

    #[test]
    fn test_align_vertically() {
        let rect = Rect::new(0.0, 100.0, 50.0, 40.0);
        assert_eq!(
            align_vertically(rect, 10.0, VerticalAlignment::Middle),
            Rect::new(0.0, 115.0, 50.0, 10.0)
        );
        assert_eq!(align_vertically(rect, 10.0, VerticalAlignment::Top).y, 100.0);
        assert_eq!(align_vertically(rect, 10.0, VerticalAlignment::Bottom).y, 130.0);
        assert_eq!(align_vertically(rect, 60.0, VerticalAlignment::Middle).y, 90.0);
    }
}
