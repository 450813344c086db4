//! Document composition
//!
//! Walks a [`Document`] and lays its blocks out into pages: paragraphs go
//! through the text flow formatter, tables through the grid resolver, and
//! everything placed in the body goes through the flow paginator. Header and
//! footer bands are laid out per page once the page count is known.
//!
//! Documents holding a table of contents or a total page count field are
//! laid out twice; the second pass sees the page numbers of the first.

use crate::Result;
use crate::borders::{BorderOptions, render_cell};
use crate::config::ConvertOptions;
use crate::constants::LAYOUT_EPSILON;
use crate::font::TextMeasurer;
use crate::layout::resolve_grid;
use crate::model::{
    Block, Bookmark, Document, FieldKind, PageSetup, Paragraph, Run, Table, TableCell,
    TableOfContents,
};
use crate::paginate::{FlowPaginator, PageFrame};
use crate::resources::{ImageHandle, ResourceScope};
use crate::sink::{DrawCommand, ImageCommand, PageContent, TextCommand};
use crate::style::{CellBorders, VerticalAlignment};
use crate::text::{self, FlowOptions, FormattedText, Fragment};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, instrument, trace, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Claim {
    PageSettings,
    Paragraph,
}

impl Claim {
    fn is_taken(self, bookmark: &Bookmark) -> bool {
        match self {
            Self::PageSettings => bookmark.used_for_page_settings,
            Self::Paragraph => bookmark.used_for_paragraph,
        }
    }

    fn take(self, bookmark: &mut Bookmark) {
        match self {
            Self::PageSettings => bookmark.used_for_page_settings = true,
            Self::Paragraph => bookmark.used_for_paragraph = true,
        }
    }
}

/// Bookmarks of one layout pass with their consumption flags.
///
/// A title may repeat. Each claim binds the unconsumed bookmark with that
/// title and the lowest `order`; the two kinds of claim are tracked apart.
#[derive(Debug, Clone, Default)]
pub struct BookmarkRegistry {
    bookmarks: Vec<Bookmark>,
}

impl BookmarkRegistry {
    pub fn new(bookmarks: Vec<Bookmark>) -> Self {
        Self { bookmarks }
    }

    pub fn get(&self, index: usize) -> Option<&Bookmark> {
        self.bookmarks.get(index)
    }

    pub fn len(&self) -> usize {
        self.bookmarks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bookmarks.is_empty()
    }

    pub fn find_by_name(&self, name: &str) -> Option<&Bookmark> {
        self.bookmarks.iter().find(|b| b.name == name)
    }

    /// Indices sorted by `order`
    pub fn ordered(&self) -> Vec<usize> {
        let mut indices: Vec<usize> = (0..self.bookmarks.len()).collect();
        indices.sort_by_key(|&i| self.bookmarks[i].order);
        indices
    }

    fn claim(&mut self, title: &str, kind: Claim) -> Option<usize> {
        let title = title.trim();
        let index = self
            .bookmarks
            .iter()
            .enumerate()
            .filter(|(_, b)| b.title.trim() == title && !kind.is_taken(b))
            .min_by_key(|(_, b)| b.order)
            .map(|(i, _)| i)?;
        kind.take(&mut self.bookmarks[index]);
        Some(index)
    }

    /// Bind a heading to a bookmark for its page geometry
    pub fn claim_for_page_settings(&mut self, title: &str) -> Option<usize> {
        self.claim(title, Claim::PageSettings)
    }

    /// Bind a heading to a bookmark for its number and TOC entry
    pub fn claim_for_paragraph(&mut self, title: &str) -> Option<usize> {
        self.claim(title, Claim::Paragraph)
    }
}

/// Results of a finished pass fed into the next one
#[derive(Debug, Clone, Default)]
struct PassInfo {
    total_pages: Option<usize>,
    /// Bookmark index to 1-based page number of its heading
    bookmark_pages: HashMap<usize, usize>,
}

#[derive(Debug, Clone, Copy)]
struct FieldContext {
    page_number: usize,
    total_pages: Option<usize>,
}

/// A laid out piece of content relative to its own top-left corner
#[derive(Debug, Clone, Default)]
struct Unit {
    height: f32,
    commands: Vec<DrawCommand>,
}

impl Unit {
    /// Append `other` below the current content
    fn push(&mut self, other: Unit) {
        let dy = self.height;
        self.commands
            .extend(other.commands.into_iter().map(|c| c.translated(0.0, dy)));
        self.height += other.height;
    }
}

/// Body pages and the paginator that fills them
#[derive(Debug)]
struct BodyFlow {
    pager: FlowPaginator,
    pages: Vec<PageContent>,
    page_sections: Vec<usize>,
    section: usize,
}

impl BodyFlow {
    fn content_width(&self) -> f32 {
        self.pager.current_frame().map_or(0.0, |f| f.content.width)
    }

    fn usable_height(&self) -> f32 {
        self.pager.current_frame().map_or(0.0, |f| f.usable_height())
    }

    fn sync_pages(&mut self) {
        while self.pages.len() < self.pager.page_count() {
            let frame = self.pager.pages()[self.pages.len()];
            self.pages.push(PageContent::new(frame.width, frame.height));
            self.page_sections.push(self.section);
        }
    }

    fn place(&mut self, unit: Unit) -> Result<usize> {
        let placement = self.pager.place(unit.height)?;
        self.sync_pages();
        let (dx, dy) = (placement.frame.content.x, placement.y);
        self.pages[placement.page_index]
            .commands
            .extend(unit.commands.into_iter().map(|c| c.translated(dx, dy)));
        Ok(placement.page_index)
    }
}

/// Where laid out blocks go
#[derive(Debug)]
enum Destination {
    /// The paginated document body
    Body,
    /// A table cell of fixed width
    Cell { width: f32, stack: Unit },
    /// A header or footer band
    Band { width: f32, stack: Unit },
}

impl Destination {
    fn cell(width: f32) -> Self {
        Self::Cell {
            width,
            stack: Unit::default(),
        }
    }

    fn band(width: f32) -> Self {
        Self::Band {
            width,
            stack: Unit::default(),
        }
    }

    fn available_width(&self, body: &BodyFlow) -> f32 {
        match self {
            Self::Body => body.content_width(),
            Self::Cell { width, .. } | Self::Band { width, .. } => *width,
        }
    }

    /// Empty paragraphs take a line in the body but nothing in cells or bands
    fn keeps_empty_paragraphs(&self) -> bool {
        matches!(self, Self::Body)
    }

    /// Add a unit; returns the page index when it went to the body
    fn add_unit(&mut self, unit: Unit, body: &mut BodyFlow) -> Result<Option<usize>> {
        match self {
            Self::Body if unit.height <= 0.0 => Ok(None),
            Self::Body => body.place(unit).map(Some),
            Self::Cell { stack, .. } | Self::Band { stack, .. } => {
                stack.push(unit);
                Ok(None)
            }
        }
    }

    fn into_stack(self) -> Unit {
        match self {
            Self::Body => Unit::default(),
            Self::Cell { stack, .. } | Self::Band { stack, .. } => stack,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Section {
    setup: PageSetup,
    frame: PageFrame,
}

struct Composer<'a> {
    doc: &'a Document,
    options: &'a ConvertOptions,
    measurer: &'a dyn TextMeasurer,
    resources: &'a mut ResourceScope,
    pass: &'a PassInfo,
    bookmarks: BookmarkRegistry,
    body: BodyFlow,
    sections: Vec<Section>,
    setup: PageSetup,
    /// Page values used by fields while laying out a band
    fields: Option<FieldContext>,
    heading_pages: HashMap<usize, usize>,
}

impl<'a> Composer<'a> {
    fn new(
        doc: &'a Document,
        options: &'a ConvertOptions,
        measurer: &'a dyn TextMeasurer,
        resources: &'a mut ResourceScope,
        pass: &'a PassInfo,
    ) -> Result<Self> {
        let mut composer = Self {
            doc,
            options,
            measurer,
            resources,
            pass,
            bookmarks: BookmarkRegistry::new(doc.bookmarks.clone()),
            body: BodyFlow {
                pager: FlowPaginator::new(),
                pages: Vec::new(),
                page_sections: Vec::new(),
                section: 0,
            },
            sections: Vec::new(),
            setup: doc.page_setup,
            fields: None,
            heading_pages: HashMap::new(),
        };
        composer.start_section(doc.page_setup)?;
        Ok(composer)
    }

    fn run(mut self) -> Result<(Vec<PageContent>, PassInfo)> {
        let doc = self.doc;
        self.layout_blocks(&doc.blocks, &mut Destination::Body)?;

        if self.body.pages.is_empty() {
            let frame = self.sections[0].frame;
            self.body.pages.push(PageContent::new(frame.width, frame.height));
            self.body.page_sections.push(0);
        }
        let total = self.body.pages.len();
        self.draw_headers_footers(total)?;

        let info = PassInfo {
            total_pages: Some(total),
            bookmark_pages: self.heading_pages,
        };
        Ok((self.body.pages, info))
    }

    fn start_section(&mut self, setup: PageSetup) -> Result<()> {
        let frame = self.section_frame(&setup, self.sections.is_empty())?;
        self.sections.push(Section { setup, frame });
        self.body.section = self.sections.len() - 1;
        self.body.pager.start_section(frame);
        self.setup = setup;
        debug!(
            section = self.sections.len(),
            orientation = ?setup.orientation,
            "Starting section {:.1}x{:.1}",
            frame.width,
            frame.height
        );
        Ok(())
    }

    /// Page frame of a section; the body moves clear of bands taller than
    /// the margin leaves room for
    fn section_frame(&mut self, setup: &PageSetup, first: bool) -> Result<PageFrame> {
        let base = PageFrame::from_setup(setup)?;
        let doc = self.doc;
        let bands = &doc.headers_footers;
        let width = base.content.width;
        let ctx = FieldContext {
            page_number: 1,
            total_pages: self.pass.total_pages,
        };

        let mut header: f32 = self.layout_band(bands.header_for(false), width, ctx)?.height;
        let mut footer: f32 = self.layout_band(bands.footer_for(false), width, ctx)?.height;
        if first {
            header = header.max(self.layout_band(bands.header_for(true), width, ctx)?.height);
            footer = footer.max(self.layout_band(bands.footer_for(true), width, ctx)?.height);
        }

        let mut top = base.content.y;
        let mut bottom = base.content.bottom();
        if header > 0.0 {
            top = top.max(setup.header_distance + header);
        }
        if footer > 0.0 {
            bottom = bottom.min(base.height - setup.footer_distance - footer);
        }
        if top > base.content.y || bottom < base.content.bottom() {
            trace!(top, bottom, "Body moved clear of header and footer");
        }
        base.with_vertical_bounds(top, bottom)
    }

    fn field_context(&self) -> FieldContext {
        self.fields.unwrap_or(FieldContext {
            page_number: self.body.pager.current_page().map_or(1, |p| p + 1),
            total_pages: self.pass.total_pages,
        })
    }

    fn field_text(&self, kind: &FieldKind, ctx: FieldContext) -> String {
        match kind {
            FieldKind::PageNumber => ctx.page_number.to_string(),
            FieldKind::PageCount => ctx.total_pages.unwrap_or(ctx.page_number).to_string(),
            FieldKind::Reference(name) => match self.bookmarks.find_by_name(name) {
                Some(bookmark) => bookmark.number.clone(),
                None => {
                    warn!(bookmark = %name, "Reference to an unknown bookmark");
                    String::new()
                }
            },
        }
    }

    fn layout_blocks(&mut self, blocks: &[Block], dest: &mut Destination) -> Result<()> {
        for block in blocks {
            match block {
                Block::Paragraph(paragraph) => self.layout_paragraph(paragraph, dest)?,
                Block::Table(table) => self.layout_table(table, dest)?,
                Block::PageBreak => {
                    if let Destination::Body = dest {
                        self.body.pager.page_break();
                    }
                }
                Block::TableOfContents(toc) => self.layout_toc(toc, dest)?,
            }
        }
        Ok(())
    }

    fn layout_band(&mut self, blocks: &[Block], width: f32, ctx: FieldContext) -> Result<Unit> {
        if blocks.is_empty() {
            return Ok(Unit::default());
        }
        let saved = self.fields.replace(ctx);
        let mut dest = Destination::band(width);
        let result = self.layout_blocks(blocks, &mut dest);
        self.fields = saved;
        result?;
        Ok(dest.into_stack())
    }

    fn layout_cell(&mut self, cell: &TableCell, width: f32) -> Result<Unit> {
        let mut dest = Destination::cell(width);
        self.layout_blocks(&cell.blocks, &mut dest)?;
        Ok(dest.into_stack())
    }

    fn apply_bookmark_geometry(&mut self, index: usize) -> Result<()> {
        let Some(bookmark) = self.bookmarks.get(index) else {
            return Ok(());
        };
        let mut next = self.setup;
        if let Some(orientation) = bookmark.orientation {
            next.orientation = orientation;
        }
        if let Some(margins) = bookmark.margins {
            next.margins = margins;
        }
        if next.orientation != self.setup.orientation || !next.margins.approx_eq(&self.setup.margins)
        {
            debug!(bookmark = %bookmark.name, "Heading changes page geometry");
            self.start_section(next)?;
        }
        Ok(())
    }

    fn layout_paragraph(&mut self, paragraph: &Paragraph, dest: &mut Destination) -> Result<()> {
        let doc = self.doc;
        let styles = &doc.styles;
        let style_name = paragraph.style.as_deref();
        let format = styles.resolve_paragraph(style_name, &paragraph.format);
        let in_body = matches!(dest, Destination::Body);

        let mut number = None;
        let mut toc_bookmark = None;
        if in_body {
            if format.page_break_before {
                self.body.pager.page_break();
            }
            if styles.is_heading(style_name) {
                let title = paragraph.plain_text();
                if let Some(index) = self.bookmarks.claim_for_page_settings(&title) {
                    self.apply_bookmark_geometry(index)?;
                }
                if let Some(index) = self.bookmarks.claim_for_paragraph(&title) {
                    number = self
                        .bookmarks
                        .get(index)
                        .map(|b| b.number.clone())
                        .filter(|n| !n.is_empty());
                    toc_bookmark = Some(index);
                }
            }
        }

        let width = (dest.available_width(&self.body) - format.left_indent - format.right_indent)
            .max(1.0);
        let mark_style = styles.resolve_text(style_name, &[&paragraph.character]);
        let ctx = self.field_context();

        let mut fragments = Vec::with_capacity(paragraph.runs.len() + 1);
        let mut images: Vec<ImageHandle> = Vec::new();
        if let Some(number) = &number {
            fragments.push(Fragment::text(format!("{number} "), mark_style.clone()));
        }
        for run in &paragraph.runs {
            match run {
                Run::Text(run) => fragments.push(Fragment::text(
                    run.text.clone(),
                    styles.resolve_text(style_name, &[&paragraph.character, &run.format]),
                )),
                Run::Field(field) => fragments.push(Fragment::text(
                    self.field_text(&field.kind, ctx),
                    styles.resolve_text(style_name, &[&paragraph.character, &field.format]),
                )),
                Run::Image(image) => match self.resources.register_image(&image.data) {
                    Ok(handle) => {
                        let (mut w, mut h) = handle.display_size(
                            image.width,
                            image.height,
                            self.options.default_image_width,
                        );
                        if w > width {
                            h *= width / w;
                            w = width;
                        }
                        fragments.push(Fragment::object(images.len(), w, h));
                        images.push(handle);
                    }
                    Err(e) => warn!("Skipping image: {e}"),
                },
            }
        }

        let flow = FlowOptions::new(width)
            .with_alignment(format.alignment)
            .with_first_line_indent(format.first_line_indent)
            .with_line_spacing(format.line_spacing);
        let formatted = text::format(&fragments, &flow, self.measurer);

        if formatted.is_empty() {
            if !dest.keeps_empty_paragraphs() {
                trace!("Skipping empty paragraph");
                return Ok(());
            }
            let line = format
                .line_spacing
                .apply(self.measurer.measure("", &mark_style).line_height());
            let unit = Unit {
                height: format.space_before + line + format.space_after,
                commands: Vec::new(),
            };
            dest.add_unit(unit, &mut self.body)?;
            return Ok(());
        }

        let total = format.space_before + formatted.height + format.space_after;
        let pieces = if in_body && total > self.body.usable_height() && formatted.lines.len() > 1 {
            warn!(
                lines = formatted.lines.len(),
                "Paragraph taller than a page, splitting it between lines"
            );
            split_lines(formatted)
        } else {
            vec![formatted]
        };

        let last = pieces.len() - 1;
        let mut first_page = None;
        for (i, piece) in pieces.into_iter().enumerate() {
            let before = if i == 0 { format.space_before } else { 0.0 };
            let after = if i == last { format.space_after } else { 0.0 };
            let mut commands = piece.draw_commands(format.left_indent, before);
            commands.extend(
                piece
                    .objects(format.left_indent, before)
                    .into_iter()
                    .filter_map(|(key, rect)| {
                        images.get(key).map(|image| {
                            DrawCommand::Image(ImageCommand {
                                rect,
                                image: Arc::clone(image),
                            })
                        })
                    }),
            );
            let unit = Unit {
                height: before + piece.height + after,
                commands,
            };
            let page = dest.add_unit(unit, &mut self.body)?;
            first_page = first_page.or(page);
        }

        if let (Some(index), Some(page)) = (toc_bookmark, first_page) {
            self.heading_pages.insert(index, page + 1);
        }
        Ok(())
    }

    fn layout_table(&mut self, table: &Table, dest: &mut Destination) -> Result<()> {
        if table.rows.is_empty() {
            return Ok(());
        }
        let heuristic = match dest {
            Destination::Cell { .. } => self.options.nested_table_widths,
            _ => self.options.table_widths,
        };
        let padding = self.options.cell_padding;
        let width = dest.available_width(&self.body);

        let grid = resolve_grid(table, width, &heuristic, &padding, |cell, content_width| {
            Ok(self.layout_cell(cell, content_width)?.height)
        })?;

        let groups = grid.row_groups();
        let mut group_of_row = vec![0; grid.row_count()];
        for (g, range) in groups.iter().enumerate() {
            for row in range.clone() {
                group_of_row[row] = g;
            }
        }
        let mut units: Vec<Unit> = groups
            .iter()
            .map(|range| Unit {
                height: grid.row_heights[range.clone()].iter().sum(),
                commands: Vec::new(),
            })
            .collect();

        for cell in grid.origins() {
            let model = &table.rows[cell.row].cells[cell.cell_index];
            let g = group_of_row[cell.row];
            let rect = grid
                .cell_rect(cell.row, cell.col)?
                .translate(0.0, -grid.row_y(groups[g].start));
            let borders = model
                .borders
                .unwrap_or_else(|| CellBorders::uniform(table.border));
            units[g]
                .commands
                .extend(render_cell(rect, model.shading, &borders, BorderOptions::default()));

            let inner = rect.inset(padding.top, padding.right, padding.bottom, padding.left);
            let content = self.layout_cell(model, inner.width.max(0.0))?;
            let aligned = text::align_vertically(
                inner,
                content.height,
                model
                    .vertical_alignment
                    .unwrap_or(VerticalAlignment::Middle),
            );
            units[g].commands.extend(
                content
                    .commands
                    .into_iter()
                    .map(|c| c.translated(aligned.x, aligned.y)),
            );
        }

        if !matches!(dest, Destination::Body) {
            let mut whole = Unit::default();
            units.into_iter().for_each(|unit| whole.push(unit));
            dest.add_unit(whole, &mut self.body)?;
            return Ok(());
        }

        let header_groups = groups
            .iter()
            .take_while(|range| range.end <= table.header_rows)
            .count();
        let header = (self.options.repeat_table_headers
            && header_groups > 0
            && header_groups < units.len())
        .then(|| {
            let mut header = Unit::default();
            units[..header_groups]
                .iter()
                .for_each(|unit| header.push(unit.clone()));
            header
        });

        // header rows start on the page of the first body row
        if header_groups > 0 && header_groups < units.len() {
            let keep: f32 = units[..=header_groups].iter().map(|unit| unit.height).sum();
            let usable = self.body.pager.current_frame().map(PageFrame::usable_height);
            if usable.is_some_and(|usable| keep <= usable + LAYOUT_EPSILON) {
                self.body.pager.ensure_space(keep)?;
                self.body.sync_pages();
            }
        }

        let mut started = false;
        for (i, unit) in units.into_iter().enumerate() {
            if let Some(header) = header.as_ref().filter(|_| started && i >= header_groups) {
                let fits = self
                    .body
                    .pager
                    .remaining()
                    .is_some_and(|left| unit.height <= left + LAYOUT_EPSILON);
                if !fits && !self.body.pager.at_page_top() {
                    self.body.pager.ensure_space(header.height + unit.height)?;
                    self.body.sync_pages();
                    trace!("Repeating table header rows");
                    self.body.place(header.clone())?;
                }
            }
            if unit.height > 0.0 {
                self.body.place(unit)?;
                started = true;
            }
        }
        Ok(())
    }

    fn layout_toc(&mut self, toc: &TableOfContents, dest: &mut Destination) -> Result<()> {
        let doc = self.doc;
        let style = doc.styles.resolve_text(None, &[]);
        let metrics = self.measurer.measure("", &style);
        let dot = self.measurer.measure(".", &style).width.max(0.1);
        let space = self.measurer.space_width(&style);
        let width = dest.available_width(&self.body);

        let entries: Vec<(usize, u8, String)> = self
            .bookmarks
            .ordered()
            .into_iter()
            .filter_map(|index| {
                let bookmark = self.bookmarks.get(index)?;
                (bookmark.level <= toc.max_level).then(|| {
                    let label = if bookmark.number.is_empty() {
                        bookmark.title.clone()
                    } else {
                        format!("{} {}", bookmark.number, bookmark.title)
                    };
                    (index, bookmark.level, label)
                })
            })
            .collect();
        debug!(entries = entries.len(), "Laying out table of contents");

        for (index, level, label) in entries {
            let indent = toc.indent * f32::from(level.saturating_sub(1));
            let page = self
                .pass
                .bookmark_pages
                .get(&index)
                .map(|p| p.to_string())
                .unwrap_or_default();
            let label_width = self.measurer.measure(&label, &style).width;
            let page_width = self.measurer.measure(&page, &style).width;
            let leader_space = width - indent - label_width - page_width - 2.0 * space;
            let dots = if leader_space > 0.0 {
                (leader_space / dot).floor() as usize
            } else {
                0
            };
            let leader_width = dots as f32 * dot;

            let line = |x: f32, text: String, w: f32| {
                DrawCommand::Text(TextCommand {
                    x,
                    y: 0.0,
                    width: w,
                    height: metrics.line_height(),
                    baseline: metrics.ascent,
                    text,
                    style: style.clone(),
                })
            };
            let mut commands = vec![line(indent, label, label_width)];
            if dots > 0 {
                commands.push(line(
                    width - page_width - space - leader_width,
                    ".".repeat(dots),
                    leader_width,
                ));
            }
            if !page.is_empty() {
                commands.push(line(width - page_width, page, page_width));
            }
            dest.add_unit(
                Unit {
                    height: metrics.line_height(),
                    commands,
                },
                &mut self.body,
            )?;
        }
        Ok(())
    }

    fn draw_headers_footers(&mut self, total: usize) -> Result<()> {
        let doc = self.doc;
        let bands = &doc.headers_footers;
        for index in 0..self.body.pages.len() {
            let Section { setup, frame } = self.sections[self.body.page_sections[index]];
            let first = index == 0;
            let ctx = FieldContext {
                page_number: index + 1,
                total_pages: Some(total),
            };
            let width = frame.content.width;
            let header = self.layout_band(bands.header_for(first), width, ctx)?;
            let footer = self.layout_band(bands.footer_for(first), width, ctx)?;

            let page = &mut self.body.pages[index];
            let x = frame.content.x;
            page.commands.extend(
                header
                    .commands
                    .into_iter()
                    .map(|c| c.translated(x, setup.header_distance)),
            );
            let footer_top = frame.height - setup.footer_distance - footer.height;
            page.commands.extend(
                footer
                    .commands
                    .into_iter()
                    .map(|c| c.translated(x, footer_top)),
            );
        }
        Ok(())
    }
}

/// One single-line piece per line, for paragraphs taller than a page
fn split_lines(formatted: FormattedText) -> Vec<FormattedText> {
    formatted
        .lines
        .into_iter()
        .map(|mut line| {
            line.y = 0.0;
            FormattedText {
                height: line.height,
                lines: vec![line],
            }
        })
        .collect()
}

/// Lay out a document into pages.
///
/// Images are registered in `resources`, which must outlive the pages.
#[instrument(skip_all, fields(blocks = doc.blocks.len(), bookmarks = doc.bookmarks.len()))]
pub fn compose_document(
    doc: &Document,
    options: &ConvertOptions,
    measurer: &dyn TextMeasurer,
    resources: &mut ResourceScope,
) -> Result<Vec<PageContent>> {
    options.validate()?;

    let first = PassInfo::default();
    let (pages, info) = Composer::new(doc, options, measurer, resources, &first)?.run()?;
    if !doc.needs_second_pass() {
        debug!("Composed {} pages", pages.len());
        return Ok(pages);
    }

    debug!(
        pages = pages.len(),
        "Laying out again with page numbers known"
    );
    let (pages, _) = Composer::new(doc, options, measurer, resources, &info)?.run()?;
    debug!("Composed {} pages", pages.len());
    Ok(pages)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::font::HeuristicMeasurer;
    use crate::model::{
        HeadersFooters, ImageRun, Margins, Orientation, TableRow, VerticalMerge,
    };
    use crate::resources::test_png;
    use crate::style::{LineSpacing, NamedStyle, ParagraphFormat, StyleSheet};

    fn compose(doc: &Document) -> Vec<PageContent> {
        let mut scope = ResourceScope::new();
        compose_document(
            doc,
            &ConvertOptions::default(),
            &HeuristicMeasurer::default(),
            &mut scope,
        )
        .unwrap()
    }

    fn tall(height: f32) -> Paragraph {
        Paragraph::text("block").with_format(
            ParagraphFormat::new()
                .with_spacing(0.0, 0.0)
                .with_line_spacing(LineSpacing::Exactly(height)),
        )
    }

    fn heading_styles() -> StyleSheet {
        StyleSheet::new().with_style(NamedStyle::new("Heading 1"))
    }

    #[test]
    fn test_hello_world_single_page() {
        let doc = Document::new().with_block(Paragraph::text("Hello world"));
        let pages = compose(&doc);
        assert_eq!(pages.len(), 1);
        let texts: Vec<_> = pages[0].texts().collect();
        assert_eq!(texts.len(), 1);
        assert_eq!(texts[0].text, "Hello world");

        let setup = PageSetup::default();
        assert!((texts[0].x - setup.margins.left).abs() < 0.001);
        assert!((texts[0].y - setup.margins.top).abs() < 0.001);
        assert!((texts[0].height - 14.4).abs() < 0.001);
    }

    #[test]
    fn test_block_moves_whole_to_next_page() {
        let usable = PageFrame::from_setup(&PageSetup::default())
            .unwrap()
            .usable_height();
        let doc = Document::new()
            .with_block(tall(usable - 100.0))
            .with_block(tall(700.0));
        let pages = compose(&doc);
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[1].texts().count(), 1);
        let top = pages[1].texts().next().unwrap().y;
        assert!((top - PageSetup::default().margins.top).abs() < 0.001);
    }

    #[test]
    fn test_page_breaks_are_lazy() {
        let doc = Document::new()
            .with_block(Block::PageBreak)
            .with_block(Paragraph::text("one"))
            .with_block(Block::PageBreak)
            .with_block(Block::PageBreak)
            .with_block(Paragraph::text("two"))
            .with_block(Block::PageBreak);
        let pages = compose(&doc);
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[1].plain_text(), "two");
    }

    #[test]
    fn test_empty_document_has_one_page() {
        assert_eq!(compose(&Document::new()).len(), 1);
    }

    #[test]
    fn test_empty_body_paragraph_takes_a_line() {
        let with_gap = Document::new()
            .with_block(Paragraph::text("a"))
            .with_block(Paragraph::new())
            .with_block(Paragraph::text("b"));
        let pages = compose(&with_gap);
        let ys: Vec<f32> = pages[0].texts().map(|t| t.y).collect();
        // 14.4 line plus 8pt space after, twice
        assert!((ys[1] - ys[0] - 2.0 * 22.4).abs() < 0.001, "{ys:?}");
    }

    #[test]
    fn test_registry_claims_are_independent() {
        let mut registry = BookmarkRegistry::new(vec![
            Bookmark::new("b", "Intro", 2),
            Bookmark::new("a", "Intro", 1),
            Bookmark::new("c", "Other", 0),
        ]);
        assert_eq!(registry.claim_for_page_settings("Intro"), Some(1));
        assert_eq!(registry.claim_for_paragraph(" Intro "), Some(1));
        assert_eq!(registry.claim_for_page_settings("Intro"), Some(0));
        assert_eq!(registry.claim_for_page_settings("Intro"), None);
        assert_eq!(registry.claim_for_paragraph("Intro"), Some(0));
        assert_eq!(registry.claim_for_paragraph("Missing"), None);
        assert_eq!(registry.ordered(), vec![2, 1, 0]);
    }

    #[test]
    fn test_heading_bookmark_starts_landscape_section() {
        let doc = Document::new()
            .with_styles(heading_styles())
            .with_bookmark(
                Bookmark::new("_Toc1", "Wide", 0)
                    .with_geometry(Orientation::Landscape, Some(Margins::uniform(36.0))),
            )
            .with_block(Paragraph::text("intro"))
            .with_block(Paragraph::text("Wide").with_style("Heading 1"))
            .with_block(Paragraph::text("body"));
        let pages = compose(&doc);
        assert_eq!(pages.len(), 2);
        assert!(pages[0].width < pages[0].height);
        assert!(pages[1].width > pages[1].height);
        let heading = pages[1].texts().next().unwrap();
        assert_eq!(heading.text, "Wide");
        assert!((heading.x - 36.0).abs() < 0.001);
    }

    #[test]
    fn test_same_geometry_keeps_page() {
        let doc = Document::new()
            .with_styles(heading_styles())
            .with_bookmark(Bookmark::new("_Toc1", "Same", 0).with_geometry(Orientation::Portrait, None))
            .with_block(Paragraph::text("intro"))
            .with_block(Paragraph::text("Same").with_style("Heading 1"));
        assert_eq!(compose(&doc).len(), 1);
    }

    #[test]
    fn test_heading_number_prefix() {
        let doc = Document::new()
            .with_styles(heading_styles())
            .with_bookmark(Bookmark::new("_Toc1", "Scope", 0).with_number("1.2", 2))
            .with_block(Paragraph::text("Scope").with_style("Heading 1"));
        let pages = compose(&doc);
        assert_eq!(pages[0].plain_text(), "1.2 Scope");
    }

    #[test]
    fn test_toc_lists_heading_pages() {
        let doc = Document::new()
            .with_styles(heading_styles())
            .with_bookmark(Bookmark::new("_Toc1", "Intro", 0).with_number("1", 1))
            .with_bookmark(Bookmark::new("_Toc2", "Deep", 1).with_number("1.1.1.1", 4))
            .with_block(Block::TableOfContents(TableOfContents::default()))
            .with_block(Block::PageBreak)
            .with_block(Paragraph::text("Intro").with_style("Heading 1"));
        let pages = compose(&doc);
        assert_eq!(pages.len(), 2);

        let toc: Vec<_> = pages[0].texts().map(|t| t.text.clone()).collect();
        assert_eq!(toc.len(), 3, "{toc:?}");
        assert_eq!(toc[0], "1 Intro");
        assert!(toc[1].chars().all(|c| c == '.'));
        assert_eq!(toc[2], "2");
        assert_eq!(pages[1].plain_text(), "1 Intro");
    }

    #[test]
    fn test_page_fields_in_footer() {
        let footer = Paragraph::text("Page ")
            .with_format(ParagraphFormat::new().with_spacing(0.0, 0.0))
            .with_run(Run::field(FieldKind::PageNumber))
            .with_run(Run::text(" of "))
            .with_run(Run::field(FieldKind::PageCount));
        let mut doc = Document::new()
            .with_block(Paragraph::text("one"))
            .with_block(Block::PageBreak)
            .with_block(Paragraph::text("two"));
        doc.headers_footers = HeadersFooters {
            default_footer: vec![footer.into()],
            first_page_header: Some(vec![Paragraph::text("Cover").into()]),
            ..Default::default()
        };
        let pages = compose(&doc);
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].plain_text(), "one Cover Page 1 of 2");
        assert_eq!(pages[1].plain_text(), "two Page 2 of 2");

        let setup = PageSetup::default();
        let footer = pages[1].texts().last().unwrap();
        let bottom = footer.y + footer.height;
        assert!((bottom - (pages[1].height - setup.footer_distance)).abs() < 0.01);
    }

    #[test]
    fn test_tall_header_pushes_body_down() {
        let mut doc = Document::new().with_block(Paragraph::text("body"));
        doc.headers_footers.default_header = vec![tall(80.0).into()];
        let pages = compose(&doc);
        let body = pages[0].texts().next().unwrap();
        let setup = PageSetup::default();
        assert!((body.y - (setup.header_distance + 80.0)).abs() < 0.01);
    }

    #[test]
    fn test_body_page_count_field_uses_second_pass() {
        let doc = Document::new()
            .with_block(
                Paragraph::text("Total ").with_run(Run::field(FieldKind::PageCount)),
            )
            .with_block(Block::PageBreak)
            .with_block(Paragraph::text("x"))
            .with_block(Block::PageBreak)
            .with_block(Paragraph::text("y"));
        let pages = compose(&doc);
        assert_eq!(pages[0].plain_text(), "Total 3");
    }

    #[test]
    fn test_unknown_reference_renders_empty() {
        let doc = Document::new().with_block(
            Paragraph::text("See ")
                .with_run(Run::field(FieldKind::Reference("missing".to_string())))
                .with_run(Run::text("end")),
        );
        assert_eq!(compose(&doc)[0].plain_text(), "See end");
    }

    #[test]
    fn test_table_with_span_and_merge() {
        let table = Table::new()
            .with_row(TableRow::new(vec![TableCell::text("Head").with_span(2)]))
            .with_row(TableRow::new(vec![
                TableCell::text("Merged").with_merge(VerticalMerge::Restart),
                TableCell::text("r1"),
            ]))
            .with_row(TableRow::new(vec![
                TableCell::empty().with_merge(VerticalMerge::Continue),
                TableCell::text("r2"),
            ]));
        let pages = compose(&Document::new().with_block(table));
        let texts: Vec<_> = pages[0].texts().map(|t| t.text.as_str()).collect();
        assert_eq!(texts.iter().filter(|t| **t == "Merged").count(), 1);
        assert_eq!(texts.len(), 4);
        // four origin cells with four sides each
        assert_eq!(pages[0].lines().count(), 16);
    }

    #[test]
    fn test_merged_cell_centered_across_rows() {
        let table = Table::new()
            .with_header_rows(0)
            .with_row(TableRow::new(vec![
                TableCell::text("M").with_merge(VerticalMerge::Restart),
                TableCell::text("a"),
            ]))
            .with_row(TableRow::new(vec![
                TableCell::empty().with_merge(VerticalMerge::Continue),
                TableCell::text("b"),
            ]));
        let pages = compose(&Document::new().with_block(table));
        let find = |s: &str| pages[0].texts().find(|t| t.text == s).unwrap().y;
        let (a, b, m) = (find("a"), find("b"), find("M"));
        assert!((m - (a + b) / 2.0).abs() < 0.01);
    }

    #[test]
    fn test_header_rows_repeat_on_new_page() {
        let mut table = Table::new()
            .with_row(TableRow::new(vec![TableCell::text("Name"), TableCell::text("Value")]));
        for i in 0..80 {
            table = table.with_row(TableRow::new(vec![
                TableCell::text(format!("row {i}")),
                TableCell::text("x"),
            ]));
        }
        let pages = compose(&Document::new().with_block(table));
        assert!(pages.len() >= 2);
        for page in &pages {
            let first = page.texts().next().unwrap();
            assert_eq!(first.text, "Name");
        }
        let rows: usize = pages
            .iter()
            .map(|p| p.texts().filter(|t| t.text.starts_with("row")).count())
            .sum();
        assert_eq!(rows, 80);
    }

    #[test]
    fn test_header_row_moves_with_first_body_row() {
        let usable = PageFrame::from_setup(&PageSetup::default())
            .unwrap()
            .usable_height();
        let table = Table::new()
            .with_row(TableRow::new(vec![TableCell::text("HEAD")]))
            .with_row(TableRow::new(vec![TableCell::new(
                (1..=4)
                    .map(|i| Paragraph::text(format!("line {i}")).into())
                    .collect(),
            )]));
        let doc = Document::new()
            .with_block(tall(usable - 40.0))
            .with_block(table);

        let pages = compose(&doc);
        assert_eq!(pages.len(), 2);
        let texts = |page: &PageContent| -> Vec<String> {
            page.texts().map(|t| t.text.clone()).collect()
        };
        assert_eq!(texts(&pages[0]), vec!["block".to_string()]);
        let second = texts(&pages[1]);
        assert_eq!(second[0], "HEAD");
        assert!(second.contains(&"line 4".to_string()));
    }

    #[test]
    fn test_empty_paragraph_in_cell_adds_no_height() {
        let options = ConvertOptions::default();
        let measurer = HeuristicMeasurer::default();
        let doc = Document::new();
        let mut scope = ResourceScope::new();
        let pass = PassInfo::default();
        let mut composer = Composer::new(&doc, &options, &measurer, &mut scope, &pass).unwrap();

        let empty = TableCell::new(vec![Paragraph::new().into(), Paragraph::new().into()]);
        assert_eq!(composer.layout_cell(&empty, 100.0).unwrap().height, 0.0);
        let text = TableCell::new(vec![Paragraph::new().into(), Paragraph::text("x").into()]);
        assert!((composer.layout_cell(&text, 100.0).unwrap().height - 22.4).abs() < 0.001);
    }

    #[test]
    fn test_images_sized_and_corrupt_skipped() {
        let doc = Document::new()
            .with_block(Paragraph::new().with_run(Run::Image(ImageRun::new(test_png(100, 50)))))
            .with_block(Paragraph::new().with_run(Run::Image(ImageRun::new(vec![1u8, 2, 3]))))
            .with_block(
                Paragraph::new()
                    .with_run(Run::Image(ImageRun::new(test_png(10, 10)).with_size(5000.0, 5000.0))),
            );
        let mut scope = ResourceScope::new();
        let pages = compose_document(
            &doc,
            &ConvertOptions::default(),
            &HeuristicMeasurer::default(),
            &mut scope,
        )
        .unwrap();
        let images: Vec<_> = pages
            .iter()
            .flat_map(|p| &p.commands)
            .filter_map(|c| match c {
                DrawCommand::Image(image) => Some(image.rect),
                _ => None,
            })
            .collect();
        assert_eq!(images.len(), 2);
        assert!((images[0].width - 141.73).abs() < 0.01);
        assert!((images[0].height - images[0].width / 2.0).abs() < 0.01);
        let usable = PageSetup::default().usable_width();
        assert!((images[1].width - usable).abs() < 0.01);
        assert_eq!(scope.len(), 2);
    }
}
