//! Workbook composition
//!
//! Each sheet is printed as one continuous canvas cut into page bands. The
//! paper is scaled so the used columns fit its printable width; rows and
//! merged regions are kept whole on a page.
//!
//! Drawing runs in two passes over the visible rows: fills first, then
//! borders and text, so a fill never paints over a neighbour's border.

use crate::Result;
use crate::borders::{BorderOptions, border_lines, fill_rect};
use crate::config::ConvertOptions;
use crate::constants::POINTS_PER_INCH;
use crate::error::LayoutError;
use crate::font::TextMeasurer;
use crate::model::{Margins, Orientation};
use crate::paginate::BandPaginator;
use crate::sheet::{
    CellRange, HeaderFooterText, HorizontalAlignment, MergedCells, PrintSetup, Sheet, SheetCell,
    SheetRow, Workbook,
};
use crate::sink::{DrawCommand, PageContent, Rect};
use crate::style::{Alignment, CellBorders, VerticalAlignment};
use crate::text::{self, FlowOptions, Fragment};
use std::collections::HashSet;
use tracing::{debug, instrument, trace};

/// Page geometry of a printed sheet in sheet units.
///
/// `scale` maps sheet units to paper points. Pages keep the paper's aspect
/// ratio but are sized so the full sheet width fits between the margins.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PrintLayout {
    pub scale: f32,
    pub page_width: f32,
    pub page_height: f32,
    /// Top and bottom include the header and footer distances
    pub margins: Margins,
    pub header_band: Rect,
    pub footer_band: Rect,
}

impl PrintLayout {
    pub fn new(sheet_width: f32, print: &PrintSetup) -> Result<Self> {
        if sheet_width <= 0.0 {
            return Err(LayoutError::InvalidGeometry(format!(
                "sheet width {sheet_width}"
            )));
        }
        let (w, h) = print.paper.dimensions();
        let (paper_width, paper_height) = match print.orientation {
            Orientation::Portrait => (w, h),
            Orientation::Landscape => (h, w),
        };

        let left = print.left * POINTS_PER_INCH;
        let right = print.right * POINTS_PER_INCH;
        let printable = paper_width - left - right;
        if printable <= 0.0 {
            return Err(LayoutError::InvalidGeometry(format!(
                "printable width {printable} on {paper_width}pt paper"
            )));
        }

        let scale = printable / sheet_width;
        let to_sheet = |inches: f32| inches * POINTS_PER_INCH / scale;
        let margins = Margins::new(
            to_sheet(print.top + print.header),
            right / scale,
            to_sheet(print.bottom + print.footer),
            left / scale,
        );
        let page_width = sheet_width + margins.left + margins.right;
        let page_height = page_width * paper_height / paper_width;
        if page_height - margins.top - margins.bottom <= 0.0 {
            return Err(LayoutError::InvalidGeometry(format!(
                "no printable height on {paper_width}x{paper_height}pt paper"
            )));
        }

        Ok(Self {
            scale,
            page_width,
            page_height,
            margins,
            header_band: Rect::new(
                margins.left,
                to_sheet(print.header),
                sheet_width,
                to_sheet(print.top),
            ),
            footer_band: Rect::new(
                margins.left,
                page_height - margins.bottom,
                sheet_width,
                to_sheet(print.bottom),
            ),
        })
    }

    pub fn usable_height(&self) -> f32 {
        self.page_height - self.margins.top - self.margins.bottom
    }
}

/// Cumulative column positions of a sheet
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnLayout {
    pub positions: Vec<f32>,
    pub widths: Vec<f32>,
}

impl ColumnLayout {
    pub fn from_sheet(sheet: &Sheet) -> Result<Self> {
        let count = sheet.column_count();
        if count == 0 {
            return Err(LayoutError::ZeroColumns {
                context: format!("sheet '{}'", sheet.name),
            });
        }
        let widths: Vec<f32> = (0..count).map(|col| sheet.column_width(col)).collect();
        let positions = widths
            .iter()
            .scan(0.0, |x, w| {
                let start = *x;
                *x += w;
                Some(start)
            })
            .collect();
        Ok(Self { positions, widths })
    }

    pub fn count(&self) -> usize {
        self.widths.len()
    }

    pub fn width(&self) -> f32 {
        self.widths.iter().sum()
    }

    /// x and width of the columns `first..=last`, clipped to the sheet
    pub fn span(&self, first: usize, last: usize) -> (f32, f32) {
        let last = last.min(self.count() - 1);
        if first > last {
            return (self.width(), 0.0);
        }
        let x = self.positions[first];
        (x, self.positions[last] + self.widths[last] - x)
    }
}

/// Row positions; hidden rows are zero high, missing rows take the default
#[derive(Debug, Clone)]
struct RowLayout {
    positions: Vec<f32>,
    default_height: f32,
}

impl RowLayout {
    fn from_sheet(sheet: &Sheet) -> Self {
        let mut positions = Vec::with_capacity(sheet.rows.len() + 1);
        let mut y = 0.0;
        for row in &sheet.rows {
            positions.push(y);
            y += match row {
                None => sheet.default_row_height,
                Some(row) if row.hidden => 0.0,
                Some(row) => row.height,
            };
        }
        positions.push(y);
        Self {
            positions,
            default_height: sheet.default_row_height,
        }
    }

    fn y(&self, row: usize) -> f32 {
        match self.positions.get(row) {
            Some(&y) => y,
            None => {
                let end = self.positions.len() - 1;
                self.positions[end] + (row - end) as f32 * self.default_height
            }
        }
    }

    /// y and height of the rows `first..=last`
    fn span(&self, first: usize, last: usize) -> (f32, f32) {
        let y = self.y(first);
        (y, self.y(last + 1) - y)
    }
}

/// How far a cell's text may run into empty neighbours
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Spill {
    Own,
    Right,
    Both,
}

fn spill_of(cell: &SheetCell) -> Spill {
    if cell.format.wrap_text {
        return Spill::Own;
    }
    match cell.format.horizontal {
        HorizontalAlignment::Center => Spill::Both,
        HorizontalAlignment::Left => Spill::Right,
        HorizontalAlignment::General if !cell.value.is_number() => Spill::Right,
        _ => Spill::Own,
    }
}

fn text_alignment(cell: &SheetCell) -> Alignment {
    match cell.format.horizontal {
        HorizontalAlignment::General if cell.value.is_number() => Alignment::Right,
        HorizontalAlignment::General | HorizontalAlignment::Left => Alignment::Left,
        HorizontalAlignment::Center => Alignment::Center,
        HorizontalAlignment::Right => Alignment::Right,
        HorizontalAlignment::Justify => Alignment::Justify,
    }
}

/// Expand the page codes of a header or footer section.
///
/// `&P` is the page number, `&N` the page count, `&A` the sheet name and
/// `&&` a literal ampersand. Formatting codes (font name, size, bold and
/// so on) are dropped.
pub fn expand_header_codes(text: &str, page: usize, total: usize, sheet_name: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '&' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('P') => out.push_str(&page.to_string()),
            Some('N') => out.push_str(&total.to_string()),
            Some('A') => out.push_str(sheet_name),
            Some('&') => out.push('&'),
            Some('"') => {
                for quoted in chars.by_ref() {
                    if quoted == '"' {
                        break;
                    }
                }
            }
            Some(d) if d.is_ascii_digit() => {
                while chars.next_if(char::is_ascii_digit).is_some() {}
            }
            Some(code) => trace!(%code, "Dropping header code"),
            None => {}
        }
    }
    out
}

struct SheetWriter<'a> {
    sheet: &'a Sheet,
    sheet_id: usize,
    merged: &'a MergedCells,
    options: &'a ConvertOptions,
    measurer: &'a dyn TextMeasurer,
    columns: ColumnLayout,
    rows: RowLayout,
    layout: PrintLayout,
    pager: BandPaginator,
    pages: Vec<PageContent>,
}

impl<'a> SheetWriter<'a> {
    fn new(
        sheet: &'a Sheet,
        sheet_id: usize,
        merged: &'a MergedCells,
        options: &'a ConvertOptions,
        measurer: &'a dyn TextMeasurer,
    ) -> Result<Self> {
        let columns = ColumnLayout::from_sheet(sheet)?;
        let layout = PrintLayout::new(columns.width(), &sheet.print)?;
        let pager = BandPaginator::new(layout.margins.top, layout.usable_height())?;
        debug!(
            sheet = %sheet.name,
            columns = columns.count(),
            scale = layout.scale,
            "Print layout {:.1}x{:.1}",
            layout.page_width,
            layout.page_height
        );
        Ok(Self {
            sheet,
            sheet_id,
            merged,
            options,
            measurer,
            columns,
            rows: RowLayout::from_sheet(sheet),
            layout,
            pager,
            pages: Vec::new(),
        })
    }

    fn visible_rows(&self) -> impl Iterator<Item = (usize, &'a SheetRow)> + use<'a> {
        let sheet: &'a Sheet = self.sheet;
        sheet
            .rows
            .iter()
            .enumerate()
            .filter_map(|(index, row)| row.as_ref().filter(|r| !r.hidden).map(|r| (index, r)))
    }

    fn cell_rect(&self, row: usize, first_col: usize, last_col: usize) -> Rect {
        let (x, width) = self.columns.span(first_col, last_col);
        let (y, height) = self.rows.span(row, row);
        Rect::new(x, y, width, height)
    }

    fn merged_rect(&self, range: &CellRange) -> Rect {
        let (x, width) = self.columns.span(range.first_col, range.last_col);
        let (y, height) = self.rows.span(range.first_row, range.last_row);
        Rect::new(x, y, width, height)
    }

    fn border_options(&self, skip_left_top: bool) -> BorderOptions {
        let options = BorderOptions::scaled(self.layout.scale);
        if skip_left_top {
            options.skipping_left_top()
        } else {
            options
        }
    }

    /// Reserve every visible row, preceded by the tallest merged region
    /// it starts
    fn plan_pages(&mut self) {
        let mut seen = HashSet::new();
        for (index, _) in self.visible_rows() {
            let tallest = (0..self.columns.count())
                .filter_map(|col| self.merged.region(self.sheet_id, index, col))
                .filter(|region| seen.insert(region.index))
                .map(|region| self.merged_rect(&region.range))
                .max_by(|a, b| a.height.total_cmp(&b.height));
            if let Some(area) = tallest {
                self.pager.reserve(area);
            }
            let row = self.cell_rect(index, 0, self.columns.count() - 1);
            self.pager.reserve(row);
        }
        self.pages = (0..self.pager.page_count())
            .map(|_| PageContent::new(self.layout.page_width, self.layout.page_height))
            .collect();
        debug!(sheet = %self.sheet.name, pages = self.pages.len(), "Planned page bands");
    }

    /// Put commands drawn in sheet coordinates on the page holding `anchor`
    fn push(&mut self, anchor: Rect, commands: Vec<DrawCommand>) {
        if commands.is_empty() {
            return;
        }
        let (band, placed) = self.pager.to_page(anchor);
        let (dx, dy) = (self.layout.margins.left, placed.y - anchor.y);
        if let Some(page) = self.pages.get_mut(band) {
            page.commands
                .extend(commands.into_iter().map(|c| c.translated(dx, dy)));
        }
    }

    fn draw_fill(&mut self, rect: Rect, cell: &SheetCell) {
        let Some(color) = cell.format.fill else {
            return;
        };
        let fill = fill_rect(rect, color, &cell.format.borders, self.border_options(false));
        self.push(rect, fill.into_iter().collect());
    }

    fn draw_borders(&mut self, rect: Rect, borders: &CellBorders, skip_left_top: bool) {
        let lines = border_lines(rect, borders, self.border_options(skip_left_top));
        self.push(rect, lines);
    }

    fn draw_text(&mut self, rect: Rect, cell: &SheetCell) {
        let pad = self.options.sheet_text_padding / self.layout.scale;
        let inner = rect.inset(pad, pad, pad, pad);
        if inner.width <= 0.0 {
            return;
        }
        let fragments: Vec<Fragment> = cell
            .styled_pieces()
            .into_iter()
            .map(|(text, style)| Fragment::text(text, style))
            .collect();
        let flow = FlowOptions::new(inner.width).with_alignment(text_alignment(cell));
        let formatted =
            text::format(&fragments, &flow, self.measurer).truncate_to_height(inner.height.max(0.0));
        let aligned = text::align_vertically(inner, formatted.height, cell.format.vertical);
        self.push(rect, formatted.draw_commands(aligned.x, aligned.y));
    }

    /// Text of a pending cell over the free columns `from..=to`
    fn draw_spilled(&mut self, row: usize, col: usize, cell: &SheetCell, from: usize, to: usize) {
        let (from, to) = match spill_of(cell) {
            Spill::Own => (col, col),
            Spill::Right => (col, to.max(col)),
            Spill::Both => {
                let reach = (col - from.min(col)).min(to.max(col) - col);
                (col - reach, col + reach)
            }
        };
        if to > col || from < col {
            trace!(row, col, from, to, "Text runs into neighbouring cells");
        }
        let rect = self.cell_rect(row, from, to);
        if rect.width > 0.0 {
            self.draw_text(rect, cell);
        }
    }

    fn draw_fills(&mut self) {
        let sheet = self.sheet;
        let mut processed = HashSet::new();
        for (index, row) in self.visible_rows() {
            let mut col = 0;
            while col < self.columns.count() {
                let Some(cell) = row.cell(col) else {
                    col += 1;
                    continue;
                };
                match self.merged.region(self.sheet_id, index, col).copied() {
                    Some(region) => {
                        if processed.insert(region.index) {
                            let origin = sheet
                                .cell(region.range.first_row, region.range.first_col)
                                .unwrap_or(cell);
                            let area = self.merged_rect(&region.range);
                            self.draw_fill(area, origin);
                        }
                        col = (region.range.last_col + 1).max(col + 1);
                    }
                    None => {
                        let rect = self.cell_rect(index, col, col);
                        self.draw_fill(rect, cell);
                        col += 1;
                    }
                }
            }
        }
    }

    fn draw_row(&mut self, index: usize, row: &SheetRow, processed: &mut HashSet<usize>) {
        let sheet = self.sheet;
        let count = self.columns.count();
        // first column free for spilled text
        let mut from = 0;
        let mut pending: Option<usize> = None;

        let mut col = 0;
        while col < count {
            let Some(cell) = row.cell(col) else {
                col += 1;
                continue;
            };
            let own = self.cell_rect(index, col, col);

            if let Some(region) = self.merged.region(self.sheet_id, index, col).copied() {
                let range = region.range;
                if let Some(waiting) = pending.take().and_then(|p| row.cell(p).map(|c| (p, c))) {
                    self.draw_spilled(index, waiting.0, waiting.1, from, col - 1);
                }
                from = range.last_col + 1;

                if !processed.insert(region.index) {
                    self.draw_borders(own, &cell.format.borders, true);
                    col += 1;
                    continue;
                }

                let area = self.merged_rect(&range);
                if let Some(origin) = sheet
                    .cell(range.first_row, range.first_col)
                    .filter(|c| !c.is_empty())
                {
                    self.draw_text(area, origin);
                }
                self.draw_borders(area, &cell.format.borders, false);
                if let Some(last) = row.cell(range.last_col).filter(|_| range.last_col != col) {
                    let rect = self.cell_rect(index, range.last_col, range.last_col);
                    self.draw_borders(rect, &last.format.borders, true);
                }
                col = (range.last_col + 1).max(col + 1);
                continue;
            }

            self.draw_borders(own, &cell.format.borders, false);
            if cell.is_empty() {
                col += 1;
                continue;
            }

            if let Some(p) = pending.take() {
                if let Some(waiting) = row.cell(p) {
                    self.draw_spilled(index, p, waiting, from, col - 1);
                }
                from = col;
            }
            match spill_of(cell) {
                Spill::Own => {
                    self.draw_text(own, cell);
                    from = col + 1;
                }
                Spill::Right => {
                    pending = Some(col);
                    from = col;
                }
                Spill::Both => pending = Some(col),
            }
            col += 1;
        }

        if let Some((p, waiting)) = pending.and_then(|p| row.cell(p).map(|c| (p, c))) {
            self.draw_spilled(index, p, waiting, from, count - 1);
        }
    }

    fn draw_cells(&mut self) {
        let mut processed = HashSet::new();
        for (index, row) in self.visible_rows() {
            self.draw_row(index, row, &mut processed);
        }
    }

    fn draw_headers_footers(&mut self) {
        let sheet = self.sheet;
        if sheet.header.is_empty() && sheet.footer.is_empty() {
            return;
        }
        let total = self.pages.len();
        let layout = self.layout;
        let third = layout.header_band.width / 3.0;
        let mut style = self.options.header_footer_style.clone();
        style.size /= layout.scale;

        for (index, page) in self.pages.iter_mut().enumerate() {
            let bands: [(Rect, &HeaderFooterText); 2] = [
                (layout.header_band, &sheet.header),
                (layout.footer_band, &sheet.footer),
            ];
            for (band, sections) in bands {
                let parts = [
                    (&sections.left, Alignment::Left),
                    (&sections.center, Alignment::Center),
                    (&sections.right, Alignment::Right),
                ];
                for (slot, (part, alignment)) in parts.into_iter().enumerate() {
                    let Some(part) = part.as_deref().filter(|p| !p.is_empty()) else {
                        continue;
                    };
                    let content = expand_header_codes(part, index + 1, total, &sheet.name);
                    let rect = Rect::new(band.x + third * slot as f32, band.y, third, band.height);
                    let formatted = text::format_text(
                        &content,
                        &style,
                        &FlowOptions::new(third).with_alignment(alignment),
                        self.measurer,
                    );
                    let aligned =
                        text::align_vertically(rect, formatted.height, VerticalAlignment::Middle);
                    page.commands
                        .extend(formatted.draw_commands(aligned.x, aligned.y));
                }
            }
        }
    }

    fn run(mut self) -> Vec<PageContent> {
        self.plan_pages();
        self.draw_fills();
        self.draw_cells();
        self.draw_headers_footers();
        self.pages
    }
}

/// Lay out one sheet of a workbook into pages
#[instrument(skip_all, fields(sheet = %sheet.name, sheet_id = sheet_id))]
pub fn compose_sheet(
    sheet: &Sheet,
    sheet_id: usize,
    merged: &MergedCells,
    options: &ConvertOptions,
    measurer: &dyn TextMeasurer,
) -> Result<Vec<PageContent>> {
    Ok(SheetWriter::new(sheet, sheet_id, merged, options, measurer)?.run())
}

/// Lay out every sheet of a workbook, in order
#[instrument(skip_all, fields(sheets = workbook.sheets.len()))]
pub fn compose_workbook(
    workbook: &Workbook,
    options: &ConvertOptions,
    measurer: &dyn TextMeasurer,
) -> Result<Vec<PageContent>> {
    options.validate()?;
    if workbook.sheets.is_empty() {
        return Err(LayoutError::ZeroColumns {
            context: "workbook without sheets".to_string(),
        });
    }

    let merged = MergedCells::from_workbook(workbook);
    let mut pages = Vec::new();
    for (sheet_id, sheet) in workbook.sheets.iter().enumerate() {
        pages.extend(compose_sheet(sheet, sheet_id, &merged, options, measurer)?);
    }
    debug!("Composed {} pages", pages.len());
    Ok(pages)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::font::HeuristicMeasurer;
    use crate::model::PageSize;
    use crate::sheet::{CellFormat, ColumnSpec};
    use crate::sink::TextCommand;
    use crate::style::{BorderSide, Color};

    /// Printable width of A4 with the default 0.7in side margins
    const PRINTABLE: f32 = 595.28 - 2.0 * 0.7 * 72.0;

    fn compose(workbook: &Workbook) -> Vec<PageContent> {
        compose_workbook(workbook, &ConvertOptions::default(), &HeuristicMeasurer::default())
            .unwrap()
    }

    fn texts(pages: &[PageContent]) -> Vec<(usize, TextCommand)> {
        pages
            .iter()
            .enumerate()
            .flat_map(|(i, p)| p.texts().cloned().map(move |t| (i, t)))
            .collect()
    }

    fn text_row(cells: Vec<Option<SheetCell>>) -> SheetRow {
        SheetRow::new(15.0, cells)
    }

    fn formatted(text: &str, horizontal: HorizontalAlignment) -> SheetCell {
        SheetCell::text(text).with_format(CellFormat {
            horizontal,
            ..CellFormat::default()
        })
    }

    #[test]
    fn test_print_layout_scales_paper() {
        let layout = PrintLayout::new(192.0, &PrintSetup::default()).unwrap();
        assert!((layout.scale - PRINTABLE / 192.0).abs() < 0.0001);
        assert!((layout.page_width * layout.scale - 595.28).abs() < 0.01);
        assert!((layout.page_height * layout.scale - 841.89).abs() < 0.01);
        assert!((layout.margins.top * layout.scale - 1.05 * 72.0).abs() < 0.01);
    }

    #[test]
    fn test_landscape_swaps_paper() {
        let print = PrintSetup {
            paper: PageSize::A3,
            orientation: Orientation::Landscape,
            ..PrintSetup::default()
        };
        let layout = PrintLayout::new(500.0, &print).unwrap();
        assert!(layout.page_width > layout.page_height);
        assert!((layout.page_height / layout.page_width - 841.89 / 1190.55).abs() < 0.0001);
    }

    #[test]
    fn test_zero_width_and_blank_sheet_rejected() {
        assert!(matches!(
            PrintLayout::new(0.0, &PrintSetup::default()),
            Err(LayoutError::InvalidGeometry(_))
        ));
        let blank = Workbook::new().with_sheet(Sheet::new("Empty"));
        let err = compose_workbook(&blank, &ConvertOptions::default(), &HeuristicMeasurer::default());
        assert!(matches!(err, Err(LayoutError::ZeroColumns { .. })));
    }

    #[test]
    fn test_columns_are_cumulative_and_hidden_zero() {
        let sheet = Sheet::new("S")
            .with_columns(vec![
                ColumnSpec::new(40.0),
                ColumnSpec::new(30.0).hidden(),
                ColumnSpec::new(50.0),
            ])
            .with_row(text_row(vec![None, None, Some(SheetCell::text("x"))]));
        let columns = ColumnLayout::from_sheet(&sheet).unwrap();
        assert_eq!(columns.positions, vec![0.0, 40.0, 40.0]);
        assert_eq!(columns.width(), 90.0);
        assert_eq!(columns.span(0, 2), (0.0, 90.0));
    }

    #[test]
    fn test_rows_split_into_pages() {
        let mut sheet = Sheet::new("Tall").with_columns(vec![ColumnSpec::new(PRINTABLE)]);
        for i in 0..10 {
            sheet = sheet.with_row(SheetRow::new(100.0, vec![Some(SheetCell::text(format!("r{i}")))]));
        }
        let pages = compose(&Workbook::new().with_sheet(sheet));
        assert_eq!(pages.len(), 2);

        let all = texts(&pages);
        let r6 = all.iter().find(|(_, t)| t.text == "r6").unwrap();
        assert_eq!(r6.0, 1);
        // bottom aligned in the first row of the page
        let top = 1.05 * 72.0;
        assert!(r6.1.y > top && r6.1.y + r6.1.height <= top + 100.0);
    }

    #[test]
    fn test_merged_region_kept_on_one_page() {
        let mut sheet = Sheet::new("M")
            .with_columns(vec![ColumnSpec::new(PRINTABLE)])
            .with_merge(CellRange::new(5, 7, 0, 0));
        for i in 0..8 {
            sheet = sheet.with_row(SheetRow::new(100.0, vec![Some(SheetCell::text(format!("r{i}")))]));
        }
        let pages = compose(&Workbook::new().with_sheet(sheet));
        assert_eq!(pages.len(), 2);
        let all = texts(&pages);
        assert_eq!(all.iter().find(|(_, t)| t.text == "r4").unwrap().0, 0);
        assert_eq!(all.iter().find(|(_, t)| t.text == "r5").unwrap().0, 1);
        // covered cells draw no text
        assert!(all.iter().all(|(_, t)| t.text != "r6"));
    }

    #[test]
    fn test_hidden_rows_skipped() {
        let sheet = Sheet::new("H")
            .with_row(text_row(vec![Some(SheetCell::text("shown"))]))
            .with_row(text_row(vec![Some(SheetCell::text("hidden"))]).hidden())
            .with_missing_row()
            .with_row(text_row(vec![Some(SheetCell::text("after"))]));
        let pages = compose(&Workbook::new().with_sheet(sheet));
        let all = texts(&pages);
        assert_eq!(all.len(), 2);
        let gap = all[1].1.y - all[0].1.y;
        // one visible row plus the default height of the missing one
        assert!((gap - 30.0).abs() < 0.01);
    }

    #[test]
    fn test_text_spills_into_empty_neighbours() {
        let long = "aaaa bbbb cccc dddd";
        let columns = vec![ColumnSpec::new(60.0); 3];
        let free = Sheet::new("Free")
            .with_columns(columns.clone())
            .with_row(text_row(vec![Some(SheetCell::text(long)), None, None]));
        let blocked = Sheet::new("Blocked")
            .with_columns(columns)
            .with_row(text_row(vec![
                Some(SheetCell::text(long)),
                Some(SheetCell::text("x")),
                None,
            ]));

        let free_pages = compose(&Workbook::new().with_sheet(free));
        assert_eq!(free_pages[0].plain_text(), long);

        let blocked_pages = compose(&Workbook::new().with_sheet(blocked));
        assert_eq!(blocked_pages[0].plain_text(), "aaaa bbbb x");
    }

    #[test]
    fn test_centered_text_spills_symmetrically() {
        let sheet = Sheet::new("C")
            .with_columns(vec![ColumnSpec::new(60.0); 5])
            .with_row(text_row(vec![
                None,
                None,
                Some(formatted("centered over three", HorizontalAlignment::Center)),
                None,
                Some(SheetCell::text("y")),
            ]));
        let pages = compose(&Workbook::new().with_sheet(sheet));
        let layout = PrintLayout::new(300.0, &PrintSetup::default()).unwrap();
        let centered = pages[0]
            .texts()
            .find(|t| t.text == "centered over three")
            .expect("text spills over columns 1 to 3");
        // one free column on the right limits the left side to one as well
        assert!(centered.x > layout.margins.left + 60.0);
        let middle = centered.x + centered.width / 2.0;
        assert!((middle - (layout.margins.left + 150.0)).abs() < 0.01);
    }

    #[test]
    fn test_general_numbers_right_aligned() {
        let sheet = Sheet::new("N")
            .with_columns(vec![ColumnSpec::new(100.0)])
            .with_row(text_row(vec![Some(SheetCell::number(42.0))]));
        let pages = compose(&Workbook::new().with_sheet(sheet));
        let layout = PrintLayout::new(100.0, &PrintSetup::default()).unwrap();
        let number = pages[0].texts().next().unwrap();
        let pad = 1.0 / layout.scale;
        assert!((number.x + number.width - (layout.margins.left + 100.0 - pad)).abs() < 0.01);
    }

    #[test]
    fn test_merged_borders_skip_shared_sides() {
        let bordered = || {
            SheetCell::text("").with_format(CellFormat {
                borders: CellBorders::uniform(BorderSide::thin()),
                ..CellFormat::default()
            })
        };
        let sheet = Sheet::new("B")
            .with_merge(CellRange::new(0, 1, 0, 1))
            .with_row(text_row(vec![Some(bordered()), Some(bordered())]))
            .with_row(text_row(vec![Some(bordered()), Some(bordered())]));
        let pages = compose(&Workbook::new().with_sheet(sheet));
        let lines: Vec<_> = pages[0].lines().collect();
        // merged area, then right and bottom of each covered cell
        assert_eq!(lines.len(), 10);

        let layout = PrintLayout::new(128.0, &PrintSetup::default()).unwrap();
        let top = lines[0];
        let half = 0.25 / layout.scale / 2.0;
        assert!((top.to.x - top.from.x - (128.0 + 2.0 * half)).abs() < 0.001);
        assert!((top.width - 0.25 / layout.scale).abs() < 0.0001);
    }

    #[test]
    fn test_fills_drawn_before_borders() {
        let cell = SheetCell::text("f").with_format(CellFormat {
            fill: Some(Color::light_gray()),
            borders: CellBorders::uniform(BorderSide::thin()),
            ..CellFormat::default()
        });
        let sheet = Sheet::new("F")
            .with_row(text_row(vec![Some(cell.clone()), Some(cell)]));
        let pages = compose(&Workbook::new().with_sheet(sheet));
        let kinds: Vec<bool> = pages[0]
            .commands
            .iter()
            .map(|c| matches!(c, DrawCommand::FillRect { .. }))
            .collect();
        assert_eq!(kinds.iter().filter(|f| **f).count(), 2);
        assert!(kinds[0] && kinds[1]);
    }

    #[test]
    fn test_header_codes_expanded() {
        assert_eq!(
            expand_header_codes("Page &P of &N", 2, 5, "Data"),
            "Page 2 of 5"
        );
        assert_eq!(
            expand_header_codes("&\"Arial,Bold\"&12&A && more&B", 1, 1, "Data"),
            "Data & more"
        );
    }

    #[test]
    fn test_header_and_footer_on_every_page() {
        let mut sheet = Sheet::new("Report").with_columns(vec![ColumnSpec::new(PRINTABLE)]);
        sheet.header.center = Some("&A".to_string());
        sheet.footer.right = Some("Page &P of &N".to_string());
        for i in 0..10 {
            sheet = sheet.with_row(SheetRow::new(100.0, vec![Some(SheetCell::text(format!("r{i}")))]));
        }
        let pages = compose(&Workbook::new().with_sheet(sheet));
        assert_eq!(pages.len(), 2);
        for (i, page) in pages.iter().enumerate() {
            let texts: Vec<_> = page.texts().map(|t| t.text.clone()).collect();
            assert!(texts.contains(&"Report".to_string()));
            assert!(texts.contains(&format!("Page {} of 2", i + 1)));
        }
        let header = pages[0].texts().find(|t| t.text == "Report").unwrap();
        assert!(header.y < 1.05 * 72.0);
        assert_eq!(header.style.size, 9.0);
    }

    #[test]
    fn test_sheets_follow_each_other() {
        let first = Sheet::new("One").with_row(text_row(vec![Some(SheetCell::text("a"))]));
        let second = Sheet::new("Two").with_row(text_row(vec![Some(SheetCell::text("b"))]));
        let pages = compose(&Workbook::new().with_sheet(first).with_sheet(second));
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[1].plain_text(), "b");
    }
}
