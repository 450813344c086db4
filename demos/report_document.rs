//! Report document example: styled headings, a long table and page fields

use lopdf_office::{
    Block, Bookmark, CharacterFormat, Color, ConvertOptions, Document, FieldKind,
    HeuristicMeasurer, NamedStyle, Paragraph, ParagraphFormat, PdfSink, Run, StyleSheet, Table,
    TableCell, TableOfContents, TableRow,
};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "debug".into()))
        .init();

    let styles = StyleSheet::new().with_style(
        NamedStyle::new("Heading 1")
            .with_paragraph(ParagraphFormat::new().with_spacing(12.0, 6.0))
            .with_character(CharacterFormat::new().with_size(16.0).with_bold(true)),
    );

    let mut table = Table::new().with_row(TableRow::new(vec![
        TableCell::text("Region").with_shading(Color::light_gray()),
        TableCell::text("Orders").with_shading(Color::light_gray()),
        TableCell::text("Comment").with_shading(Color::light_gray()),
    ]));
    for i in 1..=90 {
        table = table.with_row(TableRow::new(vec![
            TableCell::text(format!("Region {i}")),
            TableCell::text((i * 17 % 400).to_string()),
            TableCell::text("Figures confirmed by the regional office"),
        ]));
    }

    let mut doc = Document::new()
        .with_styles(styles)
        .with_bookmark(Bookmark::new("_Toc1", "Overview", 0).with_number("1", 1))
        .with_bookmark(Bookmark::new("_Toc2", "Orders by region", 1).with_number("2", 1))
        .with_block(Block::TableOfContents(TableOfContents::default()))
        .with_block(Block::PageBreak)
        .with_block(Paragraph::text("Overview").with_style("Heading 1"))
        .with_block(Paragraph::text(
            "Orders grew in every region during the quarter. The table below lists the totals.",
        ))
        .with_block(Paragraph::text("Orders by region").with_style("Heading 1"))
        .with_block(table);
    doc.headers_footers.default_footer = vec![Block::Paragraph(
        Paragraph::text("Page ")
            .with_run(Run::field(FieldKind::PageNumber))
            .with_run(Run::text(" of "))
            .with_run(Run::field(FieldKind::PageCount)),
    )];

    let conversion = lopdf_office::render_document(
        &doc,
        &ConvertOptions::default(),
        &HeuristicMeasurer::default(),
    )?;
    println!("Laid out {} pages", conversion.page_count());

    let mut sink = PdfSink::new();
    conversion.emit(&mut sink)?;
    sink.save(std::path::Path::new("report_document.pdf"))?;
    println!("Created report_document.pdf");

    Ok(())
}
