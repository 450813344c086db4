//! Workbook example: print scaling, merged titles, spilled text and header codes

use lopdf_office::{
    BorderSide, CellBorders, CellFormat, CellRange, Color, ColumnSpec, ConvertOptions,
    HeuristicMeasurer, HorizontalAlignment, PdfSink, Sheet, SheetCell, SheetRow, Workbook,
};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "debug".into()))
        .init();

    let boxed = CellFormat {
        borders: CellBorders::uniform(BorderSide::thin()),
        ..CellFormat::default()
    };
    let title = CellFormat {
        horizontal: HorizontalAlignment::Center,
        fill: Some(Color::rgb8(220, 230, 241)),
        ..boxed.clone()
    };

    let mut ledger = Sheet::new("Ledger")
        .with_columns(vec![
            ColumnSpec::new(90.0),
            ColumnSpec::new(160.0),
            ColumnSpec::new(70.0),
        ])
        .with_merge(CellRange::new(0, 0, 0, 2))
        .with_row(SheetRow::new(
            20.0,
            vec![Some(SheetCell::text("General ledger").with_format(title))],
        ));
    for i in 1..=120 {
        let date = format!("2026-{:02}-{:02}", i % 12 + 1, i % 28 + 1);
        let cells = vec![
            SheetCell::text(date),
            SheetCell::text(format!("Invoice {i} settled in full")),
            SheetCell::number(f64::from(i) * 12.5),
        ];
        ledger = ledger.with_row(SheetRow::new(
            15.0,
            cells
                .into_iter()
                .map(|cell| Some(cell.with_format(boxed.clone())))
                .collect(),
        ));
    }
    ledger.header.center = Some("&A".to_string());
    ledger.footer.right = Some("Page &P of &N".to_string());

    let notes = Sheet::new("Notes").with_row(SheetRow::new(
        15.0,
        vec![Some(SheetCell::text(
            "Amounts include tax and spill across the empty columns to the right",
        ))],
    ));

    let workbook = Workbook::new().with_sheet(ledger).with_sheet(notes);
    let conversion = lopdf_office::render_workbook(
        &workbook,
        &ConvertOptions::default(),
        &HeuristicMeasurer::default(),
    )?;
    println!("Laid out {} pages", conversion.page_count());

    let mut sink = PdfSink::new();
    conversion.emit(&mut sink)?;
    sink.save(std::path::Path::new("ledger_workbook.pdf"))?;
    println!("Created ledger_workbook.pdf");

    Ok(())
}
