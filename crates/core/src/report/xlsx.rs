//! Two-sheet workbook written directly as an Office Open XML package.
//!
//! Sheet and workbook parts are emitted with `quick_xml`. Cells use inline strings, so the package
//! needs no shared-string table. Style indices refer to
//! the `cellXfs` list in [`STYLES_XML`].

use crate::domain::stock::StockRecord;
use crate::pipeline::aggregate::RunAggregate;
use crate::report::{dated_file_name, report_title, ReportWriter};
use anyhow::Context;
use chrono::NaiveDate;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use std::borrow::Cow;
use std::io::{Cursor, Write};
use std::path::PathBuf;
use zip::write::SimpleFileOptions;

pub const SUMMARY_SHEET: &str = "Daily Summary";
pub const RAW_SHEET: &str = "Raw Data";

const SUMMARY_HEADERS: [&str; 9] = [
    "Ticker",
    "Company",
    "Price ($)",
    "Change (%)",
    "Volume",
    "Sentiment",
    "Recommendation",
    "Confidence",
    "Reasoning",
];
const SUMMARY_WIDTHS: [u32; 9] = [10, 18, 12, 12, 16, 12, 16, 12, 40];
// 1-based columns rendered centered on the summary sheet.
const SUMMARY_CENTERED: [usize; 4] = [3, 4, 5, 8];

const RAW_HEADERS: [&str; 12] = [
    "Ticker",
    "Company",
    "Price",
    "Change_Pct",
    "Volume",
    "News_Summary",
    "Key_Events",
    "Technical_Analysis",
    "Sentiment",
    "Action",
    "Reasoning",
    "Confidence",
];
const RAW_WIDTH: u32 = 22;

const MISSING: &str = "-";

const STYLE_DEFAULT: u32 = 0;
const STYLE_TITLE: u32 = 1;
const STYLE_HEADER: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RowFill {
    None,
    Gainer,
    Loser,
    Recommended,
}

impl RowFill {
    /// `cellXfs` index for a body cell with this fill.
    fn style(self, centered: bool) -> u32 {
        let base = match self {
            RowFill::None => 3,
            RowFill::Gainer => 5,
            RowFill::Loser => 7,
            RowFill::Recommended => 9,
        };
        base + u32::from(centered)
    }
}

#[derive(Debug, Clone, PartialEq)]
enum CellValue {
    Text(String),
    Number(f64),
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::Text(s)
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

impl From<u64> for CellValue {
    fn from(n: u64) -> Self {
        CellValue::Number(n as f64)
    }
}

#[derive(Debug, Clone)]
struct Cell {
    value: CellValue,
    style: u32,
}

#[derive(Debug, Default)]
struct Sheet {
    widths: Vec<u32>,
    rows: Vec<Vec<Cell>>,
}

/// Writes `daily_movers_report_YYYYMMDD.xlsx` into a fixed directory.
#[derive(Debug, Clone)]
pub struct XlsxReportWriter {
    out_dir: PathBuf,
}

impl XlsxReportWriter {
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        Self {
            out_dir: out_dir.into(),
        }
    }
}

#[async_trait::async_trait]
impl ReportWriter for XlsxReportWriter {
    async fn write(
        &self,
        report_date: NaiveDate,
        aggregate: &RunAggregate<'_>,
    ) -> anyhow::Result<PathBuf> {
        let bytes = build_workbook(report_date, aggregate)?;

        tokio::fs::create_dir_all(&self.out_dir)
            .await
            .with_context(|| format!("failed to create report dir {}", self.out_dir.display()))?;
        let path = self
            .out_dir
            .join(dated_file_name("daily_movers_report", report_date, "xlsx"));
        tokio::fs::write(&path, &bytes)
            .await
            .with_context(|| format!("failed to write workbook {}", path.display()))?;

        tracing::info!(
            path = %path.display(),
            rows = aggregate.records.len(),
            bytes = bytes.len(),
            "workbook written"
        );
        Ok(path)
    }
}

pub fn build_workbook(
    report_date: NaiveDate,
    aggregate: &RunAggregate<'_>,
) -> anyhow::Result<Vec<u8>> {
    let summary = summary_sheet(report_date, aggregate);
    let raw = raw_sheet(aggregate);

    let parts: [(&str, Cow<'_, [u8]>); 7] = [
        ("[Content_Types].xml", CONTENT_TYPES_XML.as_bytes().into()),
        ("_rels/.rels", ROOT_RELS_XML.as_bytes().into()),
        ("xl/workbook.xml", workbook_xml()?.into()),
        ("xl/_rels/workbook.xml.rels", WORKBOOK_RELS_XML.as_bytes().into()),
        ("xl/styles.xml", STYLES_XML.as_bytes().into()),
        ("xl/worksheets/sheet1.xml", sheet_xml(&summary)?.into()),
        ("xl/worksheets/sheet2.xml", sheet_xml(&raw)?.into()),
    ];

    let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options =
        SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);
    for (name, body) in parts {
        zip.start_file(name, options)
            .with_context(|| format!("failed to start workbook part {name}"))?;
        zip.write_all(&body)
            .with_context(|| format!("failed to write workbook part {name}"))?;
    }
    let cursor = zip.finish().context("failed to finish workbook")?;
    Ok(cursor.into_inner())
}

fn summary_sheet(report_date: NaiveDate, aggregate: &RunAggregate<'_>) -> Sheet {
    let mut sheet = Sheet {
        widths: SUMMARY_WIDTHS.to_vec(),
        rows: Vec::with_capacity(aggregate.records.len() + 2),
    };
    sheet.rows.push(vec![Cell {
        value: report_title(report_date).into(),
        style: STYLE_TITLE,
    }]);
    sheet.rows.push(header_row(&SUMMARY_HEADERS));

    let gainer = aggregate.top_gainer.map(|r| r.ticker.as_str());
    let loser = aggregate.top_loser.map(|r| r.ticker.as_str());

    for stock in aggregate.records {
        let ticker = stock.ticker.as_str();
        let fill = if Some(ticker) == gainer {
            RowFill::Gainer
        } else if Some(ticker) == loser {
            RowFill::Loser
        } else if aggregate.is_top_recommended(ticker) {
            RowFill::Recommended
        } else {
            RowFill::None
        };

        let analysis = aggregate.lookup.analysis(ticker);
        let rec = aggregate.lookup.recommendation(ticker);
        let values: [CellValue; 9] = [
            ticker.into(),
            stock.company_name.as_str().into(),
            stock.price.into(),
            stock.change_percent.into(),
            stock.volume.into(),
            analysis.map_or(MISSING, |a| a.sentiment.as_str()).into(),
            rec.map_or(MISSING, |r| r.action.as_str()).into(),
            rec.map_or_else(|| MISSING.into(), |r| r.confidence.into()),
            rec.map_or(MISSING, |r| r.reasoning.as_str()).into(),
        ];

        sheet.rows.push(
            values
                .into_iter()
                .enumerate()
                .map(|(i, value)| Cell {
                    value,
                    style: fill.style(SUMMARY_CENTERED.contains(&(i + 1))),
                })
                .collect(),
        );
    }
    sheet
}

fn raw_sheet(aggregate: &RunAggregate<'_>) -> Sheet {
    let mut sheet = Sheet {
        widths: vec![RAW_WIDTH; RAW_HEADERS.len()],
        rows: Vec::with_capacity(aggregate.records.len() + 1),
    };
    sheet.rows.push(header_row(&RAW_HEADERS));

    for stock in aggregate.records {
        sheet.rows.push(
            raw_values(stock, aggregate)
                .into_iter()
                .map(|value| Cell {
                    value,
                    style: STYLE_DEFAULT,
                })
                .collect(),
        );
    }
    sheet
}

fn raw_values(stock: &StockRecord, aggregate: &RunAggregate<'_>) -> [CellValue; 12] {
    let ticker = stock.ticker.as_str();
    let research = aggregate.lookup.research(ticker);
    let analysis = aggregate.lookup.analysis(ticker);
    let rec = aggregate.lookup.recommendation(ticker);

    [
        ticker.into(),
        stock.company_name.as_str().into(),
        stock.price.into(),
        stock.change_percent.into(),
        stock.volume.into(),
        research.map_or("", |r| r.news_summary.as_str()).into(),
        research.map(|r| r.key_events.join("; ")).unwrap_or_default().into(),
        analysis.map_or("", |a| a.technical_analysis.as_str()).into(),
        analysis.map_or("", |a| a.sentiment.as_str()).into(),
        rec.map_or("", |r| r.action.as_str()).into(),
        rec.map_or("", |r| r.reasoning.as_str()).into(),
        rec.map_or_else(|| "".into(), |r| r.confidence.into()),
    ]
}

fn header_row(headers: &[&str]) -> Vec<Cell> {
    headers
        .iter()
        .map(|h| Cell {
            value: (*h).into(),
            style: STYLE_HEADER,
        })
        .collect()
}

type XmlWriter = quick_xml::Writer<Cursor<Vec<u8>>>;

fn xml_writer() -> anyhow::Result<XmlWriter> {
    let mut w = quick_xml::Writer::new(Cursor::new(Vec::new()));
    w.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))?;
    Ok(w)
}

fn open(w: &mut XmlWriter, tag: &str, attrs: &[(&str, &str)]) -> anyhow::Result<()> {
    w.write_event(Event::Start(
        BytesStart::new(tag).with_attributes(attrs.iter().copied()),
    ))?;
    Ok(())
}

fn empty(w: &mut XmlWriter, tag: &str, attrs: &[(&str, &str)]) -> anyhow::Result<()> {
    w.write_event(Event::Empty(
        BytesStart::new(tag).with_attributes(attrs.iter().copied()),
    ))?;
    Ok(())
}

fn close(w: &mut XmlWriter, tag: &str) -> anyhow::Result<()> {
    w.write_event(Event::End(BytesEnd::new(tag)))?;
    Ok(())
}

fn sheet_xml(sheet: &Sheet) -> anyhow::Result<Vec<u8>> {
    let mut w = xml_writer()?;
    open(&mut w, "worksheet", &[("xmlns", SPREADSHEET_NS)])?;

    if !sheet.widths.is_empty() {
        open(&mut w, "cols", &[])?;
        for (i, width) in sheet.widths.iter().enumerate() {
            let col = (i + 1).to_string();
            let width = width.to_string();
            empty(
                &mut w,
                "col",
                &[
                    ("min", col.as_str()),
                    ("max", col.as_str()),
                    ("width", width.as_str()),
                    ("customWidth", "1"),
                ],
            )?;
        }
        close(&mut w, "cols")?;
    }

    open(&mut w, "sheetData", &[])?;
    for (r, row) in sheet.rows.iter().enumerate() {
        let row_num = r + 1;
        open(&mut w, "row", &[("r", row_num.to_string().as_str())])?;
        for (c, cell) in row.iter().enumerate() {
            let reference = format!("{}{row_num}", column_name(c + 1));
            write_cell(&mut w, &reference, cell)?;
        }
        close(&mut w, "row")?;
    }
    close(&mut w, "sheetData")?;
    close(&mut w, "worksheet")?;
    Ok(w.into_inner().into_inner())
}

fn write_cell(w: &mut XmlWriter, reference: &str, cell: &Cell) -> anyhow::Result<()> {
    let style = cell.style.to_string();
    let text = match &cell.value {
        CellValue::Number(n) if n.is_finite() => {
            open(w, "c", &[("r", reference), ("s", style.as_str())])?;
            open(w, "v", &[])?;
            w.write_event(Event::Text(BytesText::new(&n.to_string())))?;
            close(w, "v")?;
            return close(w, "c");
        }
        CellValue::Number(_) => "",
        CellValue::Text(s) => s.as_str(),
    };

    open(
        w,
        "c",
        &[("r", reference), ("s", style.as_str()), ("t", "inlineStr")],
    )?;
    open(w, "is", &[])?;
    open(w, "t", &[("xml:space", "preserve")])?;
    w.write_event(Event::Text(BytesText::new(&xml_chars(text))))?;
    close(w, "t")?;
    close(w, "is")?;
    close(w, "c")
}

/// 1-based column index to its spreadsheet letters (`1 -> A`, `27 -> AA`).
fn column_name(mut index: usize) -> String {
    let mut letters = Vec::new();
    while index > 0 {
        let rem = (index - 1) % 26;
        letters.push(char::from(b'A' + rem as u8));
        index = (index - 1) / 26;
    }
    letters.iter().rev().collect()
}

/// Drops code points XML 1.0 cannot carry at all. Markup escaping happens in the writer.
fn xml_chars(text: &str) -> Cow<'_, str> {
    let illegal = |c: char| {
        !matches!(c, '\t' | '\n' | '\r') && (c < ' ' || c == '\u{FFFE}' || c == '\u{FFFF}')
    };
    if text.contains(illegal) {
        Cow::Owned(text.chars().filter(|c| !illegal(*c)).collect())
    } else {
        Cow::Borrowed(text)
    }
}

fn workbook_xml() -> anyhow::Result<Vec<u8>> {
    let mut w = xml_writer()?;
    open(
        &mut w,
        "workbook",
        &[("xmlns", SPREADSHEET_NS), ("xmlns:r", RELATIONSHIPS_NS)],
    )?;
    open(&mut w, "sheets", &[])?;
    for (i, name) in [SUMMARY_SHEET, RAW_SHEET].into_iter().enumerate() {
        let id = (i + 1).to_string();
        let rel = format!("rId{id}");
        empty(
            &mut w,
            "sheet",
            &[("name", name), ("sheetId", id.as_str()), ("r:id", rel.as_str())],
        )?;
    }
    close(&mut w, "sheets")?;
    close(&mut w, "workbook")?;
    Ok(w.into_inner().into_inner())
}

const SPREADSHEET_NS: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";
const RELATIONSHIPS_NS: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

const CONTENT_TYPES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/><Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/><Override PartName="/xl/worksheets/sheet2.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/><Override PartName="/xl/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml"/></Types>"#;

const ROOT_RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#;

const WORKBOOK_RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet2.xml"/><Relationship Id="rId3" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/></Relationships>"#;

// cellXfs: 0 default, 1 title, 2 header, then (left, centered) pairs for no fill, gainer, loser,
// and recommended rows.
const STYLES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><fonts count="3"><font><sz val="11"/><name val="Calibri"/></font><font><b/><sz val="14"/><color rgb="FF1F4E79"/><name val="Calibri"/></font><font><b/><sz val="11"/><color rgb="FFFFFFFF"/><name val="Calibri"/></font></fonts><fills count="6"><fill><patternFill patternType="none"/></fill><fill><patternFill patternType="gray125"/></fill><fill><patternFill patternType="solid"><fgColor rgb="FF1F4E79"/><bgColor indexed="64"/></patternFill></fill><fill><patternFill patternType="solid"><fgColor rgb="FFC6EFCE"/><bgColor indexed="64"/></patternFill></fill><fill><patternFill patternType="solid"><fgColor rgb="FFFFC7CE"/><bgColor indexed="64"/></patternFill></fill><fill><patternFill patternType="solid"><fgColor rgb="FFFFEB9C"/><bgColor indexed="64"/></patternFill></fill></fills><borders count="1"><border><left/><right/><top/><bottom/><diagonal/></border></borders><cellStyleXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0"/></cellStyleXfs><cellXfs count="11"><xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/><xf numFmtId="0" fontId="1" fillId="0" borderId="0" xfId="0" applyFont="1" applyAlignment="1"><alignment horizontal="left" vertical="center"/></xf><xf numFmtId="0" fontId="2" fillId="2" borderId="0" xfId="0" applyFont="1" applyFill="1" applyAlignment="1"><alignment horizontal="center" vertical="center"/></xf><xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0" applyAlignment="1"><alignment horizontal="left" vertical="center" wrapText="1"/></xf><xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0" applyAlignment="1"><alignment horizontal="center" vertical="center"/></xf><xf numFmtId="0" fontId="0" fillId="3" borderId="0" xfId="0" applyFill="1" applyAlignment="1"><alignment horizontal="left" vertical="center" wrapText="1"/></xf><xf numFmtId="0" fontId="0" fillId="3" borderId="0" xfId="0" applyFill="1" applyAlignment="1"><alignment horizontal="center" vertical="center"/></xf><xf numFmtId="0" fontId="0" fillId="4" borderId="0" xfId="0" applyFill="1" applyAlignment="1"><alignment horizontal="left" vertical="center" wrapText="1"/></xf><xf numFmtId="0" fontId="0" fillId="4" borderId="0" xfId="0" applyFill="1" applyAlignment="1"><alignment horizontal="center" vertical="center"/></xf><xf numFmtId="0" fontId="0" fillId="5" borderId="0" xfId="0" applyFill="1" applyAlignment="1"><alignment horizontal="left" vertical="center" wrapText="1"/></xf><xf numFmtId="0" fontId="0" fillId="5" borderId="0" xfId="0" applyFill="1" applyAlignment="1"><alignment horizontal="center" vertical="center"/></xf></cellXfs><cellStyles count="1"><cellStyle name="Normal" xfId="0" builtinId="0"/></cellStyles></styleSheet>"#;
