//! Writes a [`WorkbookModel`] with `rust_xlsxwriter`.

use anyhow::{Context, Result};
use rust_xlsxwriter::{Format, FormatAlign, FormatBorder, Formula, Workbook, Worksheet};
use tracing::warn;

use crate::report::formula::Evaluator;
use crate::report::layout::{CellValue, Sheet, Style, WorkbookModel};

/// Grade strings such as "5.0" parse as numbers, so the cached result is
/// stored numerically; this keeps the trailing ".0" visible.
const GRADE_NUM_FORMAT: &str = "0.0";

/// Reusable Excel formats
struct ExcelFormats {
    plain: Format,
    header: Format,
    title: Format,
    section: Format,
    column_header: Format,
    column_header_center: Format,
    label: Format,
    dimension_label: Format,
    score: Format,
    percent: Format,
    grade: Format,
    total: Format,
    total_percent: Format,
    final_grade: Format,
    wrapped: Format,
}

impl ExcelFormats {
    fn new() -> Self {
        let column_header = Format::new()
            .set_bold()
            .set_background_color(0xF2F2F2)
            .set_border_bottom(FormatBorder::Thin);

        let total = Format::new()
            .set_bold()
            .set_background_color(0xE2EFDA)
            .set_border_top(FormatBorder::Thin);

        Self {
            plain: Format::new(),
            header: Format::new()
                .set_bold()
                .set_align(FormatAlign::Center)
                .set_background_color(0x4472C4)
                .set_font_color(0xFFFFFF)
                .set_border(FormatBorder::Thin),
            title: Format::new().set_bold().set_font_size(16),
            section: Format::new()
                .set_bold()
                .set_font_size(12)
                .set_background_color(0xD9E1F2)
                .set_border_bottom(FormatBorder::Thin),
            column_header_center: column_header.clone().set_align(FormatAlign::Center),
            column_header,
            label: Format::new().set_align(FormatAlign::VerticalCenter),
            dimension_label: Format::new()
                .set_bold()
                .set_text_wrap()
                .set_align(FormatAlign::VerticalCenter),
            score: Format::new()
                .set_num_format("0.0#")
                .set_align(FormatAlign::Center),
            percent: Format::new()
                .set_num_format("0.00%")
                .set_align(FormatAlign::Center),
            grade: Format::new()
                .set_bold()
                .set_num_format(GRADE_NUM_FORMAT)
                .set_align(FormatAlign::Center),
            total_percent: total
                .clone()
                .set_num_format("0.00%")
                .set_align(FormatAlign::Center),
            final_grade: total
                .clone()
                .set_font_size(12)
                .set_num_format(GRADE_NUM_FORMAT)
                .set_align(FormatAlign::Center),
            total,
            wrapped: Format::new().set_text_wrap().set_align(FormatAlign::Top),
        }
    }

    fn get(&self, style: Style) -> &Format {
        match style {
            Style::Plain => &self.plain,
            Style::Header => &self.header,
            Style::Title => &self.title,
            Style::Section => &self.section,
            Style::ColumnHeader => &self.column_header,
            Style::ColumnHeaderCenter => &self.column_header_center,
            Style::Label => &self.label,
            Style::DimensionLabel => &self.dimension_label,
            Style::Score => &self.score,
            Style::Percent => &self.percent,
            Style::Grade => &self.grade,
            Style::Total => &self.total,
            Style::TotalPercent => &self.total_percent,
            Style::FinalGrade => &self.final_grade,
            Style::Wrapped => &self.wrapped,
        }
    }
}

fn write_sheet(
    worksheet: &mut Worksheet,
    sheet: &Sheet,
    formats: &ExcelFormats,
    evaluator: &Evaluator,
) -> Result<()> {
    worksheet.set_name(&sheet.name)?;
    if sheet.hidden {
        worksheet.set_hidden(true);
    }

    for (&col, column) in &sheet.columns {
        worksheet.set_column_width(col, column.width)?;
        if column.hidden {
            worksheet.set_column_hidden(col)?;
        }
    }

    for merge in &sheet.merges {
        worksheet.merge_range(
            merge.first_row,
            merge.first_col,
            merge.last_row,
            merge.last_col,
            &merge.text,
            formats.get(merge.style),
        )?;
    }

    for (&(row, col), cell) in &sheet.cells {
        let format = formats.get(cell.style);
        match &cell.value {
            CellValue::Text(text) => {
                worksheet.write_string_with_format(row, col, text, format)?;
            }
            CellValue::Number(n) => {
                worksheet.write_number_with_format(row, col, *n, format)?;
            }
            CellValue::Blank => {
                worksheet.write_blank(row, col, format)?;
            }
            CellValue::Formula(text) => {
                let mut formula = Formula::new(format!("={text}"));
                match evaluator.cell_value(&sheet.name, row, col) {
                    Ok(value) => formula = formula.set_result(value.to_cached()),
                    Err(err) => warn!(
                        sheet = %sheet.name,
                        row,
                        col,
                        formula = %text,
                        error = %err,
                        "Could not evaluate formula; no cached result stored"
                    ),
                }
                worksheet.write_formula_with_format(row, col, formula, format)?;
            }
        }
    }

    Ok(())
}

/// Renders the model to XLSX bytes, caching every evaluated formula result.
pub fn render(model: &WorkbookModel) -> Result<Vec<u8>> {
    let formats = ExcelFormats::new();
    let evaluator = Evaluator::new(model);
    let mut workbook = Workbook::new();

    for sheet in &model.sheets {
        let worksheet = workbook.add_worksheet();
        write_sheet(worksheet, sheet, &formats, &evaluator)
            .with_context(|| format!("failed to render sheet '{}'", sheet.name))?;
    }

    workbook
        .save_to_buffer()
        .context("failed to serialize workbook")
}
