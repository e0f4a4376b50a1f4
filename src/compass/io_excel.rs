use calamine::{open_workbook, DataType, Range, Reader, Xlsx};

use position_matching::normalizer::RawRecord;

use crate::compass::{io_common::zip_row, *};

/// Reads a survey export in Excel format, from the worksheet named in the
/// source or else the first one. The first row holds the headers.
pub fn read_excel_records(path: &str, source: &DataSource) -> CompassResult<Vec<RawRecord>> {
    let wrange = get_range(path, source)?;

    let mut rows = wrange.rows();
    let headers: Vec<String> = rows
        .next()
        .context(EmptyExcelSnafu {})?
        .iter()
        .map(cell_to_text)
        .collect();
    debug!("read_excel_records: headers: {:?}", headers);

    let mut res: Vec<RawRecord> = Vec::new();
    for (idx, row) in rows.enumerate() {
        let cells: Vec<String> = row.iter().map(cell_to_text).collect();
        if cells.iter().all(|c| c.trim().is_empty()) {
            debug!("read_excel_records: skipping empty row {}", idx + 2);
            continue;
        }
        res.push(zip_row(&headers, &cells));
    }
    info!("Read {} rows from {}", res.len(), path);
    Ok(res)
}

/// The text of a cell, as a CSV export would show it.
fn cell_to_text(cell: &DataType) -> String {
    match cell {
        DataType::String(s) => s.clone(),
        DataType::Float(f) => f.to_string(),
        DataType::Int(i) => i.to_string(),
        DataType::Bool(b) => b.to_string(),
        DataType::Empty => "".to_string(),
        x => {
            warn!("read_excel_records: cannot read cell {:?}", x);
            "".to_string()
        }
    }
}

fn get_range(path: &str, source: &DataSource) -> CompassResult<Range<DataType>> {
    debug!(
        "get_range: path: {:?} worksheet: {:?}",
        path, &source.excel_worksheet_name
    );
    let mut workbook: Xlsx<_> = open_workbook(path).context(OpeningExcelSnafu { path })?;

    if let Some(worksheet_name) = &source.excel_worksheet_name {
        workbook
            .worksheet_range(worksheet_name)
            .context(MissingWorksheetSnafu {
                name: worksheet_name,
            })?
            .context(OpeningExcelSnafu { path })
    } else {
        workbook
            .worksheet_range_at(0)
            .context(MissingWorksheetSnafu { name: "#0" })?
            .context(OpeningExcelSnafu { path })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cells_as_text() {
        assert_eq!(cell_to_text(&DataType::String("Nõustun".to_string())), "Nõustun");
        assert_eq!(cell_to_text(&DataType::Float(0.5)), "0.5");
        assert_eq!(cell_to_text(&DataType::Float(-1.0)), "-1");
        assert_eq!(cell_to_text(&DataType::Int(101)), "101");
        assert_eq!(cell_to_text(&DataType::Empty), "");
    }

    #[test]
    fn missing_file() {
        let source = DataSource {
            provider: "xlsx".to_string(),
            file_path: "unused".to_string(),
            excel_worksheet_name: None,
            delimiter: None,
        };
        assert!(matches!(
            read_excel_records("/nonexistent/votecompass.xlsx", &source),
            Err(CompassError::OpeningExcel { .. })
        ));
    }
}
