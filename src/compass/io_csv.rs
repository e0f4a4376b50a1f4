// Primitives for reading CSV files.

use std::fs::File;

use position_matching::normalizer::RawRecord;

use crate::compass::{io_common::zip_row, *};

/// Reads a survey export in CSV format. The first row holds the headers.
pub fn read_csv_records(path: &str, source: &DataSource) -> CompassResult<Vec<RawRecord>> {
    let (mut rdr, headers) = get_reader(path, source)?;
    debug!("read_csv_records: headers: {:?}", headers);

    let mut res: Vec<RawRecord> = Vec::new();
    for (idx, line_r) in rdr.records().enumerate() {
        // The header is line 1.
        let lineno = idx + 2;
        let line = line_r.context(CsvLineParseSnafu { lineno })?;
        let cells: Vec<String> = line.iter().map(|s| s.to_string()).collect();
        if cells.iter().all(|c| c.trim().is_empty()) {
            debug!("read_csv_records: skipping empty line {}", lineno);
            continue;
        }
        res.push(zip_row(&headers, &cells));
    }
    info!("Read {} rows from {}", res.len(), path);
    Ok(res)
}

fn get_reader(path: &str, source: &DataSource) -> CompassResult<(csv::Reader<File>, Vec<String>)> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .delimiter(source.delimiter_byte()?)
        .from_path(path)
        .context(CsvOpenSnafu { path })?;
    let headers: Vec<String> = rdr
        .headers()
        .context(CsvLineParseSnafu { lineno: 1_usize })?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').to_string())
        .collect();
    Ok((rdr, headers))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn source(delimiter: Option<&str>) -> DataSource {
        DataSource {
            provider: "csv".to_string(),
            file_path: "unused".to_string(),
            excel_worksheet_name: None,
            delimiter: delimiter.map(|d| d.to_string()),
        }
    }

    fn testdata(name: &str) -> String {
        let p: PathBuf = [env!("CARGO_MANIFEST_DIR"), "testdata", name].iter().collect();
        p.display().to_string()
    }

    #[test]
    fn read_survey() {
        let rows = read_csv_records(&testdata("candidates.csv"), &source(None)).unwrap();
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0][0].0, "Ajatempel");
        assert_eq!(rows[0][2].1, "Mari Maasikas");
        assert_eq!(rows[1][2].1, "Иван Петров");
        // Every row has one cell per header.
        assert!(rows.iter().all(|r| r.len() == rows[0].len()));
    }

    #[test]
    fn semicolon_delimiter() {
        let dir = tempfile::TempDir::new().unwrap();
        let p = dir.path().join("semicolon.csv").display().to_string();
        std::fs::write(&p, "\u{feff}Nimi;Väide 1;Väide 2\nAnna;1;-0,5\n\n;;\nBoris;0\n").unwrap();
        let rows = read_csv_records(&p, &source(Some(";"))).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0][0], ("Nimi".to_string(), "Anna".to_string()));
        assert_eq!(rows[0][2], ("Väide 2".to_string(), "-0,5".to_string()));
        assert_eq!(rows[1][2], ("Väide 2".to_string(), "".to_string()));
    }

    #[test]
    fn missing_file() {
        assert!(matches!(
            read_csv_records("/nonexistent/votecompass.csv", &source(None)),
            Err(CompassError::CsvOpen { .. })
        ));
    }
}
