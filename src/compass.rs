use log::{debug, info, warn};

use position_matching::builder::ContextBuilder;
use position_matching::normalizer::{normalize_all, RawRecord};
use position_matching::*;
use snafu::{prelude::*, Snafu};

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value as JSValue;
use text_diff::print_diff;

use crate::compass::config_reader::*;
use crate::compass::io_common::{resolve_path, simplify_file_name, write_atomically};
use crate::compass::store::{DirectoryStore, ResultStore};

pub mod config_reader;
pub mod io_common;
pub mod io_csv;
pub mod io_excel;
pub mod store;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum CompassError {
    #[snafu(display("Error opening file {path}"))]
    OpeningJson {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing the JSON content of {path}"))]
    ParsingJson {
        source: serde_json::Error,
        path: String,
    },
    #[snafu(display("Error writing JSON content"))]
    SerializingJson { source: serde_json::Error },
    #[snafu(display("Error writing file {path}"))]
    WritingFile {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error opening the CSV file {path}"))]
    CsvOpen { source: csv::Error, path: String },
    #[snafu(display("Error parsing line {lineno} of the CSV file"))]
    CsvLineParse { source: csv::Error, lineno: usize },
    #[snafu(display("The CSV delimiter must be a single character, got {delimiter:?}"))]
    CsvDelimiter { delimiter: String },
    #[snafu(display("Error opening the Excel file {path}"))]
    OpeningExcel {
        source: calamine::XlsxError,
        path: String,
    },
    #[snafu(display("The Excel file has no worksheet {name:?}"))]
    MissingWorksheet { name: String },
    #[snafu(display("The Excel worksheet has no header row"))]
    EmptyExcel {},
    #[snafu(display("Unknown data source provider {provider:?} (expected csv or xlsx)"))]
    UnknownProvider { provider: String },
    #[snafu(display("Unknown header field {field:?} in the normalizer rules"))]
    UnknownField { field: String },
    #[snafu(display("The configuration file has no parent directory"))]
    MissingParentDir {},
    #[snafu(display("answers must be an array of numbers: {message}"))]
    InvalidAnswers { message: String },
    #[snafu(display("answers[{index}] is not a number"))]
    AnswersNotNumeric { index: usize },
    #[snafu(display("{source}"))]
    Matching { source: MatchErrors },
    #[snafu(display("{count} duplicate candidate keys: {keys}"))]
    DuplicateKeys { count: usize, keys: String },
    #[snafu(display("The configuration does not define outputSettings.resultsDirectory"))]
    MissingResultsDirectory {},
    #[snafu(display("Invalid result id {id:?}"))]
    InvalidResultId { id: String },
    #[snafu(display("No result with id {id}"))]
    ResultNotFound { id: String },

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type CompassResult<T> = Result<T, CompassError>;

/// A candidate as stored in the dataset file.
///
/// All the fields are optional when reading, to let the matching decide what
/// to do with incomplete entries.
#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct CandidateJson {
    #[serde(default)]
    pub party: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "candidateNumber", default)]
    pub candidate_number: Option<String>,
    #[serde(default)]
    pub positions: Option<JSValue>,
}

impl CandidateJson {
    pub fn from_record(c: &CandidateRecord) -> CandidateJson {
        CandidateJson {
            party: Some(c.party.clone()),
            name: Some(c.name.clone()),
            candidate_number: Some(c.candidate_number.clone()),
            positions: c.positions.as_ref().map(|l| {
                JSValue::Array(
                    l.iter()
                        .map(|p| match p {
                            Some(x) => serde_json::json!(x),
                            None => JSValue::Null,
                        })
                        .collect(),
                )
            }),
        }
    }

    /// Anything else than an array is not a positions vector. Inside the
    /// array, anything else than a number is a missing position.
    pub fn to_record(&self) -> CandidateRecord {
        let positions = match &self.positions {
            Some(JSValue::Array(l)) => Some(l.iter().map(|v| v.as_f64()).collect()),
            _ => None,
        };
        CandidateRecord {
            party: self.party.clone().unwrap_or_default().trim().to_string(),
            name: self.name.clone().unwrap_or_default().trim().to_string(),
            candidate_number: self
                .candidate_number
                .clone()
                .unwrap_or_default()
                .trim()
                .to_string(),
            positions,
        }
    }
}

/// The compatibility of a candidate, as returned to the respondent.
#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct CandidateMatchJson {
    pub party: String,
    pub name: String,
    #[serde(rename = "candidateNumber")]
    pub candidate_number: String,
    pub percent: Option<f64>,
}

impl CandidateMatchJson {
    pub fn from_match(m: &CandidateMatch) -> CandidateMatchJson {
        CandidateMatchJson {
            party: m.party.clone(),
            name: m.name.clone(),
            candidate_number: m.candidate_number.clone(),
            percent: m.percent,
        }
    }
}

pub fn results_to_json(res: &MatchResults) -> BTreeMap<String, CandidateMatchJson> {
    res.iter()
        .map(|(k, m)| (k.clone(), CandidateMatchJson::from_match(m)))
        .collect()
}

pub fn read_dataset(path: &str) -> CompassResult<Vec<CandidateRecord>> {
    info!("Attempting to read dataset {:?}", path);
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    let l: Vec<CandidateJson> =
        serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu { path })?;
    debug!("read_dataset: {} candidates", l.len());
    Ok(l.iter().map(|c| c.to_record()).collect())
}

pub fn write_dataset(path: &str, candidates: &[CandidateRecord]) -> CompassResult<()> {
    let l: Vec<CandidateJson> = candidates.iter().map(CandidateJson::from_record).collect();
    let js = serde_json::to_string(&l).context(SerializingJsonSnafu {})?;
    write_atomically(path, &js)
}

/// Reads the answers of a respondent: a JSON array of numbers, or a request
/// body `{"answers": [...]}`.
pub fn parse_answers(text: &str) -> CompassResult<Vec<f64>> {
    let js: JSValue = match serde_json::from_str(text) {
        Ok(js) => js,
        Err(e) => {
            return InvalidAnswersSnafu {
                message: e.to_string(),
            }
            .fail()
        }
    };
    let arr = match &js {
        JSValue::Array(l) => l,
        JSValue::Object(o) => match o.get("answers") {
            Some(JSValue::Array(l)) => l,
            _ => {
                return InvalidAnswersSnafu {
                    message: "missing answers array",
                }
                .fail()
            }
        },
        _ => {
            return InvalidAnswersSnafu {
                message: "not an array",
            }
            .fail()
        }
    };
    let mut res: Vec<f64> = Vec::new();
    for (index, v) in arr.iter().enumerate() {
        res.push(v.as_f64().context(AnswersNotNumericSnafu { index })?);
    }
    Ok(res)
}

fn read_answers(answers: &str) -> CompassResult<Vec<f64>> {
    let t = answers.trim();
    if t.starts_with('[') || t.starts_with('{') {
        parse_answers(t)
    } else {
        info!("Attempting to read answers file {:?}", t);
        let contents = fs::read_to_string(t).context(OpeningJsonSnafu { path: t })?;
        parse_answers(&contents)
    }
}

fn read_raw_records(root: &Path, source: &DataSource) -> CompassResult<Vec<RawRecord>> {
    let path = resolve_path(root, &source.file_path);
    info!(
        "Attempting to read candidate survey {:?} ({})",
        path,
        simplify_file_name(&path)
    );
    match source.provider.as_str() {
        "csv" => io_csv::read_csv_records(&path, source),
        "xlsx" | "excel" => io_excel::read_excel_records(&path, source),
        x => UnknownProviderSnafu { provider: x }.fail(),
    }
}

/// Reads the candidate survey and writes the candidate dataset.
///
/// Nothing is written if any row of the survey cannot be read.
pub fn run_ingest(config_path: String, out: Option<String>) -> CompassResult<()> {
    let (config, root) = read_config(&config_path)?;
    let statements = config.statement_set.to_statement_set();
    info!(
        "Statement set {:?}: {} statements, fingerprint {}",
        statements.version,
        statements.len(),
        statements.fingerprint()
    );
    let rules = config.normalizer_rules()?;
    debug!("run_ingest: rules: {:?}", rules);

    let records = read_raw_records(&root, &config.data_source)?;
    let normalization = normalize_all(&records, &rules, statements.len());

    if !normalization.duplicates.is_empty() {
        let keys: Vec<String> = normalization
            .duplicates
            .iter()
            .map(|d| d.key.clone())
            .collect();
        warn!(
            "{} candidates share their key with an earlier row: {}",
            keys.len(),
            keys.join(", ")
        );
        if config.reject_duplicate_keys() {
            return DuplicateKeysSnafu {
                count: keys.len(),
                keys: keys.join(", "),
            }
            .fail();
        }
    }
    if !normalization.length_mismatches.is_empty() {
        warn!(
            "{} candidates do not have {} positions, check the column order of the survey",
            normalization.length_mismatches.len(),
            statements.len()
        );
    }

    let out_path = match out {
        Some(p) => p,
        None => resolve_path(&root, &config.output_settings.dataset_path),
    };
    write_dataset(&out_path, &normalization.candidates)?;
    info!(
        "Done: wrote {} candidates to {}",
        normalization.candidates.len(),
        out_path
    );
    Ok(())
}

pub struct EvaluateOptions {
    pub config_path: String,
    pub answers: String,
    pub out: Option<String>,
    pub reference: Option<String>,
    pub sort: Option<String>,
    pub save: bool,
}

fn parse_sort_order(s: &str) -> CompassResult<SortOrder> {
    match s {
        "desc" | "descending" => Ok(SortOrder::Descending),
        "asc" | "ascending" => Ok(SortOrder::Ascending),
        x => whatever!("Unknown sort order {:?} (expected asc or desc)", x),
    }
}

fn format_ranking(res: &MatchResults, order: SortOrder) -> String {
    let mut lines: Vec<String> = Vec::new();
    for (rank, (key, m)) in sort_matches(res, order).iter().enumerate() {
        let percent = match m.percent {
            Some(p) => format!("{:6.2}%", p),
            None => "    N/A".to_string(),
        };
        lines.push(format!(
            "{:3}. {} {} ({}) [{}]",
            rank + 1,
            percent,
            m.name,
            m.party,
            key
        ));
    }
    lines.join("\n")
}

/// Evaluates the answers of a respondent against the dataset.
pub fn evaluate(config: &CompassConfig, root: &Path, answers: &[f64]) -> CompassResult<MatchResults> {
    let statements = config.statement_set.to_statement_set();
    let dataset_path = resolve_path(root, &config.output_settings.dataset_path);
    let candidates = read_dataset(&dataset_path)?;
    let context = ContextBuilder::new(&statements)
        .context(MatchingSnafu {})?
        .candidates(&candidates)
        .build();
    context.evaluate(answers).context(MatchingSnafu {})
}

pub fn run_evaluate(opts: EvaluateOptions) -> CompassResult<()> {
    let (config, root) = read_config(&opts.config_path)?;
    let sort = match &opts.sort {
        Some(s) => Some(parse_sort_order(s)?),
        None => None,
    };
    let answers = read_answers(&opts.answers)?;
    let res = evaluate(&config, &root, &answers)?;

    let result_js = results_to_json(&res);
    let pretty_js = serde_json::to_string_pretty(&result_js).context(SerializingJsonSnafu {})?;

    match (&sort, opts.out.as_deref()) {
        (Some(order), _) => println!("{}", format_ranking(&res, *order)),
        (None, None) | (None, Some("stdout")) => println!("{}", pretty_js),
        (None, Some(_)) => {}
    }
    if let Some(p) = opts.out.as_deref() {
        if p != "stdout" && !p.is_empty() {
            write_atomically(p, &pretty_js)?;
            info!("Wrote {} results to {}", res.len(), p);
        }
    }

    if opts.save {
        let dir = config
            .output_settings
            .results_directory
            .as_ref()
            .context(MissingResultsDirectorySnafu {})?;
        let mut store = DirectoryStore::new(&resolve_path(&root, dir));
        let l: Vec<CandidateMatchJson> = sort_matches(&res, SortOrder::Descending)
            .iter()
            .map(|(_, m)| CandidateMatchJson::from_match(m))
            .collect();
        let id = store.save(&l)?;
        println!("resultId: {}", id);
    }

    // The reference results, if provided for comparison
    if let Some(reference_p) = opts.reference {
        let contents =
            fs::read_to_string(&reference_p).context(OpeningJsonSnafu { path: &reference_p })?;
        let reference_js: JSValue =
            serde_json::from_str(&contents).context(ParsingJsonSnafu { path: &reference_p })?;
        let pretty_reference =
            serde_json::to_string_pretty(&reference_js).context(SerializingJsonSnafu {})?;
        let pretty_computed = serde_json::to_string_pretty(
            &serde_json::to_value(&result_js).context(SerializingJsonSnafu {})?,
        )
        .context(SerializingJsonSnafu {})?;
        if pretty_reference != pretty_computed {
            warn!("Found differences with the reference results");
            print_diff(pretty_reference.as_str(), pretty_computed.as_str(), "\n");
            whatever!("Difference detected between computed results and reference results")
        }
    }
    Ok(())
}

pub fn run_show(config_path: String, result_id: String) -> CompassResult<()> {
    let (config, root) = read_config(&config_path)?;
    let dir = config
        .output_settings
        .results_directory
        .as_ref()
        .context(MissingResultsDirectorySnafu {})?;
    let store = DirectoryStore::new(&resolve_path(&root, dir));
    let l = store
        .load(&result_id)?
        .context(ResultNotFoundSnafu { id: &result_id })?;
    let pretty_js = serde_json::to_string_pretty(&l).context(SerializingJsonSnafu {})?;
    println!("{}", pretty_js);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn testdata(name: &str) -> String {
        let p: PathBuf = [env!("CARGO_MANIFEST_DIR"), "testdata", name].iter().collect();
        p.display().to_string()
    }

    fn temp_path(dir: &TempDir, name: &str) -> String {
        dir.path().join(name).display().to_string()
    }

    #[test]
    fn parse_answers_shapes() {
        assert_eq!(parse_answers("[1, 0, -1, 0.5]").unwrap(), vec![1.0, 0.0, -1.0, 0.5]);
        assert_eq!(
            parse_answers(r#"{"answers": [0.5, -0.5]}"#).unwrap(),
            vec![0.5, -0.5]
        );
        assert!(matches!(
            parse_answers("[1, \"0\", 1]"),
            Err(CompassError::AnswersNotNumeric { index: 1 })
        ));
        assert!(matches!(
            parse_answers("[1, null]"),
            Err(CompassError::AnswersNotNumeric { index: 1 })
        ));
        assert!(matches!(
            parse_answers(r#"{"answers": 3}"#),
            Err(CompassError::InvalidAnswers { .. })
        ));
        assert!(matches!(
            parse_answers("3"),
            Err(CompassError::InvalidAnswers { .. })
        ));
        assert!(matches!(
            parse_answers("[1,"),
            Err(CompassError::InvalidAnswers { .. })
        ));
    }

    #[test]
    fn candidate_json_tolerates_bad_shapes() {
        let l: Vec<CandidateJson> = serde_json::from_str(
            r#"[
                {"party": " P ", "name": " Anna ", "candidateNumber": "7", "positions": [1, null, "x", 0.5]},
                {"name": "Boris", "positions": "none"},
                {}
            ]"#,
        )
        .unwrap();
        let records: Vec<CandidateRecord> = l.iter().map(|c| c.to_record()).collect();
        assert_eq!(records[0].party, "P");
        assert_eq!(records[0].name, "Anna");
        assert_eq!(
            records[0].positions,
            Some(vec![Some(1.0), None, None, Some(0.5)])
        );
        assert_eq!(records[1].candidate_number, "");
        assert_eq!(records[1].positions, None);
        assert_eq!(records[2], CandidateRecord::default());
    }

    #[test]
    fn candidate_json_shape() {
        let c = CandidateRecord {
            party: "P".to_string(),
            name: "Anna".to_string(),
            candidate_number: "7".to_string(),
            positions: Some(vec![Some(1.0), None, Some(-0.5)]),
        };
        let js = serde_json::to_value(CandidateJson::from_record(&c)).unwrap();
        assert_eq!(
            js,
            serde_json::json!({
                "party": "P",
                "name": "Anna",
                "candidateNumber": "7",
                "positions": [1.0, null, -0.5]
            })
        );
        assert_eq!(CandidateJson::from_record(&c).to_record(), c);
    }

    #[test]
    fn ingest_then_evaluate() {
        let _ = env_logger::builder().is_test(true).try_init();
        let dir = TempDir::new().unwrap();
        let dataset = temp_path(&dir, "candidates.json");
        run_ingest(testdata("compass_config.json"), Some(dataset.clone())).unwrap();

        let candidates = read_dataset(&dataset).unwrap();
        assert_eq!(candidates.len(), 4);
        assert_eq!(candidates[0].name, "Mari Maasikas");
        assert_eq!(candidates[0].party, "Rohelised");
        assert_eq!(candidates[0].candidate_number, "101");
        assert_eq!(
            candidates[0].positions,
            Some(vec![Some(1.0), Some(0.0), Some(-1.0), Some(0.5)])
        );
        assert_eq!(candidates[1].name, "Иван Петров");
        assert_eq!(
            candidates[1].positions,
            Some(vec![Some(-1.0), Some(0.0), Some(1.0), Some(-0.5)])
        );
        assert_eq!(candidates[2].positions, Some(vec![None, None, None, None]));
        assert_eq!(
            candidates[3].positions,
            Some(vec![Some(1.0), None, None, None])
        );

        let (config, root) = read_config(&testdata("compass_config.json")).unwrap();
        let mut config = config;
        config.output_settings.dataset_path = dataset.clone();
        let res = evaluate(&config, &root, &[1.0, 0.0, -1.0, 0.5]).unwrap();
        assert_eq!(res["101"].percent, Some(100.0));
        assert_eq!(res["102"].percent, Some(0.0));
        assert_eq!(res["103"].percent, None);
        assert_eq!(res["104"].percent, Some(100.0));
    }

    #[test]
    fn failed_ingest_keeps_previous_dataset() {
        let dir = TempDir::new().unwrap();
        fs::copy(
            testdata("compass_config.json"),
            dir.path().join("compass_config.json"),
        )
        .unwrap();
        let mut survey = fs::read(testdata("candidates.csv")).unwrap();
        let header_end = survey.iter().position(|b| *b == b'\n').unwrap() + 1;
        let first_row_end =
            header_end + survey[header_end..].iter().position(|b| *b == b'\n').unwrap() + 1;
        survey.truncate(first_row_end);
        // Not UTF-8.
        survey.extend_from_slice(b"2025/09/01 12:00:00,Erakond,Bad \xff\xfe Name,105,1,0,0,0\n");
        fs::write(dir.path().join("candidates.csv"), &survey).unwrap();
        let dataset = temp_path(&dir, "candidates.json");
        let previous = fs::read_to_string(testdata("candidates.json")).unwrap();
        fs::write(&dataset, &previous).unwrap();

        let res = run_ingest(temp_path(&dir, "compass_config.json"), None);
        assert!(matches!(
            res,
            Err(CompassError::CsvLineParse { lineno: 3, .. })
        ));
        assert_eq!(fs::read_to_string(&dataset).unwrap(), previous);
        assert!(!dir.path().join("candidates.json.tmp").exists());
    }

    #[test]
    fn evaluate_rejects_malformed_answers() {
        let (mut config, root) = read_config(&testdata("compass_config.json")).unwrap();
        config.output_settings.dataset_path = testdata("candidates.json");
        let res = evaluate(&config, &root, &[1.0, 0.0, -1.0]);
        assert!(matches!(
            res,
            Err(CompassError::Matching {
                source: MatchErrors::WrongAnswerCount {
                    expected: 4,
                    actual: 3
                }
            })
        ));
    }

    #[test]
    fn evaluate_matches_reference() {
        let dir = TempDir::new().unwrap();
        let out = temp_path(&dir, "results.json");
        run_evaluate(EvaluateOptions {
            config_path: testdata("compass_config.json"),
            answers: testdata("answers.json"),
            out: Some(out.clone()),
            reference: Some(testdata("expected_results.json")),
            sort: None,
            save: false,
        })
        .unwrap();
        let written: JSValue = serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
        assert_eq!(written["101"]["percent"], serde_json::json!(100.0));
    }

    #[test]
    fn evaluate_detects_reference_difference() {
        let dir = TempDir::new().unwrap();
        let res = run_evaluate(EvaluateOptions {
            config_path: testdata("compass_config.json"),
            answers: "[-1, 0, 1, -0.5]".to_string(),
            out: Some(temp_path(&dir, "results.json")),
            reference: Some(testdata("expected_results.json")),
            sort: Some("desc".to_string()),
            save: false,
        });
        assert!(matches!(res, Err(CompassError::Whatever { .. })));
    }

    #[test]
    fn ranking_listing() {
        let candidates = read_dataset(&testdata("candidates.json")).unwrap();
        let res = compute_matches(&[1.0, 0.0, -1.0, 0.5], &candidates, 4).unwrap();
        let listing = format_ranking(&res, SortOrder::Descending);
        let lines: Vec<&str> = listing.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].contains("100.00%"));
        assert!(lines[2].contains("0.00%"));
        assert!(lines[3].contains("N/A"));
        assert!(parse_sort_order("sideways").is_err());
    }
}
