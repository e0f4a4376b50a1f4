//! Conversion of survey export rows into candidate records.
//!
//! A row is the list of `(header, cell)` pairs of one candidate, in column
//! order. Identity columns are located with loose, case-insensitive header
//! fragments since the exports carry bilingual and inconsistently spaced
//! headers. Every other non-empty header is a statement, and its cell is
//! classified into the answer scale.

use log::{debug, warn};
use std::collections::HashMap;

use crate::candidate_key;
use crate::config::*;

/// One row of a survey export: `(header, cell)` pairs in column order.
pub type RawRecord = Vec<(String, String)>;

/// Index of the first header containing one of the fragments, ignoring case.
pub fn resolve_field_index<'a, I>(headers: I, fragments: &[String]) -> Option<usize>
where
    I: IntoIterator<Item = &'a str>,
{
    let lowered: Vec<String> = fragments.iter().map(|f| f.to_lowercase()).collect();
    headers.into_iter().position(|h| {
        let h = h.to_lowercase();
        lowered.iter().any(|f| h.contains(f.as_str()))
    })
}

/// The first header containing one of the fragments, ignoring case.
///
/// Headers are tested in their order, so with several matching headers the
/// leftmost column wins.
pub fn resolve_field<'a>(headers: &'a [String], fragments: &[String]) -> Option<&'a str> {
    resolve_field_index(headers.iter().map(|h| h.as_str()), fragments)
        .map(|idx| headers[idx].as_str())
}

/// Maps the text of an answer to a point of the scale.
///
/// Phrases are tried first (see [`PHRASE_RULES`] for the priority), then the
/// literal numerals. Anything else is not an answer.
pub fn classify_answer(raw: &str) -> Position {
    let s = raw.trim().to_lowercase();
    if s.is_empty() {
        return None;
    }
    for rule in PHRASE_RULES.iter() {
        if rule.phrases.iter().any(|p| s.contains(p)) {
            return Some(rule.value);
        }
    }
    NUMERAL_LITERALS
        .iter()
        .find(|(lit, _)| *lit == s)
        .map(|(_, v)| *v)
}

fn is_ignored(header: &str, rules: &NormalizerRules) -> bool {
    let h = header.to_lowercase();
    rules
        .ignore_fragments
        .iter()
        .any(|f| h.contains(f.to_lowercase().as_str()))
}

fn field_value(record: &[(String, String)], rules: &NormalizerRules, field: HeaderField) -> String {
    resolve_field_index(record.iter().map(|(h, _)| h.as_str()), rules.fragments(field))
        .map(|idx| record[idx].1.trim().to_string())
        .unwrap_or_default()
}

/// Converts one export row into a candidate record.
///
/// Unrecognized answers become `None` slots; ignored and blank headers do not
/// take a slot at all, so the column order of the statements is the order of
/// the positions.
pub fn normalize(record: &[(String, String)], rules: &NormalizerRules) -> CandidateRecord {
    let mut positions: Vec<Position> = Vec::new();
    for (header, cell) in record.iter() {
        if header.trim().is_empty() || is_ignored(header, rules) {
            continue;
        }
        let value = classify_answer(cell);
        if value.is_none() && !cell.trim().is_empty() {
            debug!(
                "normalize: unrecognized answer {:?} for column {:?}",
                cell, header
            );
        }
        positions.push(value);
    }

    let timestamp = field_value(record, rules, HeaderField::Timestamp);
    let res = CandidateRecord {
        party: field_value(record, rules, HeaderField::Party),
        name: field_value(record, rules, HeaderField::Name),
        candidate_number: field_value(record, rules, HeaderField::CandidateNumber),
        positions: Some(positions),
    };
    debug!(
        "normalize: {:?} ({:?}) submitted at {:?}",
        res.name, res.candidate_number, timestamp
    );
    res
}

/// Two rows of the export that share the same candidate key.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct DuplicateKey {
    pub key: String,
    pub first_row: usize,
    pub row: usize,
}

/// A row whose number of positions differs from the number of statements.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct LengthMismatch {
    pub row: usize,
    pub key: String,
    pub length: usize,
}

/// The outcome of normalizing a whole export.
#[derive(PartialEq, Debug, Clone, Default)]
pub struct Normalization {
    pub candidates: Vec<CandidateRecord>,
    pub duplicates: Vec<DuplicateKey>,
    pub length_mismatches: Vec<LengthMismatch>,
}

/// Normalizes all the rows of an export, in order.
///
/// Rows are numbered from 0. Duplicate keys are reported but kept: the
/// matching keeps the last one.
pub fn normalize_all(
    records: &[RawRecord],
    rules: &NormalizerRules,
    question_count: usize,
) -> Normalization {
    let mut res = Normalization::default();
    let mut seen: HashMap<String, usize> = HashMap::new();
    for (row, record) in records.iter().enumerate() {
        let candidate = normalize(record, rules);
        let key = candidate_key(&candidate, row);

        if let Some(first_row) = seen.get(&key) {
            warn!(
                "normalize_all: row {} has the same key {:?} as row {}",
                row, key, first_row
            );
            res.duplicates.push(DuplicateKey {
                key: key.clone(),
                first_row: *first_row,
                row,
            });
        } else {
            seen.insert(key.clone(), row);
        }

        let length = candidate.positions.as_ref().map(|p| p.len()).unwrap_or(0);
        if length != question_count {
            warn!(
                "normalize_all: row {} ({:?}) has {} positions, expected {}",
                row, key, length, question_count
            );
            res.length_mismatches.push(LengthMismatch { row, key, length });
        }
        res.candidates.push(candidate);
    }
    res
}
