mod config;
use log::{debug, info, warn};

use std::cmp::Ordering;

pub use crate::config::*;

pub mod builder;
pub mod manual;
pub mod normalizer;

// Below this norm, a vector has no usable direction.
const EPS: f64 = 1e-12;

/// True when the candidate has a number or a name to be keyed by.
pub fn has_identity(candidate: &CandidateRecord) -> bool {
    !candidate.candidate_number.trim().is_empty() || !candidate.name.trim().is_empty()
}

/// The key of a candidate in the results: the candidate number, else the
/// name, else a placeholder built from the position of the candidate in the
/// dataset.
pub fn candidate_key(candidate: &CandidateRecord, index: usize) -> String {
    let number = candidate.candidate_number.trim();
    let name = candidate.name.trim();
    if !number.is_empty() {
        number.to_string()
    } else if !name.is_empty() {
        name.to_string()
    } else {
        format!("idx_{}", index)
    }
}

/// Checks the answers of a respondent. Any violation fails the whole
/// evaluation.
pub fn validate_answers(answers: &[f64], question_count: usize) -> Result<(), MatchErrors> {
    if answers.len() != question_count {
        return Err(MatchErrors::WrongAnswerCount {
            expected: question_count,
            actual: answers.len(),
        });
    }
    for (index, v) in answers.iter().enumerate() {
        if !v.is_finite() || *v < -1.0 || *v > 1.0 {
            return Err(MatchErrors::InvalidAnswer { index, value: *v });
        }
    }
    Ok(())
}

fn norm(v: &[f64]) -> f64 {
    v.iter().map(|x| x * x).sum::<f64>().sqrt()
}

/// The cosine similarity of two paired vectors, as a percentage.
///
/// The similarity in [-1, 1] is mapped linearly to [0, 100] and rounded to two
/// decimals. Returns `None` when the vectors are empty, have different
/// lengths, or when one of them has a zero norm.
pub fn cosine_percent(u: &[f64], p: &[f64]) -> Option<f64> {
    if u.is_empty() || u.len() != p.len() {
        return None;
    }
    let norm_u = norm(u);
    let norm_p = norm(p);
    if norm_u <= EPS || norm_p <= EPS {
        return None;
    }
    let dot: f64 = u
        .iter()
        .zip(p.iter())
        .map(|(a, b)| (a / norm_u) * (b / norm_p))
        .sum();
    let score = dot.clamp(-1.0, 1.0);
    let percent = (score + 1.0) / 2.0 * 100.0;
    Some((percent * 100.0).round() / 100.0)
}

/// The answers of the respondent and the positions of the candidate, on the
/// statements both of them answered.
fn paired_vectors(
    answers: &[f64],
    positions: &[Position],
    question_count: usize,
) -> (Vec<f64>, Vec<f64>) {
    let mut u_vec: Vec<f64> = Vec::new();
    let mut p_vec: Vec<f64> = Vec::new();
    for (i, u) in answers.iter().enumerate().take(question_count) {
        match positions.get(i) {
            Some(Some(p)) if p.is_finite() && (-1.0..=1.0).contains(p) => {
                u_vec.push(*u);
                p_vec.push(*p);
            }
            // Missing, null or invalid position: not compared.
            _ => {}
        }
    }
    (u_vec, p_vec)
}

fn match_candidate(answers: &[f64], candidate: &CandidateRecord, question_count: usize) -> Option<f64> {
    if candidate.name.trim().is_empty() {
        return None;
    }
    let positions = candidate.positions.as_ref()?;
    let (u_vec, p_vec) = paired_vectors(answers, positions, question_count);
    if p_vec.is_empty() {
        return None;
    }
    cosine_percent(&u_vec, &p_vec)
}

/// Computes the compatibility of a respondent with each candidate.
///
/// Arguments:
/// * `answers` the answers of the respondent, one per statement, in [-1, 1]
/// * `candidates` the candidates, in dataset order
/// * `question_count` the number of statements
///
/// The answers are validated before any candidate is looked at: on error, no
/// result is produced. Candidates without a name, without positions or
/// without any statement in common with the respondent get a `None` percent.
/// When two candidates share a key, the later one replaces the earlier one.
pub fn compute_matches(
    answers: &[f64],
    candidates: &[CandidateRecord],
    question_count: usize,
) -> Result<MatchResults, MatchErrors> {
    validate_answers(answers, question_count)?;
    debug!(
        "compute_matches: {} answers, {} candidates",
        answers.len(),
        candidates.len()
    );

    let mut res = MatchResults::new();
    for (idx, c) in candidates.iter().enumerate() {
        let key = candidate_key(c, idx);
        if !has_identity(c) {
            warn!("compute_matches: candidate #{} has no number and no name", idx);
        }
        let percent = match_candidate(answers, c, question_count);
        debug!("compute_matches: {}: {:?}", key, percent);
        let m = CandidateMatch {
            party: c.party.trim().to_string(),
            name: c.name.trim().to_string(),
            candidate_number: c.candidate_number.trim().to_string(),
            percent,
        };
        if res.insert(key.clone(), m).is_some() {
            debug!("compute_matches: key {} replaced by candidate #{}", key, idx);
        }
    }
    info!(
        "compute_matches: {} results, {} defined",
        res.len(),
        res.values().filter(|m| m.percent.is_some()).count()
    );
    Ok(res)
}

/// Orders the matches by percent. Undefined percents come last in
/// descending order and first in ascending order; ties keep the key order.
pub fn sort_matches(results: &MatchResults, order: SortOrder) -> Vec<(String, CandidateMatch)> {
    let mut l: Vec<(String, CandidateMatch)> = results
        .iter()
        .map(|(k, m)| (k.clone(), m.clone()))
        .collect();
    let value = |m: &CandidateMatch| m.percent.unwrap_or(f64::NEG_INFINITY);
    l.sort_by(|(_, a), (_, b)| {
        let o = value(a).partial_cmp(&value(b)).unwrap_or(Ordering::Equal);
        match order {
            SortOrder::Ascending => o,
            SortOrder::Descending => o.reverse(),
        }
    });
    l
}
