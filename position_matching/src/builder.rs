pub use crate::config::*;

use log::{info, warn};

use crate::{candidate_key, compute_matches, has_identity};

/// The read-only data of a compass: the statements and the candidates.
///
/// It is built once, and then shared by all the evaluations.
#[derive(PartialEq, Debug, Clone)]
pub struct MatchContext {
    statements: StatementSet,
    candidates: Vec<CandidateRecord>,
}

impl MatchContext {
    pub fn statements(&self) -> &StatementSet {
        &self.statements
    }

    pub fn candidates(&self) -> &[CandidateRecord] {
        &self.candidates
    }

    pub fn question_count(&self) -> usize {
        self.statements.len()
    }

    /// Matches the answers of a respondent against all the candidates.
    pub fn evaluate(&self, answers: &[f64]) -> Result<MatchResults, MatchErrors> {
        compute_matches(answers, &self.candidates, self.question_count())
    }
}

/// A builder for the match context.
///
/// ```
/// pub use position_matching::builder::ContextBuilder;
/// pub use position_matching::{CandidateRecord, Statement, StatementSet};
/// # use position_matching::MatchErrors;
///
/// let statements = StatementSet::new("v1", vec![Statement::default(), Statement::default()]);
/// let mut builder = ContextBuilder::new(&statements)?;
/// builder.add_candidate(&CandidateRecord {
///     party: "Party".to_string(),
///     name: "Anna".to_string(),
///     candidate_number: "7".to_string(),
///     positions: Some(vec![Some(1.0), None]),
/// });
/// let context = builder.build();
///
/// let res = context.evaluate(&[1.0, -1.0])?;
/// assert_eq!(res["7"].percent, Some(100.0));
///
/// # Ok::<(), MatchErrors>(())
/// ```
pub struct ContextBuilder {
    pub(crate) _statements: StatementSet,
    pub(crate) _candidates: Vec<CandidateRecord>,
}

impl ContextBuilder {
    pub fn new(statements: &StatementSet) -> Result<ContextBuilder, MatchErrors> {
        if statements.is_empty() {
            return Err(MatchErrors::EmptyStatementSet);
        }
        Ok(ContextBuilder {
            _statements: statements.clone(),
            _candidates: Vec::new(),
        })
    }

    /// Replaces the candidates.
    pub fn candidates(self, cands: &[CandidateRecord]) -> ContextBuilder {
        let mut b = ContextBuilder {
            _statements: self._statements,
            _candidates: Vec::new(),
        };
        for c in cands {
            b.add_candidate(c);
        }
        b
    }

    /// Adds a candidate. Candidates are matched in the order they are added.
    pub fn add_candidate(&mut self, candidate: &CandidateRecord) {
        let idx = self._candidates.len();
        let key = candidate_key(candidate, idx);
        match candidate.positions.as_ref() {
            Some(p) if p.len() != self._statements.len() => {
                warn!(
                    "add_candidate: {} has {} positions for {} statements",
                    key,
                    p.len(),
                    self._statements.len()
                );
            }
            None => {
                warn!("add_candidate: {} has no positions", key);
            }
            _ => {}
        }
        if !has_identity(candidate) {
            warn!("add_candidate: candidate #{} has no number and no name", idx);
        }
        self._candidates.push(candidate.clone());
    }

    pub fn build(self) -> MatchContext {
        info!(
            "Match context: statement set {:?} ({}), {} statements, {} candidates",
            self._statements.version,
            self._statements.fingerprint(),
            self._statements.len(),
            self._candidates.len()
        );
        MatchContext {
            statements: self._statements,
            candidates: self._candidates,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn statements(n: usize) -> StatementSet {
        let l = (0..n)
            .map(|i| {
                let mut prompts = BTreeMap::new();
                prompts.insert("et".to_string(), format!("Väide {}", i + 1));
                prompts.insert("ru".to_string(), format!("Утверждение {}", i + 1));
                Statement { prompts }
            })
            .collect();
        StatementSet::new("2025", l)
    }

    #[test]
    fn empty_statement_set() {
        assert!(matches!(
            ContextBuilder::new(&statements(0)),
            Err(MatchErrors::EmptyStatementSet)
        ));
    }

    #[test]
    fn evaluate_uses_statement_count() {
        let s = statements(3);
        let c = CandidateRecord {
            party: "P".to_string(),
            name: "Anna".to_string(),
            candidate_number: "".to_string(),
            positions: Some(vec![Some(1.0), Some(1.0), Some(1.0)]),
        };
        let context = ContextBuilder::new(&s).unwrap().candidates(&[c]).build();
        assert_eq!(context.question_count(), 3);
        assert_eq!(context.candidates().len(), 1);
        let res = context.evaluate(&[1.0, 1.0, 1.0]).unwrap();
        assert_eq!(res["Anna"].percent, Some(100.0));
        assert_eq!(
            context.evaluate(&[1.0, 1.0]),
            Err(MatchErrors::WrongAnswerCount {
                expected: 3,
                actual: 2
            })
        );
    }

    #[test]
    fn context_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<MatchContext>();
    }

    #[test]
    fn statement_set_fingerprint() {
        let a = statements(2);
        let b = statements(2);
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_eq!(a.fingerprint().len(), 64);
        let mut reordered = statements(2);
        reordered.statements.reverse();
        assert_ne!(a.fingerprint(), reordered.fingerprint());
        let mut other_version = statements(2);
        other_version.version = "2026".to_string();
        assert_ne!(a.fingerprint(), other_version.fingerprint());
        assert_eq!(a.prompt(1, "ru"), Some("Утверждение 2"));
        assert_eq!(a.prompt(1, "en"), None);
        assert_eq!(a.prompt(5, "et"), None);
    }
}
