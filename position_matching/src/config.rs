// ********* Input data structures ***********

use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::Display;

/// The five points of the answer scale, from full disagreement to full agreement.
///
/// The index of a point in this array is the index of the corresponding button
/// in the questionnaire.
pub const CANONICAL_SCALE: [f64; 5] = [-1.0, -0.5, 0.0, 0.5, 1.0];

/// A value on the answer scale, or `None` when there is no interpretable answer.
pub type Position = Option<f64>;

/// Maps a questionnaire button index to its scale value.
///
/// Unknown indexes fall back to the neutral point.
pub fn scale_index_to_value(index: usize) -> f64 {
    CANONICAL_SCALE.get(index).cloned().unwrap_or(0.0)
}

/// Maps a scale value back to the button index. Only the five canonical points
/// have an index.
pub fn scale_value_to_index(value: Position) -> Option<usize> {
    let v = value?;
    CANONICAL_SCALE.iter().position(|p| *p == v)
}

/// One survey statement, with its prompt in one or more languages.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct Statement {
    pub prompts: BTreeMap<String, String>,
}

/// The ordered list of statements of a survey.
///
/// The position of a statement in this list is the index used by every answer
/// and position vector. Two statement sets with the same fingerprint index
/// vectors the same way.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct StatementSet {
    pub version: String,
    pub statements: Vec<Statement>,
}

impl StatementSet {
    pub fn new(version: &str, statements: Vec<Statement>) -> StatementSet {
        StatementSet {
            version: version.to_string(),
            statements,
        }
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    pub fn question_count(&self) -> usize {
        self.len()
    }

    pub fn prompt(&self, index: usize, language: &str) -> Option<&str> {
        self.statements
            .get(index)
            .and_then(|s| s.prompts.get(language))
            .map(|s| s.as_str())
    }

    /// SHA-256 over the version and the ordered prompts.
    pub fn fingerprint(&self) -> String {
        let mut data = format!("{}\n", self.version);
        for (idx, st) in self.statements.iter().enumerate() {
            for (lang, text) in st.prompts.iter() {
                data.push_str(&format!("{:04}:{}:{}\n", idx, lang, text));
            }
        }
        sha256::digest(data)
    }
}

/// A candidate, as recorded in the dataset.
///
/// `positions` is `None` when the dataset entry has no usable positions array.
/// Inside the array, a `None` slot means that the candidate did not give an
/// interpretable answer to that statement.
#[derive(PartialEq, Debug, Clone, Default)]
pub struct CandidateRecord {
    pub party: String,
    pub name: String,
    pub candidate_number: String,
    pub positions: Option<Vec<Position>>,
}

// ******** Output data structures *********

/// The compatibility of one candidate with a respondent.
///
/// `percent` is in [0, 100], rounded to two decimals, or `None` when the
/// comparison is not defined (no overlap, zero vector, missing data).
#[derive(PartialEq, Debug, Clone)]
pub struct CandidateMatch {
    pub party: String,
    pub name: String,
    pub candidate_number: String,
    pub percent: Option<f64>,
}

/// All the matches of one evaluation, by candidate key.
pub type MatchResults = BTreeMap<String, CandidateMatch>;

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum SortOrder {
    Descending,
    Ascending,
}

/// Structural errors on the inputs of an evaluation.
///
/// When one of these is returned, no candidate has been evaluated.
#[derive(PartialEq, Debug, Clone)]
pub enum MatchErrors {
    /// The statement set used to build a context has no statement.
    EmptyStatementSet,
    WrongAnswerCount { expected: usize, actual: usize },
    /// The answer is not a finite number in [-1, 1].
    InvalidAnswer { index: usize, value: f64 },
}

impl Error for MatchErrors {}

impl Display for MatchErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatchErrors::EmptyStatementSet => write!(f, "the statement set is empty"),
            MatchErrors::WrongAnswerCount { expected, actual } => write!(
                f,
                "answers must be an array of length {} (got {})",
                expected, actual
            ),
            MatchErrors::InvalidAnswer { index, value } => write!(
                f,
                "answers[{}] must be a finite number in [-1,1] (got {})",
                index, value
            ),
        }
    }
}

// ********* Normalization rules **********

/// The identity columns of the candidate survey export.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub enum HeaderField {
    Party,
    Name,
    CandidateNumber,
    Timestamp,
}

/// Locates the column of a field: the first header containing one of the
/// fragments (case-insensitive) is the column.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct FieldRule {
    pub field: HeaderField,
    pub fragments: Vec<String>,
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct NormalizerRules {
    /// Evaluated in this order.
    pub field_rules: Vec<FieldRule>,
    /// Headers containing one of these fragments are not statements.
    pub ignore_fragments: Vec<String>,
}

const PARTY_FRAGMENTS: [&str; 3] = ["Erakond", "Партия", "valimisnimekiri"];
const NAME_FRAGMENTS: [&str; 4] = ["Eesnimi", "perekonnanimi", "Имя", "фамилия"];
const CANDIDATE_NUMBER_FRAGMENTS: [&str; 2] = ["Kandidaadi number", "Номер кандидата"];
const TIMESTAMP_FRAGMENTS: [&str; 2] = ["Ajatempel", "Timestamp"];

fn to_strings(fragments: &[&str]) -> Vec<String> {
    fragments.iter().map(|s| s.to_string()).collect()
}

impl NormalizerRules {
    /// The rules for the bilingual (Estonian / Russian) candidate survey.
    pub fn default_rules() -> NormalizerRules {
        let field_rules = vec![
            FieldRule {
                field: HeaderField::Party,
                fragments: to_strings(&PARTY_FRAGMENTS),
            },
            FieldRule {
                field: HeaderField::Name,
                fragments: to_strings(&NAME_FRAGMENTS),
            },
            FieldRule {
                field: HeaderField::CandidateNumber,
                fragments: to_strings(&CANDIDATE_NUMBER_FRAGMENTS),
            },
            FieldRule {
                field: HeaderField::Timestamp,
                fragments: to_strings(&TIMESTAMP_FRAGMENTS),
            },
        ];
        let mut ignore_fragments: Vec<String> = field_rules
            .iter()
            .flat_map(|r| r.fragments.iter().cloned())
            .collect();
        ignore_fragments.push("newField".to_string());
        NormalizerRules {
            field_rules,
            ignore_fragments,
        }
    }

    pub fn fragments(&self, field: HeaderField) -> &[String] {
        self.field_rules
            .iter()
            .find(|r| r.field == field)
            .map(|r| r.fragments.as_slice())
            .unwrap_or(&[])
    }
}

/// A group of phrases that all map to the same scale value.
#[derive(PartialEq, Debug, Clone, Copy)]
pub struct PhraseRule {
    pub value: f64,
    pub phrases: &'static [&'static str],
}

/// The phrases recognized in free-text answers, by priority.
///
/// The first group with a phrase contained in the answer wins. In both
/// languages the weak phrases are substrings of the strong ones ("ei nõustu" in
/// "ei nõustu üldse", "согласен" in "не согласен"), so each strong group must
/// stay before its weak counterpart. New languages go into the existing groups.
pub const PHRASE_RULES: [PhraseRule; 5] = [
    PhraseRule {
        value: -1.0,
        phrases: &[
            "ei nõustu üldse",
            "полностью не согласен",
            "ei nõustu täielikult",
        ],
    },
    PhraseRule {
        value: -0.5,
        phrases: &["ei nõustu", "не согласен"],
    },
    PhraseRule {
        value: 0.0,
        phrases: &["neutraal", "нейтра"],
    },
    PhraseRule {
        value: 1.0,
        phrases: &["täielikult", "полностью согласен", "nõustun täielikult"],
    },
    PhraseRule {
        value: 0.5,
        phrases: &["nõustun", "согласен"],
    },
];

/// The literal forms of the scale points, with both decimal separators.
pub const NUMERAL_LITERALS: [(&str, f64); 13] = [
    ("-1", -1.0),
    ("-1.0", -1.0),
    ("-1,0", -1.0),
    ("-0.5", -0.5),
    ("-0,5", -0.5),
    ("0", 0.0),
    ("0.0", 0.0),
    ("0,0", 0.0),
    ("0.5", 0.5),
    ("0,5", 0.5),
    ("1", 1.0),
    ("1.0", 1.0),
    ("1,0", 1.0),
];
