use crate::compass::*;

use position_matching::{FieldRule, HeaderField, NormalizerRules, Statement, StatementSet};
use std::path::PathBuf;

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct StatementSettings {
    pub prompts: BTreeMap<String, String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct StatementSetSettings {
    pub version: String,
    pub statements: Vec<StatementSettings>,
}

impl StatementSetSettings {
    pub fn to_statement_set(&self) -> StatementSet {
        StatementSet::new(
            &self.version,
            self.statements
                .iter()
                .map(|s| Statement {
                    prompts: s.prompts.clone(),
                })
                .collect(),
        )
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct DataSource {
    pub provider: String,
    #[serde(rename = "filePath")]
    pub file_path: String,
    #[serde(rename = "excelWorksheetName")]
    pub excel_worksheet_name: Option<String>,
    #[serde(rename = "delimiter")]
    pub delimiter: Option<String>,
}

impl DataSource {
    pub fn delimiter_byte(&self) -> CompassResult<u8> {
        match self.delimiter.as_deref() {
            None => Ok(b','),
            Some(d) if d.len() == 1 => Ok(d.as_bytes()[0]),
            Some(d) => CsvDelimiterSnafu { delimiter: d }.fail(),
        }
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct OutputSettings {
    #[serde(rename = "datasetPath")]
    pub dataset_path: String,
    #[serde(rename = "resultsDirectory")]
    pub results_directory: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct FieldRuleSettings {
    pub field: String,
    pub fragments: Vec<String>,
}

impl FieldRuleSettings {
    fn to_rule(&self) -> CompassResult<FieldRule> {
        let field = match self.field.as_str() {
            "party" => HeaderField::Party,
            "name" => HeaderField::Name,
            "candidateNumber" => HeaderField::CandidateNumber,
            "timestamp" => HeaderField::Timestamp,
            x => return UnknownFieldSnafu { field: x }.fail(),
        };
        Ok(FieldRule {
            field,
            fragments: self.fragments.clone(),
        })
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct NormalizerSettings {
    #[serde(rename = "ignoreFragments")]
    pub ignore_fragments: Option<Vec<String>>,
    #[serde(rename = "fieldRules")]
    pub field_rules: Option<Vec<FieldRuleSettings>>,
    #[serde(rename = "rejectDuplicateKeys")]
    pub reject_duplicate_keys: Option<bool>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct CompassConfig {
    #[serde(rename = "statementSet")]
    pub statement_set: StatementSetSettings,
    #[serde(rename = "dataSource")]
    pub data_source: DataSource,
    #[serde(rename = "outputSettings")]
    pub output_settings: OutputSettings,
    pub normalizer: Option<NormalizerSettings>,
}

impl CompassConfig {
    /// The default rules, with the sections of the configuration replacing
    /// them. Custom field rules without an ignore list ignore the fragments of
    /// the field rules.
    pub fn normalizer_rules(&self) -> CompassResult<NormalizerRules> {
        let mut rules = NormalizerRules::default_rules();
        let settings = match &self.normalizer {
            Some(s) => s,
            None => return Ok(rules),
        };
        if let Some(frs) = &settings.field_rules {
            rules.field_rules = frs
                .iter()
                .map(|fr| fr.to_rule())
                .collect::<CompassResult<Vec<FieldRule>>>()?;
            rules.ignore_fragments = rules
                .field_rules
                .iter()
                .flat_map(|r| r.fragments.iter().cloned())
                .collect();
        }
        if let Some(ignore) = &settings.ignore_fragments {
            rules.ignore_fragments = ignore.clone();
        }
        Ok(rules)
    }

    pub fn reject_duplicate_keys(&self) -> bool {
        self.normalizer
            .as_ref()
            .and_then(|n| n.reject_duplicate_keys)
            .unwrap_or(false)
    }
}

/// Reads the configuration, and returns it with the directory that relative
/// paths refer to.
pub fn read_config(path: &str) -> CompassResult<(CompassConfig, PathBuf)> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    let config: CompassConfig =
        serde_json::from_str(&contents).context(ParsingJsonSnafu { path })?;
    debug!("read_config: {:?}", config);
    let root = Path::new(path)
        .parent()
        .context(MissingParentDirSnafu {})?
        .to_path_buf();
    Ok((config, root))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with(normalizer: &str) -> CompassConfig {
        let js = format!(
            r#"{{
                "statementSet": {{"version": "t", "statements": [{{"prompts": {{"et": "A"}}}}]}},
                "dataSource": {{"provider": "csv", "filePath": "x.csv"}},
                "outputSettings": {{"datasetPath": "x.json"}}
                {}
            }}"#,
            normalizer
        );
        serde_json::from_str(&js).unwrap()
    }

    #[test]
    fn default_rules_without_section() {
        let c = config_with("");
        assert_eq!(c.normalizer_rules().unwrap(), NormalizerRules::default_rules());
        assert!(!c.reject_duplicate_keys());
        assert_eq!(c.data_source.delimiter_byte().unwrap(), b',');
        assert_eq!(c.statement_set.to_statement_set().len(), 1);
    }

    #[test]
    fn custom_field_rules() {
        let c = config_with(
            r#", "normalizer": {
                "fieldRules": [
                    {"field": "name", "fragments": ["Name"]},
                    {"field": "candidateNumber", "fragments": ["Number"]}
                ],
                "rejectDuplicateKeys": true
            }"#,
        );
        let rules = c.normalizer_rules().unwrap();
        assert_eq!(rules.field_rules.len(), 2);
        assert_eq!(rules.fragments(HeaderField::Name), &["Name".to_string()]);
        assert!(rules.fragments(HeaderField::Party).is_empty());
        assert_eq!(
            rules.ignore_fragments,
            vec!["Name".to_string(), "Number".to_string()]
        );
        assert!(c.reject_duplicate_keys());
    }

    #[test]
    fn custom_ignore_list() {
        let c = config_with(r#", "normalizer": {"ignoreFragments": ["Comment"]}"#);
        let rules = c.normalizer_rules().unwrap();
        assert_eq!(rules.ignore_fragments, vec!["Comment".to_string()]);
        assert_eq!(
            rules.field_rules,
            NormalizerRules::default_rules().field_rules
        );
    }

    #[test]
    fn unknown_field() {
        let c = config_with(
            r#", "normalizer": {"fieldRules": [{"field": "email", "fragments": ["mail"]}]}"#,
        );
        assert!(matches!(
            c.normalizer_rules(),
            Err(CompassError::UnknownField { .. })
        ));
    }

    #[test]
    fn bad_delimiter() {
        let mut c = config_with("");
        c.data_source.delimiter = Some(";".to_string());
        assert_eq!(c.data_source.delimiter_byte().unwrap(), b';');
        c.data_source.delimiter = Some("::".to_string());
        assert!(c.data_source.delimiter_byte().is_err());
    }
}
