//! Metadata parser for candidate files
//!
//! A candidate file carries a YAML document (JSON works too). Only documents
//! whose `managed` key is boolean `true` produce a record:
//!
//! ```yaml
//! managed: true
//! flavor: java
//! environment:
//!   - dev
//!   - prod
//! ```
//!
//! Booleans follow YAML 1.1, so a plain `managed: yes` or `managed: on` counts
//! as well. Quoted values never do.
//!
//! A document that cannot be read is a [`ParseError`]; a readable document
//! that is not managed is simply `Ok(None)`.

use crate::model::{ExportRow, RepositoryId, ENVIRONMENT_DELIMITER};
use crate::ParseError;
use serde_yaml::Value;
use yaml_rust2::parser::{Event, EventReceiver, Parser};
use yaml_rust2::scanner::TScalarStyle;

/// Plain scalars YAML 1.1 resolves to boolean true
const YAML11_TRUE: [&str; 9] = ["true", "True", "TRUE", "yes", "Yes", "YES", "on", "On", "ON"];

/// The `environment` value of a managed document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvironmentValue {
    Absent,
    Scalar(String),
    Sequence(Vec<String>),
}

impl EnvironmentValue {
    /// Renders the value as a single delimiter-joined string
    ///
    /// `["dev", "qa", "prod"]` becomes `dev-qa-prod`, `"prod"` stays `prod`
    /// and an absent value becomes the empty string.
    pub fn joined(&self) -> String {
        match self {
            Self::Absent => String::new(),
            Self::Scalar(value) => value.clone(),
            Self::Sequence(values) => values.join(ENVIRONMENT_DELIMITER),
        }
    }
}

/// Metadata extracted from a managed file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagedFileRecord {
    pub flavor: String,
    pub environment: EnvironmentValue,
}

impl ManagedFileRecord {
    /// Projects the record into an export row for `path` in `repository`
    pub fn into_export_row(self, repository: RepositoryId, path: impl Into<String>) -> ExportRow {
        ExportRow {
            repository,
            file_path: path.into(),
            environments: self.environment.joined(),
            flavor: self.flavor,
        }
    }
}

/// Parses the text of a candidate file
///
/// # Returns
///
/// * `Ok(Some(record))` - The document is managed
/// * `Ok(None)` - The document is well formed but not managed
/// * `Err(ParseError)` - The document is malformed or not a mapping
///
/// # Example
///
/// ```
/// use bfile_scout::crawler::parse_metadata;
///
/// let record = parse_metadata("managed: true\nflavor: java\nenvironment: [dev, prod]\n")
///     .unwrap()
///     .unwrap();
/// assert_eq!(record.flavor, "java");
/// assert_eq!(record.environment.joined(), "dev-prod");
///
/// assert!(parse_metadata("managed: false\n").unwrap().is_none());
/// ```
pub fn parse_metadata(text: &str) -> Result<Option<ManagedFileRecord>, ParseError> {
    let document: Value =
        serde_yaml::from_str(text).map_err(|e| ParseError::Malformed(e.to_string()))?;

    if !document.is_mapping() {
        return Err(ParseError::NotAMapping);
    }

    let managed = match document.get("managed") {
        Some(Value::Bool(flag)) => *flag,
        Some(Value::String(_)) => ManagedScan::plain_true(text),
        _ => false,
    };
    if !managed {
        return Ok(None);
    }

    let flavor = match document.get("flavor") {
        Some(Value::String(flavor)) => flavor.clone(),
        _ => String::new(),
    };

    let environment = environment_value(document.get("environment"))?;

    Ok(Some(ManagedFileRecord {
        flavor,
        environment,
    }))
}

/// Normalizes the raw `environment` value
fn environment_value(raw: Option<&Value>) -> Result<EnvironmentValue, ParseError> {
    match raw {
        None | Some(Value::Null) => Ok(EnvironmentValue::Absent),
        Some(Value::Sequence(items)) => {
            let mut values = Vec::with_capacity(items.len());
            for item in items {
                match item {
                    Value::Null => continue,
                    other => values.push(scalar_string(other).ok_or_else(|| {
                        ParseError::InvalidEnvironment(
                            "sequence elements must be scalars".to_string(),
                        )
                    })?),
                }
            }
            Ok(EnvironmentValue::Sequence(values))
        }
        Some(other) => scalar_string(other)
            .map(EnvironmentValue::Scalar)
            .ok_or_else(|| {
                ParseError::InvalidEnvironment("expected a string or a list".to_string())
            }),
    }
}

/// Event scan of the first document for the style of the top-level `managed` value
///
/// `serde_yaml` resolves scalars with the YAML 1.2 core schema and drops the
/// quoting style, so `yes` and `"yes"` both come back as strings.
#[derive(Debug, Default)]
struct ManagedScan {
    depth: usize,
    expecting_key: bool,
    at_managed: bool,
    plain_true: Option<bool>,
}

impl ManagedScan {
    fn plain_true(text: &str) -> bool {
        let mut scan = Self::default();
        let mut parser = Parser::new_from_str(text);
        if parser.load(&mut scan, false).is_err() {
            return false;
        }
        scan.plain_true.unwrap_or(false)
    }

    /// Called for every complete node directly inside the top-level mapping
    fn top_level_node(&mut self, scalar: Option<(&str, bool)>) {
        if self.expecting_key {
            self.at_managed = matches!(scalar, Some((key, _)) if key == "managed");
            self.expecting_key = false;
            return;
        }

        if self.at_managed && self.plain_true.is_none() {
            self.plain_true = Some(matches!(
                scalar,
                Some((value, true)) if YAML11_TRUE.contains(&value)
            ));
        }
        self.at_managed = false;
        self.expecting_key = true;
    }
}

impl EventReceiver for ManagedScan {
    fn on_event(&mut self, event: Event) {
        match event {
            Event::MappingStart(..) => {
                self.depth += 1;
                if self.depth == 1 {
                    self.expecting_key = true;
                }
            }
            Event::SequenceStart(..) => self.depth += 1,
            Event::MappingEnd | Event::SequenceEnd => {
                self.depth = self.depth.saturating_sub(1);
                if self.depth == 1 {
                    self.top_level_node(None);
                }
            }
            Event::Scalar(value, style, _, tag) => {
                if self.depth == 1 {
                    let plain = matches!(style, TScalarStyle::Plain) && tag.is_none();
                    self.top_level_node(Some((value.as_str(), plain)));
                }
            }
            Event::Alias(_) => {
                if self.depth == 1 {
                    self.top_level_node(None);
                }
            }
            _ => {}
        }
    }
}

fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
