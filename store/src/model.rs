//! Benchmark history data model
//!
//! These types mirror the `window.BENCHMARK_DATA` object one field at a time.
//! Field declaration order is the serialized order, except for `Person`,
//! which replays the key order it was read with. Rewritten files stay
//! identical to the ones produced by the benchmark action.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::de::{self, IgnoredAny, MapAccess, Visitor};
use serde::ser::{self, SerializeStruct};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::HistoryError;

/// Largest integer a JavaScript number holds exactly (2^53 - 1)
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

/// Magnitude from which JavaScript switches to exponent notation
const JS_EXPONENT_THRESHOLD: f64 = 1e21;

/// Commit author or committer.
///
/// Writers disagree on key order (`email, name, username` against
/// `name, username, email`), so the order read from a file is kept and used
/// again when the record is written back.
#[derive(Debug, Clone, Eq)]
pub struct Person {
    pub email: String,
    pub name: String,
    pub username: Option<String>,
    key_order: [PersonKey; 3],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PersonKey {
    Email,
    Name,
    Username,
}

const DEFAULT_PERSON_ORDER: [PersonKey; 3] = [PersonKey::Email, PersonKey::Name, PersonKey::Username];

impl Person {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            name: name.into(),
            username: None,
            key_order: DEFAULT_PERSON_ORDER,
        }
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }
}

impl PartialEq for Person {
    fn eq(&self, other: &Self) -> bool {
        self.email == other.email && self.name == other.name && self.username == other.username
    }
}

impl Serialize for Person {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let len = if self.username.is_some() { 3 } else { 2 };
        let mut state = serializer.serialize_struct("Person", len)?;
        for key in self.key_order {
            match key {
                PersonKey::Email => state.serialize_field("email", &self.email)?,
                PersonKey::Name => state.serialize_field("name", &self.name)?,
                PersonKey::Username => {
                    if let Some(username) = &self.username {
                        state.serialize_field("username", username)?;
                    }
                }
            }
        }
        state.end()
    }
}

impl<'de> Deserialize<'de> for Person {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct PersonVisitor;

        impl<'de> Visitor<'de> for PersonVisitor {
            type Value = Person;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a commit author or committer object")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Person, A::Error> {
                let mut email: Option<String> = None;
                let mut name: Option<String> = None;
                let mut username: Option<Option<String>> = None;
                let mut seen: Vec<PersonKey> = Vec::with_capacity(3);

                while let Some(key) = map.next_key::<String>()? {
                    let field = match key.as_str() {
                        "email" => PersonKey::Email,
                        "name" => PersonKey::Name,
                        "username" => PersonKey::Username,
                        _ => {
                            map.next_value::<IgnoredAny>()?;
                            continue;
                        }
                    };
                    if seen.contains(&field) {
                        return Err(de::Error::custom(format!("duplicate field `{}`", key)));
                    }
                    seen.push(field);
                    match field {
                        PersonKey::Email => email = Some(map.next_value()?),
                        PersonKey::Name => name = Some(map.next_value()?),
                        PersonKey::Username => username = Some(map.next_value()?),
                    }
                }

                let email = email.ok_or_else(|| <A::Error as de::Error>::missing_field("email"))?;
                let name = name.ok_or_else(|| <A::Error as de::Error>::missing_field("name"))?;

                // Keys absent from the input go last
                for key in DEFAULT_PERSON_ORDER {
                    if !seen.contains(&key) {
                        seen.push(key);
                    }
                }
                let key_order = [seen[0], seen[1], seen[2]];

                Ok(Person {
                    email,
                    name,
                    username: username.flatten(),
                    key_order,
                })
            }
        }

        deserializer.deserialize_map(PersonVisitor)
    }
}

/// Source-control revision a run was measured against
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    pub author: Person,
    pub committer: Person,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distinct: Option<bool>,
    pub id: String,
    pub message: String,
    /// ISO-8601 timestamp, kept verbatim with its UTC offset
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tree_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl Commit {
    /// Repository URL implied by a GitHub-style commit URL
    pub fn repo_url(&self) -> Option<&str> {
        self.url
            .as_deref()
            .and_then(|url| url.find("/commit/").map(|idx| &url[..idx]))
    }
}

/// One named measurement within a run.
///
/// Some writers store the value as a numeric string (`"0.00000"`). That text
/// is kept and written back as long as it still parses to `value`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "BenchRecord", into = "BenchRecord")]
pub struct Bench {
    pub name: String,
    pub value: f64,
    pub unit: String,
    pub range: Option<String>,
    pub extra: Option<String>,
    value_text: Option<String>,
}

impl Bench {
    pub fn new(name: impl Into<String>, value: f64, unit: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value,
            unit: unit.into(),
            range: None,
            extra: None,
            value_text: None,
        }
    }

    /// The value as it was quoted in the source file, if it was a string
    pub fn value_text(&self) -> Option<&str> {
        self.value_text.as_deref()
    }
}

/// Wire form of a bench
#[derive(Serialize, Deserialize)]
struct BenchRecord {
    name: String,
    value: BenchValue,
    unit: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    range: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    extra: Option<String>,
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum BenchValue {
    Number(#[serde(serialize_with = "serialize_js_number")] f64),
    Text(String),
}

impl TryFrom<BenchRecord> for Bench {
    type Error = String;

    fn try_from(record: BenchRecord) -> Result<Self, Self::Error> {
        let (value, value_text) = match record.value {
            BenchValue::Number(value) => (value, None),
            BenchValue::Text(text) => {
                let value = text
                    .trim()
                    .parse::<f64>()
                    .map_err(|_| format!("bench `{}` has a non-numeric value \"{}\"", record.name, text))?;
                (value, Some(text))
            }
        };

        Ok(Bench {
            name: record.name,
            value,
            unit: record.unit,
            range: record.range,
            extra: record.extra,
            value_text,
        })
    }
}

impl From<Bench> for BenchRecord {
    fn from(bench: Bench) -> Self {
        let value = match bench.value_text {
            Some(text) if text.trim().parse::<f64>().ok() == Some(bench.value) => BenchValue::Text(text),
            _ => BenchValue::Number(bench.value),
        };

        BenchRecord {
            name: bench.name,
            value,
            unit: bench.unit,
            range: bench.range,
            extra: bench.extra,
        }
    }
}

/// Integral values are written the way JavaScript prints them: plain digits
/// (`0`, not `0.0`) below 1e21, using the shortest round-trip digits.
fn serialize_js_number<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    if value.fract() != 0.0 || value.abs() >= JS_EXPONENT_THRESHOLD {
        return serializer.serialize_f64(*value);
    }
    if value.abs() <= MAX_SAFE_INTEGER {
        return serializer.serialize_i64(*value as i64);
    }

    // Display prints shortest digits padded with zeros, as JavaScript does
    let magnitude: i128 = format!("{}", value.abs()).parse().map_err(<S::Error as ser::Error>::custom)?;
    let signed = if value.is_sign_negative() { -magnitude } else { magnitude };
    match i64::try_from(signed) {
        Ok(small) => serializer.serialize_i64(small),
        Err(_) => serializer.serialize_i128(signed),
    }
}

/// Comparison direction shared by every bench of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Tool {
    #[serde(rename = "customSmallerIsBetter")]
    SmallerIsBetter,
    #[serde(rename = "customBiggerIsBetter")]
    BiggerIsBetter,
}

impl Tool {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tool::SmallerIsBetter => "customSmallerIsBetter",
            Tool::BiggerIsBetter => "customBiggerIsBetter",
        }
    }

    pub fn smaller_is_better(&self) -> bool {
        matches!(self, Tool::SmallerIsBetter)
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tool {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "customSmallerIsBetter" | "smaller" => Ok(Tool::SmallerIsBetter),
            "customBiggerIsBetter" | "bigger" => Ok(Tool::BiggerIsBetter),
            _ => Err(format!("Unknown benchmark tool: {}", s)),
        }
    }
}

/// One timestamped benchmark execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Run {
    pub commit: Commit,
    /// Epoch milliseconds at which the run was recorded
    pub date: u64,
    pub tool: Tool,
    pub benches: Vec<Bench>,
}

impl Run {
    pub fn bench(&self, name: &str) -> Option<&Bench> {
        self.benches.iter().find(|bench| bench.name == name)
    }
}

/// Named run groups inside a suite file
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Entries {
    #[serde(rename = "Benchmark", default)]
    pub benchmark: Vec<Run>,
}

/// Root object of a suite file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuiteHistory {
    pub last_update: u64,
    pub repo_url: String,
    pub entries: Entries,
}

impl SuiteHistory {
    pub fn new(repo_url: impl Into<String>) -> Self {
        Self {
            last_update: 0,
            repo_url: repo_url.into(),
            entries: Entries::default(),
        }
    }

    pub fn runs(&self) -> &[Run] {
        &self.entries.benchmark
    }

    pub fn len(&self) -> usize {
        self.entries.benchmark.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.benchmark.is_empty()
    }

    /// Append a run; `last_update` keeps the maximum date seen.
    pub fn push_run(&mut self, run: Run) {
        self.last_update = self.last_update.max(run.date);
        self.entries.benchmark.push(run);
    }

    /// Run with the greatest date, the last inserted one on ties
    pub fn latest(&self) -> Option<&Run> {
        self.entries.benchmark.iter().max_by_key(|run| run.date)
    }

    pub fn max_date(&self) -> Option<u64> {
        self.entries.benchmark.iter().map(|run| run.date).max()
    }

    /// Distinct bench names in first-seen order
    pub fn bench_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for bench in self.entries.benchmark.iter().flat_map(|run| run.benches.iter()) {
            if !names.iter().any(|name| name == &bench.name) {
                names.push(bench.name.clone());
            }
        }
        names
    }
}

/// Slash-separated suite name such as `X86/premium/latency/read`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SuiteId(String);

impl SuiteId {
    pub fn new(id: impl Into<String>) -> Result<Self, HistoryError> {
        let id = id.into();
        let invalid = |reason: &str| HistoryError::InvalidSuiteId {
            id: id.clone(),
            reason: reason.to_string(),
        };

        if id.is_empty() {
            return Err(invalid("suite id is empty"));
        }
        if id.starts_with('/') {
            return Err(invalid("suite id must be relative"));
        }
        if id.contains('\\') || id.contains('\0') {
            return Err(invalid("suite id contains a forbidden character"));
        }
        for segment in id.split('/') {
            match segment {
                "" => return Err(invalid("suite id has an empty segment")),
                "." | ".." => return Err(invalid("suite id has a relative segment")),
                _ => {}
            }
        }

        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/')
    }

    /// Relative directory holding this suite's file
    pub fn to_relative_path(&self) -> PathBuf {
        self.segments().collect()
    }
}

impl fmt::Display for SuiteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for SuiteId {
    type Err = HistoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SuiteId::new(s)
    }
}

impl TryFrom<String> for SuiteId {
    type Error = HistoryError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        SuiteId::new(value)
    }
}

impl From<SuiteId> for String {
    fn from(id: SuiteId) -> Self {
        id.0
    }
}
