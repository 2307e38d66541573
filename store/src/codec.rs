//! Reading and writing `data.js` suite files
//!
//! A suite file is a single assignment of a JSON object literal to
//! `window.BENCHMARK_DATA`, pretty-printed with two-space indentation and
//! no trailing newline.

use crate::model::SuiteHistory;

/// Global the chart page reads the suite from
pub const DATA_VARIABLE: &str = "window.BENCHMARK_DATA";

/// Failure to decode a suite file
#[derive(Debug)]
pub struct DecodeError {
    pub reason: String,
}

impl std::fmt::Display for DecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.reason)
    }
}

/// Parse a suite file. The assignment prefix and a trailing `;` are optional.
pub fn decode(content: &str) -> Result<SuiteHistory, DecodeError> {
    let json = strip_assignment(content)?;
    serde_json::from_str(json).map_err(|e| DecodeError {
        reason: format!("line {} column {}: {}", e.line(), e.column(), e),
    })
}

/// Render a suite file exactly as the benchmark action writes it.
pub fn encode(history: &SuiteHistory) -> serde_json::Result<String> {
    let json = serde_json::to_string_pretty(history)?;
    Ok(format!("{} = {}", DATA_VARIABLE, json))
}

fn strip_assignment(content: &str) -> Result<&str, DecodeError> {
    let trimmed = content.trim();

    let body = match trimmed.strip_prefix(DATA_VARIABLE) {
        Some(rest) => rest.trim_start().strip_prefix('=').ok_or_else(|| DecodeError {
            reason: format!("expected '=' after {}", DATA_VARIABLE),
        })?,
        None if trimmed.starts_with('{') => trimmed,
        None => {
            return Err(DecodeError {
                reason: format!("expected '{} = {{...}}' or a JSON object", DATA_VARIABLE),
            })
        }
    };

    let body = body.trim();
    Ok(body.strip_suffix(';').map(str::trim_end).unwrap_or(body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Bench, Commit, Person, Run, Tool};

    fn sample_history() -> SuiteHistory {
        let person = Person::new("GitHub", "noreply@github.com").with_username("web-flow");
        let mut history = SuiteHistory::new("https://github.com/Azure/azure-storage-fuse");
        history.push_run(Run {
            commit: Commit {
                author: person.clone(),
                committer: person,
                distinct: Some(true),
                id: "79978157a7cb7035566f743a8c86becadf2dec81".to_string(),
                message: "Merge branch 'main' into vibhansa/armperftest".to_string(),
                timestamp: "2025-03-10T22:32:05+05:30".to_string(),
                tree_id: Some("cbd7d68b0a780722eb7ff9ee8e431fec9495a607".to_string()),
                url: None,
            },
            date: 1741632393001,
            tool: Tool::BiggerIsBetter,
            benches: vec![Bench::new("sequential_read", 0.0, "MiB/s")],
        });
        history
    }

    #[test]
    fn test_encode_layout() {
        let encoded = encode(&sample_history()).unwrap();
        assert!(encoded.starts_with("window.BENCHMARK_DATA = {\n  \"lastUpdate\": 1741632393001,\n  \"repoUrl\""));
        assert!(encoded.ends_with('}'));
        assert!(encoded.contains("\"value\": 0,"));
        assert!(encoded.contains("\"tool\": \"customBiggerIsBetter\""));
    }

    #[test]
    fn test_decode_variants() {
        let history = sample_history();
        let json = serde_json::to_string(&history).unwrap();

        assert_eq!(decode(&json).unwrap(), history);
        assert_eq!(decode(&format!("window.BENCHMARK_DATA={};\n", json)).unwrap(), history);
        assert_eq!(decode(&format!("\n  window.BENCHMARK_DATA   =   {}  ", json)).unwrap(), history);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(decode("var other = {}").is_err());
        assert!(decode("window.BENCHMARK_DATA {}").is_err());
        assert!(decode("window.BENCHMARK_DATA = {\"lastUpdate\": 1}").is_err());
    }

    #[test]
    fn test_decode_rejects_unknown_tool() {
        let content = r#"window.BENCHMARK_DATA = {
  "lastUpdate": 1,
  "repoUrl": "",
  "entries": { "Benchmark": [ {
    "commit": { "author": {"email": "a", "name": "a"}, "committer": {"email": "a", "name": "a"},
                "id": "abc", "message": "m", "timestamp": "2024-01-01T00:00:00Z" },
    "date": 1, "tool": "cargo", "benches": [ {"name": "x", "value": 1, "unit": "ns/iter"} ] } ] }
}"#;
        let err = decode(content).unwrap_err();
        assert!(err.reason.contains("cargo"));
    }
}
