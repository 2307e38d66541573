use crate::error::Result;
use benchhist_store::{codec, IntegrityReport, Run, Series, StoreConfig, SuiteHistory, SuiteId};
use chrono::{DateTime, Utc};
use console::style;
use serde::Serialize;
use std::io;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Yaml,
    Raw,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "table" => Ok(OutputFormat::Table),
            "csv" => Ok(OutputFormat::Csv),
            "yaml" => Ok(OutputFormat::Yaml),
            "raw" => Ok(OutputFormat::Raw),
            _ => Err(format!("Unknown output format: {}", s)),
        }
    }
}

/// One row of `show`
#[derive(Debug, Serialize)]
struct RunRow<'a> {
    date: u64,
    time: String,
    commit: &'a str,
    message: &'a str,
    tool: &'a str,
    benches: usize,
}

impl<'a> RunRow<'a> {
    fn new(run: &'a Run) -> Self {
        Self {
            date: run.date,
            time: format_date(run.date),
            commit: short_commit(&run.commit.id),
            message: run.commit.message.lines().next().unwrap_or(""),
            tool: run.tool.as_str(),
            benches: run.benches.len(),
        }
    }
}

/// One row of `latest`
#[derive(Debug, Serialize)]
struct BenchRow<'a> {
    name: &'a str,
    value: f64,
    unit: &'a str,
}

/// One row of `series`
#[derive(Debug, Serialize)]
struct PointRow<'a> {
    date: u64,
    time: String,
    value: f64,
    unit: &'a str,
}

pub struct OutputManager {
    format: OutputFormat,
    colored: bool,
    quiet: bool,
}

impl OutputManager {
    pub fn new(format: OutputFormat, colored: bool) -> Self {
        Self {
            format,
            colored,
            quiet: false,
        }
    }

    pub fn with_quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    pub fn print_suites(&self, suites: &[SuiteId]) -> Result<()> {
        let names: Vec<&str> = suites.iter().map(SuiteId::as_str).collect();
        match self.format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&names)?),
            OutputFormat::Yaml => print!("{}", serde_yaml::to_string(&names)?),
            OutputFormat::Csv => {
                let mut writer = csv::Writer::from_writer(io::stdout());
                writer.write_record(["suite"])?;
                for name in &names {
                    writer.write_record([name])?;
                }
                writer.flush()?;
            }
            OutputFormat::Table => {
                if names.is_empty() {
                    self.print_warning("No suites found")?;
                    return Ok(());
                }
                self.print_heading("Suites");
                for name in &names {
                    println!("  {}", name);
                }
                println!("\nTotal: {} suite(s)", names.len());
            }
            OutputFormat::Raw => {
                for name in &names {
                    println!("{}", name);
                }
            }
        }
        Ok(())
    }

    /// Print a suite history; `limit` keeps only the newest runs
    pub fn print_history(&self, suite: &SuiteId, history: &SuiteHistory, limit: Option<usize>) -> Result<()> {
        let runs = history.runs();
        let shown = &runs[runs.len().saturating_sub(limit.unwrap_or(runs.len()))..];

        match self.format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(history)?),
            OutputFormat::Yaml => print!("{}", serde_yaml::to_string(history)?),
            OutputFormat::Raw => println!("{}", codec::encode(history)?),
            OutputFormat::Csv => {
                let mut writer = csv::Writer::from_writer(io::stdout());
                for run in shown {
                    writer.serialize(RunRow::new(run))?;
                }
                writer.flush()?;
            }
            OutputFormat::Table => {
                self.print_heading(&format!("History of {}", suite));
                println!("Repository: {}", history.repo_url);
                println!("Last update: {}", format_date(history.last_update));
                println!();
                println!("{:<23} {:<10} {:<7} {}", "Date", "Commit", "Benches", "Message");
                println!("{:-<23} {:-<10} {:-<7} {:-<40}", "", "", "", "");

                for run in shown {
                    let row = RunRow::new(run);
                    if self.colored {
                        println!(
                            "{:<23} {:<10} {:<7} {}",
                            style(&row.time).dim(),
                            style(row.commit).green(),
                            row.benches,
                            truncate(row.message, 60)
                        );
                    } else {
                        println!("{:<23} {:<10} {:<7} {}", row.time, row.commit, row.benches, truncate(row.message, 60));
                    }
                }

                println!();
                if shown.len() < runs.len() {
                    println!("Showing {} of {} runs", shown.len(), runs.len());
                } else {
                    println!("Total: {} runs", runs.len());
                }
            }
        }
        Ok(())
    }

    pub fn print_run(&self, suite: &SuiteId, run: &Run) -> Result<()> {
        let rows: Vec<BenchRow> = run
            .benches
            .iter()
            .map(|bench| BenchRow {
                name: &bench.name,
                value: bench.value,
                unit: &bench.unit,
            })
            .collect();

        match self.format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(run)?),
            OutputFormat::Yaml => print!("{}", serde_yaml::to_string(run)?),
            OutputFormat::Csv => {
                let mut writer = csv::Writer::from_writer(io::stdout());
                for row in &rows {
                    writer.serialize(row)?;
                }
                writer.flush()?;
            }
            OutputFormat::Raw => {
                for row in &rows {
                    println!("{} {} {}", row.name, row.value, row.unit);
                }
            }
            OutputFormat::Table => {
                self.print_heading(&format!("Latest run of {}", suite));
                println!("Date: {}", format_date(run.date));
                println!("Commit: {} ({})", run.commit.id, run.commit.timestamp);
                println!("Author: {} <{}>", run.commit.author.name, run.commit.author.email);
                println!("Message: {}", truncate(run.commit.message.lines().next().unwrap_or(""), 72));
                println!("Tool: {}", run.tool);
                println!();

                let width = rows.iter().map(|row| row.name.len()).max().unwrap_or(4).max(4);
                println!("{:<width$} {:>20} {}", "Bench", "Value", "Unit", width = width);
                println!("{:-<width$} {:->20} {:-<12}", "", "", "", width = width);
                for row in &rows {
                    if self.colored {
                        println!(
                            "{:<width$} {:>20} {}",
                            style(row.name).cyan(),
                            row.value,
                            style(row.unit).dim(),
                            width = width
                        );
                    } else {
                        println!("{:<width$} {:>20} {}", row.name, row.value, row.unit, width = width);
                    }
                }
            }
        }
        Ok(())
    }

    pub fn print_series(&self, series: &Series) -> Result<()> {
        let unit = series.unit().unwrap_or("");

        match self.format {
            OutputFormat::Json | OutputFormat::Yaml => {
                let points: Vec<_> = series.iter().collect();
                if self.format == OutputFormat::Json {
                    println!("{}", serde_json::to_string_pretty(&points)?);
                } else {
                    print!("{}", serde_yaml::to_string(&points)?);
                }
            }
            OutputFormat::Csv => {
                let mut writer = csv::Writer::from_writer(io::stdout());
                for point in series {
                    writer.serialize(PointRow {
                        date: point.date,
                        time: format_date(point.date),
                        value: point.value,
                        unit,
                    })?;
                }
                writer.flush()?;
            }
            OutputFormat::Raw => {
                for point in series {
                    println!("{} {}", point.date, point.value);
                }
            }
            OutputFormat::Table => {
                if series.is_empty() {
                    self.print_warning(&format!("No samples of '{}' in {}", series.bench(), series.suite()))?;
                    return Ok(());
                }

                self.print_heading(&format!("{} / {}", series.suite(), series.bench()));
                if let Some(tool) = series.tool() {
                    let direction = if tool.smaller_is_better() { "smaller is better" } else { "bigger is better" };
                    println!("Unit: {} ({})", unit, direction);
                }
                println!();
                println!("{:<23} {:>20}", "Date", "Value");
                println!("{:-<23} {:->20}", "", "");
                for point in series {
                    println!("{:<23} {:>20}", format_date(point.date), point.value);
                }
                println!("\nTotal: {} samples", series.len());
            }
        }
        Ok(())
    }

    pub fn print_bench_names(&self, suite: &SuiteId, names: &[String]) -> Result<()> {
        match self.format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(names)?),
            OutputFormat::Yaml => print!("{}", serde_yaml::to_string(names)?),
            OutputFormat::Csv => {
                let mut writer = csv::Writer::from_writer(io::stdout());
                writer.write_record(["bench"])?;
                for name in names {
                    writer.write_record([name])?;
                }
                writer.flush()?;
            }
            OutputFormat::Raw => {
                for name in names {
                    println!("{}", name);
                }
            }
            OutputFormat::Table => {
                self.print_heading(&format!("Benches in {}", suite));
                for name in names {
                    println!("  {}", name);
                }
            }
        }
        Ok(())
    }

    pub fn print_reports(&self, reports: &[IntegrityReport]) -> Result<()> {
        match self.format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(reports)?),
            OutputFormat::Yaml => print!("{}", serde_yaml::to_string(reports)?),
            OutputFormat::Csv => {
                let mut writer = csv::Writer::from_writer(io::stdout());
                writer.write_record(["suite", "check", "severity", "passed", "problems"])?;
                for report in reports {
                    for check in &report.checks {
                        let problems = check.errors.len().to_string();
                        writer.write_record([
                            report.suite.as_str(),
                            check.name.as_str(),
                            if check.severity == benchhist_store::Severity::Error { "error" } else { "warning" },
                            if check.passed { "true" } else { "false" },
                            problems.as_str(),
                        ])?;
                    }
                }
                writer.flush()?;
            }
            OutputFormat::Raw | OutputFormat::Table => {
                for report in reports {
                    let status = if report.passed() { "ok" } else { "FAILED" };
                    if self.colored {
                        let status = if report.passed() { style(status).green() } else { style(status).red() };
                        println!("{} {} ({} runs)", status, style(&report.suite).bold(), report.runs);
                    } else {
                        println!("{} {} ({} runs)", status, report.suite, report.runs);
                    }

                    for check in report.failures() {
                        println!("  {:?} {}:", check.severity, check.name);
                        for problem in &check.errors {
                            println!("    - {}", problem);
                        }
                    }
                }
            }
        }
        Ok(())
    }

    pub fn print_config(&self, config: &StoreConfig) -> Result<()> {
        match self.format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(config)?),
            OutputFormat::Yaml => print!("{}", serde_yaml::to_string(config)?),
            OutputFormat::Raw => print!("{}", toml::to_string_pretty(config)?),
            OutputFormat::Csv | OutputFormat::Table => {
                let value = serde_json::to_value(config)?;
                let mut entries = Vec::new();
                flatten("", &value, &mut entries);

                if self.format == OutputFormat::Csv {
                    let mut writer = csv::Writer::from_writer(io::stdout());
                    writer.write_record(["key", "value"])?;
                    for (key, value) in &entries {
                        writer.write_record([key, value])?;
                    }
                    writer.flush()?;
                } else {
                    self.print_heading("Configuration");
                    println!("{:<40} {}", "Key", "Value");
                    println!("{:-<40} {:-<40}", "", "");
                    for (key, value) in &entries {
                        if self.colored {
                            println!("{:<40} {}", style(key).bold().blue(), style(value).green());
                        } else {
                            println!("{:<40} {}", key, value);
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Status lines go to stdout only in table mode, so data formats stay parseable
    pub fn print_success(&self, message: &str) -> Result<()> {
        if self.quiet {
            return Ok(());
        }
        let mark = if self.colored { style("✓").green().bold().to_string() } else { "✓".to_string() };
        self.status_line(&mark, message);
        Ok(())
    }

    pub fn print_warning(&self, message: &str) -> Result<()> {
        if self.colored {
            eprintln!("{} {}", style("⚠").yellow().bold(), message);
        } else {
            eprintln!("⚠ {}", message);
        }
        Ok(())
    }

    pub fn print_info(&self, message: &str) -> Result<()> {
        if self.quiet {
            return Ok(());
        }
        let mark = if self.colored { style("ℹ").blue().bold().to_string() } else { "ℹ".to_string() };
        self.status_line(&mark, message);
        Ok(())
    }

    fn status_line(&self, mark: &str, message: &str) {
        if self.format == OutputFormat::Table {
            println!("{} {}", mark, message);
        } else {
            eprintln!("{} {}", mark, message);
        }
    }

    fn print_heading(&self, title: &str) {
        if self.colored {
            println!("{}", style(title).bold().underlined());
        } else {
            println!("{}", title);
        }
    }
}

/// Epoch milliseconds as a UTC timestamp
fn format_date(millis: u64) -> String {
    i64::try_from(millis)
        .ok()
        .and_then(DateTime::<Utc>::from_timestamp_millis)
        .map(|date| date.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| millis.to_string())
}

fn short_commit(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let kept: String = text.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

fn flatten(prefix: &str, value: &serde_json::Value, out: &mut Vec<(String, String)>) {
    match value {
        serde_json::Value::Object(map) => {
            for (key, value) in map {
                let key = if prefix.is_empty() { key.clone() } else { format!("{}.{}", prefix, key) };
                flatten(&key, value, out);
            }
        }
        serde_json::Value::String(s) => out.push((prefix.to_string(), s.clone())),
        serde_json::Value::Null => out.push((prefix.to_string(), "(unset)".to_string())),
        other => out.push((prefix.to_string(), other.to_string())),
    }
}
