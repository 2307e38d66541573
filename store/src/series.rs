//! Per-bench time series over a suite snapshot

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::model::{Bench, Run, SuiteHistory, SuiteId, Tool};

/// One `(date, value)` sample of a bench
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub date: u64,
    pub value: f64,
}

impl From<SeriesPoint> for (u64, f64) {
    fn from(point: SeriesPoint) -> Self {
        (point.date, point.value)
    }
}

/// Lazy, restartable sequence of samples for one bench.
///
/// Holds a snapshot of the suite taken when the series was requested, so
/// later appends never show up in it. Points come out in date order; runs
/// with equal dates keep their append order.
#[derive(Debug, Clone)]
pub struct Series {
    suite: SuiteId,
    bench: String,
    history: Arc<SuiteHistory>,
    /// Date-sorted run indices, only when the stored order is not already sorted
    order: Option<Arc<[usize]>>,
}

impl Series {
    pub(crate) fn new(suite: SuiteId, bench: impl Into<String>, history: Arc<SuiteHistory>) -> Self {
        let runs = history.runs();
        let sorted = runs.windows(2).all(|pair| pair[0].date <= pair[1].date);

        let order = if sorted {
            None
        } else {
            let mut indices: Vec<usize> = (0..runs.len()).collect();
            indices.sort_by_key(|&i| runs[i].date);
            Some(Arc::from(indices))
        };

        Self {
            suite,
            bench: bench.into(),
            history,
            order,
        }
    }

    pub fn suite(&self) -> &SuiteId {
        &self.suite
    }

    pub fn bench(&self) -> &str {
        &self.bench
    }

    pub fn iter(&self) -> SeriesIter<'_> {
        SeriesIter { series: self, position: 0 }
    }

    pub fn len(&self) -> usize {
        self.matching().count()
    }

    pub fn is_empty(&self) -> bool {
        self.matching().next().is_none()
    }

    /// Unit of the first sample in date order
    pub fn unit(&self) -> Option<&str> {
        self.first_sample().map(|(_, bench)| bench.unit.as_str())
    }

    /// Comparison direction of the run holding the first sample in date order
    pub fn tool(&self) -> Option<Tool> {
        self.first_sample().map(|(run, _)| run.tool)
    }

    fn first_sample(&self) -> Option<(&Run, &Bench)> {
        (0..self.history.len())
            .filter_map(|position| self.run_at(position))
            .find_map(|run| run.bench(&self.bench).map(|bench| (run, bench)))
    }

    fn matching(&self) -> impl Iterator<Item = (&Run, &Bench)> {
        self.history
            .runs()
            .iter()
            .filter_map(|run| run.bench(&self.bench).map(|bench| (run, bench)))
    }

    fn run_at(&self, position: usize) -> Option<&Run> {
        let index = match &self.order {
            Some(order) => *order.get(position)?,
            None => position,
        };
        self.history.runs().get(index)
    }
}

impl<'a> IntoIterator for &'a Series {
    type Item = SeriesPoint;
    type IntoIter = SeriesIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator returned by `Series::iter`
#[derive(Debug, Clone)]
pub struct SeriesIter<'a> {
    series: &'a Series,
    position: usize,
}

impl<'a> Iterator for SeriesIter<'a> {
    type Item = SeriesPoint;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(run) = self.series.run_at(self.position) {
            self.position += 1;
            if let Some(bench) = run.bench(&self.series.bench) {
                return Some(SeriesPoint {
                    date: run.date,
                    value: bench.value,
                });
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.series.history.len().saturating_sub(self.position);
        (0, Some(remaining))
    }
}

impl std::iter::FusedIterator for SeriesIter<'_> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Commit, Person};

    fn run(date: u64, benches: &[(&str, f64)]) -> Run {
        let person = Person::new("vibhansa", "vibhansa@microsoft.com");
        Run {
            commit: Commit {
                author: person.clone(),
                committer: person,
                distinct: None,
                id: format!("{:040x}", date),
                message: "bench".to_string(),
                timestamp: "2025-03-07T23:48:22-08:00".to_string(),
                tree_id: None,
                url: None,
            },
            date,
            tool: Tool::SmallerIsBetter,
            benches: benches
                .iter()
                .map(|(name, value)| Bench::new(*name, *value, "milliseconds"))
                .collect(),
        }
    }

    fn series(runs: Vec<Run>, bench: &str) -> Series {
        let mut history = SuiteHistory::new("");
        for r in runs {
            history.push_run(r);
        }
        Series::new(SuiteId::new("premium/latency/read").unwrap(), bench, Arc::new(history))
    }

    #[test]
    fn test_sparse_series_skips_missing_runs() {
        let series = series(
            vec![
                run(1000, &[("random_read", 147.8), ("sequential_read", 0.09)]),
                run(2000, &[("sequential_read", 0.08)]),
                run(3000, &[("random_read", 142.5), ("sequential_read", 0.07)]),
            ],
            "random_read",
        );

        let points: Vec<(u64, f64)> = series.iter().map(Into::into).collect();
        assert_eq!(points, vec![(1000, 147.8), (3000, 142.5)]);
        assert_eq!(series.len(), 2);
        assert_eq!(series.unit(), Some("milliseconds"));
        assert_eq!(series.tool(), Some(Tool::SmallerIsBetter));
    }

    #[test]
    fn test_series_is_restartable() {
        let series = series(vec![run(1000, &[("seq_read", 0.1)]), run(2000, &[("seq_read", 0.09)])], "seq_read");

        let first: Vec<SeriesPoint> = series.iter().collect();
        let second: Vec<SeriesPoint> = (&series).into_iter().collect();
        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
    }

    #[test]
    fn test_out_of_order_runs_yield_date_order() {
        let series = series(
            vec![
                run(2000, &[("seq_read", 0.09)]),
                run(500, &[("seq_read", 0.2)]),
                run(2000, &[("seq_read", 0.07)]),
            ],
            "seq_read",
        );

        let points: Vec<(u64, f64)> = series.iter().map(Into::into).collect();
        assert_eq!(points, vec![(500, 0.2), (2000, 0.09), (2000, 0.07)]);
    }

    #[test]
    fn test_unit_and_tool_follow_date_order() {
        let mut newer = run(2000, &[("seq_read", 0.09)]);
        newer.benches[0].unit = "seconds".to_string();
        newer.tool = Tool::BiggerIsBetter;
        let older = run(500, &[("seq_read", 0.2)]);

        let series = series(vec![newer, older], "seq_read");
        assert_eq!(series.iter().next().map(|point| point.date), Some(500));
        assert_eq!(series.unit(), Some("milliseconds"));
        assert_eq!(series.tool(), Some(Tool::SmallerIsBetter));
    }

    #[test]
    fn test_unknown_bench_is_empty() {
        let series = series(vec![run(1000, &[("seq_read", 0.1)])], "random_read_4_threads");
        assert!(series.is_empty());
        assert_eq!(series.iter().next(), None);
        assert_eq!(series.unit(), None);
    }
}
