//! Final run report formatting
//!
//! Renders the accumulated result collection at process end: a short
//! per-suite summary plus the full result list as JSON.

use crate::error::Result;
use crate::models::BenchmarkResult;
use crate::orchestrator::RunReport;
use std::collections::BTreeMap;

/// Formats the terminal report of a run
pub struct ReportFormatter {
    use_color: bool,
}

impl ReportFormatter {
    pub fn new(use_color: bool) -> Self {
        Self { use_color }
    }

    /// Human-readable run summary
    pub fn summary(&self, report: &RunReport) -> String {
        let mut lines = Vec::new();

        let mut per_suite: BTreeMap<String, usize> = BTreeMap::new();
        for result in &report.results {
            *per_suite.entry(result.case.suite.to_string()).or_default() += 1;
        }

        lines.push(format!("{} result(s) collected", report.results.len()));
        for (suite, count) in &per_suite {
            lines.push(format!("  {}: {} result(s)", suite, count));
        }

        let status = match &report.error {
            None => self.paint_ok("run succeeded"),
            Some(e) => format!("run failed: {}", e.format_for_console(self.use_color)),
        };
        lines.push(status);

        lines.join("\n")
    }

    fn paint_ok(&self, text: &str) -> String {
        if self.use_color {
            use colored::Colorize;
            text.green().to_string()
        } else {
            text.to_string()
        }
    }

    /// Full result collection as pretty-printed JSON
    pub fn to_json(results: &[BenchmarkResult]) -> Result<String> {
        Ok(serde_json::to_string_pretty(results)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::models::{NetworkScope, Protocol, SuiteKind, TestCase};

    fn result(suite: SuiteKind, size: u32) -> BenchmarkResult {
        BenchmarkResult {
            case: TestCase {
                suite,
                scope: NetworkScope::Local,
                from: "target1".to_string(),
                to: "target1".to_string(),
                port: 7002,
                repetitions: 50_000,
                size,
                protocol: Protocol::Tcp,
            },
            results: "RT_LATENCY=120".to_string(),
        }
    }

    #[test]
    fn test_summary_counts_per_suite() {
        let report = RunReport {
            results: vec![
                result(SuiteKind::Metal, 300),
                result(SuiteKind::Metal, 1024),
                result(SuiteKind::Container("host".to_string()), 300),
            ],
            error: None,
        };

        let summary = ReportFormatter::new(false).summary(&report);
        assert!(summary.contains("3 result(s) collected"));
        assert!(summary.contains("metal: 2 result(s)"));
        assert!(summary.contains("host: 1 result(s)"));
        assert!(summary.contains("run succeeded"));
    }

    #[test]
    fn test_summary_reports_failure() {
        let report = RunReport {
            results: vec![result(SuiteKind::Metal, 300)],
            error: Some(AppError::suite("bridge suite failed")),
        };

        let summary = ReportFormatter::new(false).summary(&report);
        assert!(summary.contains("1 result(s) collected"));
        assert!(summary.contains("run failed"));
        assert!(summary.contains("bridge suite failed"));
    }

    #[test]
    fn test_json_dump_is_an_array_of_flat_records() {
        let json =
            ReportFormatter::to_json(&[result(SuiteKind::Metal, 300)]).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert!(value.is_array());
        assert_eq!(value[0]["test"], "metal");
        assert_eq!(value[0]["size"], 300);
        assert_eq!(value[0]["results"], "RT_LATENCY=120");
    }

    #[test]
    fn test_empty_results_serialize_to_empty_array() {
        let json = ReportFormatter::to_json(&[]).unwrap();
        assert_eq!(json.trim(), "[]");
    }
}
