//! Console rendering of benchmark results.

use super::{BenchmarkReport, ScenarioReport, StrategyReport};
use crate::evaluation::MetricRecord;
use crate::table::ColumnCount;

const RULE: &str = "============================================================";

/// Human-readable block for one scenario of `dataset`.
pub fn render_scenario(dataset: &str, scenario: &ScenarioReport) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{}\n{} | scenario {}: {}\n{}\n",
        RULE, dataset, scenario.index, scenario.scenario, RULE
    ));

    if let Some(injection) = &scenario.injection {
        out.push_str(&format!(
            "Introduced '{}' missing values: {:.2}% -> {} cells requested, {} nulled\n",
            injection.mechanism, injection.percent, injection.requested_cells, injection.realized_cells
        ));
    }

    if scenario.injection.is_some() {
        out.push_str("\nMissing values before imputation:\n");
        push_counts(&mut out, &scenario.missing_before);

        for strategy in &scenario.strategies {
            push_strategy(&mut out, strategy);
        }
    }

    if let Some(error) = &scenario.error {
        out.push_str(&format!("Scenario failed [{}]: {}\n", error.code, error.message));
    }
    out
}

/// Every scenario of every dataset, in run order.
pub fn render_report(report: &BenchmarkReport) -> String {
    let mut out = String::new();
    for dataset in &report.datasets {
        for scenario in &dataset.scenarios {
            out.push_str(&render_scenario(&dataset.name, scenario));
            out.push('\n');
        }
    }
    if report.stopped_early {
        out.push_str("Benchmark stopped before all scenarios ran.\n");
    }
    out
}

fn push_strategy(out: &mut String, strategy: &StrategyReport) {
    out.push_str(&format!("\n--- {} ---\n", strategy.name));
    out.push_str(&format!(
        "{} execution time: {:.5} seconds\n",
        strategy.name, strategy.elapsed_secs
    ));
    out.push_str("Missing values after imputation:\n");
    push_counts(out, &strategy.missing_after);
    push_metric(out, &strategy.mae);
    push_metric(out, &strategy.rmse);
}

fn push_counts(out: &mut String, counts: &[ColumnCount]) {
    for count in counts {
        out.push_str(&format!("  {:<20} {}\n", count.column, count.missing));
    }
}

fn push_metric(out: &mut String, record: &MetricRecord) {
    out.push_str(&format!("{}:\n", record.kind));
    for score in &record.scores {
        out.push_str(&format!("  {:<20} {:.4}\n", score.column, score.value));
    }
    for column in &record.skipped {
        out.push_str(&format!("  {:<20} skipped\n", column));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{MissingMechanism, Scenario};
    use crate::evaluation::{ColumnScore, MetricKind};
    use crate::reporting::{InjectionSummary, ScenarioError};

    fn metric(kind: MetricKind, value: f64) -> MetricRecord {
        MetricRecord {
            kind,
            scores: vec![ColumnScore {
                column: "wind".to_string(),
                value,
                cells: 12,
            }],
            skipped: vec!["ghost".to_string()],
        }
    }

    #[test]
    fn test_render_scenario() {
        let mut scenario = ScenarioReport::new(3, Scenario::new(20.0, 25.0, MissingMechanism::Random));
        scenario.injection = Some(InjectionSummary {
            mechanism: MissingMechanism::Random,
            percent: 21.456,
            requested_cells: 85,
            realized_cells: 83,
            bursts: 0,
        });
        scenario.missing_before = vec![ColumnCount {
            column: "wind".to_string(),
            missing: 83,
        }];
        scenario.strategies.push(StrategyReport {
            name: "simple_mean".to_string(),
            elapsed_secs: 0.000123,
            missing_after: vec![ColumnCount {
                column: "wind".to_string(),
                missing: 0,
            }],
            mae: metric(MetricKind::Mae, 1.234567),
            rmse: metric(MetricKind::Rmse, 2.0),
        });

        let text = render_scenario("weather.csv", &scenario);
        assert!(text.contains("weather.csv | scenario 3: 20-25% random"));
        assert!(text.contains("21.46% -> 85 cells requested, 83 nulled"));
        assert!(text.contains("simple_mean execution time: 0.00012 seconds"));
        assert!(text.contains("MAE:\n  wind                 1.2346\n"));
        assert!(text.contains("RMSE:\n  wind                 2.0000\n"));
        assert!(text.contains("ghost                skipped"));
    }

    #[test]
    fn test_render_failed_scenario() {
        let mut scenario = ScenarioReport::new(2, Scenario::new(10.0, 15.0, MissingMechanism::Burst));
        scenario.error = Some(ScenarioError {
            code: "INSUFFICIENT_ROWS".to_string(),
            message: "Insufficient rows for burst length".to_string(),
        });

        let text = render_scenario("tiny.csv", &scenario);
        assert!(text.contains("Scenario failed [INSUFFICIENT_ROWS]"));
        assert!(!text.contains("Missing values before"));
    }

    #[test]
    fn test_render_scenario_failed_mid_way_keeps_finished_strategies() {
        let mut scenario = ScenarioReport::new(1, Scenario::new(10.0, 15.0, MissingMechanism::Random));
        scenario.injection = Some(InjectionSummary {
            mechanism: MissingMechanism::Random,
            percent: 12.0,
            requested_cells: 10,
            realized_cells: 10,
            bursts: 0,
        });
        scenario.strategies.push(StrategyReport {
            name: "simple_mean".to_string(),
            elapsed_secs: 0.001,
            missing_after: Vec::new(),
            mae: metric(MetricKind::Mae, 1.0),
            rmse: metric(MetricKind::Rmse, 1.5),
        });
        scenario.error = Some(ScenarioError {
            code: "IMPUTATION_FAILED".to_string(),
            message: "iterative left non-finite values".to_string(),
        });

        let text = render_scenario("weather.csv", &scenario);
        let finished = text.find("--- simple_mean ---").unwrap();
        let failed = text.find("Scenario failed [IMPUTATION_FAILED]").unwrap();
        assert!(finished < failed);
    }
}
