//! End-to-end tests of the pairs engine over synthetic price histories.
//!
//! Tests cover:
//! - Alignment to signal to positions to accounting to metrics
//! - Warm-up, dollar neutrality and causality of the pipeline
//! - Transaction cost scaling
//! - Benchmark resolution (panel column, external history, too little overlap)
//! - History length limits
//! - Orchestration through a mock data port

mod common;

use approx::assert_relative_eq;
use common::*;
use pairtrader::cli::run_backtest_pipeline;
use pairtrader::domain::error::PairsError;
use pairtrader::domain::metrics::{MIN_BENCHMARK_OVERLAP, round_to};
use pairtrader::domain::panel::{PricePanel, align_prices};
use pairtrader::domain::position::PositionState;
use pairtrader::domain::price::{DateRange, PriceHistory};
use pairtrader::domain::strategy::{PairRun, PairStrategy, run_pairs_backtest};
use pairtrader::ports::data_port::DataPort;

const ROWS: usize = 300;

fn active_strategy() -> PairStrategy {
    PairStrategy {
        rolling_window: 20,
        entry_threshold: 1.0,
        exit_threshold: 0.2,
        ..PairStrategy::new("AAA", "BBB")
    }
}

fn pair_panel(n: usize) -> PricePanel {
    align_prices(&pair_histories(n), full_range(), 100).unwrap()
}

fn run(panel: &PricePanel, strategy: &PairStrategy) -> PairRun {
    run_pairs_backtest(panel, strategy, None).unwrap()
}

mod full_pipeline {
    use super::*;

    #[test]
    fn pipeline_produces_aligned_series() {
        let panel = pair_panel(ROWS);
        let run = run(&panel, &active_strategy());
        let result = &run.result;

        assert_eq!(panel.len(), ROWS);
        assert_eq!(run.signal.len(), ROWS);
        assert_eq!(run.positions.len(), ROWS);
        assert_eq!(result.dates.len(), ROWS);
        assert_eq!(result.equity_curve.len(), ROWS);
        assert_eq!(result.drawdown.len(), ROWS);
        assert_eq!(result.metrics.trading_days, ROWS);

        assert_eq!(result.equity_curve[0], 1.0);
        assert_eq!(result.net_returns[0], Some(0.0));
        assert!(result.drawdown.iter().all(|&d| d <= 0.0));
    }

    #[test]
    fn minimum_panel_counts_first_row_as_trading_day() {
        let panel = pair_panel(100);
        let run = run(&panel, &active_strategy());
        assert_eq!(run.result.metrics.trading_days, 100);
        assert_eq!(run.result.clean_returns().len(), 100);
        assert_eq!(run.result.clean_returns()[0].1, 0.0);
    }

    #[test]
    fn oscillating_pair_trades() {
        let panel = pair_panel(ROWS);
        let run = run(&panel, &active_strategy());

        assert!(run.active_periods() > 0);
        assert!(run.positions.contains(&PositionState::ShortSpread));
        assert!(run.positions.contains(&PositionState::LongSpread));
        assert!(run.result.total_transaction_costs() > 0.0);
    }

    #[test]
    fn equity_compounds_net_returns() {
        let panel = pair_panel(ROWS);
        let run = run(&panel, &active_strategy());

        let compounded = run
            .result
            .net_returns
            .iter()
            .flatten()
            .fold(1.0, |acc, r| acc * (1.0 + r));
        assert_relative_eq!(run.result.final_equity(), compounded, max_relative = 1e-12);
        assert_relative_eq!(
            run.result.metrics.total_return,
            round_to((compounded - 1.0) * 100.0, 2),
            epsilon = 1e-9
        );
    }

    #[test]
    fn repeated_runs_are_identical() {
        let panel = pair_panel(ROWS);
        let strategy = active_strategy();
        let first = run(&panel, &strategy);
        let second = run(&panel, &strategy);
        assert_eq!(first, second);
    }
}

mod invariants {
    use super::*;

    #[test]
    fn warmup_rows_are_flat_and_undefined() {
        let panel = pair_panel(ROWS);
        let strategy = active_strategy();
        let run = run(&panel, &strategy);
        let warmup = strategy.rolling_window - 1;

        assert!(run.signal.zscore[..warmup].iter().all(Option::is_none));
        assert!(run.positions[..warmup].iter().all(|p| p.is_flat()));
        assert!(run.signal.zscore[warmup].is_some());
    }

    #[test]
    fn every_row_is_dollar_neutral() {
        let panel = pair_panel(ROWS);
        let run = run(&panel, &active_strategy());

        for (gross, net) in run
            .result
            .gross_exposure
            .iter()
            .zip(&run.result.net_exposure)
        {
            assert_eq!(*net, 0.0);
            assert!(*gross == 0.0 || *gross == 1.0);
        }
        assert_eq!(run.result.metrics.avg_net_exposure, 0.0);
        assert!(run.result.metrics.exposure_check_passes());
    }

    #[test]
    fn later_shock_does_not_change_earlier_rows() {
        let shock_at = 200;
        let (mut first, second) = mean_reverting_pair(ROWS);
        let baseline = align_prices(
            &[make_history("AAA", &first), make_history("BBB", &second)],
            full_range(),
            100,
        )
        .unwrap();

        first[shock_at] *= 1.5;
        let shocked = align_prices(
            &[make_history("AAA", &first), make_history("BBB", &second)],
            full_range(),
            100,
        )
        .unwrap();

        let strategy = active_strategy();
        let a = run(&baseline, &strategy);
        let b = run(&shocked, &strategy);

        assert_eq!(a.signal.zscore[..shock_at], b.signal.zscore[..shock_at]);
        assert_eq!(a.positions[..shock_at], b.positions[..shock_at]);
        assert_eq!(
            a.result.net_returns[..shock_at],
            b.result.net_returns[..shock_at]
        );
        assert_eq!(
            a.result.equity_curve[..shock_at],
            b.result.equity_curve[..shock_at]
        );
        assert_ne!(a.signal.zscore[shock_at], b.signal.zscore[shock_at]);
    }

    #[test]
    fn doubling_costs_doubles_total_costs() {
        let panel = pair_panel(ROWS);
        let cheap = active_strategy();
        let dear = PairStrategy {
            transaction_cost_bps: cheap.transaction_cost_bps * 2.0,
            ..cheap.clone()
        };

        let a = run(&panel, &cheap);
        let b = run(&panel, &dear);

        assert_eq!(a.positions, b.positions);
        assert!(a.result.total_transaction_costs() > 0.0);
        assert_relative_eq!(
            b.result.total_transaction_costs(),
            2.0 * a.result.total_transaction_costs(),
            max_relative = 1e-12
        );
        assert!(b.result.final_equity() <= a.result.final_equity());
    }

    #[test]
    fn zero_costs_leave_gross_returns_untouched() {
        let panel = pair_panel(ROWS);
        let strategy = PairStrategy {
            transaction_cost_bps: 0.0,
            ..active_strategy()
        };
        let run = run(&panel, &strategy);
        assert_eq!(run.result.strategy_returns, run.result.net_returns);
        assert_eq!(run.result.total_transaction_costs(), 0.0);
    }
}

mod benchmark {
    use super::*;

    #[test]
    fn short_benchmark_overlap_reports_zero_beta() {
        let panel = pair_panel(ROWS);
        let short = benchmark_history(MIN_BENCHMARK_OVERLAP - 5);
        let run = run_pairs_backtest(&panel, &active_strategy(), Some(&short)).unwrap();

        assert_eq!(run.result.metrics.beta, 0.0);
        assert_eq!(run.result.metrics.correlation, 0.0);
    }

    #[test]
    fn missing_benchmark_reports_zero_beta() {
        let panel = pair_panel(ROWS);
        let run = run(&panel, &active_strategy());
        assert_eq!(run.result.metrics.beta, 0.0);
        assert_eq!(run.result.metrics.correlation, 0.0);
        assert!(run.result.metrics.beta_check_passes());
    }

    #[test]
    fn panel_and_external_benchmark_agree() {
        let mut histories = pair_histories(ROWS);
        let spy = benchmark_history(ROWS);
        let external = align_prices(&histories, full_range(), 100).unwrap();
        histories.push(spy.clone());
        let with_column = align_prices(&histories, full_range(), 100).unwrap();
        assert!(with_column.contains("SPY"));

        let strategy = active_strategy();
        let a = run_pairs_backtest(&with_column, &strategy, None).unwrap();
        let b = run_pairs_backtest(&external, &strategy, Some(&spy)).unwrap();

        assert_eq!(a.result.metrics.beta, b.result.metrics.beta);
        assert_eq!(a.result.metrics.correlation, b.result.metrics.correlation);
        assert!(a.result.metrics.correlation.abs() <= 1.0);
    }
}

mod history_limits {
    use super::*;

    #[test]
    fn fifty_rows_is_insufficient() {
        let err = align_prices(&pair_histories(50), full_range(), 100).unwrap_err();
        assert!(matches!(
            err,
            PairsError::InsufficientHistory {
                rows: 50,
                minimum: 100
            }
        ));
        assert_eq!(
            err.to_string(),
            "Insufficient data: only 50 days. Need at least 100."
        );
    }

    #[test]
    fn exactly_minimum_rows_succeeds() {
        let panel = align_prices(&pair_histories(100), full_range(), 100).unwrap();
        let run = run(&panel, &PairStrategy::new("AAA", "BBB"));
        assert_eq!(run.result.metrics.trading_days, 100);
        assert_eq!(run.signal.defined_count(), 100 - 59);
    }

    #[test]
    fn window_longer_than_sample_stays_flat() {
        let panel = align_prices(&pair_histories(120), full_range(), 100).unwrap();
        let strategy = PairStrategy {
            rolling_window: 150,
            ..PairStrategy::new("AAA", "BBB")
        };
        let run = run(&panel, &strategy);

        assert_eq!(run.signal.defined_count(), 0);
        assert_eq!(run.active_periods(), 0);
        assert_eq!(run.result.metrics.total_return, 0.0);
        assert_eq!(run.result.metrics.hit_rate, 0.0);
        assert_eq!(run.result.final_equity(), 1.0);
    }

    #[test]
    fn disjoint_dates_are_unavailable() {
        let (first, second) = mean_reverting_pair(150);
        let a = make_history("AAA", &first);
        let b = PriceHistory::new(
            "BBB",
            make_history("BBB", &second)
                .points
                .into_iter()
                .map(|mut p| {
                    p.date = p.date + chrono::Duration::days(1000);
                    p
                })
                .collect(),
        );
        let err = align_prices(&[a, b], full_range(), 100).unwrap_err();
        assert!(matches!(err, PairsError::DataUnavailable { .. }));
    }
}

mod data_port_pipeline {
    use super::*;

    fn port() -> MockDataPort {
        let mut histories = pair_histories(ROWS);
        let second = histories.pop().unwrap();
        let first = histories.pop().unwrap();
        MockDataPort::new()
            .with_history(first)
            .with_history(second)
            .with_history(benchmark_history(ROWS))
    }

    fn range() -> DateRange {
        DateRange::new(day(0), day(ROWS - 1))
    }

    #[test]
    fn mock_port_filters_by_range() {
        let points = port().fetch_closes("AAA", day(10), day(19)).unwrap();
        assert_eq!(points.len(), 10);
        assert_eq!(port().list_tickers().unwrap(), vec!["AAA", "BBB", "SPY"]);
    }

    #[test]
    fn pipeline_runs_with_benchmark() {
        let run = run_backtest_pipeline(&port(), &active_strategy(), range()).unwrap();
        assert_eq!(run.result.dates.len(), ROWS);
        assert!(run.result.metrics.correlation.abs() <= 1.0);
    }

    #[test]
    fn failed_benchmark_fetch_is_not_fatal() {
        let port = port().with_error("SPY", "rate limited");
        let run = run_backtest_pipeline(&port, &active_strategy(), range()).unwrap();
        assert_eq!(run.result.metrics.beta, 0.0);
        assert_eq!(run.result.metrics.correlation, 0.0);
    }

    #[test]
    fn failed_pair_fetch_aborts() {
        let port = port().with_error("BBB", "connection reset");
        let err = run_backtest_pipeline(&port, &active_strategy(), range()).unwrap_err();
        assert!(matches!(err, PairsError::DataSource { reason } if reason == "connection reset"));
    }

    #[test]
    fn unknown_ticker_is_unavailable() {
        let strategy = PairStrategy {
            ticker2: "ZZZ".into(),
            ..active_strategy()
        };
        let err = run_backtest_pipeline(&port(), &strategy, range()).unwrap_err();
        assert!(matches!(err, PairsError::DataUnavailable { .. }));
    }

    #[test]
    fn range_shorter_than_minimum_is_insufficient() {
        let short = DateRange::new(day(0), day(49));
        let err = run_backtest_pipeline(&port(), &active_strategy(), short).unwrap_err();
        assert!(matches!(err, PairsError::InsufficientHistory { rows: 50, .. }));
    }
}
