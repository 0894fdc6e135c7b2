//! Human-readable summaries of a [`PerformanceReport`].

use crate::report::{PerformanceReport, ReturnSeries};
use std::fmt;

/// Percentage with two decimals, `n/a` for undefined values.
fn pct(v: f64) -> String {
    if v.is_finite() {
        format!("{:.2}%", v * 100.0)
    } else {
        "n/a".to_string()
    }
}

fn num(v: f64) -> String {
    if v.is_finite() {
        format!("{v:.3}")
    } else {
        "n/a".to_string()
    }
}

impl PerformanceReport {
    fn period_line(&self) -> String {
        match (self.meta.first_date, self.meta.last_date) {
            (Some(first), Some(last)) => format!("{first} to {last}"),
            _ => "no rebalance periods".to_string(),
        }
    }

    /// Render the report as a fixed-width text table.
    pub fn to_ascii_table(&self) -> String {
        let mut output = String::new();

        output.push_str(&format!(
            "\nFactor Backtest: {} ({})\n",
            self.meta.factor, self.meta.direction
        ));
        output.push_str(&format!("Period: {}\n", self.period_line()));
        output.push_str(&format!(
            "Buckets: {}  Holding: {} days  Periods/year: {:.2}\n",
            self.meta.n_buckets, self.meta.holding_period_days, self.meta.periods_per_year
        ));
        output.push_str(&"=".repeat(80));
        output.push('\n');

        output.push_str("\nInformation Coefficient:\n");
        output.push_str(&"-".repeat(80));
        output.push('\n');
        let ic = &self.ic_summary;
        output.push_str(&format!("  Observations:     {:>10}\n", ic.observations));
        output.push_str(&format!("  Mean IC:          {:>10}\n", num(ic.mean)));
        output.push_str(&format!("  IC Std:           {:>10}\n", num(ic.std)));
        output.push_str(&format!("  ICIR:             {:>10}\n", num(ic.icir)));
        output.push_str(&format!("  Hit Rate:         {:>10}\n", pct(ic.hit_rate)));

        output.push_str("\nReturns:\n");
        output.push_str(&"-".repeat(80));
        output.push('\n');
        output.push_str(&format!(
            "{:<10} {:>10} {:>10} {:>10} {:>8} {:>10} {:>10} {:>6}\n",
            "Series", "Cum.", "Ann.", "Vol", "Sharpe", "Max DD", "Turnover", "Gaps"
        ));
        output.push_str(&"-".repeat(80));
        output.push('\n');
        for series in self.series() {
            output.push_str(&ascii_row(series));
        }

        if !self.audit.is_clean() {
            output.push_str("\nAudit:\n");
            output.push_str(&"-".repeat(80));
            output.push('\n');
            output.push_str(&format!(
                "  Skipped rebalances:        {}\n",
                self.audit.skipped.len()
            ));
            output.push_str(&format!(
                "  Forced exits:              {}\n",
                self.audit.forced_exits.len()
            ));
            output.push_str(&format!(
                "  Unresolved instruments:    {}\n",
                self.audit.unresolved.len()
            ));
            output.push_str(&format!(
                "  Thin cross-sections:       {}\n",
                self.audit.insufficient.len()
            ));
        }

        output.push_str(&"=".repeat(80));
        output.push('\n');
        output
    }

    /// Render the report as Markdown.
    pub fn to_markdown(&self) -> String {
        let mut output = String::new();

        output.push_str(&format!("# Factor Backtest: {}\n\n", self.meta.factor));
        output.push_str(&format!("**Period:** {}\n\n", self.period_line()));
        output.push_str(&format!(
            "- **Direction:** {}\n- **Buckets:** {}\n- **Holding period:** {} trading days\n- **Periods per year:** {:.2}\n\n",
            self.meta.direction,
            self.meta.n_buckets,
            self.meta.holding_period_days,
            self.meta.periods_per_year
        ));

        let ic = &self.ic_summary;
        output.push_str("## Information Coefficient\n\n");
        output.push_str(&format!("- **Observations:** {}\n", ic.observations));
        output.push_str(&format!("- **Mean IC:** {}\n", num(ic.mean)));
        output.push_str(&format!("- **IC Std:** {}\n", num(ic.std)));
        output.push_str(&format!("- **ICIR:** {}\n", num(ic.icir)));
        output.push_str(&format!("- **Hit Rate:** {}\n\n", pct(ic.hit_rate)));

        output.push_str("## Returns\n\n");
        output.push_str(
            "| Series | Cumulative | Annualized | Volatility | Sharpe | Max Drawdown | Turnover | Gaps |\n",
        );
        output.push_str("|---|---:|---:|---:|---:|---:|---:|---:|\n");
        for series in self.series() {
            let s = &series.stats;
            output.push_str(&format!(
                "| {} | {} | {} | {} | {} | {} | {} | {} |\n",
                series.label,
                pct(s.cumulative_return),
                pct(s.annualized_return),
                pct(s.annualized_volatility),
                num(s.sharpe),
                pct(s.max_drawdown),
                pct(s.mean_turnover),
                s.missing_periods
            ));
        }

        if !self.audit.is_clean() {
            output.push_str("\n## Audit\n\n");
            for skipped in &self.audit.skipped {
                output.push_str(&format!(
                    "- Skipped rebalance {}: {:?}\n",
                    skipped.date, skipped.reason
                ));
            }
            for exit in &self.audit.forced_exits {
                output.push_str(&format!(
                    "- Forced exit {} (bucket {}) on {}, target {}\n",
                    exit.symbol, exit.bucket, exit.exit_date, exit.exit_target
                ));
            }
            for unresolved in &self.audit.unresolved {
                output.push_str(&format!(
                    "- Unresolved {} on {}\n",
                    unresolved.symbol, unresolved.rebalance_date
                ));
            }
            if !self.audit.insufficient.is_empty() {
                output.push_str(&format!(
                    "- {} cross-sections below the minimum size\n",
                    self.audit.insufficient.len()
                ));
            }
        }
        output
    }
}

fn ascii_row(series: &ReturnSeries) -> String {
    let s = &series.stats;
    format!(
        "{:<10} {:>10} {:>10} {:>10} {:>8} {:>10} {:>10} {:>6}\n",
        series.label.to_string(),
        pct(s.cumulative_return),
        pct(s.annualized_return),
        pct(s.annualized_volatility),
        num(s.sharpe),
        pct(s.max_drawdown),
        pct(s.mean_turnover),
        s.missing_periods
    )
}

impl fmt::Display for PerformanceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} periods, spread {} cumulative, IC {} (ICIR {})",
            self.meta.factor,
            self.periods(),
            pct(self.spread.stats.cumulative_return),
            num(self.ic_summary.mean),
            num(self.ic_summary.icir)
        )
    }
}
