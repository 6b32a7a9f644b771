//! Terminal summary and CSV detail report for a finished backtest.

use std::path::Path;

use anyhow::{Context, Result};
use waveback_core::BacktestResult;

fn hours(sec: f64) -> f64 {
    sec / 3600.0
}

pub fn print_summary(result: &BacktestResult) {
    println!("Backtest: wave {} ({})", result.wave_number, result.wave_date);
    println!(
        "  actual active {:.2} h | optimized {:.2} h | improvement {:.1} %",
        hours(result.actual_active_sec),
        hours(result.optimized_sec),
        result.improvement_percent,
    );
    println!(
        "  days {} → {} (saved {}) | buffer capacity {} | groups {}/{} assigned",
        result.original_days,
        result.optimized_days,
        result.days_saved,
        result.buffer_capacity,
        result.assigned_groups,
        result.total_groups,
    );

    println!("\n  per day:");
    println!("    date        kind     makespan  actual  buffer  pallets");
    for day in &result.days {
        println!(
            "    {}  {}  {:>7.2}h {:>6.2}h  {:>2}→{:<2}   {:>3}/{:<3}",
            day.date,
            if day.virtual_day { "virtual" } else { "actual " },
            hours(day.makespan_sec),
            hours(day.actual_active_sec),
            day.buffer_start,
            day.buffer_end,
            day.optimized_pallets,
            day.original_pallets,
        );
    }

    println!("\n  per worker:");
    for w in &result.workers {
        println!(
            "    {:<10} {:<8} tasks {:>3}→{:<3} duration {:>6.2}h→{:<6.2}h ({:+.1} %)",
            w.code,
            w.role.as_str(),
            w.actual_tasks,
            w.optimized_tasks,
            hours(w.actual_duration_sec),
            hours(w.optimized_duration_sec),
            w.improvement_percent,
        );
    }

    let s = &result.source_counts;
    println!(
        "\n  duration sources: actual {} | picker_product {} | route_stats {} | default {}",
        s.actual, s.picker_product, s.route_stats, s.default,
    );

    if !result.leftover_repl.is_empty() || !result.leftover_dist.is_empty() {
        println!(
            "  leftovers: {} repl, {} dist",
            result.leftover_repl.len(),
            result.leftover_dist.len(),
        );
    }
}

/// Task-detail table, one row per pallet movement.
pub fn write_csv_report(path: &Path, result: &BacktestResult) -> Result<()> {
    let mut writer =
        csv::Writer::from_path(path).with_context(|| format!("create {}", path.display()))?;

    writer.write_record([
        "task_ref",
        "kind",
        "from_bin",
        "to_bin",
        "product_code",
        "qty",
        "actual_worker",
        "optimized_worker",
        "factual_duration_sec",
        "optimized_duration_sec",
        "duration_source",
    ])?;

    for d in &result.task_details {
        writer.write_record([
            d.task_ref.as_str(),
            d.kind.as_str(),
            d.from_bin.as_str(),
            d.to_bin.as_str(),
            d.product_code.as_str(),
            &format!("{}", d.qty),
            d.actual_worker.as_str(),
            d.optimized_worker.as_deref().unwrap_or(""),
            &format!("{:.1}", d.factual_duration_sec),
            &d.optimized_duration_sec
                .map(|s| format!("{s:.1}"))
                .unwrap_or_default(),
            d.source.as_str(),
        ])?;
    }

    writer.flush().context("flush report")?;
    Ok(())
}
