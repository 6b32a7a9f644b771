//! Write-once persistence of backtest runs.
//!
//! Four tables: the run header, per-day breakdowns, the decision log and
//! the fact/optimized Gantt rows. One transaction per run.

use sqlx::{Sqlite, SqlitePool, Transaction};

use waveback_core::error::{BacktestError, Result};
use waveback_core::{BacktestResult, DecisionRecord, ScheduleEvent};

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS backtest_runs (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        wave_number INTEGER NOT NULL,
        wave_date TEXT NOT NULL,
        buffer_capacity INTEGER NOT NULL,
        actual_active_sec REAL NOT NULL,
        optimized_sec REAL NOT NULL,
        improvement_percent REAL NOT NULL,
        original_days INTEGER NOT NULL,
        optimized_days INTEGER NOT NULL,
        days_saved INTEGER NOT NULL,
        total_groups INTEGER NOT NULL,
        assigned_groups INTEGER NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS backtest_day_breakdown (
        run_id INTEGER NOT NULL REFERENCES backtest_runs(id),
        day TEXT NOT NULL,
        virtual_day INTEGER NOT NULL,
        forklifts_active INTEGER NOT NULL,
        pickers_active INTEGER NOT NULL,
        actual_active_sec REAL NOT NULL,
        makespan_sec REAL NOT NULL,
        buffer_start INTEGER NOT NULL,
        buffer_end INTEGER NOT NULL,
        original_pallets INTEGER NOT NULL,
        optimized_pallets INTEGER NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS backtest_schedule_events (
        run_id INTEGER NOT NULL REFERENCES backtest_runs(id),
        timeline_type TEXT NOT NULL,
        day TEXT NOT NULL,
        worker_code TEXT NOT NULL,
        worker_name TEXT NOT NULL,
        task_ref TEXT NOT NULL,
        task_kind TEXT NOT NULL,
        from_bin TEXT NOT NULL,
        to_bin TEXT NOT NULL,
        product_code TEXT NOT NULL,
        start_at TEXT,
        end_at TEXT,
        start_offset_sec REAL,
        end_offset_sec REAL,
        duration_sec REAL NOT NULL,
        duration_source TEXT
    )",
    "CREATE TABLE IF NOT EXISTS backtest_decision_log (
        run_id INTEGER NOT NULL REFERENCES backtest_runs(id),
        seq INTEGER NOT NULL,
        day TEXT NOT NULL,
        virtual_day INTEGER NOT NULL,
        decision TEXT NOT NULL,
        worker_code TEXT,
        worker_remaining_sec REAL,
        task_ref TEXT,
        task_priority REAL,
        task_duration_sec REAL,
        task_weight_kg REAL,
        buffer_before INTEGER NOT NULL,
        buffer_after INTEGER NOT NULL,
        alt_workers_json TEXT NOT NULL,
        alt_tasks_json TEXT NOT NULL,
        active_constraint TEXT NOT NULL,
        reason TEXT NOT NULL
    )",
];

pub struct BacktestRunStore {
    pool: SqlitePool,
}

impl BacktestRunStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn ensure_schema(&self) -> Result<()> {
        for ddl in SCHEMA {
            sqlx::query(ddl)
                .execute(&self.pool)
                .await
                .map_err(BacktestError::transport)?;
        }
        Ok(())
    }

    /// Persist one run; returns the new run id.
    pub async fn persist(&self, result: &BacktestResult) -> Result<i64> {
        let mut tx = self.pool.begin().await.map_err(BacktestError::transport)?;

        let run_id: i64 = sqlx::query_scalar(
            "INSERT INTO backtest_runs (
                wave_number, wave_date, buffer_capacity,
                actual_active_sec, optimized_sec, improvement_percent,
                original_days, optimized_days, days_saved,
                total_groups, assigned_groups
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING id",
        )
        .bind(result.wave_number)
        .bind(result.wave_date.to_string())
        .bind(result.buffer_capacity as i64)
        .bind(result.actual_active_sec)
        .bind(result.optimized_sec)
        .bind(result.improvement_percent)
        .bind(result.original_days as i64)
        .bind(result.optimized_days as i64)
        .bind(result.days_saved as i64)
        .bind(result.total_groups as i64)
        .bind(result.assigned_groups as i64)
        .fetch_one(&mut *tx)
        .await
        .map_err(BacktestError::transport)?;

        for day in &result.days {
            sqlx::query(
                "INSERT INTO backtest_day_breakdown (
                    run_id, day, virtual_day, forklifts_active, pickers_active,
                    actual_active_sec, makespan_sec, buffer_start, buffer_end,
                    original_pallets, optimized_pallets
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(run_id)
            .bind(day.date.to_string())
            .bind(day.virtual_day)
            .bind(day.forklifts_active as i64)
            .bind(day.pickers_active as i64)
            .bind(day.actual_active_sec)
            .bind(day.makespan_sec)
            .bind(day.buffer_start as i64)
            .bind(day.buffer_end as i64)
            .bind(day.original_pallets as i64)
            .bind(day.optimized_pallets as i64)
            .execute(&mut *tx)
            .await
            .map_err(BacktestError::transport)?;
        }

        for event in &result.events {
            Self::insert_event(&mut tx, run_id, event).await?;
        }
        for decision in &result.decisions {
            Self::insert_decision(&mut tx, run_id, decision).await?;
        }

        tx.commit().await.map_err(BacktestError::transport)?;
        tracing::info!(run_id, wave = result.wave_number, "persisted backtest run");
        Ok(run_id)
    }

    async fn insert_event(
        tx: &mut Transaction<'_, Sqlite>,
        run_id: i64,
        event: &ScheduleEvent,
    ) -> Result<()> {
        sqlx::query(
            "INSERT INTO backtest_schedule_events (
                run_id, timeline_type, day, worker_code, worker_name, task_ref,
                task_kind, from_bin, to_bin, product_code,
                start_at, end_at, start_offset_sec, end_offset_sec,
                duration_sec, duration_source
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(run_id)
        .bind(event.timeline.as_str())
        .bind(event.day.to_string())
        .bind(&event.worker_code)
        .bind(&event.worker_name)
        .bind(&event.task_ref)
        .bind(event.kind.as_str())
        .bind(&event.from_bin)
        .bind(&event.to_bin)
        .bind(&event.product_code)
        .bind(event.start_at.map(|at| at.to_rfc3339()))
        .bind(event.end_at.map(|at| at.to_rfc3339()))
        .bind(event.start_offset_sec)
        .bind(event.end_offset_sec)
        .bind(event.duration_sec)
        .bind(event.source.map(|s| s.as_str()))
        .execute(&mut **tx)
        .await
        .map_err(BacktestError::transport)?;
        Ok(())
    }

    async fn insert_decision(
        tx: &mut Transaction<'_, Sqlite>,
        run_id: i64,
        decision: &DecisionRecord,
    ) -> Result<()> {
        let alt_workers_json =
            serde_json::to_string(&decision.alt_workers).map_err(BacktestError::transport)?;
        let alt_tasks_json =
            serde_json::to_string(&decision.alt_tasks).map_err(BacktestError::transport)?;

        sqlx::query(
            "INSERT INTO backtest_decision_log (
                run_id, seq, day, virtual_day, decision,
                worker_code, worker_remaining_sec,
                task_ref, task_priority, task_duration_sec, task_weight_kg,
                buffer_before, buffer_after,
                alt_workers_json, alt_tasks_json, active_constraint, reason
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(run_id)
        .bind(decision.seq as i64)
        .bind(decision.day.to_string())
        .bind(decision.virtual_day)
        .bind(decision.kind.as_str())
        .bind(decision.worker_code.as_deref())
        .bind(decision.worker_remaining_sec)
        .bind(decision.task_ref.as_deref())
        .bind(decision.task_priority)
        .bind(decision.task_duration_sec)
        .bind(decision.task_weight_kg)
        .bind(decision.buffer_before as i64)
        .bind(decision.buffer_after as i64)
        .bind(alt_workers_json)
        .bind(alt_tasks_json)
        .bind(decision.constraint.as_str())
        .bind(&decision.reason)
        .execute(&mut **tx)
        .await
        .map_err(BacktestError::transport)?;
        Ok(())
    }
}
