use crate::models::{RecordSet, SALES_COLUMNS, sales_schema};
use chrono::{DateTime, Utc};
use common::Result;
use datafusion::common::Column;
use datafusion::datasource::MemTable;
use datafusion::logical_expr::{Expr, SortExpr};
use datafusion::prelude::*;
use std::sync::Arc;
use tracing::info;

pub struct DedupHandler {
    ctx: SessionContext,
}

impl DedupHandler {
    pub fn new(ctx: SessionContext) -> Self {
        Self { ctx }
    }

    /// Concatenates `incoming` with `history` and drops rows equal in all
    /// seven columns. The result is sorted by the columns in order.
    ///
    /// Without history the incoming rows are returned as they are.
    pub async fn merge_and_dedup(
        &self,
        incoming: RecordSet,
        history: Option<RecordSet>,
    ) -> Result<(RecordSet, DedupMetrics)> {
        let start_time = Utc::now();
        let incoming_records = incoming.num_rows();

        let Some(history) = history else {
            let metrics = DedupMetrics {
                incoming_records,
                history_records: 0,
                total_records: incoming_records,
                duplicate_count: 0,
                unique_count: incoming_records,
                processing_time_ms: (Utc::now() - start_time).num_milliseconds(),
                processed_at: Utc::now(),
            };
            return Ok((incoming, metrics));
        };

        let history_records = history.num_rows();
        let total_records = incoming_records + history_records;

        let merged = self
            .read_records(incoming)?
            .union(self.read_records(history)?)?
            .distinct()?
            .sort(sort_by_all_columns())?;

        let batches = merged.collect().await?;
        let deduped = RecordSet::new(batches);
        let unique_count = deduped.num_rows();

        let metrics = DedupMetrics {
            incoming_records,
            history_records,
            total_records,
            duplicate_count: total_records - unique_count,
            unique_count,
            processing_time_ms: (Utc::now() - start_time).num_milliseconds(),
            processed_at: Utc::now(),
        };

        Ok((deduped, metrics))
    }

    fn read_records(&self, records: RecordSet) -> Result<DataFrame> {
        let table = MemTable::try_new(sales_schema(), vec![records.into_batches()])?;
        Ok(self.ctx.read_table(Arc::new(table))?)
    }

    pub fn log_metrics(&self, metrics: &DedupMetrics) {
        let duplicate_pct = if metrics.total_records == 0 {
            0.0
        } else {
            (metrics.duplicate_count as f64 / metrics.total_records as f64) * 100.0
        };

        info!(
            incoming = metrics.incoming_records,
            history = metrics.history_records,
            total = metrics.total_records,
            duplicates = metrics.duplicate_count,
            unique = metrics.unique_count,
            duplicate_pct = %format!("{:.2}", duplicate_pct),
            elapsed_ms = metrics.processing_time_ms,
            processed_at = %metrics.processed_at.format("%Y-%m-%d %H:%M:%S"),
            "Deduplication results"
        );
    }
}

// `Column::from_name` keeps names like "Invoice ID" intact; `col()` would parse them.
fn sort_by_all_columns() -> Vec<SortExpr> {
    SALES_COLUMNS
        .iter()
        .map(|name| Expr::Column(Column::from_name(*name)).sort(true, false))
        .collect()
}

#[derive(Debug, Clone)]
pub struct DedupMetrics {
    pub incoming_records: usize,
    pub history_records: usize,
    pub total_records: usize,
    pub duplicate_count: usize,
    pub unique_count: usize,
    pub processing_time_ms: i64,
    pub processed_at: DateTime<Utc>,
}
