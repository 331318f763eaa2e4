use anyhow::Result;
use contracts::usecases::u601_reconcile::response::RunSummary;
use sea_orm::TransactionTrait;
use uuid::Uuid;

use super::{classifier, delta};
use crate::domain::a101_pos_order::repository as pos_orders;
use crate::domain::a102_threepo_order::repository as threepo_orders;
use crate::projections::p910_recon_ledger::projection_builder;
use crate::projections::p910_recon_ledger::repository as ledger;
use crate::shared::context::ReconContext;

/// Runs the five reconciliation passes against one context. Each pass is
/// independently callable and idempotent; `run` chains them in the usual
/// order.
pub struct ReconcileExecutor<'a> {
    ctx: &'a ReconContext,
}

impl<'a> ReconcileExecutor<'a> {
    pub fn new(ctx: &'a ReconContext) -> Self {
        Self { ctx }
    }

    pub async fn run(&self) -> Result<RunSummary> {
        let mut summary = RunSummary::new(Uuid::new_v4());
        tracing::info!(run_id = %summary.run_id, "reconciliation run started");

        self.run_pos_pass(&mut summary).await?;
        self.run_threepo_delivered_pass(&mut summary).await?;
        self.run_threepo_refund_pass(&mut summary).await?;
        self.run_delta_pass(&mut summary).await?;
        self.run_classify_pass(&mut summary).await?;

        tracing::info!(
            run_id = %summary.run_id,
            processed = summary.processed,
            created = summary.created,
            updated = summary.updated,
            errors = summary.errors,
            "reconciliation run finished"
        );
        Ok(summary)
    }

    /// Upsert a ledger entry per POS order.
    pub async fn run_pos_pass(&self, summary: &mut RunSummary) -> Result<()> {
        let mut offset = 0u64;
        loop {
            let page = pos_orders::fetch_page(&self.ctx.db, self.ctx.page_size, offset).await?;
            if page.is_empty() {
                break;
            }
            let fetched = page.len() as u64;
            summary.processed += page.len();

            let mut writes = Vec::new();
            for row in &page {
                match projection_builder::from_pos_order(&self.ctx.slabs, row) {
                    Ok(write) => writes.push(write),
                    Err(err) => {
                        tracing::warn!(order_id = %row.order_id, "skipping pos order: {err}");
                        summary.errors += 1;
                    }
                }
            }

            let order_ids: Vec<String> = writes
                .iter()
                .filter_map(|w| w.pos_order_id.clone())
                .collect();
            let mut resolved =
                ledger::find_ids_for_orders(&self.ctx.db, &order_ids, false).await?;

            let mut batch = Vec::with_capacity(writes.len());
            for write in writes {
                let order_id = write.pos_order_id.clone().unwrap_or_default();
                let existing = match resolved.remove(&order_id) {
                    Some(id) => Some(id),
                    None => ledger::find_by_threepo_order_id(&self.ctx.db, &order_id)
                        .await?
                        .map(|m| m.id),
                };
                batch.push((existing, write));
            }
            self.write_batch(batch, summary).await?;

            if fetched < self.ctx.page_size {
                break;
            }
            offset += fetched;
        }
        Ok(())
    }

    /// Upsert a ledger entry per delivered (sale/addition) 3PO order.
    pub async fn run_threepo_delivered_pass(&self, summary: &mut RunSummary) -> Result<()> {
        self.threepo_pass(false, summary).await
    }

    /// Upsert a refund ledger entry per refund 3PO order. Matching only
    /// considers existing refund entries, so a refund never lands on the
    /// delivered entry for the same order.
    pub async fn run_threepo_refund_pass(&self, summary: &mut RunSummary) -> Result<()> {
        self.threepo_pass(true, summary).await
    }

    async fn threepo_pass(&self, refund: bool, summary: &mut RunSummary) -> Result<()> {
        let mut offset = 0u64;
        loop {
            let page = if refund {
                threepo_orders::fetch_refund_page(&self.ctx.db, self.ctx.page_size, offset).await?
            } else {
                threepo_orders::fetch_delivered_page(&self.ctx.db, self.ctx.page_size, offset)
                    .await?
            };
            if page.is_empty() {
                break;
            }
            let fetched = page.len() as u64;
            summary.processed += page.len();

            let mut writes = Vec::new();
            for row in &page {
                let projected = if refund {
                    projection_builder::from_threepo_refund(&self.ctx.slabs, row)
                } else {
                    projection_builder::from_threepo_delivered(&self.ctx.slabs, row)
                };
                match projected {
                    Ok(write) => writes.push(write),
                    Err(err) => {
                        tracing::warn!(order_id = %row.order_id, "skipping 3po order: {err}");
                        summary.errors += 1;
                    }
                }
            }

            let order_ids: Vec<String> = writes
                .iter()
                .filter_map(|w| w.threepo_order_id.clone())
                .collect();
            let mut resolved =
                ledger::find_ids_for_orders(&self.ctx.db, &order_ids, refund).await?;

            let mut batch = Vec::with_capacity(writes.len());
            for write in writes {
                let order_id = write.threepo_order_id.clone().unwrap_or_default();
                let existing = match resolved.remove(&order_id) {
                    Some(id) => Some(id),
                    None => ledger::find_by_pos_order_id(&self.ctx.db, &order_id, refund)
                        .await?
                        .map(|m| m.id),
                };
                batch.push((existing, write));
            }
            self.write_batch(batch, summary).await?;

            if fetched < self.ctx.page_size {
                break;
            }
            offset += fetched;
        }
        Ok(())
    }

    /// Recompute the eight delta columns over the whole ledger.
    pub async fn run_delta_pass(&self, summary: &mut RunSummary) -> Result<()> {
        let mut offset = 0u64;
        loop {
            let page = ledger::scan_page(&self.ctx.db, self.ctx.page_size, offset).await?;
            if page.is_empty() {
                break;
            }
            let fetched = page.len() as u64;

            for chunk in page.chunks(self.ctx.sub_batch_size) {
                let txn = self.ctx.db.begin().await?;
                let mut committed_rows = 0usize;
                for row in chunk {
                    let deltas = delta::compute(row);
                    match ledger::update_deltas(&txn, &row.id, &deltas).await {
                        Ok(()) => committed_rows += 1,
                        Err(err) => {
                            tracing::warn!(ledger_id = %row.id, "delta update failed: {err:#}");
                            summary.errors += 1;
                        }
                    }
                }
                if let Err(err) = txn.commit().await {
                    tracing::error!("delta chunk commit failed: {err:#}");
                    summary.errors += committed_rows;
                }
            }

            if fetched < self.ctx.page_size {
                break;
            }
            offset += fetched;
        }
        Ok(())
    }

    /// Classify every ledger entry and write the outcome columns.
    pub async fn run_classify_pass(&self, summary: &mut RunSummary) -> Result<()> {
        let mut offset = 0u64;
        loop {
            let page = ledger::scan_page(&self.ctx.db, self.ctx.page_size, offset).await?;
            if page.is_empty() {
                break;
            }
            let fetched = page.len() as u64;

            for chunk in page.chunks(self.ctx.sub_batch_size) {
                let txn = self.ctx.db.begin().await?;
                let mut committed_rows = 0usize;
                for row in chunk {
                    let outcome = classifier::classify(row, self.ctx.tolerance);
                    let result = ledger::update_status(
                        &txn,
                        &row.id,
                        outcome.status.as_str(),
                        outcome.reconciled_amount,
                        outcome.unreconciled_amount,
                    )
                    .await;
                    match result {
                        Ok(()) => committed_rows += 1,
                        Err(err) => {
                            tracing::warn!(ledger_id = %row.id, "status update failed: {err:#}");
                            summary.errors += 1;
                        }
                    }
                }
                if let Err(err) = txn.commit().await {
                    tracing::error!("classify chunk commit failed: {err:#}");
                    summary.errors += committed_rows;
                }
            }

            if fetched < self.ctx.page_size {
                break;
            }
            offset += fetched;
        }
        Ok(())
    }

    /// Write one page's worth of entries in sub-batch transactions. A failed
    /// row is logged and counted without aborting its chunk; a failed commit
    /// voids the whole chunk's counts.
    async fn write_batch(
        &self,
        rows: Vec<(Option<String>, ledger::LedgerWrite)>,
        summary: &mut RunSummary,
    ) -> Result<()> {
        for chunk in rows.chunks(self.ctx.sub_batch_size) {
            let txn = self.ctx.db.begin().await?;
            let mut created = 0usize;
            let mut updated = 0usize;
            for (existing, write) in chunk {
                let outcome = match existing {
                    Some(ledger_id) => ledger::update_entry(&txn, ledger_id, write)
                        .await
                        .map(|_| false),
                    None => ledger::insert_entry(&txn, write).await.map(|_| true),
                };
                match outcome {
                    Ok(true) => created += 1,
                    Ok(false) => updated += 1,
                    Err(err) => {
                        tracing::warn!(ledger_id = %write.id, "ledger write failed: {err:#}");
                        summary.errors += 1;
                    }
                }
            }
            match txn.commit().await {
                Ok(()) => {
                    summary.created += created;
                    summary.updated += updated;
                }
                Err(err) => {
                    tracing::error!("ledger chunk commit failed: {err:#}");
                    summary.errors += created + updated;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::config::{Config, DatabaseConfig, PipelineConfig};
    use crate::shared::data::db;
    use contracts::domain::recon_ledger::ReconStatus;
    use sea_orm::{ActiveModelTrait, Set};

    async fn test_ctx() -> ReconContext {
        let path = std::env::temp_dir().join(format!("recon_exec_{}.db", Uuid::new_v4()));
        let conn = db::connect(path.to_str().unwrap()).await.unwrap();
        db::ensure_schema(&conn).await.unwrap();
        let config = Config {
            database: DatabaseConfig {
                path: path.to_string_lossy().to_string(),
            },
            pipeline: PipelineConfig::default(),
        };
        ReconContext::new(conn, &config).unwrap()
    }

    async fn seed_pos(ctx: &ReconContext, order_id: &str, net: f64) {
        pos_orders::ActiveModel {
            order_id: Set(order_id.to_string()),
            store_id: Set("S1".to_string()),
            order_date: Set("2024-01-15".to_string()),
            gross_amount: Set(net * 1.05),
            net_amount: Set(net),
            tax_amount: Set(None),
            discount_amount: Set(None),
            payment_tender: Set(Some("card".to_string())),
        }
        .insert(&ctx.db)
        .await
        .unwrap();
    }

    async fn seed_threepo(ctx: &ReconContext, order_id: &str, action: &str, bill: f64) {
        threepo_orders::ActiveModel {
            id: Set(format!("{}-{}", order_id, action)),
            order_id: Set(order_id.to_string()),
            store_id: Set("S1".to_string()),
            order_date: Set("2024-01-15".to_string()),
            action: Set(action.to_string()),
            bill_subtotal: Set(bill),
            merchant_violation_deduction: Set(0.0),
            merchant_packaging_charge: Set(0.0),
            tax_amount: Set(None),
            commission_amount: Set(None),
            pg_charge_amount: Set(None),
            final_amount: Set(None),
            credit_note_adjustment: Set(None),
            promo_recovery_adjustment: Set(None),
        }
        .insert(&ctx.db)
        .await
        .unwrap();
    }

    /// Timestamps aside, two runs over the same sources must leave identical
    /// rows.
    fn strip_timestamps(mut rows: Vec<ledger::Model>) -> Vec<ledger::Model> {
        for row in &mut rows {
            row.loaded_at_utc = String::new();
            row.updated_at_utc = String::new();
        }
        rows
    }

    #[tokio::test]
    async fn test_matching_orders_reconcile() {
        let ctx = test_ctx().await;
        seed_pos(&ctx, "P100", 1000.0).await;
        seed_threepo(&ctx, "P100", "sale", 1000.0).await;

        let summary = ReconcileExecutor::new(&ctx).run().await.unwrap();
        assert_eq!(summary.processed, 2);
        assert_eq!(summary.created, 1);
        assert_eq!(summary.updated, 1);
        assert_eq!(summary.errors, 0);

        let row = ledger::get_by_id(&ctx.db, "RLE_P100")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(row.pos_order_id.as_deref(), Some("P100"));
        assert_eq!(row.threepo_order_id.as_deref(), Some("P100"));
        assert_eq!(row.pos_commission_value, Some(127.50));
        assert_eq!(row.pos_final_amount, Some(834.92));
        assert_eq!(row.threepo_final_amount, Some(834.92));
        assert_eq!(row.pos_vs_threepo_net_delta, Some(0.0));
        assert_eq!(row.threepo_vs_pos_commission_delta, Some(0.0));
        assert_eq!(row.status, ReconStatus::Reconciled.as_str());
        assert_eq!(row.reconciled_amount, Some(834.92));
        assert_eq!(row.unreconciled_amount, None);
    }

    #[tokio::test]
    async fn test_second_run_changes_nothing() {
        let ctx = test_ctx().await;
        seed_pos(&ctx, "P1", 450.0).await;
        seed_pos(&ctx, "P2", 620.0).await;
        seed_threepo(&ctx, "P1", "sale", 450.0).await;
        seed_threepo(&ctx, "P3", "refund", 80.0).await;

        ReconcileExecutor::new(&ctx).run().await.unwrap();
        let first = strip_timestamps(ledger::scan_page(&ctx.db, 1000, 0).await.unwrap());

        ReconcileExecutor::new(&ctx).run().await.unwrap();
        let second = strip_timestamps(ledger::scan_page(&ctx.db, 1000, 0).await.unwrap());

        assert_eq!(first.len(), 3);
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_pass_order_does_not_change_the_outcome() {
        let ctx = test_ctx().await;
        seed_pos(&ctx, "P100", 1000.0).await;
        seed_threepo(&ctx, "P100", "sale", 1000.0).await;

        // 3PO first, then POS; the POS pass must find and enrich the entry
        // the 3PO pass created.
        let executor = ReconcileExecutor::new(&ctx);
        let mut summary = RunSummary::new(Uuid::new_v4());
        executor
            .run_threepo_delivered_pass(&mut summary)
            .await
            .unwrap();
        executor.run_pos_pass(&mut summary).await.unwrap();
        executor.run_delta_pass(&mut summary).await.unwrap();
        executor.run_classify_pass(&mut summary).await.unwrap();

        let rows = ledger::scan_page(&ctx.db, 1000, 0).await.unwrap();
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.id, "RLE_P100");
        assert!(row.pos_net_amount.is_some());
        assert!(row.threepo_net_amount.is_some());
        assert_eq!(row.status, ReconStatus::Reconciled.as_str());
    }

    #[tokio::test]
    async fn test_one_sided_pos_entry_is_unreconciled() {
        let ctx = test_ctx().await;
        seed_pos(&ctx, "P100", 1000.0).await;

        ReconcileExecutor::new(&ctx).run().await.unwrap();

        let row = ledger::get_by_id(&ctx.db, "RLE_P100")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(row.status, ReconStatus::Unreconciled.as_str());
        assert_eq!(row.reconciled_amount, None);
        assert_eq!(row.unreconciled_amount, Some(834.92));
    }

    #[tokio::test]
    async fn test_refund_keeps_its_own_entry() {
        let ctx = test_ctx().await;
        seed_pos(&ctx, "P100", 1000.0).await;
        seed_threepo(&ctx, "P100", "sale", 1000.0).await;
        seed_threepo(&ctx, "P100", "refund", 200.0).await;

        ReconcileExecutor::new(&ctx).run().await.unwrap();

        let delivered = ledger::get_by_id(&ctx.db, "RLE_P100")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(delivered.pos_order_id.as_deref(), Some("P100"));
        assert_eq!(delivered.threepo_order_id.as_deref(), Some("P100"));
        assert_eq!(delivered.threepo_net_amount, Some(1000.0));

        let refund = ledger::get_by_id(&ctx.db, "RLE_P100_REFUND")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(refund.order_action, "refund");
        assert_eq!(refund.pos_order_id, None);
        assert_eq!(refund.threepo_order_id.as_deref(), Some("P100"));
        assert_eq!(refund.threepo_net_amount, Some(200.0));
    }

    #[tokio::test]
    async fn test_late_sale_does_not_disturb_the_refund_entry() {
        let ctx = test_ctx().await;
        let executor = ReconcileExecutor::new(&ctx);
        let mut summary = RunSummary::new(Uuid::new_v4());

        // Refund arrives and is processed first.
        seed_threepo(&ctx, "X1", "refund", 200.0).await;
        executor.run_threepo_refund_pass(&mut summary).await.unwrap();

        // The sale shows up in a later batch; it must open its own entry,
        // not overwrite the refund's 3PO block.
        seed_threepo(&ctx, "X1", "sale", 1000.0).await;
        executor
            .run_threepo_delivered_pass(&mut summary)
            .await
            .unwrap();

        let refund = ledger::get_by_id(&ctx.db, "RLE_X1_REFUND")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(refund.threepo_net_amount, Some(200.0));

        let delivered = ledger::get_by_id(&ctx.db, "RLE_X1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(delivered.order_action, "delivered");
        assert_eq!(delivered.threepo_net_amount, Some(1000.0));
    }

    #[tokio::test]
    async fn test_pos_pass_targets_the_delivered_entry_when_both_exist() {
        let ctx = test_ctx().await;
        seed_pos(&ctx, "P100", 1000.0).await;
        seed_threepo(&ctx, "P100", "sale", 1000.0).await;
        seed_threepo(&ctx, "P100", "refund", 200.0).await;

        let executor = ReconcileExecutor::new(&ctx);
        executor.run().await.unwrap();

        // Re-running the POS pass with both entries in place must pick the
        // delivered entry again; the refund entry never gains a POS block.
        let mut summary = RunSummary::new(Uuid::new_v4());
        executor.run_pos_pass(&mut summary).await.unwrap();
        assert_eq!(summary.created, 0);
        assert_eq!(summary.updated, 1);

        let rows = ledger::scan_page(&ctx.db, 1000, 0).await.unwrap();
        assert_eq!(rows.len(), 2);

        let delivered = ledger::get_by_id(&ctx.db, "RLE_P100")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(delivered.pos_order_id.as_deref(), Some("P100"));

        let refund = ledger::get_by_id(&ctx.db, "RLE_P100_REFUND")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(refund.pos_order_id, None);
        assert_eq!(refund.pos_net_amount, None);
    }

    #[tokio::test]
    async fn test_malformed_row_is_counted_and_the_rest_still_lands() {
        let ctx = test_ctx().await;
        seed_pos(&ctx, "", 100.0).await;
        seed_pos(&ctx, "P1", 450.0).await;

        let summary = ReconcileExecutor::new(&ctx).run().await.unwrap();
        assert_eq!(summary.processed, 2);
        assert_eq!(summary.errors, 1);
        assert_eq!(summary.created, 1);

        let rows = ledger::scan_page(&ctx.db, 1000, 0).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, "RLE_P1");
    }
}
