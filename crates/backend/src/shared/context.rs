use anyhow::Context as _;
use rust_decimal::Decimal;
use sea_orm::DatabaseConnection;

use crate::shared::config::Config;
use crate::usecases::u601_reconcile::financial_model::{default_slab_table, CommissionSlab};

/// Everything a pipeline stage needs: the store connection, the commission
/// slab table and the batch settings. Stages never reach for shared module
/// state; they get one of these.
pub struct ReconContext {
    pub db: DatabaseConnection,
    pub slabs: Vec<CommissionSlab>,
    pub page_size: u64,
    pub sub_batch_size: usize,
    pub tolerance: Decimal,
}

impl ReconContext {
    pub fn new(db: DatabaseConnection, config: &Config) -> anyhow::Result<Self> {
        let tolerance = Decimal::try_from(config.pipeline.tolerance)
            .context("pipeline.tolerance is not a valid decimal")?;
        Ok(Self {
            db,
            slabs: default_slab_table(),
            page_size: config.pipeline.page_size,
            sub_batch_size: config.pipeline.sub_batch_size,
            tolerance,
        })
    }
}
