use anyhow::Result;
use sea_orm::entity::prelude::*;
use sea_orm::{ConnectionTrait, EntityTrait, QueryOrder, QuerySelect};
use serde::{Deserialize, Serialize};

/// POS order row. Written by the upstream ingestion process; read-only here.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "a101_pos_order")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub order_id: String,
    pub store_id: String,
    pub order_date: String,
    pub gross_amount: f64,
    /// Post-discount base used for all downstream math.
    pub net_amount: f64,
    #[sea_orm(nullable)]
    pub tax_amount: Option<f64>,
    #[sea_orm(nullable)]
    pub discount_amount: Option<f64>,
    #[sea_orm(nullable)]
    pub payment_tender: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// Fetch one page ordered by order_id ascending. An empty page means the
/// source is exhausted.
pub async fn fetch_page<C: ConnectionTrait>(
    conn: &C,
    page_size: u64,
    offset: u64,
) -> Result<Vec<Model>> {
    let items = Entity::find()
        .order_by_asc(Column::OrderId)
        .limit(page_size)
        .offset(offset)
        .all(conn)
        .await?;
    Ok(items)
}
