use anyhow::Result;
use sea_orm::entity::prelude::*;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder};
use serde::{Deserialize, Serialize};

/// Settlement entry from the bank feed. Multiple rows may reference the same
/// bank transfer; `reference_number` is the de-duplication key.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "a103_bank_receipt")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub order_date: String,
    pub store_id: String,
    pub final_amount: f64,
    pub deposit_amount: f64,
    pub reference_number: String,
    #[sea_orm(nullable)]
    pub payment_tender: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// Receipts for an inclusive date range; empty store set means all stores.
pub async fn list_in_scope<C: ConnectionTrait>(
    conn: &C,
    date_from: &str,
    date_to: &str,
    store_ids: &[String],
) -> Result<Vec<Model>> {
    let mut query = Entity::find()
        .filter(Column::OrderDate.gte(date_from.to_string()))
        .filter(Column::OrderDate.lte(date_to.to_string()));

    if !store_ids.is_empty() {
        query = query.filter(Column::StoreId.is_in(store_ids.to_vec()));
    }

    let items = query.order_by_asc(Column::Id).all(conn).await?;
    Ok(items)
}
