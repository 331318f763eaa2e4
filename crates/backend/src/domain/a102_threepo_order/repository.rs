use anyhow::Result;
use sea_orm::entity::prelude::*;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, QuerySelect};
use serde::{Deserialize, Serialize};

/// Third-party-aggregator order row. `sale` and `addition` actions together
/// make up delivered volume; `refund` rows are processed as a distinct pass.
/// The feed can carry several rows per order (a sale plus its refund), so
/// rows are keyed by a feed-assigned row id and `order_id` is an ordinary
/// column. The optional tax/commission/PG/final fields carry the aggregator's
/// own authoritative figures and are used verbatim when present.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "a102_threepo_order")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub order_id: String,
    pub store_id: String,
    pub order_date: String,
    pub action: String,
    pub bill_subtotal: f64,
    pub merchant_violation_deduction: f64,
    pub merchant_packaging_charge: f64,
    #[sea_orm(nullable)]
    pub tax_amount: Option<f64>,
    #[sea_orm(nullable)]
    pub commission_amount: Option<f64>,
    #[sea_orm(nullable)]
    pub pg_charge_amount: Option<f64>,
    #[sea_orm(nullable)]
    pub final_amount: Option<f64>,
    #[sea_orm(nullable)]
    pub credit_note_adjustment: Option<f64>,
    #[sea_orm(nullable)]
    pub promo_recovery_adjustment: Option<f64>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// Fetch one page of delivered (sale + addition) rows, row id ascending.
pub async fn fetch_delivered_page<C: ConnectionTrait>(
    conn: &C,
    page_size: u64,
    offset: u64,
) -> Result<Vec<Model>> {
    let items = Entity::find()
        .filter(Column::Action.is_in(["sale", "addition"]))
        .order_by_asc(Column::Id)
        .limit(page_size)
        .offset(offset)
        .all(conn)
        .await?;
    Ok(items)
}

/// Fetch one page of refund rows, row id ascending.
pub async fn fetch_refund_page<C: ConnectionTrait>(
    conn: &C,
    page_size: u64,
    offset: u64,
) -> Result<Vec<Model>> {
    let items = Entity::find()
        .filter(Column::Action.eq("refund"))
        .order_by_asc(Column::Id)
        .limit(page_size)
        .offset(offset)
        .all(conn)
        .await?;
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::data::db;
    use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};

    async fn test_conn() -> DatabaseConnection {
        let path = std::env::temp_dir().join(format!("recon_a102_{}.db", uuid::Uuid::new_v4()));
        let conn = db::connect(path.to_str().unwrap()).await.unwrap();
        db::ensure_schema(&conn).await.unwrap();
        conn
    }

    async fn seed(conn: &DatabaseConnection, id: &str, order_id: &str, action: &str, bill: f64) {
        ActiveModel {
            id: Set(id.to_string()),
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
        .insert(conn)
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_sale_and_refund_rows_coexist_for_one_order() {
        let conn = test_conn().await;
        seed(&conn, "F1", "X1", "sale", 1000.0).await;
        seed(&conn, "F2", "X1", "refund", 200.0).await;

        let delivered = fetch_delivered_page(&conn, 10, 0).await.unwrap();
        assert_eq!(delivered.len(), 1);
        assert_eq!(delivered[0].order_id, "X1");
        assert_eq!(delivered[0].bill_subtotal, 1000.0);

        let refunds = fetch_refund_page(&conn, 10, 0).await.unwrap();
        assert_eq!(refunds.len(), 1);
        assert_eq!(refunds[0].order_id, "X1");
        assert_eq!(refunds[0].bill_subtotal, 200.0);
    }
}
