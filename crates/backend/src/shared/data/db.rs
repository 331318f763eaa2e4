use sea_orm::{ConnectionTrait, Database, DatabaseBackend, DatabaseConnection, Statement};

/// Open the SQLite database, creating the file (and parent directories) on
/// first use. `":memory:"` is accepted for tests.
pub async fn connect(db_path: &str) -> anyhow::Result<DatabaseConnection> {
    if db_path == ":memory:" {
        let conn = Database::connect("sqlite::memory:").await?;
        return Ok(conn);
    }

    if let Some(parent) = std::path::Path::new(db_path).parent() {
        std::fs::create_dir_all(parent)?;
    }
    let absolute_path = if std::path::Path::new(db_path).is_absolute() {
        std::path::PathBuf::from(db_path)
    } else {
        std::env::current_dir()?.join(db_path)
    };
    // Normalize path separators and ensure proper URL form on Windows
    let normalized = absolute_path.to_string_lossy().replace('\\', "/");
    let needs_leading_slash = !normalized.starts_with('/') && normalized.contains(':');
    let prefix = if needs_leading_slash { "/" } else { "" };
    let db_url = format!("sqlite://{}{}?mode=rwc", prefix, normalized);
    let conn = Database::connect(&db_url).await?;
    Ok(conn)
}

/// Minimal schema bootstrap: create the source, receipt and ledger tables when
/// they do not exist yet. Safe to call on every start.
pub async fn ensure_schema(conn: &DatabaseConnection) -> anyhow::Result<()> {
    for (table, ddl) in TABLES {
        let check = format!(
            "SELECT name FROM sqlite_master WHERE type='table' AND name='{}';",
            table
        );
        let existing = conn
            .query_all(Statement::from_string(DatabaseBackend::Sqlite, check))
            .await?;
        if existing.is_empty() {
            tracing::info!("Creating table {}", table);
            conn.execute(Statement::from_string(
                DatabaseBackend::Sqlite,
                ddl.to_string(),
            ))
            .await?;
        }
    }
    Ok(())
}

const TABLES: &[(&str, &str)] = &[
    (
        "a101_pos_order",
        r#"
        CREATE TABLE a101_pos_order (
            order_id TEXT PRIMARY KEY NOT NULL,
            store_id TEXT NOT NULL,
            order_date TEXT NOT NULL,
            gross_amount REAL NOT NULL,
            net_amount REAL NOT NULL,
            tax_amount REAL,
            discount_amount REAL,
            payment_tender TEXT
        );
    "#,
    ),
    (
        "a102_threepo_order",
        r#"
        CREATE TABLE a102_threepo_order (
            id TEXT PRIMARY KEY NOT NULL,
            order_id TEXT NOT NULL,
            store_id TEXT NOT NULL,
            order_date TEXT NOT NULL,
            action TEXT NOT NULL,
            bill_subtotal REAL NOT NULL,
            merchant_violation_deduction REAL NOT NULL DEFAULT 0,
            merchant_packaging_charge REAL NOT NULL DEFAULT 0,
            tax_amount REAL,
            commission_amount REAL,
            pg_charge_amount REAL,
            final_amount REAL,
            credit_note_adjustment REAL,
            promo_recovery_adjustment REAL
        );
    "#,
    ),
    (
        "a103_bank_receipt",
        r#"
        CREATE TABLE a103_bank_receipt (
            id TEXT PRIMARY KEY NOT NULL,
            order_date TEXT NOT NULL,
            store_id TEXT NOT NULL,
            final_amount REAL NOT NULL,
            deposit_amount REAL NOT NULL,
            reference_number TEXT NOT NULL,
            payment_tender TEXT
        );
    "#,
    ),
    (
        "p910_recon_ledger",
        r#"
        CREATE TABLE p910_recon_ledger (
            id TEXT PRIMARY KEY NOT NULL,
            pos_order_id TEXT,
            threepo_order_id TEXT,
            store_id TEXT NOT NULL,
            order_date TEXT NOT NULL,
            order_action TEXT NOT NULL,
            payment_tender TEXT,
            pos_net_amount REAL,
            pos_tax_paid_by_customer REAL,
            pos_commission_value REAL,
            pos_pg_charge REAL,
            pos_fee REAL,
            pos_tds_amount REAL,
            pos_final_amount REAL,
            threepo_net_amount REAL,
            threepo_tax_paid_by_customer REAL,
            threepo_commission_value REAL,
            threepo_pg_charge REAL,
            threepo_fee REAL,
            threepo_tds_amount REAL,
            threepo_final_amount REAL,
            threepo_calc_tax_paid_by_customer REAL,
            threepo_calc_commission_value REAL,
            threepo_calc_pg_charge REAL,
            threepo_calc_final_amount REAL,
            threepo_violation_deduction REAL,
            threepo_packaging_charge REAL,
            threepo_credit_note_adjustment REAL,
            threepo_promo_recovery_adjustment REAL,
            pos_vs_threepo_net_delta REAL,
            pos_vs_threepo_tax_delta REAL,
            pos_vs_threepo_commission_delta REAL,
            pos_vs_threepo_pg_charge_delta REAL,
            threepo_vs_pos_net_delta REAL,
            threepo_vs_pos_tax_delta REAL,
            threepo_vs_pos_commission_delta REAL,
            threepo_vs_pos_pg_charge_delta REAL,
            status TEXT NOT NULL DEFAULT 'PENDING',
            reconciled_amount REAL,
            unreconciled_amount REAL,
            loaded_at_utc TEXT NOT NULL,
            updated_at_utc TEXT NOT NULL
        );
    "#,
    ),
];
