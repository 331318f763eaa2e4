pub mod u601_reconcile;
pub mod u602_receivables_report;
