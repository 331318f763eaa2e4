pub mod recon_ledger;
