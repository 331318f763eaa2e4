pub mod p910_recon_ledger;
