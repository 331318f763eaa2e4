pub mod a101_pos_order;
pub mod a102_threepo_order;
pub mod a103_bank_receipt;
