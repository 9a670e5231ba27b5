pub mod atomic;
pub mod dataset_file;
pub mod ledger;
