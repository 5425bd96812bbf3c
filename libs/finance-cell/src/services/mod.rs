pub mod export;
pub mod ledger;

pub use ledger::LedgerService;
