//! cardwise-store: wallet persistence, statement import and ledger export

pub mod export;
pub mod seed;
pub mod snapshot;
pub mod statement;

pub use export::export_history_csv;
pub use seed::demo_wallet;
pub use snapshot::{cardwise_home, ensure_cardwise_home, load_wallet, save_wallet, wallet_path};
pub use statement::{StatementRow, parse_statement_csv, read_statement};
