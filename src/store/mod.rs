pub mod file_store;
pub mod token_pair;
pub mod token_store;

pub use file_store::FileTokenStore;
pub use token_pair::TokenPair;
pub use token_store::{build_token_store, MemoryTokenStore, NoopTokenStore, TokenStore};
