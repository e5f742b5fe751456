pub mod api;
pub mod cache;
pub mod client;
pub mod config;
pub mod debounce;
pub mod error;
pub mod evolution;
pub mod favorites;
pub mod filter;
pub mod http;
pub mod name_index;
pub mod normalize;
pub mod pagination;
pub mod pokemon;
pub mod store;

#[cfg(test)]
mod testing;

pub use config::*;
pub use error::{AppError, Result};
pub use pokemon::*;
pub use store::{PokemonDetail, PokemonStore, StoreSettings, StoreSnapshot};
