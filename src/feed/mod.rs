pub mod client;
pub mod provider;
pub mod table;

pub use client::NbaClient;
pub use provider::StatsFeed;
pub use table::{StatsTable, TableRow};
