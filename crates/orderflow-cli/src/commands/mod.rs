pub mod migrate;
pub mod order;
pub mod server;
