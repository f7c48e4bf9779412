pub mod car;
pub mod client;
pub mod consumers;
pub mod records;
pub mod wire;

pub use client::FirehoseClient;
