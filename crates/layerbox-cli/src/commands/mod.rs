pub mod resolve;
pub mod store;
