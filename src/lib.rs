pub mod cli;
pub mod client;
pub mod core;
pub mod parser;
pub mod protocol;
pub mod storage;
