pub mod app;
pub mod archive;
pub mod batch;
pub mod catalog;
pub mod config;
pub mod domain;
pub mod error;
pub mod output;
pub mod pool;
pub mod writer;
