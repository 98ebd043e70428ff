//! Core modules: the todo record, view filters, storage and shared helpers.

pub mod broker;
pub mod config;
pub mod db;
pub mod error;
pub mod output;
pub mod schemas;
pub mod store;
pub mod time;
pub mod todo;
pub mod view;
