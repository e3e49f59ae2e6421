//! Lark/Feishu open-platform client and the booking backend built on it.

pub mod backend;
pub mod bitable;
pub mod calendar;
pub mod client;
pub mod tables;

pub use backend::LarkBackend;
pub use client::LarkClient;
