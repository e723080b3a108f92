//! Notion import: OAuth connection and page text as uploads

pub mod client;
pub mod routes;

pub use client::NotionClient;
