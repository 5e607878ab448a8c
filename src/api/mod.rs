//! HTTP access to the PDF merge service.

mod client;

pub use client::MergeClient;
