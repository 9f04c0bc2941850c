//! HTTP transport for the dashboard backend.

pub mod client;

pub use client::DashboardHttp;
