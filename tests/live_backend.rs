//! Live Backend Tests
//!
//! These tests talk to a running dashboard backend. They are ignored by
//! default.
//!
//! Environment (a `.env` file is honoured):
//! - `DASHBOARD_API_URL` (default `http://localhost:8000`)
//! - `DASHBOARD_EMAIL` (default `trader@example.com`)
//!
//! Run: cargo test --test live_backend -- --nocapture --ignored

#![cfg(feature = "http")]

use std::env;

use dashsync::prelude::*;

fn client() -> DashboardClient {
    dotenvy::dotenv().ok();
    let url = env::var("DASHBOARD_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());
    DashboardClient::builder()
        .base_url(&url)
        .build()
        .expect("client should build")
}

fn email() -> String {
    env::var("DASHBOARD_EMAIL").unwrap_or_else(|_| "trader@example.com".to_string())
}

#[tokio::test]
#[ignore]
async fn test_ticker() {
    let client = client();
    let points = client.prices().get().await.expect("ticker fetch");
    println!("ticker: {} symbols", points.len());
    for p in &points {
        println!("  {} {} ({}%)", p.symbol, p.price, p.change_percent_24h);
    }
    assert!(!points.is_empty());
}

#[tokio::test]
#[ignore]
async fn test_notifications() {
    let client = client();
    client.sign_in(&email(), "client").await;
    let list = client.notifications().fetch().await.expect("notifications fetch");
    println!("notifications: {} ({} unread)", list.len(), list.iter().filter(|n| !n.read).count());
}

#[tokio::test]
#[ignore]
async fn test_history_first_page() {
    let client = client();
    client.sign_in(&email(), "client").await;
    let cursor = client.history().cursor().await.expect("history page 1");
    let page = cursor.page().expect("page loaded");
    println!(
        "history page {}: {} records, next={:?}",
        page.cursor,
        page.len(),
        page.next_cursor
    );
}

#[tokio::test]
#[ignore]
async fn test_role() {
    let client = client();
    client.sign_in(&email(), "client").await;
    let role = client.roles().current().await.expect("role lookup");
    println!("role for {}: {:?}", role.email, role.role);
}
