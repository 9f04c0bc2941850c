//! Domain modules organized as vertical slices.
//!
//! Each sub-module contains (as needed):
//! - `mod.rs`: Rich domain types and their `Decode` impls
//! - `wire.rs`: Raw serde structs matching backend responses
//! - `convert.rs`: `TryFrom`/`From` conversions with validation
//! - `state.rs` / `feed.rs`: Local state with optimistic update logic
//! - `client.rs`: Sub-client wiring the domain into the shared caches

pub mod history;
pub mod notification;
pub mod price;
pub mod role;
pub mod strategy;
