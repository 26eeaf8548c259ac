//! rollcall attendance service.
//!
//! Serves attendance reports over HTTP and turns newly recorded attendance
//! entries on the store's change feed into push notifications.

pub mod api;
pub mod config;
pub mod db;
pub mod feed;
pub mod notify;
pub mod reports;
pub mod state;
