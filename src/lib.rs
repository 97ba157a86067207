//! Telegram bot that reports new GitHub activity of a tracked account.
pub mod clock;
pub mod config;
pub mod fetcher;
pub mod gateway;
pub mod github;
pub mod handlers;
pub mod model;
pub mod registry;
pub mod report;
pub mod scheduler;

#[cfg(test)]
mod testing;
