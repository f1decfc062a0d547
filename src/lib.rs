pub mod bot;
pub mod config;
pub mod dispatch;
pub mod domain;
pub mod engine;
pub mod error;
pub mod jupiter;
pub mod messages;
pub mod monitoring;
pub mod notifier;
pub mod pacing;
pub mod submitter;
pub mod telegram;
pub mod wallet;
