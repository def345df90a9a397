//! Topic hub for Pairlink.
//!
//! A connection binds itself to a session by subscribing one of its
//! channels to a session topic. Whatever gets published on that topic is
//! then delivered to every subscribed channel.
//!
//! # Key types
//!
//! - [`PubSub`]: the hub: subscribe, unsubscribe, publish
//!
//! Sinks are plain `tokio::sync::mpsc::Sender`s. The hub never creates or
//! closes them; it only holds clones while they are subscribed.

mod hub;

pub use hub::PubSub;
