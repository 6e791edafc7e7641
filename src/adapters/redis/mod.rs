//! Redis adapters.

mod broker;

pub use broker::RedisStreamBroker;
