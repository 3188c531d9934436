//! Environment configuration for the three push subscriptions this
//! service reads from (spec §6's routing table destinations).

use consumer_framework::ConsumerConfig;

pub struct OrderConsumerConfig {
    pub orders: ConsumerConfig,
    pub billing: ConsumerConfig,
    pub notifications: ConsumerConfig,
}

impl OrderConsumerConfig {
    pub fn from_env() -> Result<Self, String> {
        Ok(Self {
            orders: ConsumerConfig::from_env("order-consumer", "orders")?,
            billing: ConsumerConfig::from_env("order-consumer", "billing")?,
            notifications: ConsumerConfig::from_env("order-consumer", "notifications")?,
        })
    }
}
