//! Environment configuration for the two media push consumers.

use consumer_framework::ConsumerConfig;

pub struct MediaConsumerConfig {
    pub finalize: ConsumerConfig,
    pub delete: ConsumerConfig,
}

impl MediaConsumerConfig {
    pub fn from_env() -> Result<Self, String> {
        let finalize_topic =
            std::env::var("MEDIA_FINALIZE_TOPIC").unwrap_or_else(|_| "media-finalize-events".to_string());
        let delete_topic = std::env::var("MEDIA_DELETE_TOPIC").unwrap_or_else(|_| "media-delete-events".to_string());

        Ok(Self {
            finalize: ConsumerConfig::from_env("media-consumer-finalize", &finalize_topic)?,
            delete: ConsumerConfig::from_env("media-consumer-delete", &delete_topic)?,
        })
    }
}
