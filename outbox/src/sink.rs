use async_trait::async_trait;
use lapin::options::{BasicPublishOptions, ConfirmSelectOptions};
use lapin::{BasicProperties, Channel, Connection, ConnectionProperties};

use crate::error::SinkError;

/// Where the flusher hands off a published message. The broker itself is
/// out of scope; this is the seam the flusher depends on so it can be
/// tested without one.
#[async_trait]
pub trait BrokerSink: Send + Sync {
    async fn publish(&self, exchange: &str, routing_key: &str, payload: &[u8]) -> Result<(), SinkError>;
}

/// `BrokerSink` backed by a real AMQP 0.9.1 broker via `lapin`. Uses
/// publisher confirms so a successful `publish` call means the broker has
/// actually accepted the message, not just that it was written to the
/// socket.
pub struct LapinSink {
    channel: Channel,
}

impl LapinSink {
    pub async fn connect(amqp_url: &str) -> Result<Self, SinkError> {
        let connection = Connection::connect(amqp_url, ConnectionProperties::default()).await?;
        let channel = connection.create_channel().await?;
        channel
            .confirm_select(ConfirmSelectOptions::default())
            .await?;
        Ok(Self { channel })
    }
}

#[async_trait]
impl BrokerSink for LapinSink {
    async fn publish(&self, exchange: &str, routing_key: &str, payload: &[u8]) -> Result<(), SinkError> {
        let confirm = self
            .channel
            .basic_publish(
                exchange,
                routing_key,
                BasicPublishOptions::default(),
                payload,
                BasicProperties::default().with_delivery_mode(2),
            )
            .await?
            .await?;
        if confirm.is_nack() {
            return Err(SinkError::Publish(format!(
                "broker nacked publish to {exchange}/{routing_key}"
            )));
        }
        Ok(())
    }
}
