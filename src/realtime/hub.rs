use crate::realtime::{BROADCAST_CHANNEL_CAPACITY, RealtimeEvent};
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::sync::broadcast::{Receiver, Sender};
use tracing::{debug, info, instrument};

/// In-process pub/sub: one broadcast channel per named topic.
pub struct RealtimeHub {
    /// Sender half of every channel that has (or had) a subscriber
    channels: DashMap<String, Sender<Arc<RealtimeEvent>>>,
}

impl Default for RealtimeHub {
    fn default() -> Self {
        Self::new()
    }
}

impl RealtimeHub {
    pub fn new() -> Self {
        RealtimeHub {
            channels: DashMap::new(),
        }
    }

    #[instrument(skip(self))]
    pub fn subscribe(&self, channel: &str) -> Receiver<Arc<RealtimeEvent>> {
        // entry() holds the shard lock, two first subscribers cannot race
        self.channels
            .entry(channel.to_string())
            .or_insert_with(|| {
                info!("Creating broadcast channel");
                broadcast::channel::<Arc<RealtimeEvent>>(BROADCAST_CHANNEL_CAPACITY).0
            })
            .subscribe()
    }

    /// Delivers `event` to the current subscribers of `channel` and returns
    /// how many there were. A channel nobody listens to any more is dropped.
    #[instrument(skip(self, event), fields(event = %event.kind))]
    pub fn publish(&self, channel: &str, event: Arc<RealtimeEvent>) -> usize {
        let Some(sender) = self.channels.get(channel) else {
            debug!("No subscribers on channel");
            return 0;
        };
        match sender.send(event) {
            Ok(receivers) => {
                debug!(receivers, "Event broadcast");
                receivers
            }
            Err(_) => {
                drop(sender); // release the shard lock before removing
                self.channels
                    .remove_if(channel, |_, tx| tx.receiver_count() == 0);
                debug!("Dropped channel without receivers");
                0
            }
        }
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }
}
