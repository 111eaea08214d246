pub mod channels;
pub mod events;
pub mod router;

pub use channels::message_channels;
pub use events::{PresenceEvent, ReadReceiptEvent, SendFailureEvent, TypingEvent};
pub use router::{ChannelTransport, DeliveryOutcome, DeliveryRouter, RedisTransport};
