//! Event bus contract for the onboarding services.
//!
//! Messages are `{event, data}` published to coarse topics (`payment`,
//! `subscription`, `vendor`, ...). Delivery is at-least-once and unordered
//! across topics, so every consumer must be idempotent or deduplicate by
//! business key ([`ProcessedKeys`]). Consumers dispatch on the event name,
//! case-insensitively, and ignore names they do not know.

pub mod bus;
pub mod dedupe;
pub mod error;
pub mod memory;
pub mod message;
pub mod retry;
pub mod topic;

pub use bus::{EventBus, EventBusExt, EventHandler};
pub use dedupe::ProcessedKeys;
pub use error::{BusError, HandlerError};
pub use memory::InMemoryEventBus;
pub use message::{
    BusMessage, OrderPlaced, PaymentCompleted, UserCreated, VendorActivated,
    VendorSubscriptionCreated, VendorSubscriptionPaid,
};
pub use retry::{RetryPolicy, Retrying};
pub use topic::{Topic, events};
