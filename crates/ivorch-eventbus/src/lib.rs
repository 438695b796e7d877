pub mod bridge;
pub mod bus;
pub mod event;
pub mod writer;

pub use bridge::SubprocessBridge;
pub use bus::EventBus;
pub use event::{EventEnvelope, EventKind, Producer};
pub use writer::EventLogWriter;
