mod accumulator;
mod filler;
mod loop_;
mod reconnect;
pub mod speech;

pub use accumulator::{CommittedUtterance, UtteranceAccumulator};
pub use loop_::{new_nudge_queue, ConversationLoop, ConversationOutcome, NudgeQueue, PendingNudge};
pub use reconnect::ReconnectPolicy;
