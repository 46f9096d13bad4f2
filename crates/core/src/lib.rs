pub mod backend;
pub mod event;
pub mod frame;
pub mod initializer;
pub mod queue;
pub mod store;

pub use backend::{BackendError, EventStream, LiveBackend, LiveConnectRequest};
pub use event::BackendEvent;
pub use frame::{FrameKind, MediaFrame};
pub use initializer::{SessionConfig, SessionOptions};
pub use queue::{IngressQueue, IngressReceiver, QueueError};
pub use store::{SessionKey, SessionStore};
