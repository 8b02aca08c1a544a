//! Wire protocol for pomosync: JSON over a persistent WebSocket.
//!
//! Every frame is a tagged union over `"type"`. Simple commands carry their
//! fields at the top level; state snapshots nest under `"data"`.

pub mod message;

pub use message::*;
