//! Real-time relay between backend event producers and a connected client
//!
//! - `RelayChannel` - outbound FIFO plus inbound control-frame pump
//! - `ConnectionRegistry` - at most one live `Connection` per session
//! - `ClientMessage` / `ClientFrame` - the JSON wire shapes

mod channel;
pub mod messages;
mod registry;

pub use channel::RelayChannel;
pub use messages::{ClientFrame, ClientMessage};
pub use registry::{Connection, ConnectionRegistry, ConnectionState, ConnectionStatus};
