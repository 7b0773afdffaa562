//! rircd - a minimalistic IRC daemon.
//!
//! Three actor types cooperate through typed event channels:
//!
//! ```text
//! ┌────────────┐              ┌──────────────┐            ┌────────────────┐
//! │ Reader (N) │─ClientEvent─▶│ Daemon (1)   │─ClientEvent▶│ Room (per room)│
//! │ owns socket│              │ owns clients │            │ owns members,  │
//! │ read half  │              │ and rooms    │            │ topic, key     │
//! └────────────┘              └──────────────┘            └────────────────┘
//!                                     │                           │
//!                                     └────────┬──────────────────┘
//!                                        LogEvent / StateEvent
//!                                     ┌─────────────────────┐
//!                                     │ Logger / StateKeeper│
//!                                     └─────────────────────┘
//! ```
//!
//! Every channel has exactly one consumer, so all mutation of shared maps is
//! single-writer by construction. Socket writes from any actor go through
//! the target client's writer task, one complete line at a time.

pub mod client;
pub mod config;
pub mod daemon;
pub mod events;
pub mod network;
pub mod room;
pub mod sinks;
