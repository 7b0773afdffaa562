//! Wire-format building blocks for rircd.
//!
//! This crate carries everything that deals with the IRC byte protocol
//! itself, independent of the server's actors: CRLF line framing over a raw
//! byte stream, nickname and room-name validation, and the shaping rules for
//! server-originated reply lines.

pub mod line;
pub mod nick;
pub mod reply;
pub mod room;

pub use line::LineBuffer;
pub use nick::is_valid_nickname;
pub use room::sanitize_room_name;
