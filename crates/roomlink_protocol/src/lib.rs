//! # Roomlink Protocol
//!
//! Wire types and JSON codecs for the roomlink client.
//!
//! This crate provides:
//! - Login request/response bodies
//! - The `/sync` response shape (joined/invited/left room sections)
//! - Room event and stripped state event types
//! - Message and membership request bodies
//!
//! This is a pure protocol crate with no I/O operations. Every section of a
//! sync response is optional on the wire; all containers default to empty so
//! partial server responses decode without errors.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod event;
mod login;
mod request;
mod sync;

pub use event::{
    Membership, MessageContent, RoomEvent, StrippedStateEvent, ROOM_MEMBER, ROOM_MESSAGE,
};
pub use login::{LoginRequest, LoginResponse};
pub use request::{InviteRequest, JoinResponse, SendEventResponse, TextMessage, MSGTYPE_TEXT};
pub use sync::{
    InviteState, InvitedRoom, JoinedRoom, LeftRoom, RoomSections, State, SyncResponse, Timeline,
};
