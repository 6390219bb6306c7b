mod registry;
mod room;
mod room_command;

pub use registry::*;
pub(crate) use room::Room;
pub(crate) use room_command::RoomCommand;
