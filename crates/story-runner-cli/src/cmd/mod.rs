pub mod show;
pub mod verify;
