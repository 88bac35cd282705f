pub mod character;
pub mod config;
pub mod interaction;
pub mod movement;
pub mod possession;
pub mod protocol;
pub mod tcp_transport;
pub mod transport;
pub mod world;
