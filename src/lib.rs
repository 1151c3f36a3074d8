//! Client-side coordination for lobby based games whose instances live on an
//! EVM chain: a persistent burner identity, the lobby backend's JSON actions,
//! and the factory handshake that turns a lobby into a confirmed game address.

pub use error::{
    Error,
    Result,
};

pub mod chain;
pub mod config;
pub mod deployment;
pub mod error;
pub mod faucet;
pub mod identity;
pub mod lobby;
pub mod session;
pub mod status;
pub mod transport;
