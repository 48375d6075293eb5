//! Socket abstraction.
mod socket;

pub use socket::Socket;
