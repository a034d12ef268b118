//! Device emulator: a TCP server that behaves like a real four-outlet PDU.
//!
//! The emulator stands in for hardware when developing or testing anything
//! that speaks the KSHELL protocol. It serves any number of concurrent
//! connections against one shared [`kshell_device::DeviceHandle`], so state
//! changed through one session is immediately visible to every other.

pub mod server;
pub mod session;

pub use server::EmulatorServer;
pub use session::{AdminCredentials, Session, SessionState};
