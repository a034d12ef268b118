//! Client side of the KSHELL protocol.
//!
//! [`DeviceClient`] is a typed request-reply session for programs; the
//! `kshell` binary in this crate builds its command line interface on top
//! of it. [`CredentialStore`] keeps labeled connection details on disk so
//! devices can be addressed by name instead of host, user and password
//! every time.

pub mod client;
pub mod credentials;
pub mod error;
pub mod shell;

pub use client::DeviceClient;
pub use credentials::{CredentialStore, StoredConnection};
pub use error::{ClientError, CredentialStoreError};
