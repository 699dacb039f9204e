//! Offline key-refresh protocol module
//!
//! Re-randomizes each player's key share and presignature material under a
//! fixed group public key. Useful for proactive security: regularly
//! refreshing shares limits the window of vulnerability if a share is
//! compromised.

mod coordinator;

pub use coordinator::RefreshCoordinator;
