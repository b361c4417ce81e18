//! Concrete identity-provider integrations.
//!
//! Each vendor gets one type implementing
//! [`IdentityProvider`](crate::provider::IdentityProvider). The hosting
//! server selects one at construction time and never branches on vendor
//! afterward.

pub mod authkit;
pub mod clerk;

pub use authkit::{AuthKitConfig, AuthKitProvider};
pub use clerk::{ClerkConfig, ClerkProvider};
