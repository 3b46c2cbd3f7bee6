//! Capability system implementation
//!
//! This module implements Spark's capability-based security model.
//!
//! ## Design Principles
//!
//! 1. **Unforgeable**: Capabilities are created by [`Kernel::new_endpoint`]
//!    and narrowed with [`Capability::restrict`]. The constructor is private
//!    to this crate, so no other crate can name an arbitrary endpoint with
//!    arbitrary rights.
//! 2. **Transferable**: Capabilities are plain values and can ride inside a
//!    message envelope to grant authority to the receiver.
//! 3. **Detached**: A capability holds no reference to the kernel. Dropping one
//!    never closes anything.
//!
//! [`Kernel::new_endpoint`]: crate::Kernel::new_endpoint
//!
//! ## Example
//!
//! ```
//! use core_types::Rights;
//! use kernel::{Capability, Kernel};
//!
//! let kernel = Kernel::new();
//! let full = kernel.new_endpoint(Rights::SEND | Rights::RECV);
//! let send_only = full.restrict(Rights::SEND);
//! assert!(send_only.can_send());
//! assert!(!send_only.restrict(Rights::RECV).is_valid());
//! assert!(!Capability::INVALID.restrict(Rights::SEND).is_valid());
//! ```
//!
//! Minting outside the kernel does not compile:
//!
//! ```compile_fail
//! use core_types::{Endpoint, Rights};
//! use kernel::Capability;
//!
//! let forged = Capability::mint(Endpoint::new(0), Rights::SEND | Rights::RECV);
//! ```
//!
//! Neither does building one field by field:
//!
//! ```compile_fail
//! use core_types::{Endpoint, Rights};
//! use kernel::Capability;
//!
//! let forged = Capability {
//!     endpoint: Endpoint::new(0),
//!     rights: Rights::SEND | Rights::RECV,
//! };
//! ```

use core_types::{Endpoint, Rights};
use serde::Serialize;
use std::fmt;

/// Grants access to an IPC endpoint
///
/// A capability is the pair of an endpoint and a non-empty set of rights.
/// The all-zero value is the invalid capability: no valid-but-rightless
/// capability exists.
///
/// Serializable for diagnostics. Capabilities cannot be deserialized.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub struct Capability {
    endpoint: Endpoint,
    rights: Rights,
}

impl Capability {
    /// The invalid capability
    pub const INVALID: Capability = Capability {
        endpoint: Endpoint::new(0),
        rights: Rights::empty(),
    };

    /// Mints a capability for an endpoint
    ///
    /// Called when an endpoint is allocated. An empty rights mask yields the
    /// invalid capability.
    pub(crate) const fn mint(endpoint: Endpoint, rights: Rights) -> Self {
        if rights.is_empty() {
            return Self::INVALID;
        }
        Self { endpoint, rights }
    }

    /// Returns true if the capability carries any rights
    pub const fn is_valid(&self) -> bool {
        !self.rights.is_empty()
    }

    /// Returns true if the capability permits sending
    pub const fn can_send(&self) -> bool {
        self.rights.contains(Rights::SEND)
    }

    /// Returns true if the capability permits receiving
    pub const fn can_recv(&self) -> bool {
        self.rights.contains(Rights::RECV)
    }

    /// Returns the endpoint this capability names
    pub const fn endpoint(&self) -> Endpoint {
        self.endpoint
    }

    /// Returns the rights this capability grants
    pub const fn rights(&self) -> Rights {
        self.rights
    }

    /// Derives a capability with a reduced set of rights
    ///
    /// The result carries `self.rights() ∩ rights`. If the intersection is
    /// empty, or `self` is already invalid, the result is the invalid
    /// capability. Rights can only shrink.
    pub fn restrict(&self, rights: Rights) -> Capability {
        if !self.is_valid() {
            return Capability::INVALID;
        }
        Capability::mint(self.endpoint, self.rights & rights)
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.is_valid() {
            return write!(f, "Cap(invalid)");
        }
        let send = if self.can_send() { "s" } else { "-" };
        let recv = if self.can_recv() { "r" } else { "-" };
        write!(f, "Cap({}, {}{})", self.endpoint, send, recv)
    }
}
