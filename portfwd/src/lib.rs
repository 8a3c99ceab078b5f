//! Typed records over VirtualBox NAT port-forwarding rules stored in a
//! machine's extra-data namespace.
//!
//! A [`ForwardedPort`] is one rule: three keys (`GuestPort`, `HostPort`,
//! `Protocol`) under a prefix derived from the NAT device, its instance, and
//! the rule name. Records track dirty state per attribute, validate before
//! saving, and persist through the [`extradata::ExtraData`] seam of their
//! parent machine.

mod collection;
mod dirty;
mod error;
mod port;
#[cfg(test)]
mod testutil;
mod validation;

pub use collection::Collection;
pub use error::{PortError, Result};
pub use port::{DEFAULT_DEVICE, ForwardedPort, ParseProtocolError, Protocol};
pub use validation::{ValidationError, ValidationErrors};
