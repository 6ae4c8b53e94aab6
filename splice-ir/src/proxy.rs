//! Non-addressable CFG endpoints.

/// A placeholder CFG node standing in for a target outside the module —
/// an unknown caller for a `ret`, an external call target, or similar.
/// Carries no payload of its own; it exists only so edges have something
/// to point at.
#[derive(Clone, Debug, Default)]
pub struct ProxyBlock;
