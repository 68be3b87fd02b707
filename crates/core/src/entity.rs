//! Entity trait: identity + continuity across state changes.

/// Entity marker + minimal interface.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + Ord + core::hash::Hash + core::fmt::Debug + core::fmt::Display;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;

    /// Secondary key that must be unique across all entities of this type.
    ///
    /// Stores reject `create` when another entity already holds the same key.
    fn unique_key(&self) -> Option<String> {
        None
    }
}
