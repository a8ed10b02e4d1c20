//! Identity-bearing parts of an aggregate.

/// Something inside an aggregate that is addressed by id rather than by value.
///
/// A pricing tier is one: two tiers with the same band and price are still
/// different tiers, and commands name the one they target by its id.
pub trait Entity {
    type Id: Copy + Eq + core::hash::Hash + core::fmt::Debug;

    fn id(&self) -> &Self::Id;

    fn has_id(&self, id: &Self::Id) -> bool {
        self.id() == id
    }
}
