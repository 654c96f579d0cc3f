//! Entity matching and typed, read-only component queries.
//!
//! Matching is driven by the *primary* type (the first one requested): its
//! column is walked in storage order and every entity that also carries the
//! remaining types is yielded.

use crate::component::{Component, ComponentTypeId};
use crate::entity::Entity;
use crate::storage::ComponentStore;

/// Collect the entities whose component set is a superset of `types`.
///
/// The result is a snapshot: later insertions or removals do not affect it.
/// An empty `types` slice matches nothing.
#[must_use]
pub fn matching_entities(store: &ComponentStore, types: &[ComponentTypeId]) -> Vec<Entity> {
    let Some((&primary, rest)) = types.split_first() else {
        return Vec::new();
    };
    store
        .entities_with(primary)
        .iter()
        .copied()
        .filter(|&entity| rest.iter().all(|&ty| store.contains(entity, ty)))
        .collect()
}

/// A compile-time set of component types fetched together.
///
/// Implemented for tuples `(A,)` through `(A, B, C, D)`.
pub trait Query {
    /// Borrowed components yielded per entity.
    type Item<'w>;

    /// Type tags required by the query, primary type first.
    fn type_ids() -> Vec<ComponentTypeId>;

    /// Borrow every component of the query from `entity`, or `None` if any
    /// is missing.
    fn fetch(store: &ComponentStore, entity: Entity) -> Option<Self::Item<'_>>;
}

macro_rules! impl_query {
    ($($ty:ident),+) => {
        impl<$($ty: Component),+> Query for ($($ty,)+) {
            type Item<'w> = ($(&'w $ty,)+);

            fn type_ids() -> Vec<ComponentTypeId> {
                vec![$($ty::component_type_id()),+]
            }

            fn fetch(store: &ComponentStore, entity: Entity) -> Option<Self::Item<'_>> {
                Some(($(store.get::<$ty>(entity)?,)+))
            }
        }
    };
}

impl_query!(A);
impl_query!(A, B);
impl_query!(A, B, C);
impl_query!(A, B, C, D);

/// Visit every entity matching `Q` with its borrowed components.
pub fn for_each<Q: Query>(store: &ComponentStore, mut visitor: impl FnMut(Entity, Q::Item<'_>)) {
    for entity in matching_entities(store, &Q::type_ids()) {
        if let Some(item) = Q::fetch(store, entity) {
            visitor(entity, item);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Position(i32);
    impl Component for Position {
        fn type_name() -> &'static str {
            "Position"
        }
    }

    #[derive(Debug, PartialEq)]
    struct Velocity(i32);
    impl Component for Velocity {
        fn type_name() -> &'static str {
            "Velocity"
        }
    }

    fn e(index: u32) -> Entity {
        Entity::from_parts(index, 0)
    }

    fn populated() -> ComponentStore {
        let mut store = ComponentStore::new();
        store.insert(e(1), Position(10)).unwrap();
        store.insert(e(2), Position(20)).unwrap();
        store.insert(e(3), Position(30)).unwrap();
        store.insert(e(2), Velocity(2)).unwrap();
        store.insert(e(3), Velocity(3)).unwrap();
        store
    }

    #[test]
    fn test_matching_follows_primary_order() {
        let store = populated();
        let pos = Position::component_type_id();
        let vel = Velocity::component_type_id();
        assert_eq!(matching_entities(&store, &[pos]), vec![e(1), e(2), e(3)]);
        assert_eq!(matching_entities(&store, &[pos, vel]), vec![e(2), e(3)]);
        assert_eq!(matching_entities(&store, &[vel, pos]), vec![e(2), e(3)]);
    }

    #[test]
    fn test_matching_empty_types() {
        let store = populated();
        assert!(matching_entities(&store, &[]).is_empty());
    }

    #[test]
    fn test_typed_query_yields_components() {
        let store = populated();
        let mut seen = Vec::new();
        for_each::<(Position, Velocity)>(&store, |entity, (p, v)| {
            seen.push((entity, p.0 + v.0));
        });
        assert_eq!(seen, vec![(e(2), 22), (e(3), 33)]);
    }

    #[test]
    fn test_query_type_ids_primary_first() {
        assert_eq!(
            <(Velocity, Position)>::type_ids(),
            vec![Velocity::component_type_id(), Position::component_type_id()]
        );
    }
}
