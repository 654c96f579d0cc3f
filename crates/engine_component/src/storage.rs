//! Dense, per-type component storage.
//!
//! Each component type gets one [`Column`]: component values and their owning
//! entities live in parallel vectors, with a hash index from entity to row.
//! Rows are appended on insert and swap-removed on removal, so iteration
//! follows insertion order until a removal moves the last row into the gap.

use std::any::{Any, TypeId};
use std::collections::HashMap;

use crate::component::{Component, ComponentTypeId};
use crate::entity::Entity;
use crate::error::{EcsError, EcsResult};

/// A column in the store, holding every component of a single type.
#[derive(Debug, Clone)]
pub struct Column<T> {
    /// Entities in row order. `entities[i]` owns `data[i]`.
    entities: Vec<Entity>,
    data: Vec<T>,
    rows: HashMap<Entity, usize>,
}

impl<T> Column<T> {
    /// Create a new empty column.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entities: Vec::new(),
            data: Vec::new(),
            rows: HashMap::new(),
        }
    }

    /// Returns the number of component instances stored.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if this column contains no components.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns `true` if `entity` has a row in this column.
    #[must_use]
    pub fn contains(&self, entity: Entity) -> bool {
        self.rows.contains_key(&entity)
    }

    /// Append a value for `entity`. Returns the value back if a row already
    /// exists.
    pub fn push(&mut self, entity: Entity, value: T) -> Result<(), T> {
        if self.rows.contains_key(&entity) {
            return Err(value);
        }
        self.rows.insert(entity, self.data.len());
        self.entities.push(entity);
        self.data.push(value);
        Ok(())
    }

    /// Get a reference to the component owned by `entity`.
    #[must_use]
    pub fn get(&self, entity: Entity) -> Option<&T> {
        self.rows.get(&entity).map(|&row| &self.data[row])
    }

    /// Get a mutable reference to the component owned by `entity`.
    #[must_use]
    pub fn get_mut(&mut self, entity: Entity) -> Option<&mut T> {
        let row = *self.rows.get(&entity)?;
        Some(&mut self.data[row])
    }

    /// Remove and return the component owned by `entity`.
    pub fn remove(&mut self, entity: Entity) -> Option<T> {
        let row = self.rows.remove(&entity)?;
        self.entities.swap_remove(row);
        let value = self.data.swap_remove(row);
        if let Some(&moved) = self.entities.get(row) {
            self.rows.insert(moved, row);
        }
        Some(value)
    }

    /// Entities in row order.
    #[must_use]
    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    /// Iterate over `(entity, component)` pairs in row order.
    pub fn iter(&self) -> impl Iterator<Item = (Entity, &T)> {
        self.entities.iter().copied().zip(self.data.iter())
    }

    /// Iterate mutably over `(entity, component)` pairs in row order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (Entity, &mut T)> {
        self.entities.iter().copied().zip(self.data.iter_mut())
    }
}

impl<T> Default for Column<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Type-erased view of a [`Column`], so the store can operate on a column
/// knowing only its [`ComponentTypeId`].
pub trait AnyColumn: Any {
    /// Human-readable component name.
    fn type_name(&self) -> &'static str;
    /// The Rust type stored, used to detect type-tag collisions.
    fn rust_type(&self) -> TypeId;
    /// Entities in row order.
    fn entities(&self) -> &[Entity];
    /// Returns `true` if `entity` has a row.
    fn contains(&self, entity: Entity) -> bool;
    /// Remove the row for `entity`, returning the boxed value.
    fn remove_boxed(&mut self, entity: Entity) -> Option<Box<dyn Any>>;
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

struct TypedColumn<T: Component> {
    column: Column<T>,
}

impl<T: Component> AnyColumn for TypedColumn<T> {
    fn type_name(&self) -> &'static str {
        T::type_name()
    }

    fn rust_type(&self) -> TypeId {
        TypeId::of::<T>()
    }

    fn entities(&self) -> &[Entity] {
        self.column.entities()
    }

    fn contains(&self, entity: Entity) -> bool {
        self.column.contains(entity)
    }

    fn remove_boxed(&mut self, entity: Entity) -> Option<Box<dyn Any>> {
        self.column
            .remove(entity)
            .map(|value| Box::new(value) as Box<dyn Any>)
    }

    fn as_any(&self) -> &dyn Any {
        &self.column
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        &mut self.column
    }
}

/// Owner of all component data, keyed by [`ComponentTypeId`].
#[derive(Default)]
pub struct ComponentStore {
    columns: HashMap<ComponentTypeId, Box<dyn AnyColumn>>,
}

impl std::fmt::Debug for ComponentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map()
            .entries(
                self.columns
                    .values()
                    .map(|c| (c.type_name(), c.entities().len())),
            )
            .finish()
    }
}

impl ComponentStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            columns: HashMap::new(),
        }
    }

    /// Typed access to the column for `T`, if one exists.
    #[must_use]
    pub fn column<T: Component>(&self) -> Option<&Column<T>> {
        self.columns
            .get(&T::component_type_id())
            .and_then(|c| c.as_any().downcast_ref::<Column<T>>())
    }

    /// Typed mutable access to the column for `T`, if one exists.
    #[must_use]
    pub fn column_mut<T: Component>(&mut self) -> Option<&mut Column<T>> {
        self.columns
            .get_mut(&T::component_type_id())
            .and_then(|c| c.as_any_mut().downcast_mut::<Column<T>>())
    }

    /// Make sure a column for `T` exists and is bound to `T`.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::ComponentTypeConflict`] if the type tag of `T` is
    /// already bound to another Rust type.
    pub fn register<T: Component>(&mut self) -> EcsResult<()> {
        let type_id = T::component_type_id();
        let column = self
            .columns
            .entry(type_id)
            .or_insert_with(|| Box::new(TypedColumn::<T> { column: Column::new() }));
        if column.rust_type() != TypeId::of::<T>() {
            return Err(EcsError::ComponentTypeConflict {
                type_id,
                component: T::type_name(),
            });
        }
        Ok(())
    }

    /// Store `value` for `entity`.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::DuplicateComponent`] if `entity` already has a `T`.
    pub fn insert<T: Component>(&mut self, entity: Entity, value: T) -> EcsResult<()> {
        self.register::<T>()?;
        let column = self
            .column_mut::<T>()
            .ok_or(EcsError::ComponentTypeConflict {
                type_id: T::component_type_id(),
                component: T::type_name(),
            })?;
        column
            .push(entity, value)
            .map_err(|_| EcsError::DuplicateComponent {
                entity,
                component: T::type_name(),
            })
    }

    /// O(1) lookup. Absence is a normal outcome.
    #[must_use]
    pub fn get<T: Component>(&self, entity: Entity) -> Option<&T> {
        self.column::<T>()?.get(entity)
    }

    /// O(1) mutable lookup.
    #[must_use]
    pub fn get_mut<T: Component>(&mut self, entity: Entity) -> Option<&mut T> {
        self.column_mut::<T>()?.get_mut(entity)
    }

    /// Remove and return the `T` owned by `entity`.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::ComponentNotFound`] if absent.
    pub fn remove<T: Component>(&mut self, entity: Entity) -> EcsResult<T> {
        self.column_mut::<T>()
            .and_then(|c| c.remove(entity))
            .ok_or(EcsError::ComponentNotFound {
                entity,
                component: T::type_name(),
            })
    }

    /// Remove a component knowing only its type tag.
    pub fn remove_erased(
        &mut self,
        entity: Entity,
        type_id: ComponentTypeId,
    ) -> Option<Box<dyn Any>> {
        self.columns.get_mut(&type_id)?.remove_boxed(entity)
    }

    /// Returns `true` if `entity` has a component with tag `type_id`.
    #[must_use]
    pub fn contains(&self, entity: Entity, type_id: ComponentTypeId) -> bool {
        self.columns
            .get(&type_id)
            .is_some_and(|c| c.contains(entity))
    }

    /// Entities carrying `type_id`, in storage order.
    #[must_use]
    pub fn entities_with(&self, type_id: ComponentTypeId) -> &[Entity] {
        self.columns
            .get(&type_id)
            .map(|c| c.entities())
            .unwrap_or(&[])
    }

    /// Number of components stored under `type_id`.
    #[must_use]
    pub fn len_of(&self, type_id: ComponentTypeId) -> usize {
        self.entities_with(type_id).len()
    }

    /// Name of the component type bound to `type_id`, if any.
    #[must_use]
    pub fn type_name(&self, type_id: ComponentTypeId) -> Option<&'static str> {
        self.columns.get(&type_id).map(|c| c.type_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Position(f32, f32);

    impl Component for Position {
        fn type_name() -> &'static str {
            "Position"
        }
    }

    #[derive(Debug, Clone, PartialEq)]
    struct Impostor(u8);

    impl Component for Impostor {
        fn type_name() -> &'static str {
            "Position"
        }
    }

    fn e(index: u32) -> Entity {
        Entity::from_parts(index, 0)
    }

    #[test]
    fn test_column_swap_remove_keeps_index() {
        let mut col = Column::new();
        col.push(e(1), 'a').unwrap();
        col.push(e(2), 'b').unwrap();
        col.push(e(3), 'c').unwrap();

        assert_eq!(col.remove(e(1)), Some('a'));
        assert_eq!(col.entities(), &[e(3), e(2)]);
        assert_eq!(col.get(e(3)), Some(&'c'));
        assert_eq!(col.get(e(2)), Some(&'b'));
        assert_eq!(col.len(), 2);
    }

    #[test]
    fn test_column_rejects_second_row() {
        let mut col = Column::new();
        col.push(e(1), 1).unwrap();
        assert_eq!(col.push(e(1), 2), Err(2));
        assert_eq!(col.get(e(1)), Some(&1));
    }

    #[test]
    fn test_store_insert_get_remove() {
        let mut store = ComponentStore::new();
        store.insert(e(1), Position(1.0, 2.0)).unwrap();
        assert_eq!(store.get::<Position>(e(1)), Some(&Position(1.0, 2.0)));

        store.get_mut::<Position>(e(1)).unwrap().0 = 5.0;
        assert_eq!(store.remove::<Position>(e(1)), Ok(Position(5.0, 2.0)));
        assert!(store.get::<Position>(e(1)).is_none());
    }

    #[test]
    fn test_store_duplicate_component() {
        let mut store = ComponentStore::new();
        store.insert(e(1), Position(0.0, 0.0)).unwrap();
        let err = store.insert(e(1), Position(1.0, 1.0)).unwrap_err();
        assert_eq!(
            err,
            EcsError::DuplicateComponent {
                entity: e(1),
                component: "Position"
            }
        );
    }

    #[test]
    fn test_store_remove_missing() {
        let mut store = ComponentStore::new();
        assert!(matches!(
            store.remove::<Position>(e(4)),
            Err(EcsError::ComponentNotFound { .. })
        ));
    }

    #[test]
    fn test_store_type_tag_conflict() {
        let mut store = ComponentStore::new();
        store.insert(e(1), Position(0.0, 0.0)).unwrap();
        assert!(matches!(
            store.insert(e(2), Impostor(1)),
            Err(EcsError::ComponentTypeConflict { .. })
        ));
    }

    #[test]
    fn test_store_remove_erased() {
        let mut store = ComponentStore::new();
        let tag = Position::component_type_id();
        store.insert(e(1), Position(3.0, 4.0)).unwrap();
        assert!(store.contains(e(1), tag));

        let boxed = store.remove_erased(e(1), tag).unwrap();
        assert_eq!(boxed.downcast_ref::<Position>(), Some(&Position(3.0, 4.0)));
        assert!(!store.contains(e(1), tag));
        assert_eq!(store.len_of(tag), 0);
    }
}
