//! Entities: records whose identity survives every change to their state.

/// A record identified by a stable, ordered id (products, movements).
pub trait Entity {
    type Id: Copy + Ord + core::hash::Hash + core::fmt::Debug;

    fn id(&self) -> Self::Id;
}

/// Sort in place by ascending id.
pub fn sort_by_id<E: Entity>(entities: &mut [E]) {
    entities.sort_by_key(Entity::id);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ProductId;

    struct Row(ProductId);

    impl Entity for Row {
        type Id = ProductId;

        fn id(&self) -> ProductId {
            self.0
        }
    }

    #[test]
    fn sorts_by_id() {
        let mut rows = vec![Row(ProductId::new(3)), Row(ProductId::new(1)), Row(ProductId::new(2))];
        sort_by_id(&mut rows);
        assert_eq!(
            rows.iter().map(|r| r.id().get()).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
    }
}
