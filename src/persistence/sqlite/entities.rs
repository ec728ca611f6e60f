//! SQLite implementation of the entity repository.

use async_trait::async_trait;
use sqlx::SqlitePool;

use super::entity_key;
use crate::{
    models::Entity,
    persistence::{error::PersistenceError, traits::EntityRepository},
};

/// Entity registration and lookup over a SQLite pool.
pub struct SqliteEntityRepository {
    pool: SqlitePool,
}

#[derive(sqlx::FromRow)]
struct EntityRow {
    id: i64,
    canonical_id: String,
}

impl SqliteEntityRepository {
    /// Creates a repository over the given pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EntityRepository for SqliteEntityRepository {
    async fn get_id(&self, canonical_id: &str) -> Result<i64, PersistenceError> {
        entity_key(&self.pool, canonical_id).await
    }

    #[tracing::instrument(skip(self), level = "debug")]
    async fn insert_entity(&self, canonical_id: &str) -> Result<i64, PersistenceError> {
        let id = sqlx::query_scalar::<_, i64>(
            "insert into entities (canonical_id) values (?) returning id",
        )
        .bind(canonical_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| PersistenceError::OperationFailed(e.to_string()))?;

        tracing::debug!(canonical_id, id, "registered entity");
        Ok(id)
    }

    async fn get_canonical_id(&self, id: i64) -> Result<String, PersistenceError> {
        sqlx::query_scalar::<_, String>("select canonical_id from entities where id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| PersistenceError::OperationFailed(e.to_string()))?
            .ok_or_else(|| PersistenceError::NotFound(format!("entity #{id}")))
    }

    async fn list_entities(&self) -> Result<Vec<Entity>, PersistenceError> {
        let rows = sqlx::query_as::<_, EntityRow>(
            "select id, canonical_id from entities order by id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| PersistenceError::OperationFailed(e.to_string()))?;

        Ok(rows
            .into_iter()
            .map(|row| Entity { id: row.id, canonical_id: row.canonical_id })
            .collect())
    }

    async fn get_entity(&self, canonical_id: &str) -> Result<Entity, PersistenceError> {
        let row = sqlx::query_as::<_, EntityRow>(
            "select id, canonical_id from entities where canonical_id = ?",
        )
        .bind(canonical_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| PersistenceError::OperationFailed(e.to_string()))?
        .ok_or_else(|| PersistenceError::NotFound(format!("entity '{canonical_id}'")))?;

        Ok(Entity { id: row.id, canonical_id: row.canonical_id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::sqlite::setup_test_store;

    #[tokio::test]
    async fn insert_then_lookup_round_trips() {
        let store = setup_test_store().await;
        let repo = SqliteEntityRepository::new(store.pool().clone());

        let canonical = "instance=i|kind=service|name=s";
        let id = repo.insert_entity(canonical).await.unwrap();

        assert_eq!(repo.get_id(canonical).await.unwrap(), id);
        assert_eq!(repo.get_canonical_id(id).await.unwrap(), canonical);

        let entity = repo.get_entity(canonical).await.unwrap();
        assert_eq!(entity.id, id);
        assert_eq!(entity.canonical_id, canonical);
    }

    #[tokio::test]
    async fn missing_entity_is_not_found() {
        let store = setup_test_store().await;
        let repo = SqliteEntityRepository::new(store.pool().clone());

        let err = repo.get_id("instance=i|kind=service|name=absent").await.unwrap_err();
        assert!(err.is_not_found());

        let err = repo.get_canonical_id(42).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn list_entities_preserves_insertion_order() {
        let store = setup_test_store().await;
        let repo = SqliteEntityRepository::new(store.pool().clone());

        repo.insert_entity("instance=i|kind=service|name=a").await.unwrap();
        repo.insert_entity("instance=i|kind=service|name=b").await.unwrap();

        let entities = repo.list_entities().await.unwrap();
        assert_eq!(entities.len(), 2);
        assert_eq!(entities[0].canonical_id, "instance=i|kind=service|name=a");
        assert_eq!(entities[1].canonical_id, "instance=i|kind=service|name=b");
    }
}
