//! CRUD controllers over the store, one per entity.

mod behaviour;
mod creature;
mod user;

use crate::di::{Dependencies, Injectable, ProviderKey};
use crate::entity::{Behaviour, Client, Creature, Entity, Method, User};
use crate::error::{AppError, ConfigError};
use crate::store::{Database, Record, Store, IMMUTABLE_FIELDS, MANAGED_FIELDS};
use serde_json::Value;
use std::marker::PhantomData;
use std::sync::Arc;
use uuid::Uuid;

pub type ClientController = CrudController<Client>;
pub type CreatureController = CrudController<Creature>;
pub type BehaviourController = CrudController<Behaviour>;
pub type UserController = CrudController<User>;

pub struct CrudController<E> {
    store: Arc<dyn Store>,
    entity: PhantomData<fn() -> E>,
}

impl<E: Entity> Injectable for CrudController<E> {
    fn dependencies() -> Vec<ProviderKey> {
        vec![ProviderKey::of::<Database>()]
    }

    fn construct(deps: &Dependencies) -> Result<Self, ConfigError> {
        Ok(Self::new(deps.get::<Database>()?.store()))
    }
}

fn not_found<E: Entity>(id: &str) -> AppError {
    AppError::UnprocessableEntity(format!("Unable to find {} with id '{}'", E::NAME, id))
}

impl<E: Entity> CrudController<E> {
    pub fn new(store: Arc<dyn Store>) -> Self {
        CrudController {
            store,
            entity: PhantomData,
        }
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    pub async fn get_all(&self) -> Result<Vec<E>, AppError> {
        self.store
            .find_all(&E::TABLE)
            .await?
            .into_iter()
            .map(E::from_record)
            .collect()
    }

    /// First entity matching every field of `filter`. A field the entity lacks matches nothing.
    pub async fn get_one(&self, filter: &Record) -> Result<E, AppError> {
        let found = if filter.keys().all(|k| E::TABLE.has_field(k)) {
            self.store.find_one(&E::TABLE, filter).await?
        } else {
            None
        };
        match found {
            Some(record) => E::from_record(record),
            None => Err(AppError::UnprocessableEntity(format!(
                "Unable to find {} matching {}",
                E::NAME,
                Value::Object(filter.clone())
            ))),
        }
    }

    pub async fn get_by_id(&self, id: &str) -> Result<E, AppError> {
        let uuid = Uuid::parse_str(id).map_err(|_| not_found::<E>(id))?;
        match self.store.find_by_id(&E::TABLE, uuid).await? {
            Some(record) => E::from_record(record),
            None => Err(not_found::<E>(id)),
        }
    }

    pub async fn add(&self, fields: Record) -> Result<E, AppError> {
        if let Some(unknown) = fields.keys().find(|k| !E::TABLE.has_field(k)) {
            return Err(AppError::BadRequest(format!("Unknown {} field '{}'", E::NAME, unknown)));
        }
        let mut fields = fields;
        fields.retain(|k, _| !MANAGED_FIELDS.contains(&k.as_str()));
        E::validate(&fields, Method::Create)?;

        let mut entity = E::from_partial(&fields)?;
        entity.before_insert();
        let record = self
            .store
            .insert(&E::TABLE, entity.to_columns()?)
            .await
            .map_err(|e| {
                tracing::warn!(entity = E::NAME, error = %e, "insert failed");
                AppError::BadRequest(format!("Unable to create {}", E::NAME))
            })?;
        E::from_record(record)
    }

    pub async fn update_by_id(&self, id: &str, fields: Record) -> Result<E, AppError> {
        if fields.is_empty() {
            return Err(AppError::BadRequest(format!("No changes for {} with id '{}'", E::NAME, id)));
        }
        if let Some(field) = fields.keys().find(|k| IMMUTABLE_FIELDS.contains(&k.as_str())) {
            return Err(AppError::BadRequest(format!("Field '{}' of {} cannot be changed", field, E::NAME)));
        }
        let mut changes = fields;
        changes.remove("version");
        if let Some(unknown) = changes.keys().find(|k| E::TABLE.column(k).is_none()) {
            return Err(AppError::BadRequest(format!("Unknown {} field '{}'", E::NAME, unknown)));
        }
        if changes.is_empty() {
            return Err(AppError::BadRequest(format!("No changes for {} with id '{}'", E::NAME, id)));
        }
        E::validate(&changes, Method::Update)?;

        let current = self.get_by_id(id).await?;
        current.before_update(&changes);
        let mut merged = serde_json::to_value(&current)?;
        if let Value::Object(map) = &mut merged {
            map.extend(changes.clone());
        }
        serde_json::from_value::<E>(merged)
            .map_err(|e| AppError::BadRequest(format!("Invalid {}: {}", E::NAME, e)))?;

        let uuid = Uuid::parse_str(id).map_err(|_| not_found::<E>(id))?;
        let updated = self
            .store
            .update(&E::TABLE, uuid, &changes)
            .await
            .map_err(|e| {
                tracing::warn!(entity = E::NAME, %id, error = %e, "update failed");
                AppError::BadRequest(format!("Unable to update {} with id '{}'", E::NAME, id))
            })?;
        if updated.is_none() {
            return Err(not_found::<E>(id));
        }
        self.get_by_id(id).await
    }

    pub async fn delete_by_id(&self, id: &str) -> Result<&'static str, AppError> {
        let entity = self.get_by_id(id).await?;
        entity.before_remove();
        let uuid = Uuid::parse_str(id).map_err(|_| not_found::<E>(id))?;
        let removed = self.store.delete(&E::TABLE, uuid).await.map_err(|e| {
            tracing::warn!(entity = E::NAME, %id, error = %e, "delete failed");
            AppError::BadRequest(format!("Unable to remove {} with id '{}'", E::NAME, id))
        })?;
        if !removed {
            return Err(AppError::BadRequest(format!("Unable to remove {} with id '{}'", E::NAME, id)));
        }
        Ok("success")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use serde_json::json;

    fn record(v: Value) -> Record {
        v.as_object().cloned().unwrap()
    }

    fn clients() -> ClientController {
        ClientController::new(Arc::new(MemoryStore::new()))
    }

    #[tokio::test]
    async fn add_then_get_by_id() {
        let controller = clients();
        let neighbor = Uuid::new_v4();
        let created = controller
            .add(record(json!({"neighbors": [neighbor], "version": 9})))
            .await
            .unwrap();
        assert_eq!(created.base.version, 1);
        let found = controller.get_by_id(&created.base.uuid.to_string()).await.unwrap();
        assert_eq!(found.neighbors, vec![neighbor]);
    }

    #[tokio::test]
    async fn add_rejects_unknown_fields() {
        let err = clients().add(record(json!({"colour": "red"}))).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn get_one_with_unknown_field_finds_nothing() {
        let controller = clients();
        controller.add(record(json!({"neighbors": []}))).await.unwrap();
        let err = controller.get_one(&record(json!({"colour": "red"}))).await.unwrap_err();
        assert!(matches!(err, AppError::UnprocessableEntity(_)));
        assert!(controller.get_one(&record(json!({"version": 1}))).await.is_ok());
    }

    #[tokio::test]
    async fn get_by_id_misses_are_unprocessable() {
        let controller = clients();
        let missing = Uuid::new_v4().to_string();
        let err = controller.get_by_id(&missing).await.unwrap_err();
        assert_eq!(err.to_string(), format!("Unable to find Client with id '{}'", missing));
        let err = controller.get_by_id("not-a-uuid").await.unwrap_err();
        assert!(matches!(err, AppError::UnprocessableEntity(_)));
    }

    #[tokio::test]
    async fn update_rules() {
        let controller = clients();
        let created = controller.add(Record::new()).await.unwrap();
        let id = created.base.uuid.to_string();

        for body in [json!({}), json!({"uuid": Uuid::new_v4()}), json!({"createdAt": "2020-01-01T00:00:00Z"}), json!({"versione": 2}), json!({"version": 4})] {
            let err = controller.update_by_id(&id, record(body.clone())).await.unwrap_err();
            assert!(matches!(err, AppError::BadRequest(_)), "{body} should be rejected");
        }
        let err = controller
            .update_by_id(&id, record(json!({"neighbors": "x"})))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));

        let neighbor = Uuid::new_v4();
        let updated = controller
            .update_by_id(&id, record(json!({"neighbors": [neighbor], "version": 40})))
            .await
            .unwrap();
        assert_eq!(updated.neighbors, vec![neighbor]);
        assert_eq!(updated.base.version, 2);

        let err = controller
            .update_by_id(&Uuid::new_v4().to_string(), record(json!({"neighbors": []})))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::UnprocessableEntity(_)));
    }

    #[tokio::test]
    async fn delete_then_miss() {
        let controller = clients();
        let id = controller.add(Record::new()).await.unwrap().base.uuid.to_string();
        assert_eq!(controller.delete_by_id(&id).await.unwrap(), "success");
        assert!(matches!(
            controller.delete_by_id(&id).await.unwrap_err(),
            AppError::UnprocessableEntity(_)
        ));
        assert!(controller.get_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn duplicate_unique_value_is_bad_request() {
        let behaviours = BehaviourController::new(Arc::new(MemoryStore::new()));
        behaviours.add(record(json!({"type": "burrowing"}))).await.unwrap();
        let err = behaviours.add(record(json!({"type": "burrowing"}))).await.unwrap_err();
        assert_eq!(err.to_string(), "Unable to create Behaviour");
    }
}
