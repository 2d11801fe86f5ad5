use crate::controller::{ClientController, CreatureController};
use crate::entity::Creature;
use crate::error::AppError;

impl CreatureController {
    /// Creatures owned by a client. The client must exist.
    pub async fn get_by_client_id(&self, client_id: &str) -> Result<Vec<Creature>, AppError> {
        let client = ClientController::new(self.store().clone())
            .get_by_id(client_id)
            .await?;
        let mut creatures = self.get_all().await?;
        creatures.retain(|c| c.client == Some(client.base.uuid));
        Ok(creatures)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, Record};
    use serde_json::json;
    use std::sync::Arc;

    #[tokio::test]
    async fn creatures_of_a_client() {
        let store: Arc<dyn crate::store::Store> = Arc::new(MemoryStore::new());
        let clients = ClientController::new(store.clone());
        let creatures = CreatureController::new(store);
        let owner = clients.add(Record::new()).await.unwrap().base.uuid;
        let fields = json!({"client": owner}).as_object().cloned().unwrap();
        creatures.add(fields).await.unwrap();
        creatures.add(Record::new()).await.unwrap();

        let owned = creatures.get_by_client_id(&owner.to_string()).await.unwrap();
        assert_eq!(owned.len(), 1);
        assert!(creatures.get_by_client_id("nobody").await.is_err());
    }
}
