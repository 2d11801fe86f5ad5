use crate::controller::{BehaviourController, CreatureController};
use crate::entity::Behaviour;
use crate::error::AppError;

impl BehaviourController {
    /// Behaviours listed on a creature, in the creature's order. Dangling ids are skipped.
    pub async fn get_by_creature_id(&self, creature_id: &str) -> Result<Vec<Behaviour>, AppError> {
        let creature = CreatureController::new(self.store().clone())
            .get_by_id(creature_id)
            .await?;
        let mut behaviours = Vec::with_capacity(creature.behaviours.len());
        for id in &creature.behaviours {
            match self.get_by_id(&id.to_string()).await {
                Ok(b) => behaviours.push(b),
                Err(AppError::UnprocessableEntity(_)) => {
                    tracing::debug!(creature = %creature_id, behaviour = %id, "dangling behaviour reference");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(behaviours)
    }
}
