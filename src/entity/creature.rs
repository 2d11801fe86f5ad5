use crate::entity::{Entity, EntityBase};
use crate::store::{Column, TableSpec};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Creature {
    #[serde(flatten)]
    pub base: EntityBase,
    /// Owning client.
    #[serde(default)]
    pub client: Option<Uuid>,
    #[serde(default)]
    pub behaviours: Vec<Uuid>,
}

impl Entity for Creature {
    const NAME: &'static str = "Creature";
    const TABLE: TableSpec = TableSpec {
        name: "creature",
        columns: &[Column::new("client", "uuid"), Column::new("behaviours", "jsonb")],
    };
}
