use crate::entity::{Entity, EntityBase};
use crate::store::{Column, TableSpec};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    #[serde(flatten)]
    pub base: EntityBase,
    #[serde(default)]
    pub neighbors: Vec<Uuid>,
}

impl Entity for Client {
    const NAME: &'static str = "Client";
    const TABLE: TableSpec = TableSpec {
        name: "client",
        columns: &[Column::new("neighbors", "jsonb")],
    };

    fn before_insert(&mut self) {
        tracing::info!(neighbors = self.neighbors.len(), "inserting client");
    }
}
