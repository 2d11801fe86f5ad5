use crate::entity::{require, Entity, EntityBase, Method};
use crate::error::AppError;
use crate::store::{Column, Record, TableSpec};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Behaviour {
    #[serde(flatten)]
    pub base: EntityBase,
    #[serde(rename = "type", default)]
    pub kind: String,
}

impl Entity for Behaviour {
    const NAME: &'static str = "Behaviour";
    const TABLE: TableSpec = TableSpec {
        name: "behaviour",
        columns: &[Column::new("type", "text").unique()],
    };

    fn validate(fields: &Record, method: Method) -> Result<(), AppError> {
        require(fields, "type", method)
    }
}
