//! Account database entity for SeaORM.

use sea_orm::entity::prelude::*;

use common::AppError;
use domain::{Account, AccountRole};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "accounts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub username: String,
    pub role: String,
    pub is_active: bool,
    pub is_activated: bool,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// Convert database model to domain entity.
///
/// The role column carries a check constraint, so an unknown value here means
/// the row was written outside this service.
impl TryFrom<Model> for Account {
    type Error = AppError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        let role = model
            .role
            .parse::<AccountRole>()
            .map_err(|e| AppError::internal(format!("account {}: {}", model.id, e)))?;

        Ok(Account {
            id: model.id,
            username: model.username,
            role,
            active: model.is_active,
            activated: model.is_activated,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}
