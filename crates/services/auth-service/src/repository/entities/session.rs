//! Refresh session database entity for SeaORM.

use sea_orm::entity::prelude::*;

use domain::Session;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "sessions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub account_id: Uuid,
    #[sea_orm(column_type = "Text", unique)]
    pub token: String,
    pub expires_at: DateTimeUtc,
    pub is_revoked: bool,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for Session {
    fn from(model: Model) -> Self {
        Session {
            id: model.id,
            account_id: model.account_id,
            token: model.token,
            expires_at: model.expires_at,
            revoked: model.is_revoked,
            created_at: model.created_at,
        }
    }
}
