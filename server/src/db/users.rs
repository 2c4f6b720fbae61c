use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveValue::{NotSet, Set},
    ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, entity::prelude::*,
};
use serde::{Deserialize, Serialize};

/// Listing submitters, keyed by email. Authentication is out of scope;
/// the row exists so submissions stay attributable.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

pub struct UserRepository;

impl UserRepository {
    pub async fn upsert_by_email(db: &DatabaseConnection, email: &str) -> Result<Model, DbErr> {
        if let Some(existing) = Entity::find()
            .filter(Column::Email.eq(email))
            .one(db)
            .await?
        {
            return Ok(existing);
        }

        let active = ActiveModel {
            id: NotSet,
            email: Set(email.to_string()),
            created_at: Set(Utc::now()),
        };

        active.insert(db).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_db;

    #[tokio::test]
    async fn upsert_is_idempotent_per_email() {
        let db = test_db().await;

        let first = UserRepository::upsert_by_email(&db, "dev@coinvote.example")
            .await
            .unwrap();
        let second = UserRepository::upsert_by_email(&db, "dev@coinvote.example")
            .await
            .unwrap();
        let other = UserRepository::upsert_by_email(&db, "other@coinvote.example")
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_ne!(first.id, other.id);
    }
}
