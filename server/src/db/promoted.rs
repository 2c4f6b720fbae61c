use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveValue::{NotSet, Set},
    ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QueryOrder,
    entity::prelude::*,
};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "promoted_coins")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub coin_slug: String,
    /// Admin-assigned slot order on the promoted strip.
    pub position: i32,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

pub struct PromotedRepository;

impl PromotedRepository {
    pub async fn create(
        db: &DatabaseConnection,
        coin_slug: &str,
        position: i32,
        starts_at: DateTime<Utc>,
        ends_at: DateTime<Utc>,
    ) -> Result<Model, DbErr> {
        let active = ActiveModel {
            id: NotSet,
            coin_slug: Set(coin_slug.to_string()),
            position: Set(position),
            starts_at: Set(starts_at),
            ends_at: Set(ends_at),
        };

        active.insert(db).await
    }

    /// Promotions live when starts_at <= now < ends_at, in slot order.
    pub async fn active(db: &DatabaseConnection, now: DateTime<Utc>) -> Result<Vec<Model>, DbErr> {
        Entity::find()
            .filter(Column::StartsAt.lte(now))
            .filter(Column::EndsAt.gt(now))
            .order_by_asc(Column::Position)
            .all(db)
            .await
    }

    pub async fn delete(db: &DatabaseConnection, id: i64) -> Result<bool, DbErr> {
        let res = Entity::delete_by_id(id).exec(db).await?;

        Ok(res.rows_affected > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_db;
    use chrono::Duration;

    #[tokio::test]
    async fn active_window_and_ordering() {
        let db = test_db().await;
        let now = Utc::now();

        // Expired, live (slot 2), live (slot 1), future.
        PromotedRepository::create(&db, "old", 1, now - Duration::days(9), now - Duration::days(2))
            .await
            .unwrap();
        PromotedRepository::create(&db, "second", 2, now - Duration::days(1), now + Duration::days(1))
            .await
            .unwrap();
        PromotedRepository::create(&db, "first", 1, now - Duration::days(1), now + Duration::days(1))
            .await
            .unwrap();
        PromotedRepository::create(&db, "soon", 1, now + Duration::days(1), now + Duration::days(2))
            .await
            .unwrap();

        let active = PromotedRepository::active(&db, now).await.unwrap();
        let slugs: Vec<_> = active.iter().map(|p| p.coin_slug.as_str()).collect();

        assert_eq!(slugs, vec!["first", "second"]);
    }

    #[tokio::test]
    async fn delete_ends_promotion() {
        let db = test_db().await;
        let now = Utc::now();

        let row = PromotedRepository::create(&db, "bitcoin", 1, now - Duration::days(1), now + Duration::days(1))
            .await
            .unwrap();

        assert!(PromotedRepository::delete(&db, row.id).await.unwrap());
        assert!(!PromotedRepository::delete(&db, row.id).await.unwrap());
        assert!(PromotedRepository::active(&db, now).await.unwrap().is_empty());
    }
}
