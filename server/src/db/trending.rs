use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveValue::Set, DatabaseConnection, DbErr, EntityTrait, QueryOrder, TransactionTrait,
    entity::prelude::*,
};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "trending_coins")]
pub struct Model {
    /// 1-based rank, also the primary key: the table never holds more
    /// than one ranking at a time.
    #[sea_orm(primary_key, auto_increment = false)]
    pub rank: i32,
    pub coin_slug: String,
    pub score: i64,
    pub computed_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

pub struct TrendingRepository;

impl TrendingRepository {
    /// Replace the whole ranking. Scores arrive pre-sorted descending
    /// from the trending job. The swap runs in one transaction, so a
    /// concurrent read sees either the previous complete ranking or the
    /// new one, never an empty or partial table.
    pub async fn rewrite(
        db: &DatabaseConnection,
        ranked: &[(String, i64)],
    ) -> Result<(), DbErr> {
        let txn = db.begin().await?;

        Entity::delete_many().exec(&txn).await?;

        if !ranked.is_empty() {
            let now = Utc::now();
            let rows = ranked.iter().enumerate().map(|(i, (slug, score))| ActiveModel {
                rank: Set(i as i32 + 1),
                coin_slug: Set(slug.clone()),
                score: Set(*score),
                computed_at: Set(now),
            });

            Entity::insert_many(rows).exec(&txn).await?;
        }

        txn.commit().await
    }

    pub async fn list(db: &DatabaseConnection) -> Result<Vec<Model>, DbErr> {
        Entity::find().order_by_asc(Column::Rank).all(db).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_db;

    #[tokio::test]
    async fn rewrite_replaces_previous_ranking() {
        let db = test_db().await;

        TrendingRepository::rewrite(
            &db,
            &[("bitcoin".to_string(), 40), ("pepe".to_string(), 12)],
        )
        .await
        .unwrap();

        TrendingRepository::rewrite(&db, &[("pepe".to_string(), 55)])
            .await
            .unwrap();

        let ranking = TrendingRepository::list(&db).await.unwrap();
        assert_eq!(ranking.len(), 1);
        assert_eq!(ranking[0].rank, 1);
        assert_eq!(ranking[0].coin_slug, "pepe");
        assert_eq!(ranking[0].score, 55);
    }

    #[tokio::test]
    async fn empty_rewrite_clears_the_table() {
        let db = test_db().await;

        TrendingRepository::rewrite(&db, &[("bitcoin".to_string(), 1)])
            .await
            .unwrap();
        TrendingRepository::rewrite(&db, &[]).await.unwrap();

        assert!(TrendingRepository::list(&db).await.unwrap().is_empty());
    }
}
