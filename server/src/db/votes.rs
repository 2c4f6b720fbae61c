use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{
    ActiveValue::{NotSet, Set},
    ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter,
    QuerySelect, TransactionTrait,
    entity::prelude::*,
    sea_query::OnConflict,
};
use serde::{Deserialize, Serialize};

use crate::db::coins::CoinRepository;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "votes")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub coin_slug: String,
    /// Opaque voter fingerprint, typically the client address.
    pub voter: String,
    pub voted_on: NaiveDate,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

pub struct VoteRepository;

impl VoteRepository {
    /// Record a vote. Returns false when the (coin, voter, day) triple
    /// already exists; the unique index is the only dedup authority.
    pub async fn cast<C: ConnectionTrait>(
        db: &C,
        coin_slug: &str,
        voter: &str,
        voted_on: NaiveDate,
    ) -> Result<bool, DbErr> {
        let active = ActiveModel {
            id: NotSet,
            coin_slug: Set(coin_slug.to_string()),
            voter: Set(voter.to_string()),
            voted_on: Set(voted_on),
            created_at: Set(Utc::now()),
        };

        let res = Entity::insert(active)
            .on_conflict(
                OnConflict::columns([Column::CoinSlug, Column::Voter, Column::VotedOn])
                    .do_nothing()
                    .to_owned(),
            )
            .exec(db)
            .await;

        match res {
            Ok(_) => Ok(true),
            Err(DbErr::RecordNotInserted) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Record a vote and bump the coin's denormalized counter in one
    /// transaction; both writes commit or neither does, so the counter
    /// never drifts from the votes table. A duplicate returns false
    /// without touching the counter.
    pub async fn cast_and_count(
        db: &DatabaseConnection,
        coin_slug: &str,
        voter: &str,
        voted_on: NaiveDate,
    ) -> Result<bool, DbErr> {
        let txn = db.begin().await?;

        if !Self::cast(&txn, coin_slug, voter, voted_on).await? {
            return Ok(false);
        }

        CoinRepository::bump_votes(&txn, coin_slug).await?;
        txn.commit().await?;

        Ok(true)
    }

    /// Vote totals per coin since the cutoff date, the trending input.
    pub async fn counts_since(
        db: &DatabaseConnection,
        cutoff: NaiveDate,
    ) -> Result<Vec<(String, i64)>, DbErr> {
        Entity::find()
            .select_only()
            .column(Column::CoinSlug)
            .column_as(Column::Id.count(), "votes")
            .filter(Column::VotedOn.gte(cutoff))
            .group_by(Column::CoinSlug)
            .into_tuple::<(String, i64)>()
            .all(db)
            .await
    }

    pub async fn delete_for_coin(db: &DatabaseConnection, coin_slug: &str) -> Result<u64, DbErr> {
        let res = Entity::delete_many()
            .filter(Column::CoinSlug.eq(coin_slug))
            .exec(db)
            .await?;

        Ok(res.rows_affected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{coins, test_db};
    use chrono::Duration;

    fn day(offset: i64) -> NaiveDate {
        Utc::now().date_naive() + Duration::days(offset)
    }

    async fn seed_coin(db: &DatabaseConnection, slug: &str) {
        CoinRepository::insert(
            db,
            coins::Model {
                slug: slug.to_string(),
                name: slug.to_string(),
                symbol: slug.to_string(),
                description: None,
                chain: None,
                contract_address: None,
                logo_url: None,
                links: None,
                is_presale: false,
                approved: true,
                votes: 0,
                submitted_by: None,
                price_usd: None,
                market_cap_usd: None,
                change_24h: None,
                price_updated_at: None,
                launched_at: None,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            },
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn one_vote_per_voter_per_day() {
        let db = test_db().await;

        assert!(VoteRepository::cast(&db, "bitcoin", "1.2.3.4", day(0))
            .await
            .unwrap());
        assert!(!VoteRepository::cast(&db, "bitcoin", "1.2.3.4", day(0))
            .await
            .unwrap());

        // Different day, coin, or voter are all fresh votes.
        assert!(VoteRepository::cast(&db, "bitcoin", "1.2.3.4", day(1))
            .await
            .unwrap());
        assert!(VoteRepository::cast(&db, "pepe", "1.2.3.4", day(0))
            .await
            .unwrap());
        assert!(VoteRepository::cast(&db, "bitcoin", "5.6.7.8", day(0))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn counter_tracks_accepted_votes_exactly() {
        let db = test_db().await;
        seed_coin(&db, "bitcoin").await;

        assert!(VoteRepository::cast_and_count(&db, "bitcoin", "1.2.3.4", day(0))
            .await
            .unwrap());
        assert!(!VoteRepository::cast_and_count(&db, "bitcoin", "1.2.3.4", day(0))
            .await
            .unwrap());
        assert!(VoteRepository::cast_and_count(&db, "bitcoin", "5.6.7.8", day(0))
            .await
            .unwrap());

        // Denormalized counter and the votes table agree: two accepted,
        // one rejected duplicate.
        let coin = CoinRepository::find_by_slug(&db, "bitcoin")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(coin.votes, 2);

        let counts = VoteRepository::counts_since(&db, day(-1)).await.unwrap();
        assert_eq!(counts, vec![("bitcoin".to_string(), 2)]);
    }

    #[tokio::test]
    async fn counts_since_respects_cutoff() {
        let db = test_db().await;

        VoteRepository::cast(&db, "bitcoin", "a", day(-5)).await.unwrap();
        VoteRepository::cast(&db, "bitcoin", "b", day(0)).await.unwrap();
        VoteRepository::cast(&db, "bitcoin", "c", day(0)).await.unwrap();
        VoteRepository::cast(&db, "pepe", "a", day(0)).await.unwrap();

        let mut counts = VoteRepository::counts_since(&db, day(-1)).await.unwrap();
        counts.sort();

        assert_eq!(
            counts,
            vec![("bitcoin".to_string(), 2), ("pepe".to_string(), 1)]
        );
    }

    #[tokio::test]
    async fn delete_for_coin_removes_history() {
        let db = test_db().await;

        VoteRepository::cast(&db, "bitcoin", "a", day(0)).await.unwrap();
        VoteRepository::cast(&db, "bitcoin", "b", day(0)).await.unwrap();

        assert_eq!(VoteRepository::delete_for_coin(&db, "bitcoin").await.unwrap(), 2);
        assert!(VoteRepository::counts_since(&db, day(-1)).await.unwrap().is_empty());
    }
}
