use chrono::{DateTime, Utc};
use feeds::Quote;
use sea_orm::{
    ActiveValue::{NotSet, Set},
    ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait, FromJsonQueryResult,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
    entity::prelude::*,
    sea_query::{Expr, ExprTrait, OnConflict},
};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "coins")]
pub struct Model {
    /// Doubles as the CoinGecko asset id and the CoinMarketCap slug.
    #[sea_orm(primary_key, auto_increment = false)]
    pub slug: String,
    pub name: String,
    pub symbol: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,
    pub chain: Option<String>,
    pub contract_address: Option<String>,
    pub logo_url: Option<String>,
    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub links: Option<CoinLinks>,
    pub is_presale: bool,
    pub approved: bool,
    /// Denormalized all-time total, bumped on every accepted vote.
    pub votes: i64,
    pub submitted_by: Option<i64>,
    // Price mirror, refreshed by the price job and served when every
    // live provider fails.
    pub price_usd: Option<f64>,
    pub market_cap_usd: Option<f64>,
    pub change_24h: Option<f64>,
    pub price_updated_at: Option<DateTime<Utc>>,
    pub launched_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult)]
pub struct CoinLinks {
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub telegram: Option<String>,
    #[serde(default)]
    pub twitter: Option<String>,
    #[serde(default)]
    pub explorer: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoinSort {
    #[default]
    Votes,
    MarketCap,
    Newest,
}

/// Admin metadata edit. Absent fields keep their current value.
#[derive(Debug, Default, Deserialize)]
pub struct CoinMetaPatch {
    pub name: Option<String>,
    pub symbol: Option<String>,
    pub description: Option<String>,
    pub chain: Option<String>,
    pub contract_address: Option<String>,
    pub logo_url: Option<String>,
    pub links: Option<CoinLinks>,
    pub is_presale: Option<bool>,
    pub launched_at: Option<DateTime<Utc>>,
}

pub struct CoinRepository;

impl CoinRepository {
    pub async fn find_by_slug(
        db: &DatabaseConnection,
        slug: &str,
    ) -> Result<Option<Model>, DbErr> {
        Entity::find_by_id(slug).one(db).await
    }

    pub async fn list_approved(
        db: &DatabaseConnection,
        sort: CoinSort,
        page: u64,
        per_page: u64,
    ) -> Result<Vec<Model>, DbErr> {
        let query = Entity::find().filter(Column::Approved.eq(true));

        let query = match sort {
            CoinSort::Votes => query.order_by_desc(Column::Votes),
            CoinSort::MarketCap => query.order_by_desc(Column::MarketCapUsd),
            CoinSort::Newest => query.order_by_desc(Column::CreatedAt),
        };

        query
            .paginate(db, per_page)
            .fetch_page(page.saturating_sub(1))
            .await
    }

    pub async fn find_by_slugs(
        db: &DatabaseConnection,
        slugs: &[String],
    ) -> Result<Vec<Model>, DbErr> {
        if slugs.is_empty() {
            return Ok(Vec::new());
        }

        Entity::find()
            .filter(Column::Slug.is_in(slugs.iter().cloned()))
            .all(db)
            .await
    }

    pub async fn list_pending(db: &DatabaseConnection) -> Result<Vec<Model>, DbErr> {
        Entity::find()
            .filter(Column::Approved.eq(false))
            .order_by_asc(Column::CreatedAt)
            .all(db)
            .await
    }

    pub async fn approved_slugs(db: &DatabaseConnection) -> Result<Vec<String>, DbErr> {
        Entity::find()
            .select_only()
            .column(Column::Slug)
            .filter(Column::Approved.eq(true))
            .order_by_asc(Column::Slug)
            .into_tuple::<String>()
            .all(db)
            .await
    }

    /// Insert a brand-new listing. The slug primary key is the only
    /// uniqueness authority; a taken slug surfaces as
    /// `DbErr::RecordNotInserted` even under concurrent submissions.
    pub async fn insert(db: &DatabaseConnection, coin: Model) -> Result<Model, DbErr> {
        let now = Utc::now();
        let active = ActiveModel {
            slug: Set(coin.slug.clone()),
            name: Set(coin.name.clone()),
            symbol: Set(coin.symbol.clone()),
            description: Set(coin.description.clone()),
            chain: Set(coin.chain.clone()),
            contract_address: Set(coin.contract_address.clone()),
            logo_url: Set(coin.logo_url.clone()),
            links: Set(coin.links.clone()),
            is_presale: Set(coin.is_presale),
            approved: Set(coin.approved),
            votes: Set(0),
            submitted_by: Set(coin.submitted_by),
            price_usd: Set(coin.price_usd),
            market_cap_usd: Set(coin.market_cap_usd),
            change_24h: Set(coin.change_24h),
            price_updated_at: Set(coin.price_updated_at),
            launched_at: Set(coin.launched_at),
            created_at: Set(now),
            updated_at: Set(now),
        };

        Entity::insert(active)
            .on_conflict(OnConflict::column(Column::Slug).do_nothing().to_owned())
            .exec(db)
            .await?;

        Ok(Model {
            votes: 0,
            created_at: now,
            updated_at: now,
            ..coin
        })
    }

    /// Bulk-import upsert: a new slug is inserted as an approved listing,
    /// an existing one only gets its market fields refreshed.
    pub async fn upsert_market(
        db: &DatabaseConnection,
        slug: &str,
        name: &str,
        symbol: &str,
        logo_url: Option<String>,
        quote: &Quote,
    ) -> Result<(), DbErr> {
        let now = Utc::now();
        let active = ActiveModel {
            slug: Set(slug.to_string()),
            name: Set(name.to_string()),
            symbol: Set(symbol.to_string()),
            description: NotSet,
            chain: NotSet,
            contract_address: NotSet,
            logo_url: Set(logo_url),
            links: NotSet,
            is_presale: Set(false),
            approved: Set(true),
            votes: Set(0),
            submitted_by: NotSet,
            price_usd: Set(Some(quote.price_usd)),
            market_cap_usd: Set(quote.market_cap_usd),
            change_24h: Set(quote.change_24h),
            price_updated_at: Set(Some(quote.fetched_at)),
            launched_at: NotSet,
            created_at: Set(now),
            updated_at: Set(now),
        };

        Entity::insert(active)
            .on_conflict(
                OnConflict::column(Column::Slug)
                    .update_columns([
                        Column::Name,
                        Column::Symbol,
                        Column::LogoUrl,
                        Column::PriceUsd,
                        Column::MarketCapUsd,
                        Column::Change24h,
                        Column::PriceUpdatedAt,
                        Column::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(db)
            .await?;

        Ok(())
    }

    pub async fn approve(db: &DatabaseConnection, slug: &str) -> Result<Option<Model>, DbErr> {
        let Some(coin) = Self::find_by_slug(db, slug).await? else {
            return Ok(None);
        };

        let mut active: ActiveModel = coin.into();
        active.approved = Set(true);
        active.updated_at = Set(Utc::now());

        Ok(Some(active.update(db).await?))
    }

    pub async fn update_meta(
        db: &DatabaseConnection,
        slug: &str,
        patch: CoinMetaPatch,
    ) -> Result<Option<Model>, DbErr> {
        let Some(coin) = Self::find_by_slug(db, slug).await? else {
            return Ok(None);
        };

        let mut active: ActiveModel = coin.into();

        if let Some(name) = patch.name {
            active.name = Set(name);
        }
        if let Some(symbol) = patch.symbol {
            active.symbol = Set(symbol);
        }
        if let Some(description) = patch.description {
            active.description = Set(Some(description));
        }
        if let Some(chain) = patch.chain {
            active.chain = Set(Some(chain));
        }
        if let Some(contract_address) = patch.contract_address {
            active.contract_address = Set(Some(contract_address));
        }
        if let Some(logo_url) = patch.logo_url {
            active.logo_url = Set(Some(logo_url));
        }
        if let Some(links) = patch.links {
            active.links = Set(Some(links));
        }
        if let Some(is_presale) = patch.is_presale {
            active.is_presale = Set(is_presale);
        }
        if let Some(launched_at) = patch.launched_at {
            active.launched_at = Set(Some(launched_at));
        }
        active.updated_at = Set(Utc::now());

        Ok(Some(active.update(db).await?))
    }

    pub async fn delete(db: &DatabaseConnection, slug: &str) -> Result<bool, DbErr> {
        let res = Entity::delete_by_id(slug).exec(db).await?;

        Ok(res.rows_affected > 0)
    }

    pub async fn bump_votes<C: ConnectionTrait>(db: &C, slug: &str) -> Result<(), DbErr> {
        Entity::update_many()
            .col_expr(Column::Votes, Expr::col(Column::Votes).add(1))
            .filter(Column::Slug.eq(slug))
            .exec(db)
            .await?;

        Ok(())
    }

    /// Write-through of a fresh quote. `None` fields keep the previous
    /// mirror value so a sparse provider never erases fuller data.
    pub async fn update_price_mirror(
        db: &DatabaseConnection,
        slug: &str,
        quote: &Quote,
    ) -> Result<(), DbErr> {
        let mut update = Entity::update_many()
            .col_expr(Column::PriceUsd, Expr::value(quote.price_usd))
            .col_expr(Column::PriceUpdatedAt, Expr::value(quote.fetched_at))
            .filter(Column::Slug.eq(slug));

        if let Some(market_cap) = quote.market_cap_usd {
            update = update.col_expr(Column::MarketCapUsd, Expr::value(market_cap));
        }
        if let Some(change) = quote.change_24h {
            update = update.col_expr(Column::Change24h, Expr::value(change));
        }

        update.exec(db).await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_db;

    fn sample(slug: &str, approved: bool) -> Model {
        Model {
            slug: slug.to_string(),
            name: slug.to_string(),
            symbol: slug[..3.min(slug.len())].to_string(),
            description: None,
            chain: None,
            contract_address: None,
            logo_url: None,
            links: None,
            is_presale: false,
            approved,
            votes: 0,
            submitted_by: None,
            price_usd: None,
            market_cap_usd: None,
            change_24h: None,
            price_updated_at: None,
            launched_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn quote(slug: &str, price: f64) -> Quote {
        Quote {
            slug: slug.to_string(),
            price_usd: price,
            market_cap_usd: Some(1_000_000.0),
            change_24h: Some(2.5),
            fetched_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn approval_gates_public_listing() {
        let db = test_db().await;

        CoinRepository::insert(&db, sample("bitcoin", true))
            .await
            .unwrap();
        CoinRepository::insert(&db, sample("newcoin", false))
            .await
            .unwrap();

        let listed = CoinRepository::list_approved(&db, CoinSort::Votes, 1, 50)
            .await
            .unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].slug, "bitcoin");

        let pending = CoinRepository::list_pending(&db).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].slug, "newcoin");

        let approved = CoinRepository::approve(&db, "newcoin").await.unwrap();
        assert!(approved.unwrap().approved);

        let listed = CoinRepository::list_approved(&db, CoinSort::Votes, 1, 50)
            .await
            .unwrap();
        assert_eq!(listed.len(), 2);
    }

    #[tokio::test]
    async fn duplicate_slug_insert_is_rejected() {
        let db = test_db().await;

        CoinRepository::insert(&db, sample("bitcoin", true))
            .await
            .unwrap();

        let err = CoinRepository::insert(&db, sample("bitcoin", false))
            .await
            .unwrap_err();
        assert!(matches!(err, DbErr::RecordNotInserted));

        // The original row is untouched by the losing insert.
        let coin = CoinRepository::find_by_slug(&db, "bitcoin")
            .await
            .unwrap()
            .unwrap();
        assert!(coin.approved);
    }

    #[tokio::test]
    async fn upsert_market_refreshes_existing_rows() {
        let db = test_db().await;

        CoinRepository::upsert_market(&db, "bitcoin", "Bitcoin", "btc", None, &quote("bitcoin", 1.0))
            .await
            .unwrap();
        CoinRepository::upsert_market(&db, "bitcoin", "Bitcoin", "btc", None, &quote("bitcoin", 2.0))
            .await
            .unwrap();

        let coin = CoinRepository::find_by_slug(&db, "bitcoin")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(coin.price_usd, Some(2.0));
        assert!(coin.approved);
    }

    #[tokio::test]
    async fn price_mirror_keeps_old_fields_on_sparse_quote() {
        let db = test_db().await;

        CoinRepository::insert(&db, sample("bitcoin", true))
            .await
            .unwrap();
        CoinRepository::update_price_mirror(&db, "bitcoin", &quote("bitcoin", 10.0))
            .await
            .unwrap();

        let sparse = Quote {
            market_cap_usd: None,
            change_24h: None,
            ..quote("bitcoin", 11.0)
        };
        CoinRepository::update_price_mirror(&db, "bitcoin", &sparse)
            .await
            .unwrap();

        let coin = CoinRepository::find_by_slug(&db, "bitcoin")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(coin.price_usd, Some(11.0));
        assert_eq!(coin.market_cap_usd, Some(1_000_000.0));
        assert_eq!(coin.change_24h, Some(2.5));
    }

    #[tokio::test]
    async fn sorting_and_pagination() {
        let db = test_db().await;

        for (slug, votes) in [("a-coin", 5), ("b-coin", 9), ("c-coin", 1)] {
            CoinRepository::insert(&db, sample(slug, true)).await.unwrap();
            for _ in 0..votes {
                CoinRepository::bump_votes(&db, slug).await.unwrap();
            }
        }

        let by_votes = CoinRepository::list_approved(&db, CoinSort::Votes, 1, 2)
            .await
            .unwrap();
        assert_eq!(by_votes.len(), 2);
        assert_eq!(by_votes[0].slug, "b-coin");
        assert_eq!(by_votes[1].slug, "a-coin");

        let page_two = CoinRepository::list_approved(&db, CoinSort::Votes, 2, 2)
            .await
            .unwrap();
        assert_eq!(page_two.len(), 1);
        assert_eq!(page_two[0].slug, "c-coin");
    }
}
