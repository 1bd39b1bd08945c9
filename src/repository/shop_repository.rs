use async_trait::async_trait;
use chrono::{DateTime, Utc, NaiveDateTime};
use sqlx::{SqlitePool, FromRow};
use uuid::Uuid;

use crate::{
    domain::{CreateShopRequest, Shop, ShopFilter, ShopStatus, UpdateShopRequest},
    error::{AppError, Result},
    repository::ShopRepository,
};

const SHOP_COLUMNS: &str = r#"
    id, owner_id, name, logo_url, industry, shop_number, city, mall,
    contact_number, owner_email, status, created_at, updated_at
"#;

#[derive(FromRow)]
struct ShopRow {
    id: String,
    owner_id: String,
    name: String,
    logo_url: Option<String>,
    industry: String,
    shop_number: String,
    city: String,
    mall: String,
    contact_number: String,
    owner_email: Option<String>,
    status: String,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

pub struct SqliteShopRepository {
    pool: SqlitePool,
}

impl SqliteShopRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_shop(row: ShopRow) -> Result<Shop> {
        Ok(Shop {
            id: Uuid::parse_str(&row.id).map_err(|e| AppError::Database(e.to_string()))?,
            owner_id: Uuid::parse_str(&row.owner_id).map_err(|e| AppError::Database(e.to_string()))?,
            name: row.name,
            logo_url: row.logo_url,
            industry: row.industry,
            shop_number: row.shop_number,
            city: row.city,
            mall: row.mall,
            contact_number: row.contact_number,
            owner_email: row.owner_email,
            status: ShopStatus::from_str(&row.status)
                .ok_or_else(|| AppError::Database(format!("Invalid shop status: {}", row.status)))?,
            created_at: DateTime::from_naive_utc_and_offset(row.created_at, Utc),
            updated_at: DateTime::from_naive_utc_and_offset(row.updated_at, Utc),
        })
    }
}

#[async_trait]
impl ShopRepository for SqliteShopRepository {
    async fn create(&self, request: CreateShopRequest) -> Result<Shop> {
        let id = Uuid::new_v4();
        let now = Utc::now().naive_utc();

        sqlx::query(
            r#"
            INSERT INTO shops (
                id, owner_id, name, logo_url, industry, shop_number, city, mall,
                contact_number, owner_email, status, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#
        )
        .bind(id.to_string())
        .bind(request.owner_id.to_string())
        .bind(&request.name)
        .bind(&request.logo_url)
        .bind(&request.industry)
        .bind(&request.shop_number)
        .bind(&request.city)
        .bind(&request.mall)
        .bind(&request.contact_number)
        .bind(&request.owner_email)
        .bind(ShopStatus::Pending.as_str())
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        self.find_by_id(id).await?.ok_or_else(|| {
            AppError::Database("Failed to retrieve created shop".to_string())
        })
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Shop>> {
        let sql = format!("SELECT {} FROM shops WHERE id = ?", SHOP_COLUMNS);
        let row = sqlx::query_as::<_, ShopRow>(&sql)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        row.map(Self::row_to_shop).transpose()
    }

    async fn list(&self, filter: &ShopFilter) -> Result<Vec<Shop>> {
        // Each filter is optional: a NULL bind matches every row.
        let sql = format!(
            r#"
            SELECT {} FROM shops
            WHERE (?1 IS NULL OR status = ?1)
              AND (?2 IS NULL OR city = ?2)
              AND (?3 IS NULL OR mall = ?3)
              AND (?4 IS NULL OR industry = ?4)
              AND (?5 IS NULL OR owner_id = ?5)
            ORDER BY name ASC
            "#,
            SHOP_COLUMNS
        );

        let rows = sqlx::query_as::<_, ShopRow>(&sql)
            .bind(filter.status.map(|s| s.as_str()))
            .bind(filter.city.as_deref())
            .bind(filter.mall.as_deref())
            .bind(filter.industry.as_deref())
            .bind(filter.owner_id.map(|id| id.to_string()))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        rows.into_iter()
            .map(Self::row_to_shop)
            .collect()
    }

    async fn list_billable(&self) -> Result<Vec<Shop>> {
        let sql = format!(
            "SELECT {} FROM shops WHERE status IN ('approved', 'active', 'inactive') ORDER BY created_at",
            SHOP_COLUMNS
        );
        let rows = sqlx::query_as::<_, ShopRow>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        rows.into_iter()
            .map(Self::row_to_shop)
            .collect()
    }

    async fn update_status(&self, id: Uuid, status: ShopStatus) -> Result<Shop> {
        let result = sqlx::query("UPDATE shops SET status = ?, updated_at = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(Utc::now().naive_utc())
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Shop not found".to_string()));
        }

        self.find_by_id(id).await?.ok_or_else(|| {
            AppError::Database("Failed to retrieve updated shop".to_string())
        })
    }

    async fn update_details(&self, id: Uuid, changes: &UpdateShopRequest) -> Result<Shop> {
        let result = sqlx::query(
            r#"
            UPDATE shops SET
                name = COALESCE(?1, name),
                logo_url = COALESCE(?2, logo_url),
                industry = COALESCE(?3, industry),
                shop_number = COALESCE(?4, shop_number),
                city = COALESCE(?5, city),
                mall = COALESCE(?6, mall),
                contact_number = COALESCE(?7, contact_number),
                owner_email = COALESCE(?8, owner_email),
                updated_at = ?9
            WHERE id = ?10
            "#
        )
        .bind(changes.name.as_deref())
        .bind(changes.logo_url.as_deref())
        .bind(changes.industry.as_deref())
        .bind(changes.shop_number.as_deref())
        .bind(changes.city.as_deref())
        .bind(changes.mall.as_deref())
        .bind(changes.contact_number.as_deref())
        .bind(changes.owner_email.as_deref())
        .bind(Utc::now().naive_utc())
        .bind(id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Shop not found".to_string()));
        }

        self.find_by_id(id).await?.ok_or_else(|| {
            AppError::Database("Failed to retrieve updated shop".to_string())
        })
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM shops WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Shop not found".to_string()));
        }

        Ok(())
    }
}
