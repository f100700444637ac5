//! # Directory Repository
//!
//! Locations, customers, pets and services. The clinic application owns the
//! CRUD for these; the ledger only needs to confirm a reference exists for the
//! tenant before a checkout or transfer, plus inserts for seeding and tests.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::DbResult;
use vetpos_core::{Customer, Location, Pet, Service};

// =============================================================================
// Connection-level lookups (usable inside a transaction)
// =============================================================================

pub(crate) async fn find_location(
    conn: &mut SqliteConnection,
    tenant_id: &str,
    id: &str,
) -> DbResult<Option<Location>> {
    let location = sqlx::query_as::<_, Location>(
        "SELECT id, tenant_id, name, created_at FROM locations WHERE id = ?1 AND tenant_id = ?2",
    )
    .bind(id)
    .bind(tenant_id)
    .fetch_optional(conn)
    .await?;

    Ok(location)
}

pub(crate) async fn find_customer(
    conn: &mut SqliteConnection,
    tenant_id: &str,
    id: &str,
) -> DbResult<Option<Customer>> {
    let customer = sqlx::query_as::<_, Customer>(
        r#"
        SELECT id, tenant_id, name, phone, email, created_at
        FROM customers
        WHERE id = ?1 AND tenant_id = ?2
        "#,
    )
    .bind(id)
    .bind(tenant_id)
    .fetch_optional(conn)
    .await?;

    Ok(customer)
}

pub(crate) async fn find_pet(
    conn: &mut SqliteConnection,
    tenant_id: &str,
    id: &str,
) -> DbResult<Option<Pet>> {
    let pet = sqlx::query_as::<_, Pet>(
        r#"
        SELECT id, tenant_id, customer_id, name, species, created_at
        FROM pets
        WHERE id = ?1 AND tenant_id = ?2
        "#,
    )
    .bind(id)
    .bind(tenant_id)
    .fetch_optional(conn)
    .await?;

    Ok(pet)
}

pub(crate) async fn find_service(
    conn: &mut SqliteConnection,
    tenant_id: &str,
    id: &str,
) -> DbResult<Option<Service>> {
    let service = sqlx::query_as::<_, Service>(
        r#"
        SELECT id, tenant_id, name, price_cents, is_active, created_at
        FROM services
        WHERE id = ?1 AND tenant_id = ?2
        "#,
    )
    .bind(id)
    .bind(tenant_id)
    .fetch_optional(conn)
    .await?;

    Ok(service)
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for the reference records a sale or transfer points at.
#[derive(Debug, Clone)]
pub struct DirectoryRepository {
    pool: SqlitePool,
}

impl DirectoryRepository {
    pub fn new(pool: SqlitePool) -> Self {
        DirectoryRepository { pool }
    }

    pub async fn get_location(&self, tenant_id: &str, id: &str) -> DbResult<Option<Location>> {
        let mut conn = self.pool.acquire().await?;
        find_location(&mut conn, tenant_id, id).await
    }

    pub async fn get_customer(&self, tenant_id: &str, id: &str) -> DbResult<Option<Customer>> {
        let mut conn = self.pool.acquire().await?;
        find_customer(&mut conn, tenant_id, id).await
    }

    pub async fn get_pet(&self, tenant_id: &str, id: &str) -> DbResult<Option<Pet>> {
        let mut conn = self.pool.acquire().await?;
        find_pet(&mut conn, tenant_id, id).await
    }

    pub async fn get_service(&self, tenant_id: &str, id: &str) -> DbResult<Option<Service>> {
        let mut conn = self.pool.acquire().await?;
        find_service(&mut conn, tenant_id, id).await
    }

    /// Lists a tenant's locations by name.
    pub async fn list_locations(&self, tenant_id: &str) -> DbResult<Vec<Location>> {
        let locations = sqlx::query_as::<_, Location>(
            "SELECT id, tenant_id, name, created_at FROM locations WHERE tenant_id = ?1 ORDER BY name",
        )
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(locations)
    }

    pub async fn create_location(&self, tenant_id: &str, name: &str) -> DbResult<Location> {
        let location = Location {
            id: Uuid::new_v4().to_string(),
            tenant_id: tenant_id.to_string(),
            name: name.to_string(),
            created_at: Utc::now(),
        };

        debug!(id = %location.id, tenant_id = %tenant_id, "Creating location");

        sqlx::query("INSERT INTO locations (id, tenant_id, name, created_at) VALUES (?1, ?2, ?3, ?4)")
            .bind(&location.id)
            .bind(&location.tenant_id)
            .bind(&location.name)
            .bind(location.created_at)
            .execute(&self.pool)
            .await?;

        Ok(location)
    }

    pub async fn create_customer(
        &self,
        tenant_id: &str,
        name: &str,
        phone: Option<&str>,
        email: Option<&str>,
    ) -> DbResult<Customer> {
        let customer = Customer {
            id: Uuid::new_v4().to_string(),
            tenant_id: tenant_id.to_string(),
            name: name.to_string(),
            phone: phone.map(str::to_string),
            email: email.map(str::to_string),
            created_at: Utc::now(),
        };

        debug!(id = %customer.id, tenant_id = %tenant_id, "Creating customer");

        sqlx::query(
            r#"
            INSERT INTO customers (id, tenant_id, name, phone, email, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&customer.id)
        .bind(&customer.tenant_id)
        .bind(&customer.name)
        .bind(&customer.phone)
        .bind(&customer.email)
        .bind(customer.created_at)
        .execute(&self.pool)
        .await?;

        Ok(customer)
    }

    pub async fn create_pet(
        &self,
        tenant_id: &str,
        customer_id: &str,
        name: &str,
        species: Option<&str>,
    ) -> DbResult<Pet> {
        let pet = Pet {
            id: Uuid::new_v4().to_string(),
            tenant_id: tenant_id.to_string(),
            customer_id: customer_id.to_string(),
            name: name.to_string(),
            species: species.map(str::to_string),
            created_at: Utc::now(),
        };

        debug!(id = %pet.id, customer_id = %customer_id, "Creating pet");

        sqlx::query(
            r#"
            INSERT INTO pets (id, tenant_id, customer_id, name, species, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&pet.id)
        .bind(&pet.tenant_id)
        .bind(&pet.customer_id)
        .bind(&pet.name)
        .bind(&pet.species)
        .bind(pet.created_at)
        .execute(&self.pool)
        .await?;

        Ok(pet)
    }

    pub async fn create_service(&self, tenant_id: &str, name: &str, price_cents: i64) -> DbResult<Service> {
        let service = Service {
            id: Uuid::new_v4().to_string(),
            tenant_id: tenant_id.to_string(),
            name: name.to_string(),
            price_cents,
            is_active: true,
            created_at: Utc::now(),
        };

        debug!(id = %service.id, tenant_id = %tenant_id, "Creating service");

        sqlx::query(
            r#"
            INSERT INTO services (id, tenant_id, name, price_cents, is_active, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&service.id)
        .bind(&service.tenant_id)
        .bind(&service.name)
        .bind(service.price_cents)
        .bind(service.is_active)
        .bind(service.created_at)
        .execute(&self.pool)
        .await?;

        Ok(service)
    }
}

#[cfg(test)]
mod tests {
    use crate::{Database, DbConfig};

    const TENANT: &str = "6f1c2a4e-0000-4000-8000-000000000001";
    const OTHER_TENANT: &str = "6f1c2a4e-0000-4000-8000-000000000002";

    #[tokio::test]
    async fn test_lookups_are_tenant_scoped() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let directory = db.directory();

        let location = directory.create_location(TENANT, "Main Clinic").await.unwrap();
        let customer = directory
            .create_customer(TENANT, "Ana Ruiz", Some("555-0101"), None)
            .await
            .unwrap();
        let pet = directory
            .create_pet(TENANT, &customer.id, "Luna", Some("canine"))
            .await
            .unwrap();

        assert!(directory.get_location(TENANT, &location.id).await.unwrap().is_some());
        assert!(directory.get_location(OTHER_TENANT, &location.id).await.unwrap().is_none());
        assert!(directory.get_customer(OTHER_TENANT, &customer.id).await.unwrap().is_none());

        let found = directory.get_pet(TENANT, &pet.id).await.unwrap().unwrap();
        assert_eq!(found.customer_id, customer.id);
    }

    #[tokio::test]
    async fn test_pet_requires_existing_customer() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let result = db
            .directory()
            .create_pet(TENANT, "00000000-0000-4000-8000-00000000dead", "Milo", None)
            .await;

        assert!(matches!(result, Err(crate::DbError::ForeignKeyViolation { .. })));
    }
}
