use async_trait::async_trait;
use sea_orm::{
    ActiveValue::{NotSet, Set},
    ColumnTrait, ConnectionTrait, DatabaseConnection, DbBackend, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Statement,
};
use std::sync::Arc;
use tracing::{debug, info};

use crate::entities::lead::{
    ActiveModel as LeadActiveModel, Column, Entity as LeadEntity, Model as Lead,
};
use crate::db::check_connection;
use crate::errors::ServiceError;
use crate::ids::generate_public_id;
use crate::repositories::{BaseRepository, LeadStore, NewLead, Repository};

const SQLITE_CREATE_LEADS: &str = r#"CREATE TABLE IF NOT EXISTS leads (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    public_id TEXT UNIQUE NOT NULL,
    name TEXT NOT NULL,
    phone TEXT NOT NULL,
    city TEXT,
    quantity TEXT,
    message TEXT,
    created_at DATETIME DEFAULT CURRENT_TIMESTAMP
)"#;

const POSTGRES_CREATE_LEADS: &str = r#"CREATE TABLE IF NOT EXISTS leads (
    id BIGSERIAL PRIMARY KEY,
    public_id TEXT UNIQUE NOT NULL,
    name TEXT NOT NULL,
    phone TEXT NOT NULL,
    city TEXT,
    quantity TEXT,
    message TEXT,
    created_at TIMESTAMPTZ DEFAULT now()
)"#;

/// Schema statement for the `leads` table in the dialect of `backend`
fn create_leads_table_sql(backend: DbBackend) -> Result<&'static str, ServiceError> {
    match backend {
        DbBackend::Sqlite => Ok(SQLITE_CREATE_LEADS),
        DbBackend::Postgres => Ok(POSTGRES_CREATE_LEADS),
        other => Err(ServiceError::InternalError(format!(
            "unsupported database backend: {:?}",
            other
        ))),
    }
}

/// Lead storage over a sea-orm connection pool (SQLite or Postgres)
#[derive(Debug, Clone)]
pub struct LeadRepository {
    base: BaseRepository,
}

impl LeadRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }
}

impl Repository for LeadRepository {
    fn get_db(&self) -> &DatabaseConnection {
        self.base.get_db()
    }
}

#[async_trait]
impl LeadStore for LeadRepository {
    async fn initialize(&self) -> Result<(), ServiceError> {
        let db = self.get_db();
        let backend = db.get_database_backend();
        let sql = create_leads_table_sql(backend)?;

        db.execute(Statement::from_string(backend, sql.to_string()))
            .await?;

        info!(backend = ?backend, "Ensured leads table exists");
        Ok(())
    }

    async fn insert(&self, lead: NewLead) -> Result<String, ServiceError> {
        let public_id = generate_public_id();

        let model = LeadActiveModel {
            id: NotSet,
            public_id: Set(public_id.clone()),
            name: Set(lead.name),
            phone: Set(lead.phone),
            city: Set(lead.city),
            quantity: Set(lead.quantity),
            message: Set(lead.message),
            created_at: NotSet,
        };

        LeadEntity::insert(model)
            .exec_without_returning(self.get_db())
            .await?;

        debug!(public_id = %public_id, "Inserted lead");
        Ok(public_id)
    }

    async fn list_all(&self) -> Result<Vec<Lead>, ServiceError> {
        let leads = LeadEntity::find()
            .order_by_desc(Column::CreatedAt)
            .order_by_desc(Column::Id)
            .all(self.get_db())
            .await?;

        Ok(leads)
    }

    async fn find_by_public_id(&self, public_id: &str) -> Result<Option<Lead>, ServiceError> {
        let lead = LeadEntity::find()
            .filter(Column::PublicId.eq(public_id))
            .one(self.get_db())
            .await?;

        Ok(lead)
    }

    async fn delete_by_public_id(&self, public_id: &str) -> Result<bool, ServiceError> {
        let result = LeadEntity::delete_many()
            .filter(Column::PublicId.eq(public_id))
            .exec(self.get_db())
            .await?;

        debug!(public_id = %public_id, rows = result.rows_affected, "Deleted lead");
        Ok(result.rows_affected > 0)
    }

    async fn count(&self) -> Result<u64, ServiceError> {
        let total = LeadEntity::find().count(self.get_db()).await?;
        Ok(total)
    }

    async fn ping(&self) -> Result<(), ServiceError> {
        check_connection(self.get_db()).await
    }
}
