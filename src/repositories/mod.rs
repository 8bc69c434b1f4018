use async_trait::async_trait;
use sea_orm::DatabaseConnection;
use std::sync::Arc;

use crate::entities::lead::Model as Lead;
use crate::errors::ServiceError;

pub mod lead_repository;

pub use lead_repository::LeadRepository;

/// Repository trait for common database operations
pub trait Repository {
    fn get_db(&self) -> &DatabaseConnection;
}

#[derive(Debug, Clone)]
pub struct BaseRepository {
    db: Arc<DatabaseConnection>,
}

impl BaseRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

impl Repository for BaseRepository {
    fn get_db(&self) -> &DatabaseConnection {
        &self.db
    }
}

/// Fields of a lead accepted from a submission, before an id is assigned
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLead {
    pub name: String,
    pub phone: String,
    pub city: Option<String>,
    pub quantity: Option<String>,
    pub message: Option<String>,
}

/// Persistence operations on leads.
///
/// Every lookup is keyed by the public id; the storage row id never crosses
/// this boundary.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LeadStore: Send + Sync {
    /// Creates the `leads` table when it does not exist yet
    async fn initialize(&self) -> Result<(), ServiceError>;

    /// Stores a lead and returns its newly generated public id
    async fn insert(&self, lead: NewLead) -> Result<String, ServiceError>;

    /// All leads, newest first
    async fn list_all(&self) -> Result<Vec<Lead>, ServiceError>;

    async fn find_by_public_id(&self, public_id: &str) -> Result<Option<Lead>, ServiceError>;

    /// Returns `true` when a row was removed
    async fn delete_by_public_id(&self, public_id: &str) -> Result<bool, ServiceError>;

    async fn count(&self) -> Result<u64, ServiceError>;

    /// Round-trips to the backing database
    async fn ping(&self) -> Result<(), ServiceError>;
}
