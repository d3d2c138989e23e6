//! Directory repository: companies, users and the manager tree.

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Unchanged, ColumnTrait, DatabaseConnection, EntityTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};

use claimflow_core::workflow::{
    Company, Directory, User, UserRole, WorkflowError, check_manager_assignment,
};
use claimflow_shared::types::{CompanyId, CurrencyCode, UserId};

use super::db_err;
use super::mapping::{company_from_model, to_db_time, user_from_model};
use crate::entities::{companies, sea_orm_active_enums, users};

/// Input for creating a user.
#[derive(Debug, Clone)]
pub struct CreateUserInput {
    /// Login email, unique across companies.
    pub email: String,
    /// Display name.
    pub name: String,
    /// Role within the company.
    pub role: UserRole,
    /// Optional manager in the same company.
    pub manager_id: Option<UserId>,
}

/// PostgreSQL-backed [`Directory`].
#[derive(Debug, Clone)]
pub struct DirectoryRepository {
    db: DatabaseConnection,
}

impl DirectoryRepository {
    /// Creates a new directory repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Creates a company.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn create_company(
        &self,
        name: &str,
        default_currency: CurrencyCode,
    ) -> Result<Company, WorkflowError> {
        let company = companies::ActiveModel {
            id: Set(CompanyId::new().into_inner()),
            name: Set(name.to_string()),
            default_currency: Set(default_currency.as_str().to_string()),
            created_at: Set(to_db_time(Utc::now())),
        };

        let model = company.insert(&self.db).await.map_err(db_err)?;
        company_from_model(model)
    }

    /// Creates a user in a company.
    ///
    /// # Errors
    ///
    /// Returns an error if the email is taken or the database operation fails.
    pub async fn create_user(
        &self,
        company_id: CompanyId,
        input: CreateUserInput,
    ) -> Result<User, WorkflowError> {
        let user = users::ActiveModel {
            id: Set(UserId::new().into_inner()),
            company_id: Set(company_id.into_inner()),
            email: Set(input.email.trim().to_lowercase()),
            name: Set(input.name),
            role: Set(input.role.into()),
            manager_id: Set(input.manager_id.map(UserId::into_inner)),
            created_at: Set(to_db_time(Utc::now())),
        };

        let model = user.insert(&self.db).await.map_err(db_err)?;
        Ok(user_from_model(model))
    }

    async fn find_user(&self, user_id: UserId) -> Result<Option<users::Model>, WorkflowError> {
        users::Entity::find_by_id(user_id.into_inner())
            .one(&self.db)
            .await
            .map_err(db_err)
    }
}

#[async_trait]
impl Directory for DirectoryRepository {
    async fn get_company(&self, company_id: CompanyId) -> Result<Option<Company>, WorkflowError> {
        companies::Entity::find_by_id(company_id.into_inner())
            .one(&self.db)
            .await
            .map_err(db_err)?
            .map(company_from_model)
            .transpose()
    }

    async fn get_user(&self, user_id: UserId) -> Result<Option<User>, WorkflowError> {
        Ok(self.find_user(user_id).await?.map(user_from_model))
    }

    async fn get_manager_of(&self, user_id: UserId) -> Result<Option<User>, WorkflowError> {
        let Some(user) = self.find_user(user_id).await? else {
            return Ok(None);
        };
        let Some(manager_id) = user.manager_id else {
            return Ok(None);
        };

        let manager = users::Entity::find_by_id(manager_id)
            .filter(users::Column::CompanyId.eq(user.company_id))
            .one(&self.db)
            .await
            .map_err(db_err)?;

        Ok(manager.map(user_from_model))
    }

    async fn list_direct_reports(&self, manager_id: UserId) -> Result<Vec<User>, WorkflowError> {
        let reports = users::Entity::find()
            .filter(users::Column::ManagerId.eq(manager_id.into_inner()))
            .order_by_asc(users::Column::Name)
            .all(&self.db)
            .await
            .map_err(db_err)?;

        Ok(reports.into_iter().map(user_from_model).collect())
    }

    async fn list_company_users(&self, company_id: CompanyId) -> Result<Vec<User>, WorkflowError> {
        let users = users::Entity::find()
            .filter(users::Column::CompanyId.eq(company_id.into_inner()))
            .order_by_asc(users::Column::Name)
            .order_by_asc(users::Column::Id)
            .all(&self.db)
            .await
            .map_err(db_err)?;

        Ok(users.into_iter().map(user_from_model).collect())
    }

    async fn list_approval_eligible_users(
        &self,
        company_id: CompanyId,
    ) -> Result<Vec<User>, WorkflowError> {
        let users = users::Entity::find()
            .filter(users::Column::CompanyId.eq(company_id.into_inner()))
            .filter(users::Column::Role.ne(sea_orm_active_enums::UserRole::Employee))
            .order_by_asc(users::Column::Name)
            .order_by_asc(users::Column::Id)
            .all(&self.db)
            .await
            .map_err(db_err)?;

        Ok(users.into_iter().map(user_from_model).collect())
    }

    async fn assign_manager(
        &self,
        company_id: CompanyId,
        user_id: UserId,
        manager_id: Option<UserId>,
    ) -> Result<User, WorkflowError> {
        let txn = self.db.begin().await.map_err(db_err)?;

        // The company row lock serializes every manager change in the company
        companies::Entity::find_by_id(company_id.into_inner())
            .lock_exclusive()
            .one(&txn)
            .await
            .map_err(db_err)?
            .ok_or(WorkflowError::not_found("company"))?;

        let members: Vec<User> = users::Entity::find()
            .filter(users::Column::CompanyId.eq(company_id.into_inner()))
            .all(&txn)
            .await
            .map_err(db_err)?
            .into_iter()
            .map(user_from_model)
            .collect();
        check_manager_assignment(&members, user_id, manager_id)?;

        let model = users::ActiveModel {
            id: Unchanged(user_id.into_inner()),
            manager_id: Set(manager_id.map(UserId::into_inner)),
            ..Default::default()
        }
        .update(&txn)
        .await
        .map_err(db_err)?;

        txn.commit().await.map_err(db_err)?;
        Ok(user_from_model(model))
    }
}
