//! Database seeder for Claimflow development and testing.
//!
//! Seeds a demo company with one user per role, a manager tree and a
//! sequential approval rule, then prints an access token per user.
//!
//! Usage: cargo run --bin seeder

use std::sync::Arc;

use anyhow::Context;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};

use claimflow_core::currency::FixedRateConverter;
use claimflow_core::workflow::{
    ApprovalType, Directory, ExpenseLifecycle, NewApprovalRule, RuleApprover, User, UserRole,
};
use claimflow_db::entities::users;
use claimflow_db::repositories::directory::CreateUserInput;
use claimflow_db::{ApprovalRuleRepository, DirectoryRepository, ExpenseRepository};
use claimflow_shared::types::{CompanyId, CurrencyCode};
use claimflow_shared::{AppConfig, JwtService};

/// Admin login used to detect an already seeded database.
const ADMIN_EMAIL: &str = "admin@acme.claimflow.dev";

/// (email, name, role) of the demo users, admin first.
const DEMO_USERS: [(&str, &str, UserRole); 6] = [
    (ADMIN_EMAIL, "Ada Admin", UserRole::Admin),
    ("manager@acme.claimflow.dev", "Mona Manager", UserRole::Manager),
    ("employee@acme.claimflow.dev", "Eve Employee", UserRole::Employee),
    ("director@acme.claimflow.dev", "Dirk Director", UserRole::Director),
    ("cfo@acme.claimflow.dev", "Cleo Cfo", UserRole::Cfo),
    ("finance@acme.claimflow.dev", "Finn Finance", UserRole::Finance),
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("Failed to load configuration")?;

    println!("Connecting to database...");
    let db = claimflow_db::connect(&config.database.url, 2, 1)
        .await
        .context("Failed to connect to database")?;
    let directory = DirectoryRepository::new(db.clone());

    let users = if let Some(company_id) = seeded_company(&db).await? {
        println!("  Demo company already exists, skipping...");
        directory.list_company_users(company_id).await?
    } else {
        println!("Seeding demo company...");
        seed(&db, &directory).await?
    };

    let jwt = JwtService::new(&config.jwt);
    println!("Access tokens (valid {}s):", jwt.access_token_expires_in());
    for user in &users {
        let token = jwt.generate_access_token(user.id, user.company_id, user.role.as_str())?;
        println!("  {:<9} {:<30} {token}", user.role.as_str(), user.email);
    }

    println!("Seeding complete!");
    Ok(())
}

/// Returns the demo company if the admin user already exists.
async fn seeded_company(db: &DatabaseConnection) -> anyhow::Result<Option<CompanyId>> {
    let admin = users::Entity::find()
        .filter(users::Column::Email.eq(ADMIN_EMAIL))
        .one(db)
        .await?;
    Ok(admin.map(|a| a.company_id.into()))
}

async fn seed(
    db: &DatabaseConnection,
    directory: &DirectoryRepository,
) -> anyhow::Result<Vec<User>> {
    let company = directory
        .create_company("Acme Corp", CurrencyCode::EUR)
        .await?;

    let mut users: Vec<User> = Vec::with_capacity(DEMO_USERS.len());
    for (email, name, role) in DEMO_USERS {
        println!("  Seeding {role} {email}...");
        let user = directory
            .create_user(
                company.id,
                CreateUserInput {
                    email: email.to_string(),
                    name: name.to_string(),
                    role,
                    manager_id: None,
                },
            )
            .await?;
        users.push(user);
    }

    let by_role = |role: UserRole| {
        users
            .iter()
            .find(|u| u.role == role)
            .map(|u| u.id)
            .context("demo user missing")
    };
    let admin = by_role(UserRole::Admin)?;
    let manager = by_role(UserRole::Manager)?;
    let employee = by_role(UserRole::Employee)?;
    let director = by_role(UserRole::Director)?;
    let cfo = by_role(UserRole::Cfo)?;

    let lifecycle = ExpenseLifecycle::new(
        Arc::new(directory.clone()),
        Arc::new(ApprovalRuleRepository::new(db.clone())),
        Arc::new(ExpenseRepository::new(db.clone())),
        Arc::new(FixedRateConverter::new()),
    );

    println!("  Building manager tree...");
    lifecycle.assign_manager(admin, employee, Some(manager)).await?;
    lifecycle.assign_manager(admin, manager, Some(director)).await?;

    println!("  Seeding approval rule...");
    lifecycle
        .create_rule(
            admin,
            NewApprovalRule {
                name: "Manager, then director and CFO".to_string(),
                is_manager_approver: true,
                approval_type: ApprovalType::Sequential,
                percentage_required: None,
                specific_approver_id: None,
                approvers: vec![
                    RuleApprover {
                        user_id: director,
                        sequence_order: 1,
                    },
                    RuleApprover {
                        user_id: cfo,
                        sequence_order: 2,
                    },
                ],
            },
        )
        .await?;

    Ok(directory.list_company_users(company.id).await?)
}
