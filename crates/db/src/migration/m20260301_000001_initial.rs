//! Initial database migration.
//!
//! Creates the enum types and the tables for companies, users, approval rules,
//! expenses and their approval steps.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        // ============================================================
        // PART 1: ENUMS
        // ============================================================
        db.execute_unprepared(ENUMS_SQL).await?;

        // ============================================================
        // PART 2: DIRECTORY
        // ============================================================
        db.execute_unprepared(COMPANIES_SQL).await?;
        db.execute_unprepared(USERS_SQL).await?;

        // ============================================================
        // PART 3: APPROVAL RULES
        // ============================================================
        db.execute_unprepared(APPROVAL_RULES_SQL).await?;
        db.execute_unprepared(APPROVAL_RULE_APPROVERS_SQL).await?;

        // ============================================================
        // PART 4: EXPENSES & APPROVAL LEDGER
        // ============================================================
        db.execute_unprepared(EXPENSES_SQL).await?;
        db.execute_unprepared(EXPENSE_APPROVALS_SQL).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(DROP_ALL_SQL).await?;
        Ok(())
    }
}

// ============================================================
// SQL CONSTANTS
// ============================================================

const ENUMS_SQL: &str = r"
CREATE TYPE user_role AS ENUM (
    'admin',
    'employee',
    'manager',
    'director',
    'cfo',
    'finance'
);

CREATE TYPE approval_type AS ENUM ('sequential', 'percentage', 'specific', 'hybrid');

CREATE TYPE expense_status AS ENUM ('pending', 'approved', 'rejected');

CREATE TYPE approval_status AS ENUM ('pending', 'approved', 'rejected');
";

const COMPANIES_SQL: &str = r"
CREATE TABLE companies (
    id UUID PRIMARY KEY,
    name VARCHAR(255) NOT NULL,
    default_currency CHAR(3) NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),

    CONSTRAINT chk_default_currency_format CHECK (default_currency ~ '^[A-Z]{3}$')
);
";

const USERS_SQL: &str = r"
CREATE TABLE users (
    id UUID PRIMARY KEY,
    company_id UUID NOT NULL REFERENCES companies(id) ON DELETE CASCADE,
    email VARCHAR(255) NOT NULL UNIQUE,
    name VARCHAR(255) NOT NULL,
    role user_role NOT NULL DEFAULT 'employee',
    manager_id UUID REFERENCES users(id) ON DELETE SET NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),

    CONSTRAINT chk_not_own_manager CHECK (manager_id IS NULL OR manager_id <> id)
);

CREATE INDEX idx_users_company ON users(company_id);
CREATE INDEX idx_users_manager ON users(manager_id) WHERE manager_id IS NOT NULL;
";

const APPROVAL_RULES_SQL: &str = r"
CREATE TABLE approval_rules (
    id UUID PRIMARY KEY,
    company_id UUID NOT NULL REFERENCES companies(id) ON DELETE CASCADE,
    name VARCHAR(255) NOT NULL,
    is_manager_approver BOOLEAN NOT NULL DEFAULT false,
    approval_type approval_type NOT NULL,
    percentage_required SMALLINT,
    specific_approver_id UUID REFERENCES users(id) ON DELETE RESTRICT,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),

    CONSTRAINT chk_percentage_range CHECK (
        percentage_required IS NULL OR percentage_required BETWEEN 1 AND 100
    ),
    CONSTRAINT chk_percentage_iff_threshold_type CHECK (
        (approval_type IN ('percentage', 'hybrid')) = (percentage_required IS NOT NULL)
    ),
    CONSTRAINT chk_specific_iff_specific_type CHECK (
        (approval_type IN ('specific', 'hybrid')) = (specific_approver_id IS NOT NULL)
    )
);

-- Active rule selection: first created per company
CREATE INDEX idx_approval_rules_company_created ON approval_rules(company_id, created_at, id);
";

const APPROVAL_RULE_APPROVERS_SQL: &str = r"
CREATE TABLE approval_rule_approvers (
    id UUID PRIMARY KEY,
    approval_rule_id UUID NOT NULL REFERENCES approval_rules(id) ON DELETE CASCADE,
    approver_id UUID NOT NULL REFERENCES users(id) ON DELETE RESTRICT,
    sequence_order INTEGER NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),

    CONSTRAINT chk_rule_sequence_positive CHECK (sequence_order >= 1),
    CONSTRAINT uq_rule_sequence UNIQUE (approval_rule_id, sequence_order)
);
";

const EXPENSES_SQL: &str = r"
CREATE TABLE expenses (
    id UUID PRIMARY KEY,
    company_id UUID NOT NULL REFERENCES companies(id) ON DELETE CASCADE,
    employee_id UUID NOT NULL REFERENCES users(id) ON DELETE RESTRICT,
    amount NUMERIC(19, 4) NOT NULL,
    currency CHAR(3) NOT NULL,
    converted_amount NUMERIC(19, 4),
    category VARCHAR(100) NOT NULL,
    description TEXT NOT NULL,
    expense_date DATE NOT NULL,
    status expense_status NOT NULL DEFAULT 'pending',

    -- Policy snapshot of the rule active at submission
    approval_rule_id UUID REFERENCES approval_rules(id) ON DELETE RESTRICT,
    approval_type approval_type,
    percentage_required SMALLINT,
    specific_approver_id UUID REFERENCES users(id) ON DELETE RESTRICT,

    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),

    CONSTRAINT chk_amount_positive CHECK (amount > 0),
    CONSTRAINT chk_currency_format CHECK (currency ~ '^[A-Z]{3}$'),
    CONSTRAINT chk_policy_snapshot CHECK (
        (approval_rule_id IS NULL) = (approval_type IS NULL)
    )
);

CREATE INDEX idx_expenses_company_created ON expenses(company_id, created_at DESC);
CREATE INDEX idx_expenses_employee_created ON expenses(employee_id, created_at DESC);
";

const EXPENSE_APPROVALS_SQL: &str = r"
CREATE TABLE expense_approvals (
    id UUID PRIMARY KEY,
    expense_id UUID NOT NULL REFERENCES expenses(id) ON DELETE CASCADE,
    approver_id UUID NOT NULL REFERENCES users(id) ON DELETE RESTRICT,
    sequence_order INTEGER NOT NULL,
    status approval_status NOT NULL DEFAULT 'pending',
    comments TEXT,
    decided_at TIMESTAMPTZ,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),

    CONSTRAINT chk_step_sequence_positive CHECK (sequence_order >= 1),
    CONSTRAINT chk_decided_at_matches_status CHECK (
        (status = 'pending') = (decided_at IS NULL)
    ),
    CONSTRAINT uq_expense_sequence UNIQUE (expense_id, sequence_order)
);

CREATE INDEX idx_expense_approvals_approver ON expense_approvals(approver_id, status);
";

const DROP_ALL_SQL: &str = r"
DROP TABLE IF EXISTS expense_approvals CASCADE;
DROP TABLE IF EXISTS expenses CASCADE;
DROP TABLE IF EXISTS approval_rule_approvers CASCADE;
DROP TABLE IF EXISTS approval_rules CASCADE;
DROP TABLE IF EXISTS users CASCADE;
DROP TABLE IF EXISTS companies CASCADE;

DROP TYPE IF EXISTS approval_status;
DROP TYPE IF EXISTS expense_status;
DROP TYPE IF EXISTS approval_type;
DROP TYPE IF EXISTS user_role;
";
