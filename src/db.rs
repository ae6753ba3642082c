use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectOptions, ConnectionTrait, Database, DatabaseConnection,
    DbBackend, DbErr, EntityTrait, QueryFilter, Set, Statement,
};
use std::time::Duration;
use tracing::info;

use crate::config::{BootstrapConfig, DatabaseConfig};
use crate::entity::user;

/// Initialize database connection and run one-shot schema setup
pub async fn init_database(config: &DatabaseConfig) -> Result<DatabaseConnection, DbErr> {
    // Make sure the directory holding the database file exists
    if let Some(dir) = config.path.parent() {
        std::fs::create_dir_all(dir)
            .map_err(|e| DbErr::Custom(format!("failed to create database directory: {}", e)))?;
    }

    info!("Connecting to database: {}", config.path.display());
    connect_and_migrate(&config.connection_url()).await
}

/// Connect to a SQLite URL and apply the schema. Split out from
/// `init_database` so tests can run against `sqlite::memory:`.
pub async fn connect_and_migrate(url: &str) -> Result<DatabaseConnection, DbErr> {
    let mut opt = ConnectOptions::new(url);
    // An in-memory database exists per connection, so it must not be pooled
    let max_connections = if url.contains(":memory:") { 1 } else { 5 };
    opt.max_connections(max_connections)
        .min_connections(1)
        .connect_timeout(Duration::from_secs(8))
        .acquire_timeout(Duration::from_secs(8))
        .sqlx_logging(true)
        .sqlx_logging_level(tracing::log::LevelFilter::Debug);

    let db = Database::connect(opt).await?;
    create_schema(&db).await?;
    Ok(db)
}

/// One-shot idempotent DDL. The CHECK constraints mirror the data-model
/// invariants: non-empty node names, the fixed node-type set, non-negative
/// levels, and the closed department set for regulation files.
async fn create_schema(db: &DatabaseConnection) -> Result<(), DbErr> {
    let statements = [
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            username TEXT NOT NULL UNIQUE,
            password TEXT NOT NULL,
            role TEXT NOT NULL DEFAULT 'user' CHECK(role IN ('user', 'admin')),
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS organization_nodes (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL CHECK(name <> ''),
            type TEXT NOT NULL CHECK(type IN ('committee', 'position', 'department', 'sub_department')),
            parent_id INTEGER REFERENCES organization_nodes(id) ON DELETE CASCADE,
            level INTEGER NOT NULL CHECK(level >= 0),
            order_index INTEGER NOT NULL DEFAULT 0,
            leader_name TEXT,
            personnel TEXT,
            description TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS regulation_files (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            department TEXT NOT NULL CHECK(department IN ('方丈办公室', '维那', '监院一', '监院二', '监院三', '管理办法')),
            file_name TEXT NOT NULL,
            original_name TEXT NOT NULL,
            file_path TEXT NOT NULL,
            file_size INTEGER NOT NULL,
            file_type TEXT NOT NULL,
            uploaded_by INTEGER NOT NULL REFERENCES users(id),
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
        "CREATE INDEX IF NOT EXISTS idx_org_nodes_level_order ON organization_nodes(level, order_index)",
        "CREATE INDEX IF NOT EXISTS idx_org_nodes_parent ON organization_nodes(parent_id)",
        "CREATE INDEX IF NOT EXISTS idx_regulation_department ON regulation_files(department)",
        "CREATE INDEX IF NOT EXISTS idx_regulation_uploaded_by ON regulation_files(uploaded_by)",
    ];

    for sql in statements {
        db.execute(Statement::from_string(DbBackend::Sqlite, sql.to_string()))
            .await?;
    }

    info!("Database schema ready");
    Ok(())
}

/// Create the bootstrap accounts when they are missing (one admin, one
/// regular user). Existing accounts are never touched.
pub async fn seed_default_users(
    db: &DatabaseConnection,
    bootstrap: &BootstrapConfig,
) -> anyhow::Result<()> {
    let accounts = [
        (
            bootstrap.admin_username.as_str(),
            bootstrap.admin_password.as_str(),
            user::role::ADMIN,
        ),
        (
            bootstrap.user_username.as_str(),
            bootstrap.user_password.as_str(),
            user::role::USER,
        ),
    ];

    for (username, password, role) in accounts {
        let existing = user::Entity::find()
            .filter(user::Column::Username.eq(username))
            .one(db)
            .await?;

        if existing.is_some() {
            continue;
        }

        let hashed = bcrypt::hash(password, bcrypt::DEFAULT_COST)?;
        let now = chrono::Utc::now();
        let account = user::ActiveModel {
            username: Set(username.to_string()),
            password: Set(hashed),
            role: Set(role.to_string()),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };
        account.insert(db).await?;
        info!("Created default account: {} ({})", username, role);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BootstrapConfig;

    #[tokio::test]
    async fn test_schema_and_seed() {
        let db = connect_and_migrate("sqlite::memory:").await.unwrap();

        let bootstrap = BootstrapConfig::default();
        seed_default_users(&db, &bootstrap).await.unwrap();

        let admin = user::Entity::find()
            .filter(user::Column::Username.eq("admin"))
            .one(&db)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(admin.role, "admin");
        assert!(bcrypt::verify("admin123", &admin.password).unwrap());

        // Seeding twice must not duplicate or overwrite accounts
        seed_default_users(&db, &bootstrap).await.unwrap();
        let count = user::Entity::find().all(&db).await.unwrap().len();
        assert_eq!(count, 2);
    }

    #[tokio::test]
    async fn test_role_check_constraint() {
        let db = connect_and_migrate("sqlite::memory:").await.unwrap();

        let now = chrono::Utc::now();
        let bad = user::ActiveModel {
            username: Set("ghost".to_string()),
            password: Set("x".to_string()),
            role: Set("overlord".to_string()),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };
        assert!(bad.insert(&db).await.is_err());
    }
}
