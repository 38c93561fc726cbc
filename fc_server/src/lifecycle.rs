//! Startup sequence: directories, database, bootstrap accounts.

use std::path::PathBuf;

use fast_cms::{AuthError, Database, db::SqlUserRepository, seed};
use sqlx::migrate::MigrateError;

use crate::config::{Environment, ServerConfig, StorageSettings};

#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    #[error("Failed to create directory {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to connect to database: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Failed to run migrations: {0}")]
    Migrate(#[from] MigrateError),

    #[error("Failed to create bootstrap accounts: {0}")]
    Seed(#[from] AuthError),
}

/// Create the data, static, avatar and post-image directories.
pub async fn prepare_directories(storage: &StorageSettings) -> Result<(), LifecycleError> {
    for dir in [
        &storage.data_dir,
        &storage.static_dir,
        &storage.avatar_dir,
        &storage.post_images_dir,
    ] {
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|source| LifecycleError::Io {
                path: dir.clone(),
                source,
            })?;
    }
    Ok(())
}

/// Ensure the super-admin exists and, in development, the fixture accounts.
pub async fn bootstrap_accounts(
    db: &Database,
    config: &ServerConfig,
) -> Result<(), LifecycleError> {
    let users = SqlUserRepository::new(db.pool().clone());

    let (admin, created) = seed::ensure_super_admin(&users, &config.super_admin).await?;
    if created {
        tracing::info!(user_id = admin.id, username = %admin.username, "Created super admin");
    }

    if config.environment == Environment::Development {
        let seeded = seed::seed_fixtures(&users).await?;
        tracing::debug!(seeded, "Development fixtures ready");
    }
    Ok(())
}

/// Bring the server's dependencies up: directories, connection pool,
/// migrations and bootstrap accounts.
pub async fn startup(config: &ServerConfig) -> Result<Database, LifecycleError> {
    prepare_directories(&config.storage).await?;

    let db = Database::new(&config.database).await?;
    tracing::info!("Database connected");

    db.migrate().await?;
    tracing::info!("Migrations applied");

    bootstrap_accounts(&db, config).await?;
    Ok(db)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fast_cms::{Power, db::UserRepository, seed::fixture_accounts};

    fn config_in(root: &std::path::Path) -> ServerConfig {
        let mut config = ServerConfig::development("s".repeat(32), root);
        config.database.database_url =
            format!("sqlite://{}", config.storage.data_dir.join("test.db").display());
        config
    }

    #[tokio::test]
    async fn test_prepare_directories() {
        let root = tempfile::tempdir().unwrap();
        let storage = StorageSettings::new(root.path().join("data"), root.path().join("static"), 1);

        prepare_directories(&storage).await.unwrap();

        assert!(storage.data_dir.is_dir());
        assert!(storage.avatar_dir.is_dir());
        assert!(storage.post_images_dir.is_dir());
        // Running again is harmless.
        prepare_directories(&storage).await.unwrap();
    }

    #[tokio::test]
    async fn test_startup_seeds_accounts_once() {
        let root = tempfile::tempdir().unwrap();
        let config = config_in(root.path());

        let db = startup(&config).await.unwrap();
        let users = SqlUserRepository::new(db.pool().clone());
        let expected = fixture_accounts().len() as i64 + 1;
        assert_eq!(users.count_users().await.unwrap(), expected);

        let admin = users
            .find_by_username(&config.super_admin.username)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(admin.power, Power::SuperAdmin);
        db.close().await;

        let db = startup(&config).await.unwrap();
        let users = SqlUserRepository::new(db.pool().clone());
        assert_eq!(users.count_users().await.unwrap(), expected);
        db.close().await;
    }

    #[tokio::test]
    async fn test_production_skips_fixtures() {
        let db = Database::in_memory().await.unwrap();
        let mut config = ServerConfig::development("s".repeat(32), std::path::Path::new("."));
        config.environment = Environment::Production;

        bootstrap_accounts(&db, &config).await.unwrap();

        let users = SqlUserRepository::new(db.pool().clone());
        assert_eq!(users.count_users().await.unwrap(), 1);
    }
}
