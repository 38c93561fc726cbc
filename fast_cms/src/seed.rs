//! Account bootstrap: the configured super-admin and development fixtures.
//!
//! Both entry points are idempotent; accounts that already exist (matched by
//! username) are left as they are.

use crate::{
    auth::{AuthResult, Power, User, hash_password},
    db::{NewUser, UserRepository},
};

/// Password shared by every development fixture account.
pub const FIXTURE_PASSWORD: &str = "123456";

/// Credentials of the bootstrap super-admin
#[derive(Clone)]
pub struct SuperAdmin {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for SuperAdmin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SuperAdmin")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl Default for SuperAdmin {
    fn default() -> Self {
        Self {
            username: "superadmin".to_string(),
            email: "superadmin@seek2.team".to_string(),
            password: "seek2geek".to_string(),
        }
    }
}

/// Make sure the super-admin account exists.
///
/// Returns the account and whether it was created by this call.
pub async fn ensure_super_admin(
    users: &dyn UserRepository,
    admin: &SuperAdmin,
) -> AuthResult<(User, bool)> {
    ensure_user(
        users,
        &admin.username,
        &admin.email,
        &admin.password,
        Power::SuperAdmin,
    )
    .await
}

/// Development fixtures: `test_super_admin`, `test_admin` and
/// `test_user_0` through `test_user_3`, all with [`FIXTURE_PASSWORD`].
pub fn fixture_accounts() -> Vec<(String, String, Power)> {
    let mut accounts = vec![
        (
            "test_super_admin".to_string(),
            "test_super_admin@seek2.team".to_string(),
            Power::SuperAdmin,
        ),
        (
            "test_admin".to_string(),
            "admin@seek2.team".to_string(),
            Power::Admin,
        ),
    ];
    accounts.extend((0..4).map(|i| {
        let username = format!("test_user_{i}");
        let email = format!("{username}@seek2.team");
        (username, email, Power::Normal)
    }));
    accounts
}

/// Create any missing fixture accounts; returns how many were created.
pub async fn seed_fixtures(users: &dyn UserRepository) -> AuthResult<usize> {
    let mut created = 0;
    for (username, email, power) in fixture_accounts() {
        let (_, was_created) =
            ensure_user(users, &username, &email, FIXTURE_PASSWORD, power).await?;
        if was_created {
            created += 1;
        }
    }
    if created > 0 {
        log::info!("seeded {created} fixture accounts");
    }
    Ok(created)
}

async fn ensure_user(
    users: &dyn UserRepository,
    username: &str,
    email: &str,
    password: &str,
    power: Power,
) -> AuthResult<(User, bool)> {
    if let Some(existing) = users.find_by_username(username).await? {
        return Ok((existing, false));
    }

    let user = users
        .create_user(&NewUser {
            username: username.to_string(),
            email: email.to_string(),
            hashed_password: hash_password(password)?,
            power,
        })
        .await?;
    log::info!("created {} account {}", user.power, user.username);
    Ok((user, true))
}
