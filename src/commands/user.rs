use std::io::IsTerminal;

use anyhow::{bail, Context, Result};
use chrono::Utc;

use super::CommandRunner;
use crate::auth::{hash_password, is_acceptable_password, MIN_PASSWORD_LEN};
use crate::cli;
use crate::context;
use crate::storage::{Storage, StorageRead, StorageTx, StorageWrite};
use crate::types::{roles_for, NewUser};

/// Prompt for a new password (double entry) when attached to a terminal.
fn prompt_password() -> Result<String> {
    if !std::io::stdin().is_terminal() {
        bail!("no password given; pass --password or run from a terminal");
    }
    let p1 = rpassword::prompt_password("Password: ").context("read password")?;
    let p2 = rpassword::prompt_password("Confirm password: ").context("confirm password")?;
    if p1 != p2 {
        bail!("passwords do not match");
    }
    Ok(p1)
}

fn resolve_password(given: &Option<String>) -> Result<String> {
    let password = match given {
        Some(password) => password.clone(),
        None => prompt_password()?,
    };
    if !is_acceptable_password(&password) {
        bail!("password must be at least {MIN_PASSWORD_LEN} characters");
    }
    Ok(password)
}

pub fn create_admin<S: Storage>(
    storage: &S,
    email: &str,
    first_name: &str,
    last_name: &str,
    password: &str,
) -> Result<i64> {
    let email = email.trim();
    if email.is_empty() || first_name.trim().is_empty() || last_name.trim().is_empty() {
        bail!("email, first name and last name are required");
    }
    let password_hash = hash_password(password)?;

    let tx = storage.begin_tx()?;
    if tx.find_user_by_email(email)?.is_some() {
        bail!("a user with email {email} already exists");
    }
    let user = tx
        .insert_user(&NewUser {
            email: email.to_string(),
            first_name: first_name.trim().to_string(),
            last_name: last_name.trim().to_string(),
            password_hash,
            roles: roles_for(true),
            created_at: Utc::now(),
        })
        .context("inserting admin user")?;
    tx.commit()?;
    Ok(user.id)
}

pub fn set_password<S: Storage>(storage: &S, email: &str, password: &str) -> Result<i64> {
    let tx = storage.begin_tx()?;
    let Some(mut user) = tx.find_user_by_email(email.trim())? else {
        bail!("no user with email {}", email.trim());
    };
    user.password_hash = hash_password(password)?;
    user.clear_reset_token();
    user.updated_at = Utc::now();
    tx.update_user(&user).context("updating user")?;
    tx.commit()?;
    Ok(user.id)
}

impl CommandRunner for cli::UserCmd {
    fn run<S: Storage>(&self, _ctx: &context::Context, storage: &S) -> Result<()> {
        match self {
            cli::UserCmd::CreateAdmin {
                email,
                first_name,
                last_name,
                password,
            } => {
                let password = resolve_password(password)?;
                let id = create_admin(storage, email, first_name, last_name, &password)
                    .context("creating admin")?;
                log::info!("👤 Admin {} created with id {}", email.trim(), id);
                Ok(())
            }
            cli::UserCmd::SetPassword { email, password } => {
                let password = resolve_password(password)?;
                let id = set_password(storage, email, &password).context("setting password")?;
                log::info!("🔒 Password updated for user {}", id);
                Ok(())
            }
        }
    }
}
