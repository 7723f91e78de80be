//! One-shot CLI to create or reset a back-office admin account.
//!
//! Usage: create_admin <email> <name> <password>

use anyhow::{Context, Result};
use diesel::ExpressionMethods;
use diesel_async::RunQueryDsl;
use tikki_storefront::bootstrap;
use tikki_storefront::config::Config;
use tikki_storefront::db;
use tikki_storefront::models::CreateAdminEntity;
use tikki_storefront::routes::admin::auth::hash_password;
use tikki_storefront::schema::admins;

#[tokio::main]
async fn main() -> Result<()> {
    bootstrap::init_tracing();
    bootstrap::init_env();

    let args: Vec<String> = std::env::args().collect();
    let [_, email, name, password] = args.as_slice() else {
        anyhow::bail!("Usage: create_admin <email> <name> <password>");
    };

    let config = Config::from_env()?;
    let pool = db::create_pool(&config.database_url).await?;
    let conn = &mut pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let new_admin = CreateAdminEntity {
        email: email.trim().to_lowercase(),
        name: name.clone(),
        password_hash: hash_password(password)?,
    };

    diesel::insert_into(admins::table)
        .values(&new_admin)
        .on_conflict(admins::email)
        .do_update()
        .set((
            admins::name.eq(&new_admin.name),
            admins::password_hash.eq(&new_admin.password_hash),
        ))
        .execute(conn)
        .await
        .context("Failed to upsert admin")?;

    tracing::info!(email = %new_admin.email, "Admin account ready");
    Ok(())
}
