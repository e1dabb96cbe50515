//! Bootstraps the first admin account; the API cannot grant the first one.

use anyhow::Context;
use serde_json::{Map, Value};

use crate::config::Config;
use crate::db::{Store, StoreError};
use crate::resource::{self, Mode};

pub async fn cmd_create_admin(
    config: &Config,
    username: &str,
    email: &str,
    password: &str,
) -> anyhow::Result<()> {
    let mut body = Map::new();
    body.insert("username".into(), Value::from(username));
    body.insert("email".into(), Value::from(email));
    body.insert("password".into(), Value::from(password));

    let fields = resource::REGISTER
        .validate(&body, Mode::Create)
        .map_err(|errors| {
            let msgs: Vec<String> = errors.into_iter().map(|e| e.msg).collect();
            anyhow::anyhow!("Invalid admin account: {}", msgs.join("; "))
        })?;

    let store = Store::new(&config.general.database_path).await?;

    let user = match store
        .users()
        .create(
            fields.get_str("username").unwrap_or_default(),
            fields.get_str("email").unwrap_or_default(),
            fields.get_str("password").unwrap_or_default(),
            true,
            &config.auth,
        )
        .await
    {
        Ok(user) => user,
        Err(StoreError::Duplicate) => anyhow::bail!("User '{username}' already exists"),
        Err(e) => return Err(e).context("Failed to create admin"),
    };

    println!("Created admin '{}' (id {})", user.username, user.id);
    Ok(())
}
