//! The `coursekit login` command.

use std::path::PathBuf;

use anyhow::{Context, Result};

use coursekit_client::config::global_config_dir;
use coursekit_client::CoursekitConfig;

use super::Session;

pub async fn execute(
    config_path: Option<PathBuf>,
    email: String,
    password: Option<String>,
) -> Result<()> {
    let password = match password {
        Some(p) => p,
        None => std::env::var("COURSEKIT_PASSWORD")
            .context("no password given; pass --password or set COURSEKIT_PASSWORD")?,
    };

    let session = Session::open(config_path)?;
    let auth = session
        .backend
        .login(&email, &password)
        .await
        .map_err(|e| anyhow::anyhow!("login failed: {}", e.user_message()))?;

    match auth.current_user_id() {
        Ok(id) => println!("Logged in as user {id}."),
        Err(e) => println!("Logged in ({e})."),
    }

    let Some(dir) = global_config_dir() else {
        println!("HOME is not set; export the token instead:");
        println!("  export COURSEKIT_TOKEN={}", auth.token().unwrap_or_default());
        return Ok(());
    };

    let path = dir.join("config.toml");
    let mut stored: CoursekitConfig = if path.exists() {
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read config: {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("failed to parse config: {}", path.display()))?
    } else {
        CoursekitConfig::default()
    };
    stored.backend.api_url = session.config.backend.api_url.clone();
    stored.backend.token = auth.token().map(str::to_string);

    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create {}", dir.display()))?;
    std::fs::write(&path, toml::to_string_pretty(&stored)?)
        .with_context(|| format!("failed to write {}", path.display()))?;
    println!("Token saved to {}", path.display());

    Ok(())
}
