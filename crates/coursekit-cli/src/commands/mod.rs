//! Subcommand implementations.

pub mod answer_sheet;
pub mod attempts;
pub mod exam;
pub mod init;
pub mod login;
pub mod materials;
pub mod take;
pub mod validate;

use std::path::PathBuf;

use anyhow::{Context, Result};
use tokio::sync::broadcast;

use coursekit_client::{connect, load_config_from, CoursekitConfig, HttpBackend};
use coursekit_core::events::{EventBus, PortalEvent, ToastLevel};
use coursekit_core::model::UserId;

/// Everything a networked command needs.
pub struct Session {
    pub config: CoursekitConfig,
    pub backend: HttpBackend,
    pub events: EventBus,
    notices: broadcast::Receiver<PortalEvent>,
}

impl Session {
    pub fn open(config_path: Option<PathBuf>) -> Result<Self> {
        let config = load_config_from(config_path.as_deref())?;
        let backend = connect(&config.backend)?;
        let events = EventBus::default();
        let notices = events.subscribe();
        tracing::debug!(api_url = %config.backend.api_url, "session opened");
        Ok(Self {
            config,
            backend,
            events,
            notices,
        })
    }

    /// `--user` when given, otherwise the id in the login token.
    pub fn user_id(&self, explicit: Option<UserId>) -> Result<UserId> {
        match explicit {
            Some(id) => Ok(id),
            None => self
                .backend
                .auth()
                .current_user_id()
                .context("cannot tell who you are; run `coursekit login` or pass --user"),
        }
    }

    /// Print the toasts published so far to stderr.
    pub fn flush_notices(&mut self) {
        while let Ok(event) = self.notices.try_recv() {
            match event {
                PortalEvent::Toast { level, message } => {
                    let prefix = match level {
                        ToastLevel::Success => "ok",
                        ToastLevel::Info => "info",
                        ToastLevel::Error => "error",
                    };
                    eprintln!("[{prefix}] {message}");
                }
                other => tracing::debug!(event = ?other, "portal event"),
            }
        }
    }
}
