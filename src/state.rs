use crate::config::Config;
use crate::db::{email_settings, DbPool};
use crate::error::AppResult;
use crate::notifications::{MailChannel, MessageChannel, SmtpMailer, StatusNotifier, WhatsAppClient};
use crate::settings::{InMemorySettingsCache, LandingPageSettings, SettingsStore};
use std::sync::Arc;

pub struct AppState {
    pub pool: DbPool,
    pub config: Arc<Config>,
    pub settings: SettingsStore,
    pub landing: LandingPageSettings,
    pub notifier: StatusNotifier,
    pub mail: Arc<dyn MailChannel>,
}

impl AppState {
    /// Wires the services around the given notification channels.
    pub fn new(
        pool: DbPool,
        config: Arc<Config>,
        whatsapp: Arc<dyn MessageChannel>,
        mail: Arc<dyn MailChannel>,
    ) -> Self {
        let notifier = StatusNotifier::new(
            whatsapp,
            mail.clone(),
            config.conference_name.clone(),
            config.app_url.clone(),
            config.timezone,
        );
        Self {
            settings: SettingsStore::new(pool.clone(), config.timezone),
            landing: LandingPageSettings::new(
                pool.clone(),
                Arc::new(InMemorySettingsCache::new()),
                config.storage_folder.clone(),
            ),
            notifier,
            mail,
            pool,
            config,
        }
    }

    /// Production wiring: the WhatsApp gateway client and an SMTP mailer
    /// primed from the active email settings row.
    pub async fn connect(pool: DbPool, config: Arc<Config>) -> AppResult<Self> {
        let whatsapp = Arc::new(WhatsAppClient::new(config.whatsapp.clone()));
        let mailer = Arc::new(SmtpMailer::new(
            config.mail_from_address.clone(),
            config.mail_from_name.clone(),
        ));

        let active = email_settings::active_settings(&pool).await?;
        if let Err(err) = mailer.configure(active.as_ref()).await {
            tracing::warn!(error = %err, "stored email settings could not be applied");
        }
        if whatsapp.manual_mode() {
            tracing::info!("WhatsApp notifications run in manual mode");
        }

        Ok(Self::new(pool, config, whatsapp, mailer))
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::db::create_memory_pool;
    use crate::notifications::testing::{RecordingMail, RecordingWhatsApp};
    use std::path::Path;

    pub(crate) struct TestState {
        pub state: Arc<AppState>,
        pub whatsapp: Arc<RecordingWhatsApp>,
        pub mail: Arc<RecordingMail>,
    }

    /// In-memory state with recording channels and uploads under `storage`.
    pub(crate) async fn test_state(storage: &Path) -> TestState {
        let pool = create_memory_pool().await.expect("memory pool");
        let config = Config {
            storage_folder: storage.to_path_buf(),
            ..Config::default()
        };
        let whatsapp = Arc::new(RecordingWhatsApp::default());
        let mail = Arc::new(RecordingMail::default());
        let state = AppState::new(pool, Arc::new(config), whatsapp.clone(), mail.clone());
        TestState {
            state: Arc::new(state),
            whatsapp,
            mail,
        }
    }
}
