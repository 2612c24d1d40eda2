use std::sync::Arc;
use std::time::Duration;

use crate::auth::TokenVerifier;
use crate::clients::{HttpMediaClient, MailError, Mailer, MediaClient, SmtpMailer};
use crate::config::AppConfig;
use crate::database::{
    DatabaseManager, LessonRepository, PgStore, SerieRepository, TrackingRepository,
    UserRepository,
};
use crate::proxy::ServiceProxy;
use crate::services::{
    LessonService, NotificationService, SerieService, TrackingService, UserService,
};

/// Storage handles for every aggregate.
#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn UserRepository>,
    pub series: Arc<dyn SerieRepository>,
    pub lessons: Arc<dyn LessonRepository>,
    pub tracking: Arc<dyn TrackingRepository>,
}

impl Repositories {
    /// One store backing all four repositories.
    pub fn shared<S>(store: Arc<S>) -> Self
    where
        S: UserRepository + SerieRepository + LessonRepository + TrackingRepository + 'static,
    {
        Self {
            users: store.clone(),
            series: store.clone(),
            lessons: store.clone(),
            tracking: store,
        }
    }
}

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub verifier: Arc<TokenVerifier>,
    pub database: Option<DatabaseManager>,
    pub users: UserService,
    pub series: SerieService,
    pub lessons: LessonService,
    pub tracking: TrackingService,
    pub user_proxy: Option<ServiceProxy>,
    pub tracking_proxy: Option<ServiceProxy>,
}

impl AppState {
    pub fn build(
        config: AppConfig,
        repos: Repositories,
        media: Arc<dyn MediaClient>,
        mailer: Arc<dyn Mailer>,
        database: Option<DatabaseManager>,
    ) -> Self {
        let verifier = Arc::new(TokenVerifier::from_config(&config.auth));

        let notifications =
            NotificationService::new(repos.series.clone(), mailer, config.email.batch_size);
        let users = UserService::new(repos.users.clone());
        let series = SerieService::new(
            repos.series.clone(),
            repos.users.clone(),
            media.clone(),
            notifications.clone(),
        );
        let lessons = LessonService::new(
            repos.lessons.clone(),
            repos.series.clone(),
            media,
            notifications,
        );
        let tracking = TrackingService::new(
            repos.tracking.clone(),
            repos.lessons.clone(),
            config.tracking.stale_minutes,
        );

        let proxy_timeout = Duration::from_secs(config.services.proxy_timeout_secs);
        let max_body = config.server.max_request_size_bytes;
        let user_proxy = config.services.user_service_url.as_deref().map(|url| {
            tracing::info!(%url, "Forwarding /api/v1/users to the user service");
            ServiceProxy::new("User Service", url, "/api/v1/users", proxy_timeout, max_body)
        });
        let tracking_proxy = config.services.tracking_service_url.as_deref().map(|url| {
            tracing::info!(%url, "Forwarding /api/v1/tracking to the tracking service");
            ServiceProxy::new("Tracking Service", url, "/api/tracking", proxy_timeout, max_body)
        });

        Self {
            config: Arc::new(config),
            verifier,
            database,
            users,
            series,
            lessons,
            tracking,
            user_proxy,
            tracking_proxy,
        }
    }

    /// Production wiring: Postgres storage, the HTTP media client and SMTP mail.
    pub fn from_config(config: AppConfig, database: DatabaseManager) -> Result<Self, MailError> {
        let store = Arc::new(PgStore::new(database.pool().clone()));
        let media = Arc::new(HttpMediaClient::new(
            config.services.media_service_url.clone(),
            Duration::from_secs(config.services.media_timeout_secs),
        ));
        let mailer = Arc::new(SmtpMailer::new(&config.email)?);

        Ok(Self::build(
            config,
            Repositories::shared(store),
            media,
            mailer,
            Some(database),
        ))
    }
}
