use std::{fmt, sync::Arc};

use sqlx::PgPool;

use revue_core::database::{
    ReviewsRepository, TermsRepository, TitlesRepository, UsersRepository,
};

use crate::auth::jwt::JwtKeys;
use crate::infra::config::Config;
use crate::infra::mail::{LogMailer, Mailer};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub users: UsersRepository,
    pub terms: TermsRepository,
    pub titles: TitlesRepository,
    pub reviews: ReviewsRepository,
    pub jwt: Arc<JwtKeys>,
    pub mailer: Arc<dyn Mailer>,
}

impl fmt::Debug for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppState").finish_non_exhaustive()
    }
}

impl AppState {
    pub fn new(pool: PgPool, config: Config) -> Self {
        let mailer = Arc::new(LogMailer::new(config.mail_from.clone()));
        Self::with_mailer(pool, config, mailer)
    }

    /// Injection point for the mail port, used by the integration tests to
    /// capture deliveries.
    pub fn with_mailer(pool: PgPool, config: Config, mailer: Arc<dyn Mailer>) -> Self {
        let jwt = Arc::new(JwtKeys::new(
            config.secret.as_bytes(),
            config.token_ttl_secs,
        ));
        Self {
            config: Arc::new(config),
            users: UsersRepository::new(pool.clone()),
            terms: TermsRepository::new(pool.clone()),
            titles: TitlesRepository::new(pool.clone()),
            reviews: ReviewsRepository::new(pool),
            jwt,
            mailer,
        }
    }

    /// Secret keying the confirmation-code HMAC.
    pub fn code_secret(&self) -> &[u8] {
        self.config.secret.as_bytes()
    }
}
