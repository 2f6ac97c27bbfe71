use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{Local, NaiveDate};
use tracing::{debug, info};

use crate::core::{Environment, FacturaError};

use super::token::{AuthHeader, AuthToken, CacheRecord, Credentials};

/// Performs the actual WSAA login: builds the ticket request, signs it
/// into a CMS blob with the given key/certificate, and submits it.
///
/// Implemented outside this crate; the cache only decides *when* a
/// login happens.
pub trait Authenticator: Send + Sync {
    fn login(
        &self,
        private_key: &Path,
        certificate: &Path,
        environment: Environment,
    ) -> Result<AuthToken, FacturaError>;
}

type DateSource = Box<dyn Fn() -> NaiveDate + Send + Sync>;

struct DayEntry {
    date: NaiveDate,
    token: AuthToken,
}

/// Day-scoped cache of WSAA tokens, keyed by `(cuit, calendar date)`.
///
/// The first use of a day checks the on-disk record at
/// `<cache_dir>/<cuit>_<YYYY_MM_DD>.json`, and only when that is also
/// absent invokes the [`Authenticator`]. Later calls on the same day
/// reuse the cached pair without touching the authenticator. Acquisition
/// is single-flight per taxpayer: concurrent first-of-the-day calls
/// serialize on the taxpayer's entry, so at most one login wins and
/// every caller observes the same token.
///
/// A WSAA ticket is only valid for about 12 hours, so a record keyed by
/// calendar day can outlive its token late in the day. A stale token is
/// not detected locally; the service rejects the next call with a
/// structured error, which surfaces as [`FacturaError::Service`].
pub struct AuthTokenCache {
    cache_dir: PathBuf,
    credentials: Credentials,
    environment: Environment,
    authenticator: Box<dyn Authenticator>,
    today: DateSource,
    entries: Mutex<HashMap<String, Arc<Mutex<Option<DayEntry>>>>>,
}

impl AuthTokenCache {
    pub fn new(
        cache_dir: impl Into<PathBuf>,
        credentials: Credentials,
        environment: Environment,
        authenticator: Box<dyn Authenticator>,
    ) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            credentials,
            environment,
            authenticator,
            today: Box::new(|| Local::now().date_naive()),
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Replace the calendar-date source. Tests use this to pin the day.
    pub fn with_date_source(
        mut self,
        source: impl Fn() -> NaiveDate + Send + Sync + 'static,
    ) -> Self {
        self.today = Box::new(source);
        self
    }

    /// The `Auth` header for today's token, logging in first if no
    /// record exists for `(cuit, today)`.
    ///
    /// Never returns a partially populated header: on authenticator
    /// failure the error propagates and nothing is written to the
    /// cache.
    pub fn auth_header(&self, cuit: &str) -> Result<AuthHeader, FacturaError> {
        let today = (self.today)();
        let slot = self.slot(cuit);
        let mut entry = slot.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(cached) = entry.as_ref() {
            if cached.date == today {
                debug!(cuit, %today, "wsaa token cache hit");
                return Ok(self.header_from(&cached.token, cuit));
            }
        }

        let token = self.load_or_login(cuit, today)?;
        let header = self.header_from(&token, cuit);
        *entry = Some(DayEntry { date: today, token });
        Ok(header)
    }

    fn slot(&self, cuit: &str) -> Arc<Mutex<Option<DayEntry>>> {
        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        Arc::clone(entries.entry(cuit.to_string()).or_default())
    }

    fn load_or_login(&self, cuit: &str, today: NaiveDate) -> Result<AuthToken, FacturaError> {
        let path = self.record_path(cuit, today);
        if path.exists() {
            debug!(cuit, path = %path.display(), "loading wsaa record from disk");
            return self.load_record(&path, cuit);
        }

        self.credentials.check()?;
        info!(cuit, %today, "no wsaa record for today, logging in");
        let token = self.authenticator.login(
            &self.credentials.private_key,
            &self.credentials.certificate,
            self.environment,
        )?;
        self.store_record(&path, &token)?;
        Ok(token)
    }

    fn record_path(&self, cuit: &str, date: NaiveDate) -> PathBuf {
        self.cache_dir
            .join(format!("{cuit}_{}.json", date.format("%Y_%m_%d")))
    }

    fn load_record(&self, path: &Path, cuit: &str) -> Result<AuthToken, FacturaError> {
        let raw = fs::read(path)
            .map_err(|e| FacturaError::Cache(format!("reading {}: {e}", path.display())))?;
        let record: CacheRecord = serde_json::from_slice(&raw)
            .map_err(|e| FacturaError::Cache(format!("parsing {}: {e}", path.display())))?;
        Ok(AuthToken {
            token: record.token,
            sign: record.sign,
            expires_at: None,
            cuit: cuit.to_string(),
        })
    }

    fn store_record(&self, path: &Path, token: &AuthToken) -> Result<(), FacturaError> {
        fs::create_dir_all(&self.cache_dir)
            .map_err(|e| FacturaError::Cache(format!("creating cache dir: {e}")))?;
        let record = CacheRecord {
            token: token.token.clone(),
            sign: token.sign.clone(),
        };
        let raw = serde_json::to_vec_pretty(&record)
            .map_err(|e| FacturaError::Cache(format!("encoding record: {e}")))?;
        fs::write(path, raw)
            .map_err(|e| FacturaError::Cache(format!("writing {}: {e}", path.display())))
    }

    fn header_from(&self, token: &AuthToken, cuit: &str) -> AuthHeader {
        AuthHeader {
            token: token.token.clone(),
            sign: token.sign.clone(),
            cuit: cuit.to_string(),
        }
    }
}
