use std::{
    collections::HashMap,
    env,
    ops::Deref,
    path::{Path, PathBuf},
    str::FromStr,
    sync::Arc,
};

use chrono::Duration;
use tokio::fs;
use tracing::info;
use url::Url;

use crate::{
    error::Error,
    helpers::{parse_list, Role},
    pipeline::Pipeline,
    provider::{DatabasePool, SubscriberStore, Telegram, HTTP},
    source::{build_pipeline, PipelineKind},
};

#[derive(Debug)]
pub struct AppState<T>(Arc<T>);

impl<T> AppState<T> {
    pub fn new(state: T) -> AppState<T> {
        AppState(Arc::new(state))
    }
}

impl<T> Clone for AppState<T> {
    fn clone(&self) -> AppState<T> {
        AppState(Arc::clone(&self.0))
    }
}

impl<T> Deref for AppState<T> {
    type Target = Arc<T>;

    fn deref(&self) -> &Arc<T> {
        &self.0
    }
}

#[derive(Debug)]
pub struct State {
    pub config: Config,
    pub http: HTTP,
    pub database: Option<DatabasePool>,
    pub subscribers: SubscriberStore,
    pub telegram: Option<Telegram>,
    pub web: Pipeline,
    pub chat: Pipeline,
}

impl State {
    pub async fn new(
        config: Config,
        database: Option<DatabasePool>,
        http: HTTP,
    ) -> Result<State, Error> {
        if let Some(database) = &database {
            database.init_migrations().await?;
        }

        let telegram = match &config.telegram_token {
            Some(_) => Some(Telegram::new(&config)?),
            None => None,
        };

        let web = build_pipeline(PipelineKind::Web, &config, &http, database.as_ref());
        let chat =
            build_pipeline(PipelineKind::Chat, &config, &http, database.as_ref());

        info!("web pipeline: {:?}", web.stage_names());
        info!("chat pipeline: {:?}", chat.stage_names());

        let subscribers = SubscriberStore::new(config.subscribers_file.to_owned());

        Ok(Self {
            config,
            http,
            database,
            subscribers,
            telegram,
            web,
            chat,
        })
    }

    pub fn pipeline(&self, kind: PipelineKind) -> &Pipeline {
        match kind {
            PipelineKind::Web => &self.web,
            PipelineKind::Chat => &self.chat,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub role: Role,
    pub server_host: String,
    pub port: u16,
    pub allowed_origins: Vec<String>,
    pub static_dir: String,
    pub database_url: Option<String>,
    pub timeout: u64,
    pub sources: Vec<String>,
    pub coingecko_url: String,
    pub coingecko_api_key: Option<String>,
    pub coingecko_per_page: u16,
    pub binance_url: String,
    pub binance_symbol_limit: usize,
    pub binance_margin_url: String,
    pub dashboard_api_url: String,
    pub web_cache_file: PathBuf,
    pub chat_cache_file: PathBuf,
    pub cache_max_age: i64,
    pub store_max_age: i64,
    pub snapshot_max_age: i64,
    pub ratio_threshold: f64,
    pub web_limit: usize,
    pub chat_limit: usize,
    pub refresh_interval: u64,
    pub history_max_days: i64,
    pub telegram_token: Option<String>,
    pub telegram_api_url: String,
    pub telegram_poll_timeout: u64,
    pub subscribers_file: PathBuf,
    pub daily_report_time: (u32, u32),
    pub broadcast_delay: u64,
    pub reconnect_interval: u64,
}

impl Config {
    pub fn cache_max_age(&self) -> Duration {
        Duration::minutes(self.cache_max_age)
    }

    pub fn store_max_age(&self) -> Duration {
        Duration::minutes(self.store_max_age)
    }

    pub fn snapshot_max_age(&self) -> Duration {
        Duration::minutes(self.snapshot_max_age)
    }

    pub fn get_coingecko_markets_url(&self) -> Result<Url, Error> {
        let per_page = self.coingecko_per_page.to_string();
        let mut params = vec![
            ("vs_currency", "usd"),
            ("order", "volume_desc"),
            ("per_page", per_page.as_str()),
            ("page", "1"),
            ("sparkline", "false"),
            ("price_change_percentage", "24h"),
        ];

        if let Some(key) = &self.coingecko_api_key {
            params.push(("x_cg_demo_api_key", key.as_str()));
        }

        let url = Url::parse_with_params(
            &format!("{}/coins/markets", self.coingecko_url),
            &params,
        )?;

        Ok(url)
    }

    pub fn get_exchange_info_url(&self) -> Result<Url, Error> {
        let url = Url::parse(&format!("{}/exchangeInfo", self.binance_url))?;
        Ok(url)
    }

    pub fn get_klines_url(&self, symbol: &str) -> Result<Url, Error> {
        let url = Url::parse_with_params(
            &format!("{}/klines", self.binance_url),
            &[("symbol", symbol), ("interval", "1d"), ("limit", "2")],
        )?;
        Ok(url)
    }

    pub fn get_margin_market_url(&self) -> Result<Url, Error> {
        let url = Url::parse(&self.binance_margin_url)?;
        Ok(url)
    }

    pub fn get_dashboard_url(&self) -> Result<Url, Error> {
        let url = Url::parse(&self.dashboard_api_url)?;
        Ok(url)
    }

    pub fn get_telegram_url(&self, method: &str) -> Result<String, Error> {
        let token = self.telegram_token.as_ref().ok_or_else(|| {
            Error::ConfigurationError(String::from("TELEGRAM_TOKEN is not set"))
        })?;

        Ok(format!("{}/bot{}/{}", self.telegram_api_url, token, method))
    }
}

pub fn get_configuration() -> Result<Config, Error> {
    let role = Role::from_str(&env::var("APP_ROLE")?)?;
    let server_host = env::var("SERVER_HOST")?;
    let port: u16 = env::var("PORT")?.parse()?;
    let allowed_origins = parse_list(&env::var("ALLOWED_ORIGINS")?);
    let static_dir = resolve_path(&env::var("STATIC_DIRECTORY")?)
        .to_string_lossy()
        .into_owned();
    let database_url = optional_var("DATABASE_URL");
    let timeout = env::var("TIMEOUT")?.parse()?;
    let sources = parse_list(&env::var("SOURCES")?.to_lowercase());

    let coingecko_url = trim_url(env::var("COINGECKO_URL")?);
    let coingecko_api_key = optional_var("COINGECKO_API_KEY");
    let coingecko_per_page = env::var("COINGECKO_PER_PAGE")?.parse()?;
    let binance_url = trim_url(env::var("BINANCE_URL")?);
    let binance_symbol_limit = env::var("BINANCE_SYMBOL_LIMIT")?.parse()?;
    let binance_margin_url = env::var("BINANCE_MARGIN_URL")?;
    let dashboard_api_url = env::var("DASHBOARD_API_URL")?;

    let web_cache_file = resolve_path(&env::var("WEB_CACHE_FILE")?);
    let chat_cache_file = resolve_path(&env::var("CHAT_CACHE_FILE")?);
    let cache_max_age = env::var("CACHE_MAX_AGE_IN_MINUTES")?.parse()?;
    let store_max_age = env::var("STORE_MAX_AGE_IN_MINUTES")?.parse()?;
    let snapshot_max_age = env::var("SNAPSHOT_MAX_AGE_IN_MINUTES")?.parse()?;

    let ratio_threshold = env::var("RATIO_THRESHOLD")?.parse()?;
    let web_limit = env::var("WEB_LIMIT")?.parse()?;
    let chat_limit = env::var("CHAT_LIMIT")?.parse()?;
    let refresh_interval: u64 =
        env::var("REFRESH_INTERVAL_IN_MINUTES")?.parse()?;
    let history_max_days = env::var("HISTORY_MAX_DAYS")?.parse()?;

    let telegram_token = optional_var("TELEGRAM_TOKEN");
    let telegram_api_url = trim_url(env::var("TELEGRAM_API_URL")?);
    let telegram_poll_timeout = env::var("TELEGRAM_POLL_TIMEOUT")?.parse()?;
    let subscribers_file = resolve_path(&env::var("SUBSCRIBERS_FILE")?);
    let daily_report_time = parse_report_time(&env::var("DAILY_REPORT_TIME")?)?;
    let broadcast_delay = env::var("BROADCAST_DELAY_IN_MS")?.parse()?;
    let reconnect_interval = env::var("RECONNECT_INTERVAL")?.parse()?;

    if refresh_interval == 0 {
        return Err(Error::ConfigurationError(String::from(
            "REFRESH_INTERVAL_IN_MINUTES must be greater than 0",
        )));
    }

    let config = Config {
        role,
        server_host,
        port,
        allowed_origins,
        static_dir,
        database_url,
        timeout,
        sources,
        coingecko_url,
        coingecko_api_key,
        coingecko_per_page,
        binance_url,
        binance_symbol_limit,
        binance_margin_url,
        dashboard_api_url,
        web_cache_file,
        chat_cache_file,
        cache_max_age,
        store_max_age,
        snapshot_max_age,
        ratio_threshold,
        web_limit,
        chat_limit,
        refresh_interval,
        history_max_days,
        telegram_token,
        telegram_api_url,
        telegram_poll_timeout,
        subscribers_file,
        daily_report_time,
        broadcast_delay,
        reconnect_interval,
    };

    Ok(config)
}

/// Loads `app.conf` and then `.env` from the crate directory into the
/// process environment. `.env` is optional and overrides `app.conf`;
/// variables already present in the environment are left alone.
pub async fn set_configuration() -> Result<(), Error> {
    let config_file: &str = "app.conf";
    let env_file: &str = ".env";

    let directory = env!("CARGO_MANIFEST_DIR");
    let config_path = format!("{}/{}", directory, config_file);
    let env_path = format!("{}/{}", directory, env_file);

    let mut values: HashMap<String, String> = HashMap::new();

    let config_string = fs::read_to_string(config_path).await?;
    values.extend(parse_config_string(&config_string));

    if let Ok(env_string) = fs::read_to_string(env_path).await {
        values.extend(parse_config_string(&env_string));
    }

    for (key, value) in values {
        if env::var_os(&key).is_none() {
            env::set_var(key, value);
        }
    }

    Ok(())
}

fn parse_config_string(config: &str) -> Vec<(String, String)> {
    config
        .lines()
        .map(|line| line.trim())
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_once('='))
        .map(|(key, value)| {
            let value = value.trim().trim_matches('"');
            (key.trim().to_owned(), value.to_owned())
        })
        .filter(|(key, _)| !key.is_empty())
        .collect()
}

fn parse_report_time(value: &str) -> Result<(u32, u32), Error> {
    let invalid = || {
        Error::ConfigurationError(format!(
            "DAILY_REPORT_TIME must be HH:MM, got {}",
            value
        ))
    };

    let (hour, minute) = value.trim().split_once(':').ok_or_else(invalid)?;
    let hour: u32 = hour.parse().map_err(|_| invalid())?;
    let minute: u32 = minute.parse().map_err(|_| invalid())?;

    if hour > 23 || minute > 59 {
        return Err(invalid());
    }

    Ok((hour, minute))
}

fn optional_var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}

fn trim_url(url: String) -> String {
    url.trim_end_matches('/').to_owned()
}

fn resolve_path(value: &str) -> PathBuf {
    let path = Path::new(value);

    if path.is_absolute() {
        return path.to_path_buf();
    }

    Path::new(env!("CARGO_MANIFEST_DIR")).join(path)
}

#[cfg(test)]
pub(crate) fn test_config() -> Config {
    Config {
        role: Role::All,
        server_host: String::from("127.0.0.1"),
        port: 8080,
        allowed_origins: vec![String::from("*")],
        static_dir: String::from("static"),
        database_url: None,
        timeout: 10,
        sources: vec![String::from("coingecko"), String::from("binance")],
        coingecko_url: String::from("https://api.coingecko.com/api/v3"),
        coingecko_api_key: Some(String::from("demo-key")),
        coingecko_per_page: 100,
        binance_url: String::from("https://api.binance.com/api/v3"),
        binance_symbol_limit: 50,
        binance_margin_url: String::from("https://www.binance.com/margin"),
        dashboard_api_url: String::from("http://localhost:8080/api/data"),
        web_cache_file: PathBuf::from("/tmp/web.json"),
        chat_cache_file: PathBuf::from("/tmp/chat.json"),
        cache_max_age: 60,
        store_max_age: 60,
        snapshot_max_age: 5,
        ratio_threshold: 10.0,
        web_limit: 20,
        chat_limit: 10,
        refresh_interval: 10,
        history_max_days: 90,
        telegram_token: None,
        telegram_api_url: String::from("https://api.telegram.org"),
        telegram_poll_timeout: 30,
        subscribers_file: PathBuf::from("/tmp/subscribers.json"),
        daily_report_time: (9, 0),
        broadcast_delay: 100,
        reconnect_interval: 5,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config_string() {
        let data = "# defaults\nPORT=8080\n\nSOURCES = coingecko,binance\nTELEGRAM_TOKEN=\nBAD LINE\nDATABASE_URL=\"postgres://u:p@h/db?sslmode=disable\"\n";
        let values = parse_config_string(data);

        assert_eq!(
            values,
            vec![
                (String::from("PORT"), String::from("8080")),
                (String::from("SOURCES"), String::from("coingecko,binance")),
                (String::from("TELEGRAM_TOKEN"), String::new()),
                (
                    String::from("DATABASE_URL"),
                    String::from("postgres://u:p@h/db?sslmode=disable")
                ),
            ]
        );
    }

    #[test]
    fn test_parse_report_time() {
        assert_eq!(parse_report_time("09:00").unwrap(), (9, 0));
        assert_eq!(parse_report_time(" 23:59 ").unwrap(), (23, 59));
        assert!(parse_report_time("24:00").is_err());
        assert!(parse_report_time("9").is_err());
        assert!(parse_report_time("ab:cd").is_err());
    }

    #[test]
    fn test_resolve_path() {
        assert_eq!(resolve_path("/tmp/cache.json"), PathBuf::from("/tmp/cache.json"));
        assert!(resolve_path("data/cache.json").ends_with("data/cache.json"));
        assert!(resolve_path("data/cache.json").is_absolute());
    }

    #[test]
    fn test_upstream_urls() {
        let config = test_config();

        let markets = config.get_coingecko_markets_url().unwrap();
        assert_eq!(markets.path(), "/api/v3/coins/markets");
        let query: HashMap<String, String> =
            markets.query_pairs().into_owned().collect();
        assert_eq!(query["vs_currency"], "usd");
        assert_eq!(query["order"], "volume_desc");
        assert_eq!(query["per_page"], "100");
        assert_eq!(query["price_change_percentage"], "24h");
        assert_eq!(query["x_cg_demo_api_key"], "demo-key");

        let klines = config.get_klines_url("APEUSDT").unwrap();
        assert_eq!(
            klines.as_str(),
            "https://api.binance.com/api/v3/klines?symbol=APEUSDT&interval=1d&limit=2"
        );
    }

    #[test]
    fn test_telegram_url_requires_token() {
        let mut config = test_config();
        assert!(matches!(
            config.get_telegram_url("getMe"),
            Err(Error::ConfigurationError(_))
        ));

        config.telegram_token = Some(String::from("123:abc"));
        assert_eq!(
            config.get_telegram_url("getMe").unwrap(),
            "https://api.telegram.org/bot123:abc/getMe"
        );
    }
}
