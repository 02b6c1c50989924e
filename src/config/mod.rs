use serde::Deserialize;
use std::env;
use std::str::FromStr;

// Главная структура конфигурации - контейнер для всех настроек
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub auth: AuthConfig,
    pub booking: BookingConfig,
    pub availability: AvailabilityConfig,
}

// Настройки приложения
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub environment: String,
    pub rust_log: String,
    /// "json" для структурированных логов, иначе обычный текст
    pub log_format: String,
}

// Настройки базы данных
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub pool_size: u32,
}

// Настройки Redis
#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    pub url: String,
}

// Внешний провайдер аутентификации
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Секрет, которым провайдер подписывает JWT (HS256)
    pub jwt_secret: String,
    /// Базовый URL auth API провайдера, например https://xyz.supabase.co/auth/v1
    pub auth_url: String,
    pub api_key: Option<String>,
}

// Настройки мастера бронирования
#[derive(Debug, Clone, Deserialize)]
pub struct BookingConfig {
    pub payment_delay_ms: u64,
    pub default_ticket_price: f64,
}

// Фоновое обновление доступности фильмов
#[derive(Debug, Clone, Deserialize)]
pub struct AvailabilityConfig {
    pub enabled: bool,
    pub refresh_interval_seconds: u64,
    pub archive_after_days: i64,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} has invalid value '{value}'")]
    Invalid { name: &'static str, value: String },
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    env::var(name).map_err(|_| ConfigError::Missing(name))
}

fn or_default(name: &'static str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn parsed<T: FromStr>(name: &'static str, default: &str) -> Result<T, ConfigError> {
    let value = or_default(name, default);
    value.parse().map_err(|_| ConfigError::Invalid { name, value })
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Config {
            app: AppConfig {
                host: or_default("HOST", "0.0.0.0"),
                port: parsed("PORT", "8000")?,
                environment: or_default("ENVIRONMENT", "development"),
                rust_log: or_default("RUST_LOG", "cinema_booking=debug,tower_http=debug"),
                log_format: or_default("LOG_FORMAT", "text"),
            },
            database: DatabaseConfig {
                url: required("DATABASE_URL")?,
                pool_size: parsed("DB_POOL_SIZE", "20")?,
            },
            redis: RedisConfig {
                url: required("REDIS_URL")?,
            },
            auth: AuthConfig {
                jwt_secret: required("JWT_SECRET")?,
                auth_url: required("AUTH_URL")?,
                api_key: env::var("AUTH_API_KEY").ok(),
            },
            booking: BookingConfig {
                payment_delay_ms: parsed("PAYMENT_DELAY_MS", "2000")?,
                default_ticket_price: parsed("DEFAULT_TICKET_PRICE", "250")?,
            },
            availability: AvailabilityConfig {
                enabled: parsed("ENABLE_AVAILABILITY_REFRESH", "true")?,
                refresh_interval_seconds: parsed("AVAILABILITY_REFRESH_SECONDS", "3600")?,
                archive_after_days: parsed("ARCHIVE_AFTER_DAYS", "90")?,
            },
        })
    }
}

impl Default for BookingConfig {
    fn default() -> Self {
        Self {
            payment_delay_ms: 2000,
            default_ticket_price: crate::models::movie::DEFAULT_TICKET_PRICE,
        }
    }
}
