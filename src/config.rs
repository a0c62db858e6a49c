//! Panel configuration.
//!
//! Settings are assembled from layers, each overriding the previous one:
//! built-in defaults, an optional JSON file, `PROMO_*` environment variables and
//! finally command line flags.

use crate::application::presence::DEFAULT_TICK_PERIOD;
use crate::domain::offer::{OfferConfig, Price};
use crate::error::ConfigError;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_PRICE_AMOUNT: u64 = 9500;
pub const DEFAULT_CURRENCY: &str = "usd";
pub const DEFAULT_PAGE_ORIGIN: &str = "http://localhost:3000";

/// One source of settings. Unset fields leave lower layers untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SettingsLayer {
    pub telegram_link: Option<String>,
    pub telegram_username: Option<String>,
    pub prefilled_message: Option<String>,
    pub price_amount: Option<u64>,
    pub currency_code: Option<String>,
    pub payment_public_key: Option<String>,
    pub page_origin: Option<String>,
    pub tick_ms: Option<u64>,
    pub seed: Option<u64>,
}

impl SettingsLayer {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Reads `PROMO_*` variables through `lookup`. Unparseable numbers are
    /// logged and ignored.
    pub fn from_env<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let text = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let number = |key: &str| text(key).and_then(|raw| parse_or_warn::<u64>(key, &raw));
        Self {
            telegram_link: text("PROMO_TELEGRAM_LINK"),
            telegram_username: text("PROMO_TELEGRAM_USERNAME"),
            prefilled_message: text("PROMO_PREFILLED_MESSAGE"),
            price_amount: number("PROMO_PRICE_AMOUNT"),
            currency_code: text("PROMO_CURRENCY"),
            payment_public_key: text("PROMO_PAYMENT_PUBLIC_KEY"),
            page_origin: text("PROMO_PAGE_ORIGIN"),
            tick_ms: number("PROMO_TICK_MS"),
            seed: number("PROMO_SEED"),
        }
    }

    /// Returns `self` with every field set in `over` replaced.
    pub fn merge(self, over: SettingsLayer) -> Self {
        Self {
            telegram_link: over.telegram_link.or(self.telegram_link),
            telegram_username: over.telegram_username.or(self.telegram_username),
            prefilled_message: over.prefilled_message.or(self.prefilled_message),
            price_amount: over.price_amount.or(self.price_amount),
            currency_code: over.currency_code.or(self.currency_code),
            payment_public_key: over.payment_public_key.or(self.payment_public_key),
            page_origin: over.page_origin.or(self.page_origin),
            tick_ms: over.tick_ms.or(self.tick_ms),
            seed: over.seed.or(self.seed),
        }
    }
}

fn parse_or_warn<T>(key: &str, raw: &str) -> Option<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(err) => {
            tracing::warn!("invalid {key}, ignoring: {err}");
            None
        }
    }
}

/// Fully resolved settings for one panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelSettings {
    pub offer: OfferConfig,
    /// Supplied to the payment gateway. Checkout is unavailable without it.
    pub public_key: Option<String>,
    pub page_origin: String,
    pub tick_period: Duration,
    pub seed: Option<u64>,
}

impl PanelSettings {
    /// Defaults, then the file at `path` if given, then the environment.
    pub fn load<F>(path: Option<&Path>, env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Self::load_with_overrides(path, env, SettingsLayer::default())
    }

    pub fn load_with_overrides<F>(
        path: Option<&Path>,
        env: F,
        overrides: SettingsLayer,
    ) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut layer = SettingsLayer::default();
        if let Some(path) = path {
            layer = layer.merge(SettingsLayer::from_file(path)?);
        }
        layer = layer.merge(SettingsLayer::from_env(env));
        Self::resolve(layer.merge(overrides))
    }

    pub fn resolve(layer: SettingsLayer) -> Result<Self, ConfigError> {
        let price = Price::new(
            layer.price_amount.unwrap_or(DEFAULT_PRICE_AMOUNT),
            layer.currency_code.as_deref().unwrap_or(DEFAULT_CURRENCY),
        )?;
        let tick_ms = layer
            .tick_ms
            .unwrap_or(DEFAULT_TICK_PERIOD.as_millis() as u64);
        if tick_ms == 0 {
            return Err(ConfigError::InvalidValue {
                key: "tick_ms",
                reason: "Tick period must be positive".to_string(),
            });
        }

        Ok(Self {
            offer: OfferConfig {
                explicit_link: layer.telegram_link,
                contact_username: layer.telegram_username,
                prefilled_message: layer.prefilled_message,
                price,
            },
            public_key: layer.payment_public_key,
            page_origin: layer
                .page_origin
                .unwrap_or_else(|| DEFAULT_PAGE_ORIGIN.to_string()),
            tick_period: Duration::from_millis(tick_ms),
            seed: layer.seed,
        })
    }
}
