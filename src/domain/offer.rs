use crate::error::ConfigError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The price of the offer in minor currency units.
///
/// Wraps the raw amount so that a zero price or a malformed currency code can
/// never reach the payment gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawPrice", into = "RawPrice")]
pub struct Price {
    amount: u64,
    currency: String,
}

#[derive(Serialize, Deserialize)]
struct RawPrice {
    amount: u64,
    currency: String,
}

impl Price {
    pub fn new(amount: u64, currency: &str) -> Result<Self, ConfigError> {
        if amount == 0 {
            return Err(ConfigError::InvalidValue {
                key: "price_amount",
                reason: "Price must be positive".to_string(),
            });
        }
        let currency = currency.trim();
        if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(ConfigError::InvalidValue {
                key: "currency_code",
                reason: format!("{currency:?} is not a three-letter currency code"),
            });
        }
        Ok(Self {
            amount,
            currency: currency.to_ascii_lowercase(),
        })
    }

    /// Amount in minor units (cents for USD).
    pub fn amount(&self) -> u64 {
        self.amount
    }

    /// Lowercase ISO 4217 code, the form payment processors expect.
    pub fn currency(&self) -> &str {
        &self.currency
    }

    /// Amount in major units. Whole amounts drop their fractional digits.
    pub fn major_units(&self) -> Decimal {
        let major = Decimal::from_i128_with_scale(i128::from(self.amount), 2);
        if major.fract().is_zero() {
            major.trunc().normalize()
        } else {
            major
        }
    }
}

impl TryFrom<RawPrice> for Price {
    type Error = ConfigError;

    fn try_from(raw: RawPrice) -> Result<Self, Self::Error> {
        Self::new(raw.amount, &raw.currency)
    }
}

impl From<Price> for RawPrice {
    fn from(price: Price) -> Self {
        Self {
            amount: price.amount,
            currency: price.currency,
        }
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let major = self.major_units();
        match self.currency.as_str() {
            "usd" => write!(f, "${major}"),
            "eur" => write!(f, "€{major}"),
            "gbp" => write!(f, "£{major}"),
            other => write!(f, "{major} {}", other.to_ascii_uppercase()),
        }
    }
}

/// Everything the panel needs to know about the offer and how to reach the seller.
///
/// Blank optional strings count as absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfferConfig {
    /// Full contact URL. Wins over every other contact field.
    #[serde(default)]
    pub explicit_link: Option<String>,
    /// Telegram username, with or without a leading `@`.
    #[serde(default)]
    pub contact_username: Option<String>,
    /// Message pre-filled in the chat. Defaults to [`OfferConfig::default_message`].
    #[serde(default)]
    pub prefilled_message: Option<String>,
    pub price: Price,
}

impl OfferConfig {
    pub fn new(price: Price) -> Self {
        Self {
            explicit_link: None,
            contact_username: None,
            prefilled_message: None,
            price,
        }
    }

    pub fn explicit_link(&self) -> Option<&str> {
        non_blank(&self.explicit_link)
    }

    pub fn contact_username(&self) -> Option<&str> {
        non_blank(&self.contact_username)
    }

    pub fn prefilled_message(&self) -> Option<&str> {
        non_blank(&self.prefilled_message)
    }

    pub fn default_message(&self) -> String {
        format!(
            "Hi! I'm interested in the {} offer including all content. Could you guide me on how to pay?",
            self.price
        )
    }

    /// The text sent along with the contact link.
    pub fn interest_message(&self) -> String {
        self.prefilled_message()
            .map(str::to_string)
            .unwrap_or_else(|| self.default_message())
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_price_validation() {
        assert!(Price::new(9500, "usd").is_ok());
        assert!(matches!(
            Price::new(0, "usd"),
            Err(ConfigError::InvalidValue { key: "price_amount", .. })
        ));
        assert!(matches!(
            Price::new(100, "dollars"),
            Err(ConfigError::InvalidValue { key: "currency_code", .. })
        ));
        assert!(Price::new(100, "u5d").is_err());
    }

    #[test]
    fn test_price_currency_is_lowercased() {
        let price = Price::new(9500, " USD ").unwrap();
        assert_eq!(price.currency(), "usd");
    }

    #[test]
    fn test_price_major_units() {
        assert_eq!(Price::new(9500, "usd").unwrap().major_units(), dec!(95));
        assert_eq!(Price::new(9550, "usd").unwrap().major_units(), dec!(95.50));
        assert_eq!(Price::new(7, "usd").unwrap().major_units(), dec!(0.07));
    }

    #[test]
    fn test_price_display() {
        assert_eq!(Price::new(9500, "usd").unwrap().to_string(), "$95");
        assert_eq!(Price::new(8500, "eur").unwrap().to_string(), "€85");
        assert_eq!(Price::new(9550, "gbp").unwrap().to_string(), "£95.50");
        assert_eq!(Price::new(9500, "chf").unwrap().to_string(), "95 CHF");
    }

    #[test]
    fn test_price_deserialization_validates() {
        let ok: Price = serde_json::from_str(r#"{"amount": 9500, "currency": "USD"}"#).unwrap();
        assert_eq!(ok.amount(), 9500);
        assert_eq!(ok.currency(), "usd");

        let zero = serde_json::from_str::<Price>(r#"{"amount": 0, "currency": "usd"}"#);
        assert!(zero.is_err());
    }

    #[test]
    fn test_default_message_uses_configured_price() {
        let offer = OfferConfig::new(Price::new(8500, "usd").unwrap());
        assert_eq!(
            offer.interest_message(),
            "Hi! I'm interested in the $85 offer including all content. Could you guide me on how to pay?"
        );
    }

    #[test]
    fn test_blank_fields_are_absent() {
        let mut offer = OfferConfig::new(Price::new(9500, "usd").unwrap());
        offer.explicit_link = Some("   ".to_string());
        offer.contact_username = Some(String::new());
        offer.prefilled_message = Some(" ".to_string());

        assert_eq!(offer.explicit_link(), None);
        assert_eq!(offer.contact_username(), None);
        assert_eq!(offer.interest_message(), offer.default_message());
    }

    #[test]
    fn test_prefilled_message_wins() {
        let mut offer = OfferConfig::new(Price::new(9500, "usd").unwrap());
        offer.prefilled_message = Some("Hi".to_string());
        assert_eq!(offer.interest_message(), "Hi");
    }
}
