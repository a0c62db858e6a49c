use crate::domain::offer::OfferConfig;
use crate::error::LinkError;
use tracing::debug;
use url::Url;
use url::form_urlencoded::byte_serialize;

/// Returned whenever a proper link cannot be assembled.
pub const SAFE_DEFAULT_LINK: &str = "https://t.me/";

const TELEGRAM_BASE: &str = "https://t.me";
const MAX_USERNAME_LEN: usize = 32;

/// Builds the Telegram link behind the "contact" button.
///
/// Precedence: the explicit link as given, then a chat with
/// `contact_username`, then a share dialog pointing at `fallback_origin`.
/// Never fails; any problem yields [`SAFE_DEFAULT_LINK`].
pub fn build_contact_link(offer: &OfferConfig, fallback_origin: &str) -> String {
    match try_build_contact_link(offer, fallback_origin) {
        Ok(link) => link,
        Err(error) => {
            debug!(%error, "Using default contact link");
            SAFE_DEFAULT_LINK.to_string()
        }
    }
}

pub fn try_build_contact_link(
    offer: &OfferConfig,
    fallback_origin: &str,
) -> Result<String, LinkError> {
    if let Some(link) = offer.explicit_link() {
        return Ok(link.to_string());
    }

    let message = encode(&offer.interest_message());

    if let Some(username) = offer.contact_username() {
        let username = normalize_username(username)?;
        return checked(format!("{TELEGRAM_BASE}/{username}?text={message}"));
    }

    let origin = fallback_origin.trim();
    if origin.is_empty() {
        return Err(LinkError::MissingOrigin);
    }
    let origin = Url::parse(origin)
        .map_err(|source| LinkError::InvalidUrl {
            url: origin.to_string(),
            source,
        })?
        .origin();
    // Opaque origins (`data:`, `javascript:`) serialize as "null".
    if !origin.is_tuple() {
        return Err(LinkError::MissingOrigin);
    }
    checked(format!(
        "{TELEGRAM_BASE}/share/url?url={}&text={message}",
        encode(&origin.ascii_serialization())
    ))
}

/// Strips a leading `@`; Telegram usernames are ASCII letters, digits and `_`.
fn normalize_username(raw: &str) -> Result<&str, LinkError> {
    let username = raw.trim().trim_start_matches('@');
    let valid = !username.is_empty()
        && username.len() <= MAX_USERNAME_LEN
        && username
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(username)
    } else {
        Err(LinkError::InvalidUsername(raw.to_string()))
    }
}

fn encode(component: &str) -> String {
    byte_serialize(component.as_bytes()).collect()
}

fn checked(link: String) -> Result<String, LinkError> {
    match Url::parse(&link) {
        Ok(_) => Ok(link),
        Err(source) => Err(LinkError::InvalidUrl { url: link, source }),
    }
}
