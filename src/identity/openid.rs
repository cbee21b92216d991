//! OpenID 2.0 relying party in stateless mode.
//!
//! No associations are kept: every positive assertion is confirmed with a
//! direct `check_authentication` request to the provider that issued it.
//! Discovery understands XRDS documents (directly or via `X-XRDS-Location`)
//! and HTML `<link rel="openid2.provider">` markup.

use axum::async_trait;
use regex::Regex;
use reqwest::{
    header::{ACCEPT, CONTENT_TYPE},
    Client, Response,
};
use std::{collections::HashMap, sync::LazyLock, time::Duration};
use tracing::{debug, instrument, warn};
use url::Url;

use super::{IdentityError, IdentityProvider, LoginRedirect, PendingLogin};

const OPENID_NS: &str = "http://specs.openid.net/auth/2.0";
const IDENTIFIER_SELECT: &str = "http://specs.openid.net/auth/2.0/identifier_select";
const SERVER_TYPE: &str = "http://specs.openid.net/auth/2.0/server";
const SIGNON_TYPE: &str = "http://specs.openid.net/auth/2.0/signon";
const XRDS_CONTENT_TYPE: &str = "application/xrds+xml";
const XRDS_LOCATION: &str = "x-xrds-location";
const DISCOVERY_ACCEPT: &str = "application/xrds+xml, text/html;q=0.9, */*;q=0.1";
const REQUEST_TIMEOUT_SECONDS: u64 = 10;

// Compiled once; `None` only if a pattern fails to compile.
static SERVICE_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?is)<Service\b[^>]*>(.*?)</Service>").ok());
static TYPE_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?is)<Type>\s*([^<]+?)\s*</Type>").ok());
static URI_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?is)<URI\b[^>]*>\s*([^<]+?)\s*</URI>").ok());
static LOCAL_ID_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?is)<LocalID>\s*([^<]+?)\s*</LocalID>").ok());
static LINK_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?is)<link\b[^>]*>").ok());
static REL_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r#"(?is)\brel\s*=\s*["']([^"']*)["']"#).ok());
static HREF_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r#"(?is)\bhref\s*=\s*["']([^"']*)["']"#).ok());

/// Where to send the user and which identifiers to ask for.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Endpoint {
    url: String,
    claimed_id: String,
    local_id: String,
}

#[derive(Debug, Clone)]
pub struct OpenIdProvider {
    client: Client,
}

impl OpenIdProvider {
    /// Build the HTTP client used for discovery and verification.
    ///
    /// # Errors
    /// Returns an error if the client cannot be constructed.
    pub fn new() -> Result<Self, IdentityError> {
        let client = Client::builder()
            .user_agent(crate::APP_USER_AGENT)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECONDS))
            .build()?;
        Ok(Self { client })
    }

    #[instrument(skip(self))]
    async fn discover(&self, identifier: &str) -> Result<Endpoint, IdentityError> {
        let url = normalize_identifier(identifier)?;
        let response = self
            .client
            .get(url.clone())
            .header(ACCEPT, DISCOVERY_ACCEPT)
            .send()
            .await?
            .error_for_status()?;

        // the claimed identifier is the URL after redirects
        let claimed_id = response.url().to_string();
        let xrds_location = header_value(&response, XRDS_LOCATION);
        let is_xrds = header_value(&response, CONTENT_TYPE.as_str())
            .is_some_and(|value| value.contains(XRDS_CONTENT_TYPE));
        let body = response.text().await?;

        let from_xrds = if is_xrds {
            parse_xrds(&body, &claimed_id)
        } else if let Some(location) = xrds_location {
            let document = self
                .client
                .get(&location)
                .header(ACCEPT, XRDS_CONTENT_TYPE)
                .send()
                .await?
                .error_for_status()?
                .text()
                .await?;
            parse_xrds(&document, &claimed_id)
        } else {
            None
        };

        from_xrds
            .or_else(|| parse_html(&body, &claimed_id))
            .ok_or_else(|| IdentityError::Discovery(url.to_string()))
    }

    async fn check_authentication(
        &self,
        endpoint: &str,
        response: &HashMap<String, String>,
    ) -> Result<(), IdentityError> {
        let mut params: Vec<(&str, &str)> = response
            .iter()
            .filter(|(key, _)| key.starts_with("openid.") && key.as_str() != "openid.mode")
            .map(|(key, value)| (key.as_str(), value.as_str()))
            .collect();
        params.push(("openid.mode", "check_authentication"));

        let body = self
            .client
            .post(endpoint)
            .form(&params)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        match parse_key_values(&body).get("is_valid").map(String::as_str) {
            Some("true") => Ok(()),
            _ => Err(IdentityError::Rejected(
                "provider did not confirm the assertion".to_string(),
            )),
        }
    }
}

#[async_trait]
impl IdentityProvider for OpenIdProvider {
    async fn begin(
        &self,
        identifier: &str,
        return_to: &str,
        realm: &str,
    ) -> Result<LoginRedirect, IdentityError> {
        let endpoint = self.discover(identifier).await?;
        debug!(endpoint = %endpoint.url, "discovered OpenID endpoint");
        let url = authentication_url(&endpoint, return_to, realm)?;
        Ok(LoginRedirect {
            url,
            pending: PendingLogin {
                endpoint: endpoint.url,
                claimed_id: endpoint.claimed_id,
            },
        })
    }

    async fn complete(
        &self,
        pending: &PendingLogin,
        response: &HashMap<String, String>,
        return_to: &str,
    ) -> Result<String, IdentityError> {
        let claimed_id = verify_assertion(pending, response, return_to)?;

        if pending.claimed_id == IDENTIFIER_SELECT {
            // the provider picked the identifier; it must also be the one serving it
            let discovered = self.discover(&claimed_id).await?;
            if discovered.url != pending.endpoint {
                warn!(
                    claimed_id = %claimed_id,
                    expected = %pending.endpoint,
                    found = %discovered.url,
                    "claimed identifier is served by another endpoint"
                );
                return Err(IdentityError::Rejected(
                    "provider is not authoritative for the claimed identifier".to_string(),
                ));
            }
        }

        self.check_authentication(&pending.endpoint, response)
            .await?;
        Ok(claimed_id)
    }
}

fn header_value(response: &Response, name: &str) -> Option<String> {
    response
        .headers()
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(ToString::to_string)
}

/// Turn user input into a discoverable URL; bare hosts default to https.
fn normalize_identifier(identifier: &str) -> Result<Url, IdentityError> {
    let trimmed = identifier.trim();
    if trimmed.is_empty() {
        return Err(IdentityError::InvalidIdentifier("empty identifier".to_string()));
    }
    let candidate = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    };
    let mut url = Url::parse(&candidate)
        .map_err(|err| IdentityError::InvalidIdentifier(format!("{trimmed}: {err}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(IdentityError::InvalidIdentifier(format!(
            "{trimmed}: unsupported scheme"
        )));
    }
    url.set_fragment(None);
    Ok(url)
}

fn unescape(value: &str) -> String {
    value
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

/// Pick the endpoint from an XRDS document, preferring OP identifier services.
fn parse_xrds(document: &str, claimed_id: &str) -> Option<Endpoint> {
    let service_re = SERVICE_RE.as_ref()?;
    let type_re = TYPE_RE.as_ref()?;
    let uri_re = URI_RE.as_ref()?;
    let local_id_re = LOCAL_ID_RE.as_ref()?;

    let mut signon = None;
    for service in service_re.captures_iter(document) {
        let Some(body) = service.get(1).map(|m| m.as_str()) else {
            continue;
        };
        let types: Vec<&str> = type_re
            .captures_iter(body)
            .filter_map(|c| c.get(1).map(|m| m.as_str()))
            .collect();
        let Some(uri) = uri_re
            .captures(body)
            .and_then(|c| c.get(1))
            .map(|m| unescape(m.as_str()))
        else {
            continue;
        };

        if types.contains(&SERVER_TYPE) {
            return Some(Endpoint {
                url: uri,
                claimed_id: IDENTIFIER_SELECT.to_string(),
                local_id: IDENTIFIER_SELECT.to_string(),
            });
        }
        if signon.is_none() && types.contains(&SIGNON_TYPE) {
            let local_id = local_id_re
                .captures(body)
                .and_then(|c| c.get(1))
                .map_or_else(|| claimed_id.to_string(), |m| unescape(m.as_str()));
            signon = Some(Endpoint {
                url: uri,
                claimed_id: claimed_id.to_string(),
                local_id,
            });
        }
    }
    signon
}

/// Read `openid2.provider` / `openid2.local_id` links from an HTML page.
fn parse_html(document: &str, claimed_id: &str) -> Option<Endpoint> {
    let link_re = LINK_RE.as_ref()?;
    let rel_re = REL_RE.as_ref()?;
    let href_re = HREF_RE.as_ref()?;

    let mut provider = None;
    let mut local_id = None;
    for tag in link_re.find_iter(document) {
        let tag = tag.as_str();
        let (Some(rel), Some(href)) = (
            rel_re.captures(tag).and_then(|c| c.get(1)),
            href_re.captures(tag).and_then(|c| c.get(1)),
        ) else {
            continue;
        };
        let target = unescape(href.as_str());
        for value in rel.as_str().split_whitespace() {
            if value.eq_ignore_ascii_case("openid2.provider") && provider.is_none() {
                provider = Some(target.clone());
            } else if value.eq_ignore_ascii_case("openid2.local_id") && local_id.is_none() {
                local_id = Some(target.clone());
            }
        }
    }

    provider.map(|url| Endpoint {
        url,
        claimed_id: claimed_id.to_string(),
        local_id: local_id.unwrap_or_else(|| claimed_id.to_string()),
    })
}

fn authentication_url(
    endpoint: &Endpoint,
    return_to: &str,
    realm: &str,
) -> Result<String, IdentityError> {
    let mut url = Url::parse(&endpoint.url)
        .map_err(|err| IdentityError::Discovery(format!("{}: {err}", endpoint.url)))?;
    url.query_pairs_mut()
        .append_pair("openid.ns", OPENID_NS)
        .append_pair("openid.mode", "checkid_setup")
        .append_pair("openid.claimed_id", &endpoint.claimed_id)
        .append_pair("openid.identity", &endpoint.local_id)
        .append_pair("openid.return_to", return_to)
        .append_pair("openid.realm", realm);
    Ok(url.into())
}

fn without_fragment(identifier: &str) -> &str {
    identifier
        .split_once('#')
        .map_or(identifier, |(head, _)| head)
}

/// Checks that need no network: mode, namespace, return URL, issuing
/// endpoint and claimed identifier. Returns the claimed identifier.
fn verify_assertion(
    pending: &PendingLogin,
    response: &HashMap<String, String>,
    return_to: &str,
) -> Result<String, IdentityError> {
    let field = |key: &str| response.get(key).map(String::as_str);

    match field("openid.mode") {
        Some("id_res") => {}
        Some("cancel") => return Err(IdentityError::Cancelled),
        Some("error") => {
            return Err(IdentityError::Provider(
                field("openid.error").unwrap_or("unknown error").to_string(),
            ))
        }
        other => {
            return Err(IdentityError::Rejected(format!(
                "unexpected mode {}",
                other.unwrap_or("(none)")
            )))
        }
    }

    if field("openid.ns") != Some(OPENID_NS) {
        return Err(IdentityError::Rejected(
            "unsupported protocol version".to_string(),
        ));
    }

    if !field("openid.return_to").is_some_and(|value| value.starts_with(return_to)) {
        return Err(IdentityError::Rejected(
            "return_to does not match this site".to_string(),
        ));
    }

    if field("openid.op_endpoint") != Some(pending.endpoint.as_str()) {
        return Err(IdentityError::Rejected(
            "assertion came from an unexpected endpoint".to_string(),
        ));
    }

    let claimed_id = field("openid.claimed_id")
        .filter(|value| !value.is_empty())
        .ok_or_else(|| IdentityError::Rejected("missing claimed identifier".to_string()))?;

    if pending.claimed_id != IDENTIFIER_SELECT
        && without_fragment(claimed_id) != without_fragment(&pending.claimed_id)
    {
        return Err(IdentityError::Rejected(
            "claimed identifier does not match".to_string(),
        ));
    }

    Ok(claimed_id.to_string())
}

/// Parse a key-value form response (`key:value` per line).
fn parse_key_values(body: &str) -> HashMap<String, String> {
    body.lines()
        .filter_map(|line| line.split_once(':'))
        .map(|(key, value)| (key.trim().to_string(), value.trim().to_string()))
        .collect()
}
