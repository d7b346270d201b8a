//! Resolve overrides: pin every connection of a requester to one address
//!
//! An override string has the form `hostname:port:address`. Connections are
//! dialed to `address:port` whatever host the URL names, and `hostname` is sent
//! as the `Host` header. The override belongs to one requester's client; no
//! process-wide transport is touched.

use crate::error::{AppError, Result};
use crate::logging::RequestLogger;
use reqwest::dns::{Addrs, Name, Resolve, Resolving};
use reqwest::header::{HeaderMap, HeaderValue, HOST};
use reqwest::ClientBuilder;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use url::Url;

/// Strategy deciding where a requester's connections are dialed
pub trait DialOverride: Send + Sync + fmt::Debug {
    /// Install the override on the client being built
    fn configure(&self, builder: ClientBuilder, logger: RequestLogger) -> ClientBuilder;

    /// Adjust a request URL before it is sent
    fn rewrite_url(&self, url: &mut Url) -> Result<()>;

    /// Host header forced onto every request
    fn host_header(&self) -> Option<&str>;

    /// The override as configured and the address it dials
    fn describe_dial(&self) -> (String, String);
}

/// A parsed `hostname:port:address` override
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveOverride {
    original: String,
    host: String,
    port: u16,
    address: String,
}

impl ResolveOverride {
    /// Parse an override string; anything but exactly three fields is rejected
    pub fn parse(raw: &str) -> Result<Self> {
        let pieces: Vec<&str> = raw.split(':').collect();
        if pieces.len() != 3 {
            return Err(AppError::config(format!(
                "Invalid resolve override '{}': expected host:port:address", raw
            )));
        }

        let (host, port, address) = (pieces[0], pieces[1], pieces[2]);
        if host.is_empty() || address.is_empty() {
            return Err(AppError::config(format!(
                "Invalid resolve override '{}': host and address must not be empty", raw
            )));
        }

        let port: u16 = port.parse().map_err(|e| {
            AppError::config(format!("Invalid resolve override '{}': bad port '{}': {}", raw, port, e))
        })?;

        HeaderValue::from_str(host).map_err(|e| {
            AppError::config(format!("Invalid resolve override '{}': host is not a valid header: {}", raw, e))
        })?;

        Ok(Self {
            original: raw.to_string(),
            host: host.to_string(),
            port,
            address: address.to_string(),
        })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// The address connections are dialed to: third field, then second
    pub fn dial_target(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }
}

impl DialOverride for ResolveOverride {
    fn configure(&self, builder: ClientBuilder, logger: RequestLogger) -> ClientBuilder {
        builder.dns_resolver(Arc::new(OverrideResolver {
            original: self.original.clone(),
            address: self.address.clone(),
            port: self.port,
            logger,
        }))
    }

    fn rewrite_url(&self, url: &mut Url) -> Result<()> {
        // The connector only consults the resolver for names, and it always
        // dials the URL's port, so both are pinned on the URL itself.
        let is_ip_literal = matches!(url.host(), Some(url::Host::Ipv4(_)) | Some(url::Host::Ipv6(_)));
        if is_ip_literal {
            url.set_host(Some(&self.address))
                .map_err(|e| AppError::fatal(format!("Cannot redirect '{}' to {}: {}", url, self.address, e)))?;
        }
        url.set_port(Some(self.port))
            .map_err(|_| AppError::fatal(format!("Cannot set port {} on '{}'", self.port, url)))?;
        Ok(())
    }

    fn host_header(&self) -> Option<&str> {
        Some(&self.host)
    }

    fn describe_dial(&self) -> (String, String) {
        (self.original.clone(), self.dial_target())
    }
}

/// Resolver answering every name with the override address
struct OverrideResolver {
    original: String,
    address: String,
    port: u16,
    logger: RequestLogger,
}

impl Resolve for OverrideResolver {
    fn resolve(&self, _name: Name) -> Resolving {
        let original = self.original.clone();
        let address = self.address.clone();
        let port = self.port;
        let logger = self.logger.clone();

        Box::pin(async move {
            logger.log_dial(&original, &format!("{}:{}", address, port)).await;

            let addrs: Vec<SocketAddr> = match address.parse::<IpAddr>() {
                Ok(ip) => vec![SocketAddr::new(ip, port)],
                Err(_) => tokio::net::lookup_host((address.as_str(), port)).await?.collect(),
            };
            Ok::<Addrs, Box<dyn std::error::Error + Send + Sync>>(Box::new(addrs.into_iter()))
        })
    }
}

/// Header map holding only the forced Host header
pub(crate) fn host_header_map(host: &str) -> Result<HeaderMap> {
    let value = HeaderValue::from_str(host)
        .map_err(|e| AppError::config(format!("Invalid Host header '{}': {}", host, e)))?;
    let mut headers = HeaderMap::new();
    headers.insert(HOST, value);
    Ok(headers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_parse_valid_override() {
        let parsed = ResolveOverride::parse("example.com:443:203.0.113.5").unwrap();
        assert_eq!(parsed.host(), "example.com");
        assert_eq!(parsed.port(), 443);
        assert_eq!(parsed.address(), "203.0.113.5");
        assert_eq!(parsed.dial_target(), "203.0.113.5:443");
        assert_eq!(parsed.host_header(), Some("example.com"));
    }

    #[test]
    fn test_parse_rejects_wrong_field_count() {
        assert!(matches!(ResolveOverride::parse("example.com:443"), Err(AppError::Config(_))));
        assert!(matches!(ResolveOverride::parse("example.com"), Err(AppError::Config(_))));
        assert!(matches!(ResolveOverride::parse("a:1:b:c"), Err(AppError::Config(_))));
    }

    #[test]
    fn test_parse_rejects_bad_port_and_empty_fields() {
        assert!(ResolveOverride::parse("example.com:https:203.0.113.5").is_err());
        assert!(ResolveOverride::parse("example.com:70000:203.0.113.5").is_err());
        assert!(ResolveOverride::parse(":443:203.0.113.5").is_err());
        assert!(ResolveOverride::parse("example.com:443:").is_err());
    }

    #[test]
    fn test_rewrite_named_host_keeps_name() {
        let parsed = ResolveOverride::parse("example.com:8443:127.0.0.1").unwrap();
        let mut url = Url::parse("https://api.example.com/ping?1").unwrap();
        parsed.rewrite_url(&mut url).unwrap();
        assert_eq!(url.as_str(), "https://api.example.com:8443/ping?1");
    }

    #[test]
    fn test_rewrite_ip_literal_host() {
        let parsed = ResolveOverride::parse("example.com:8080:127.0.0.1").unwrap();
        let mut url = Url::parse("http://10.1.2.3:9999/ping?5").unwrap();
        parsed.rewrite_url(&mut url).unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:8080/ping?5");
    }

    #[test]
    fn test_host_header_map_replaces_everything() {
        let headers = host_header_map("example.com").unwrap();
        assert_eq!(headers.len(), 1);
        assert_eq!(headers.get(HOST).unwrap(), "example.com");
    }

    proptest! {
        #[test]
        fn prop_dial_target_is_address_then_port(
            host in "[a-z]{1,12}(\\.[a-z]{2,6})?",
            port in 1u16..,
            a in 0u8.., b in 0u8.., c in 0u8.., d in 0u8..,
        ) {
            let address = format!("{}.{}.{}.{}", a, b, c, d);
            let parsed = ResolveOverride::parse(&format!("{}:{}:{}", host, port, address)).unwrap();
            prop_assert_eq!(parsed.dial_target(), format!("{}:{}", address, port));
            prop_assert_eq!(parsed.host(), host.as_str());
        }
    }
}
