//! Addressing for the device's call-monitor port.

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::defaults::DEFAULT_MONITOR_PORT;

/// TCP endpoint of a call-monitor service.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct MonitorEndpoint {
    host: String,
    port: u16,
}

impl MonitorEndpoint {
    /// Builds an endpoint from a host and port.
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Builds an endpoint on the default monitor port when `port` is absent.
    #[must_use]
    pub fn with_default_port(host: impl Into<String>, port: Option<u16>) -> Self {
        Self::new(host, port.unwrap_or(DEFAULT_MONITOR_PORT))
    }

    /// Host name or address.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// TCP port.
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }
}

impl fmt::Display for MonitorEndpoint {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(formatter, "tcp://[{}]:{}", self.host, self.port)
        } else {
            write!(formatter, "tcp://{}:{}", self.host, self.port)
        }
    }
}

impl MonitorEndpoint {
    /// Parses `input`, using `port` when the text names no port of its own.
    ///
    /// Accepts `host`, `host:port`, `[v6]:port`, a bare IPv6 address and
    /// `tcp://host:port`.
    ///
    /// # Errors
    ///
    /// Returns [`EndpointParseError`] when the host is missing, the port is
    /// not a number in range, or a URL uses a scheme other than `tcp`.
    pub fn parse_with_port(input: &str, port: u16) -> Result<Self, EndpointParseError> {
        let (host, explicit) = split_endpoint(input)?;
        Ok(Self::new(host, explicit.unwrap_or(port)))
    }
}

impl FromStr for MonitorEndpoint {
    type Err = EndpointParseError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        Self::parse_with_port(input, DEFAULT_MONITOR_PORT)
    }
}

type EndpointParts<'a> = (Cow<'a, str>, Option<u16>);

fn split_endpoint(input: &str) -> Result<EndpointParts<'_>, EndpointParseError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(EndpointParseError::MissingHost(input.to_owned()));
    }

    if trimmed.contains("://") {
        return split_url(input, trimmed);
    }

    split_host_port(input, trimmed)
}

fn split_url(input: &str, trimmed: &str) -> Result<EndpointParts<'static>, EndpointParseError> {
    let url = Url::parse(trimmed)?;
    if url.scheme() != "tcp" {
        return Err(EndpointParseError::UnsupportedScheme(
            url.scheme().to_owned(),
        ));
    }
    let host = url
        .host_str()
        .map(|text| text.trim_start_matches('[').trim_end_matches(']'))
        .filter(|text| !text.is_empty())
        .ok_or_else(|| EndpointParseError::MissingHost(input.to_owned()))?;
    Ok((Cow::Owned(host.to_owned()), url.port()))
}

fn split_host_port<'a>(
    input: &str,
    trimmed: &'a str,
) -> Result<EndpointParts<'a>, EndpointParseError> {
    if let Some(rest) = trimmed.strip_prefix('[') {
        let (host, tail) = rest
            .split_once(']')
            .ok_or_else(|| EndpointParseError::MissingHost(input.to_owned()))?;
        if host.is_empty() {
            return Err(EndpointParseError::MissingHost(input.to_owned()));
        }
        let port = match tail.strip_prefix(':') {
            Some(port) => Some(parse_port(input, port)?),
            None if tail.is_empty() => None,
            None => return Err(EndpointParseError::InvalidPort(input.to_owned())),
        };
        return Ok((Cow::Borrowed(host), port));
    }

    match trimmed.rsplit_once(':') {
        // Bare IPv6 addresses carry several colons and no port.
        Some((host, _)) if host.contains(':') => Ok((Cow::Borrowed(trimmed), None)),
        Some((host, port)) => {
            if host.is_empty() {
                return Err(EndpointParseError::MissingHost(input.to_owned()));
            }
            Ok((Cow::Borrowed(host), Some(parse_port(input, port)?)))
        }
        None => Ok((Cow::Borrowed(trimmed), None)),
    }
}

fn parse_port(input: &str, port: &str) -> Result<u16, EndpointParseError> {
    port.parse::<u16>()
        .map_err(|_| EndpointParseError::InvalidPort(input.to_owned()))
}

/// Errors encountered while parsing a [`MonitorEndpoint`] from text.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EndpointParseError {
    /// Scheme was not `tcp`.
    #[error("unsupported endpoint scheme '{0}'")]
    UnsupportedScheme(String),
    /// Host name was missing.
    #[error("missing host in '{0}'")]
    MissingHost(String),
    /// Port was not a number in `0..=65535`.
    #[error("invalid port in '{0}'")]
    InvalidPort(String),
    /// URL failed to parse.
    #[error(transparent)]
    Url(#[from] url::ParseError),
}
