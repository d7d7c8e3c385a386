use secrecy::{ExposeSecret, SecretString};

/// Hosted controller region.
///
/// Each region is served from its own API host; an organization lives in
/// exactly one of them and tokens are only valid against that host.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CloudRegion {
    #[default]
    Global01,
    Global02,
    Global03,
    Global04,
    Global05,
    Emea01,
    Emea02,
    Emea03,
    Apac01,
}

impl CloudRegion {
    pub const ALL: [Self; 9] = [
        Self::Global01,
        Self::Global02,
        Self::Global03,
        Self::Global04,
        Self::Global05,
        Self::Emea01,
        Self::Emea02,
        Self::Emea03,
        Self::Apac01,
    ];

    /// The API host for this region.
    pub fn api_host(self) -> &'static str {
        match self {
            Self::Global01 => "api.mist.com",
            Self::Global02 => "api.gc1.mist.com",
            Self::Global03 => "api.ac2.mist.com",
            Self::Global04 => "api.gc2.mist.com",
            Self::Global05 => "api.gc4.mist.com",
            Self::Emea01 => "api.eu.mist.com",
            Self::Emea02 => "api.gc3.mist.com",
            Self::Emea03 => "api.ac6.mist.com",
            Self::Apac01 => "api.ac5.mist.com",
        }
    }

    /// Lowercase region name as used in config files (`global01`, `emea02`, ...).
    pub fn name(self) -> &'static str {
        match self {
            Self::Global01 => "global01",
            Self::Global02 => "global02",
            Self::Global03 => "global03",
            Self::Global04 => "global04",
            Self::Global05 => "global05",
            Self::Emea01 => "emea01",
            Self::Emea02 => "emea02",
            Self::Emea03 => "emea03",
            Self::Apac01 => "apac01",
        }
    }

    /// Look a region up by its config name (case-insensitive).
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|r| r.name().eq_ignore_ascii_case(name))
    }
}

/// Build the `Authorization: Token <key>` header value.
///
/// The value is marked sensitive so it never shows up in `Debug` output
/// of the request.
pub(crate) fn token_header(
    token: &SecretString,
) -> Result<reqwest::header::HeaderValue, crate::error::Error> {
    let mut value =
        reqwest::header::HeaderValue::from_str(&format!("Token {}", token.expose_secret()))
            .map_err(|_| crate::error::Error::Authentication {
                message: "API token contains characters not allowed in a header".into(),
            })?;
    value.set_sensitive(true);
    Ok(value)
}
