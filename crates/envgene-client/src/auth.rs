use std::fmt::{self, Debug};

use reqwest::header::HeaderValue;

use crate::error::Result;

/// Value of an `Authorization` header to attach to registry requests.
#[derive(Clone, PartialEq, Eq)]
pub enum AuthHeader {
    /// HTTP basic auth credentials.
    Basic { username: String, password: String },
    /// HTTP bearer token, as issued by cloud registries.
    Bearer(String),
}

impl AuthHeader {
    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self::Basic {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn bearer(token: impl Into<String>) -> Self {
        Self::Bearer(token.into())
    }

    /// Encodes this credential as a sensitive header value.
    pub fn header_value(&self) -> Result<HeaderValue> {
        match self {
            AuthHeader::Basic { username, password } => Ok(basic_auth(username, password)),
            AuthHeader::Bearer(token) => {
                let mut val = HeaderValue::from_str(&format!("Bearer {token}"))?;
                val.set_sensitive(true);
                Ok(val)
            }
        }
    }

    /// The full header text, e.g. `Basic dXNlcjpwYXNz`.
    pub fn to_header_string(&self) -> Result<String> {
        Ok(self
            .header_value()?
            .to_str()
            .map(String::from)
            .unwrap_or_default())
    }
}

impl Debug for AuthHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Basic { username, .. } => {
                f.write_fmt(format_args!("Basic(username={username},password=***)"))
            }
            Self::Bearer(_) => f.write_str("Bearer(***)"),
        }
    }
}

// From reqwest utils.
fn basic_auth<U, P>(username: U, password: P) -> HeaderValue
where
    U: fmt::Display,
    P: fmt::Display,
{
    use base64::prelude::BASE64_STANDARD;
    use base64::write::EncoderWriter;
    use std::io::Write;

    let mut buf = b"Basic ".to_vec();
    {
        let mut encoder = EncoderWriter::new(&mut buf, &BASE64_STANDARD);
        let _ = write!(encoder, "{username}:{password}");
    }
    let mut header = HeaderValue::from_bytes(&buf).expect("base64 is always valid HeaderValue");
    header.set_sensitive(true);
    header
}
