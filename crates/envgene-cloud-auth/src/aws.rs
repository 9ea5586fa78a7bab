//! AWS Signature Version 4 request signing and the CodeArtifact calls built
//! on it.

use std::fmt::{self, Debug};

use chrono::{DateTime, Utc};
use envgene_client::{EnvgeneClient, Method};
use hmac::{Hmac, Mac};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use url::Url;

use crate::error::{CloudAuthError, Result};

type HmacSha256 = Hmac<Sha256>;

pub const CODEARTIFACT_SERVICE: &str = "codeartifact";
const ALGORITHM: &str = "AWS4-HMAC-SHA256";

// RFC 3986 unreserved characters pass through unencoded.
const AWS_URI_ENCODE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Static AWS credentials: an access key pair, optionally with a session
/// token.
#[derive(Clone, PartialEq, Eq)]
pub struct AwsCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
}

impl AwsCredentials {
    pub fn new(access_key_id: impl Into<String>, secret_access_key: impl Into<String>) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            session_token: None,
        }
    }
}

impl Debug for AwsCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_fmt(format_args!(
            "AwsCredentials(access_key_id={},secret_access_key=***)",
            self.access_key_id
        ))
    }
}

/// Headers produced by [`sign_request`], to be added verbatim to the
/// outgoing request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignedHeaders {
    pub amz_date: String,
    pub authorization: String,
    pub security_token: Option<String>,
}

impl SignedHeaders {
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> {
        [
            ("x-amz-date", Some(self.amz_date.as_str())),
            ("authorization", Some(self.authorization.as_str())),
            ("x-amz-security-token", self.security_token.as_deref()),
        ]
        .into_iter()
        .filter_map(|(name, value)| value.map(|value| (name, value)))
    }
}

/// Signs a request with SigV4. The signature covers the method, path,
/// query, `host`, `x-amz-date` (and the session token, when present), and
/// the payload hash.
pub fn sign_request(
    credentials: &AwsCredentials,
    region: &str,
    service: &str,
    method: &Method,
    url: &Url,
    payload: &[u8],
    now: DateTime<Utc>,
) -> SignedHeaders {
    let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();
    let date = now.format("%Y%m%d").to_string();

    let mut headers = vec![
        ("host".to_string(), host_header(url)),
        ("x-amz-date".to_string(), amz_date.clone()),
    ];
    if let Some(token) = &credentials.session_token {
        headers.push(("x-amz-security-token".to_string(), token.clone()));
    }
    headers.sort();
    let canonical_headers: String = headers
        .iter()
        .map(|(name, value)| format!("{name}:{}\n", value.trim()))
        .collect();
    let signed_headers = headers
        .iter()
        .map(|(name, _)| name.as_str())
        .collect::<Vec<_>>()
        .join(";");

    let canonical_request = format!(
        "{method}\n{}\n{}\n{canonical_headers}\n{signed_headers}\n{}",
        canonical_uri(url),
        canonical_query(url),
        hex::encode(Sha256::digest(payload)),
    );

    let scope = format!("{date}/{region}/{service}/aws4_request");
    let string_to_sign = format!(
        "{ALGORITHM}\n{amz_date}\n{scope}\n{}",
        hex::encode(Sha256::digest(canonical_request.as_bytes()))
    );

    let k_date = hmac(
        format!("AWS4{}", credentials.secret_access_key).as_bytes(),
        date.as_bytes(),
    );
    let k_region = hmac(&k_date, region.as_bytes());
    let k_service = hmac(&k_region, service.as_bytes());
    let k_signing = hmac(&k_service, b"aws4_request");
    let signature = hex::encode(hmac(&k_signing, string_to_sign.as_bytes()));

    SignedHeaders {
        authorization: format!(
            "{ALGORITHM} Credential={}/{scope}, SignedHeaders={signed_headers}, Signature={signature}",
            credentials.access_key_id
        ),
        amz_date,
        security_token: credentials.session_token.clone(),
    }
}

fn hmac(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC accepts keys of any size");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

fn host_header(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default();
    match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    }
}

fn canonical_uri(url: &Url) -> String {
    let path = url.path();
    if path.is_empty() {
        return "/".into();
    }
    path.split('/')
        .map(|segment| {
            let decoded = percent_encoding::percent_decode_str(segment).decode_utf8_lossy();
            utf8_percent_encode(&decoded, AWS_URI_ENCODE).to_string()
        })
        .collect::<Vec<_>>()
        .join("/")
}

fn canonical_query(url: &Url) -> String {
    let mut pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| {
            (
                utf8_percent_encode(&k, AWS_URI_ENCODE).to_string(),
                utf8_percent_encode(&v, AWS_URI_ENCODE).to_string(),
            )
        })
        .collect();
    pairs.sort();
    pairs
        .into_iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&")
}

/// CodeArtifact API endpoint for `region`.
pub fn codeartifact_endpoint(region: &str) -> Result<Url> {
    Ok(format!("https://codeartifact.{region}.amazonaws.com/").parse()?)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuthorizationTokenResponse {
    authorization_token: String,
}

/// Sends a SigV4-signed, empty-bodied `POST` to a CodeArtifact endpoint
/// and returns the response body.
pub(crate) async fn signed_post(
    client: &EnvgeneClient,
    credentials: &AwsCredentials,
    region: &str,
    url: &Url,
) -> Result<String> {
    let signed = sign_request(
        credentials,
        region,
        CODEARTIFACT_SERVICE,
        &Method::POST,
        url,
        b"",
        Utc::now(),
    );
    let mut req = client.http().post(url.clone());
    for (name, value) in signed.iter() {
        req = req.header(name, value);
    }
    let res = req
        .send()
        .await
        .map_err(envgene_client::ClientError::from)?;
    let status = res.status();
    let body = res
        .text()
        .await
        .map_err(envgene_client::ClientError::from)?;
    if !status.is_success() {
        return Err(CloudAuthError::TokenRequest {
            provider: "AWS",
            status: Some(status),
            message: body,
        });
    }
    Ok(body)
}

/// Calls CodeArtifact `GetAuthorizationToken` for `domain`.
pub async fn get_authorization_token(
    client: &EnvgeneClient,
    endpoint: &Url,
    credentials: &AwsCredentials,
    region: &str,
    domain: &str,
    domain_owner: Option<&str>,
) -> Result<String> {
    let mut url = endpoint.join("v1/authorization-token")?;
    {
        let mut query = url.query_pairs_mut();
        query.append_pair("domain", domain);
        if let Some(owner) = domain_owner {
            query.append_pair("domain-owner", owner);
        }
    }
    let body = signed_post(client, credentials, region, &url).await?;
    let parsed: AuthorizationTokenResponse =
        serde_json::from_str(&body).map_err(|e| CloudAuthError::TokenRequest {
            provider: "AWS",
            status: None,
            message: format!("unexpected GetAuthorizationToken response: {e}"),
        })?;
    tracing::info!("AWS token obtained for domain '{domain}'");
    Ok(parsed.authorization_token)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use miette::{IntoDiagnostic, Result};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use wiremock::matchers::{header_exists, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    #[test]
    fn sigv4_get_vanilla() -> Result<()> {
        let creds = AwsCredentials::new("AKIDEXAMPLE", "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY");
        let url: Url = "https://example.amazonaws.com/".parse().into_diagnostic()?;
        let now = Utc.with_ymd_and_hms(2015, 8, 30, 12, 36, 0).unwrap();
        let signed = sign_request(&creds, "us-east-1", "service", &Method::GET, &url, b"", now);
        assert_eq!(signed.amz_date, "20150830T123600Z");
        assert_eq!(
            signed.authorization,
            "AWS4-HMAC-SHA256 Credential=AKIDEXAMPLE/20150830/us-east-1/service/aws4_request, \
             SignedHeaders=host;x-amz-date, \
             Signature=5fa00fa31553b73ebf1942676e86291e8372ff2a2260956d9b8aae1d763fbf31"
        );
        Ok(())
    }

    #[test]
    fn canonical_query_is_sorted_and_encoded() -> Result<()> {
        let url: Url = "https://x.example/v1?version=1.0%2B1&domain=my%20domain&a=b"
            .parse()
            .into_diagnostic()?;
        assert_eq!(canonical_query(&url), "a=b&domain=my%20domain&version=1.0%2B1");
        Ok(())
    }

    #[test]
    fn credentials_are_masked() {
        let creds = AwsCredentials::new("AKIA", "very-secret");
        assert!(!format!("{creds:?}").contains("very-secret"));
    }

    #[async_std::test]
    async fn authorization_token_call() -> Result<()> {
        let mock_server = MockServer::start().await;
        let client = EnvgeneClient::new()?;

        Mock::given(method("POST"))
            .and(path("/v1/authorization-token"))
            .and(query_param("domain", "my-domain"))
            .and(query_param("domain-owner", "123456789012"))
            .and(header_exists("authorization"))
            .and(header_exists("x-amz-date"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "authorizationToken": "aws_token_123",
                "expiration": 1700000000
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let endpoint: Url = format!("{}/", mock_server.uri()).parse().into_diagnostic()?;
        let token = get_authorization_token(
            &client,
            &endpoint,
            &AwsCredentials::new("AKIA", "secret"),
            "us-east-1",
            "my-domain",
            Some("123456789012"),
        )
        .await?;
        assert_eq!(token, "aws_token_123");
        Ok(())
    }

    #[async_std::test]
    async fn rejected_token_call_is_transient() -> Result<()> {
        let mock_server = MockServer::start().await;
        let client = EnvgeneClient::new()?;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(403).set_body_string("The security token included in the request is expired"))
            .mount(&mock_server)
            .await;

        let endpoint: Url = format!("{}/", mock_server.uri()).parse().into_diagnostic()?;
        let err = get_authorization_token(
            &client,
            &endpoint,
            &AwsCredentials::new("AKIA", "secret"),
            "us-east-1",
            "my-domain",
            None,
        )
        .await
        .unwrap_err();
        assert!(err.is_transient());
        Ok(())
    }
}
