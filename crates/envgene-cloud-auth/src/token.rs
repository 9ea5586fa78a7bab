use std::fmt::Debug;

use async_trait::async_trait;
use envgene_client::EnvgeneClient;
use url::Url;

use crate::aws::{self, AwsCredentials};
use crate::error::Result;
use crate::gcp::{GcpTokenProvider, ServiceAccountKey};

/// Where provider bearer tokens come from.
#[async_trait]
pub trait CloudTokenSource: Debug + Send + Sync {
    /// CodeArtifact authorization token for `domain`.
    async fn aws_authorization_token(
        &self,
        credentials: &AwsCredentials,
        region: &str,
        domain: &str,
        domain_owner: Option<&str>,
    ) -> Result<String>;

    /// OAuth2 access token for a service account JSON key.
    async fn gcp_access_token(&self, service_account_json: &str) -> Result<String>;
}

/// Token source that talks to the real provider endpoints.
#[derive(Debug)]
pub struct HttpTokenSource {
    client: EnvgeneClient,
    aws_endpoint: Option<Url>,
    gcp: GcpTokenProvider,
}

impl HttpTokenSource {
    pub fn new(client: EnvgeneClient) -> Self {
        Self {
            client,
            aws_endpoint: None,
            gcp: GcpTokenProvider::new(),
        }
    }

    /// Sends CodeArtifact calls to `endpoint` instead of the regional AWS
    /// endpoint.
    pub fn with_aws_endpoint(mut self, endpoint: Url) -> Self {
        self.aws_endpoint = Some(endpoint);
        self
    }
}

#[async_trait]
impl CloudTokenSource for HttpTokenSource {
    async fn aws_authorization_token(
        &self,
        credentials: &AwsCredentials,
        region: &str,
        domain: &str,
        domain_owner: Option<&str>,
    ) -> Result<String> {
        let endpoint = match &self.aws_endpoint {
            Some(endpoint) => endpoint.clone(),
            None => aws::codeartifact_endpoint(region)?,
        };
        aws::get_authorization_token(
            &self.client,
            &endpoint,
            credentials,
            region,
            domain,
            domain_owner,
        )
        .await
    }

    async fn gcp_access_token(&self, service_account_json: &str) -> Result<String> {
        let key = ServiceAccountKey::from_json(service_account_json)?;
        self.gcp.access_token(&self.client, &key).await
    }
}
