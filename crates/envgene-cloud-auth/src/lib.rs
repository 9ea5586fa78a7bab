//! Cloud registry authentication and provider-aware Maven search.
//!
//! [`resolve_v2_auth_headers`] turns a V2 registry's auth config and the
//! caller's credential store into an `Authorization` header.
//! [`create_maven_searcher`] builds the [`MavenSearcher`] for the registry's
//! provider: Nexus, Artifactory, AWS CodeArtifact or GCP Artifact Registry.
//! Provider tokens come from a [`CloudTokenSource`], so both can run
//! against stubs.

pub use error::{CloudAuthError, Result};
pub use helper::{
    create_maven_searcher, extract_domain_owner, extract_region, extract_repository_name,
    get_gcp_access_token, get_gcp_credentials_from_registry, resolve_auth_config,
    resolve_credentials, DEFAULT_AWS_REGION, DEFAULT_SEARCHER_TIMEOUT,
};
pub use resolver::resolve_v2_auth_headers;
pub use searcher::{
    ArtifactQuery, ArtifactorySearcher, AwsCodeArtifactSearcher, CodeArtifactRepository,
    GcpArtifactRegistrySearcher, MavenSearcher, NexusSearcher,
};
pub use token::{CloudTokenSource, HttpTokenSource};

pub mod aws;
mod error;
pub mod gcp;
mod helper;
mod resolver;
mod searcher;
mod token;
