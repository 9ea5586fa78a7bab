use reqwest::header::CONTENT_TYPE;
use reqwest::Method;
use serde::Deserialize;
use url::Url;

use crate::error::{ClientError, Result};
use crate::{AuthHeader, EnvgeneClient};

/// One item matched by an Artifactory AQL query.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct AqlResult {
    pub repo: String,
    pub path: String,
    pub name: String,
}

#[derive(Debug, Default, Deserialize)]
struct AqlResponse {
    #[serde(default)]
    results: Vec<AqlResult>,
}

impl EnvgeneClient {
    /// Runs an AQL query against the Artifactory instance at `base`, via
    /// `POST <base>/api/search/aql`.
    pub async fn search_aql(
        &self,
        base: &Url,
        aql: &str,
        auth: Option<&AuthHeader>,
    ) -> Result<Vec<AqlResult>> {
        let url: Url = format!("{}/api/search/aql", base.as_str().trim_end_matches('/')).parse()?;
        let res = self
            .request(Method::POST, url.clone(), auth)?
            .header(CONTENT_TYPE, "text/plain")
            .body(aql.to_string())
            .send()
            .await?;
        let text = Self::check_status(&url, res)?.text().await?;
        let parsed: AqlResponse =
            serde_json::from_str(&text).map_err(|source| ClientError::BadJson {
                source,
                url: url.to_string(),
            })?;
        Ok(parsed.results)
    }
}

#[cfg(test)]
mod test {
    use miette::{IntoDiagnostic, Result};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use wiremock::matchers::{body_string, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    #[async_std::test]
    async fn aql_search() -> Result<()> {
        let mock_server = MockServer::start().await;
        let client = EnvgeneClient::new()?;
        let aql = r#"items.find({"$or":  [{"name": "app-1.0.json"}]})"#;

        Mock::given(method("POST"))
            .and(path("/artifactory/api/search/aql"))
            .and(body_string(aql))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": [
                    { "repo": "releases", "path": "com/example/app/1.0", "name": "app-1.0.json", "size": 12 }
                ],
                "range": { "total": 1 }
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let base: Url = format!("{}/artifactory", mock_server.uri())
            .parse()
            .into_diagnostic()?;
        assert_eq!(
            client.search_aql(&base, aql, None).await?,
            vec![AqlResult {
                repo: "releases".into(),
                path: "com/example/app/1.0".into(),
                name: "app-1.0.json".into(),
            }]
        );
        Ok(())
    }
}
