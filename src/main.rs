use envgene_artifacts::EnvgeneArtifacts;
use miette::Result;

#[async_std::main]
async fn main() -> Result<()> {
    EnvgeneArtifacts::load().await
}
