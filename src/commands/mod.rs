use async_trait::async_trait;
use miette::Result;

pub mod download;
pub mod resolve;

#[async_trait]
pub trait EnvgeneCommand {
    async fn execute(self) -> Result<()>;
}
