use crate::domain::model::StreamedAnswer;
use crate::utils::error::Result;
use async_trait::async_trait;

pub trait Storage: Send + Sync {
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<String>> + Send;
}

/// A remote language model that answers a prompt as a stream of fragments.
#[async_trait]
pub trait InferenceService: Send + Sync {
    async fn stream_completion(&self, prompt: &str) -> Result<StreamedAnswer>;
}
