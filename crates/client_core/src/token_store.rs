use anyhow::Result;
use async_trait::async_trait;
use storage::Storage;
use tokio::sync::Mutex;

pub const TOKEN_KEY: &str = "token";

#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn load_token(&self) -> Result<Option<String>>;
    async fn save_token(&self, token: &str) -> Result<()>;
    async fn clear_token(&self) -> Result<()>;
}

#[async_trait]
impl TokenStore for Storage {
    async fn load_token(&self) -> Result<Option<String>> {
        Ok(self
            .get_value(TOKEN_KEY)
            .await?
            .map(|stored| stored.value)
            .filter(|token| !token.is_empty()))
    }

    async fn save_token(&self, token: &str) -> Result<()> {
        self.put_value(TOKEN_KEY, token).await
    }

    async fn clear_token(&self) -> Result<()> {
        self.delete_value(TOKEN_KEY).await?;
        Ok(())
    }
}

/// Process-local token store; nothing survives a restart.
#[derive(Default)]
pub struct MemoryTokenStore {
    token: Mutex<Option<String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Mutex::new(Some(token.into())),
        }
    }

    pub async fn current(&self) -> Option<String> {
        self.token.lock().await.clone()
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn load_token(&self) -> Result<Option<String>> {
        Ok(self.token.lock().await.clone())
    }

    async fn save_token(&self, token: &str) -> Result<()> {
        *self.token.lock().await = Some(token.to_string());
        Ok(())
    }

    async fn clear_token(&self) -> Result<()> {
        *self.token.lock().await = None;
        Ok(())
    }
}
