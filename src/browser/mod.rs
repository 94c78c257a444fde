//! Browser automation used to capture report screenshots

mod webdriver;

pub use webdriver::{WebDriver, WebDriverLauncher};

use crate::config::BrowserOptions;
use crate::error::Result;
use async_trait::async_trait;

/// One live browser session.
#[async_trait]
pub trait Browser: Send {
    /// Load `url` in the current window.
    async fn navigate(&mut self, url: &str) -> Result<()>;

    /// Capture the visible viewport as PNG bytes.
    async fn screenshot(&mut self) -> Result<Vec<u8>>;

    /// End the session and release any process backing it.
    async fn quit(&mut self) -> Result<()>;
}

/// Opens browser sessions. Lets callers substitute the real driver.
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    /// Start a fresh session according to `options`.
    async fn launch(&self, options: &BrowserOptions) -> Result<Box<dyn Browser>>;
}

#[async_trait]
impl<B: Browser + ?Sized> Browser for Box<B> {
    async fn navigate(&mut self, url: &str) -> Result<()> {
        (**self).navigate(url).await
    }

    async fn screenshot(&mut self) -> Result<Vec<u8>> {
        (**self).screenshot().await
    }

    async fn quit(&mut self) -> Result<()> {
        (**self).quit().await
    }
}
