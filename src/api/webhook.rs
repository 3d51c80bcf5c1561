use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};

use crate::{
    core::notification::{Notification, NotificationSink},
    prelude::*,
};

/// Posts every notification as JSON.
pub struct Sink {
    client: Client,
    url: Url,
}

impl Sink {
    pub fn new(url: Url) -> Result<Self> {
        Ok(Self { client: Client::builder().timeout(Duration::from_secs(3)).build()?, url })
    }
}

#[async_trait]
impl NotificationSink for Sink {
    #[instrument(skip_all, fields(url = %self.url))]
    async fn notify(&self, notification: &Notification) -> Result {
        debug!("posting the notification…");
        self.client
            .post(self.url.clone())
            .json(notification)
            .send()
            .await
            .with_context(|| format!("failed to post the notification to `{}`", self.url))?
            .error_for_status()?;
        Ok(())
    }
}
