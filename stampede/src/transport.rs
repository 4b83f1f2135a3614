//! The outbound side of a race: one POST per call, bearer credential, no body.
use crate::error::RaceError;
use reqwest::{Client, Url};
use stampede_core::{Credential, RaceConfig, TransportError};
use std::future::Future;

/// Sends a single apply request and reports the response status.
///
/// Implementations must not retry: one call is one attempt. Anything short of a fully read
/// response is reported as a [`TransportError`].
pub trait Transport: Send + Sync + 'static {
    fn send(
        &self,
        credential: &Credential,
    ) -> impl Future<Output = Result<u16, TransportError>> + Send;
}

#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: Client,
    endpoint: Url,
}

impl HttpTransport {
    pub fn new(config: &RaceConfig) -> Result<Self, RaceError> {
        let endpoint = config.endpoint()?;

        let mut builder = Client::builder();
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(RaceError::Client)?;

        Ok(Self { client, endpoint })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

impl Transport for HttpTransport {
    async fn send(&self, credential: &Credential) -> Result<u16, TransportError> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .bearer_auth(credential.expose())
            .send()
            .await
            .map_err(request_error)?;

        let status = response.status().as_u16();

        // The call only counts once the whole response has arrived.
        response.bytes().await.map_err(|err| {
            if err.is_timeout() {
                TransportError::Timeout(err.to_string())
            } else {
                TransportError::Body(err.to_string())
            }
        })?;

        Ok(status)
    }
}

fn request_error(err: reqwest::Error) -> TransportError {
    let message = err.to_string();
    if err.is_timeout() {
        TransportError::Timeout(message)
    } else if err.is_connect() {
        TransportError::Connect(message)
    } else if err.is_body() || err.is_decode() {
        TransportError::Body(message)
    } else {
        TransportError::Request(message)
    }
}
