//! Builder state and terminators.

use convoy_client::{
    default_client, HttpClient, Request, RequestPolicy, Response, Result, RetryPolicy,
    TransferHandle,
};

/// Accumulates a request, its per-attempt policy and an optional retry
/// policy, then hands the lot to an engine.
///
/// Builders target the process-wide default client unless
/// [`RequestBuilder::via`] points them at an explicit instance.
#[derive(Debug)]
pub struct RequestBuilder<'a> {
    pub(crate) request: Request,
    pub(crate) policy: RequestPolicy,
    pub(crate) retry: Option<RetryPolicy>,
    pub(crate) client: Option<&'a HttpClient>,
}

impl<'a> RequestBuilder<'a> {
    pub(crate) fn new(request: Request) -> RequestBuilder<'static> {
        RequestBuilder {
            request,
            policy: RequestPolicy::default(),
            retry: None,
            client: None,
        }
    }

    /// Send through `client` instead of the default engine.
    #[must_use]
    pub fn via(self, client: &HttpClient) -> RequestBuilder<'_> {
        RequestBuilder {
            request: self.request,
            policy: self.policy,
            retry: self.retry,
            client: Some(client),
        }
    }

    /// Replace the whole per-attempt policy.
    #[must_use]
    pub fn policy(mut self, policy: RequestPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Attach a retry policy.
    #[must_use]
    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = Some(retry);
        self
    }

    /// Submit and return the transfer handle.
    pub fn send(self) -> Result<TransferHandle> {
        let client = self.client.unwrap_or_else(|| default_client());
        match self.retry {
            Some(retry) => client.submit_with_retry(self.request, self.policy, retry),
            None => client.submit(self.request, self.policy),
        }
    }

    /// Submit and block until the response arrives.
    pub fn fetch(self) -> Result<Response> {
        self.send()?.wait()
    }
}
