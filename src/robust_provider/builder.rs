use std::{pin::Pin, time::Duration};

use alloy::{network::Network, providers::RootProvider};

use crate::robust_provider::{Error, IntoRootProvider, RobustProvider, provider::CallPolicy};

/// A fallback endpoint that connects once [`RobustProviderBuilder::build`] runs.
type PendingEndpoint<N> = Pin<Box<dyn Future<Output = Result<RootProvider<N>, Error>> + Send>>;

/// Default bound on one endpoint's share of a call, backoff included.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(60);
/// Default number of retries per endpoint after the first attempt.
pub const DEFAULT_MAX_RETRIES: usize = 3;
/// Default initial backoff delay.
pub const DEFAULT_MIN_DELAY: Duration = Duration::from_secs(1);

/// Configures and connects a [`RobustProvider`].
///
/// Endpoints can be given as anything [`IntoRootProvider`]: URLs, root providers or filled
/// providers. Connections are only opened by [`build`](Self::build).
pub struct RobustProviderBuilder<N: Network, P: IntoRootProvider<N>> {
    primary: P,
    fallbacks: Vec<PendingEndpoint<N>>,
    policy: CallPolicy,
}

impl<N: Network, P: IntoRootProvider<N>> RobustProviderBuilder<N, P> {
    /// Starts from `primary` with the `DEFAULT_*` limits and no fallbacks.
    #[must_use]
    pub fn new(primary: P) -> Self {
        Self { primary, fallbacks: Vec::new(), policy: CallPolicy::default() }
    }

    /// Like [`new`](Self::new), but every endpoint gets a single attempt.
    #[must_use]
    pub fn fragile(primary: P) -> Self {
        Self::new(primary).max_retries(0).min_delay(Duration::ZERO)
    }

    /// Appends a fallback endpoint. Fallbacks are tried in the order they were added.
    #[must_use]
    pub fn fallback<F: IntoRootProvider<N> + Send + 'static>(mut self, endpoint: F) -> Self {
        self.fallbacks.push(Box::pin(endpoint.into_root_provider()));
        self
    }

    #[must_use]
    pub fn call_timeout(mut self, call_timeout: Duration) -> Self {
        self.policy.call_timeout = call_timeout;
        self
    }

    #[must_use]
    pub fn max_retries(mut self, max_retries: usize) -> Self {
        self.policy.max_retries = max_retries;
        self
    }

    #[must_use]
    pub fn min_delay(mut self, min_delay: Duration) -> Self {
        self.policy.min_delay = min_delay;
        self
    }

    /// Connects the primary endpoint, then every fallback in order.
    ///
    /// # Errors
    ///
    /// Returns the first connection error.
    pub async fn build(self) -> Result<RobustProvider<N>, Error> {
        let Self { primary, fallbacks: pending, policy } = self;
        debug!(
            call_timeout_ms = policy.call_timeout.as_millis(),
            max_retries = policy.max_retries,
            fallbacks = pending.len(),
            "Connecting RobustProvider"
        );

        let primary = primary.into_root_provider().await?;
        let mut fallbacks = Vec::with_capacity(pending.len());
        for endpoint in pending {
            fallbacks.push(endpoint.await?);
        }

        Ok(RobustProvider { primary, fallbacks, policy })
    }
}
