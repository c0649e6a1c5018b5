//! Client-side `tower` middleware attaching a fresh bearer JWT to every outgoing request.

use alloy_rpc_types_engine::{Claims, JwtSecret};
use http::{header::AUTHORIZATION, HeaderValue, Request};
use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};
use tower::{Layer, Service};

/// Signs a fresh [`Claims`] on every outgoing request rather than caching a token, since the
/// Engine API's `iat` skew window is only five seconds either side of the server's clock.
#[derive(Clone)]
pub struct AuthClientLayer {
    secret: JwtSecret,
}

impl AuthClientLayer {
    /// Creates a layer that signs outgoing requests with `secret`.
    pub const fn new(secret: JwtSecret) -> Self {
        Self { secret }
    }
}

impl<S> Layer<S> for AuthClientLayer {
    type Service = AuthClientService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AuthClientService { inner, secret: self.secret }
    }
}

/// The [`Service`] produced by [`AuthClientLayer`].
#[derive(Clone)]
pub struct AuthClientService<S> {
    inner: S,
    secret: JwtSecret,
}

impl<S, ReqBody> Service<Request<ReqBody>> for AuthClientService<S>
where
    S: Service<Request<ReqBody>> + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = AuthClientError<S::Error>;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx).map_err(AuthClientError::Inner)
    }

    fn call(&mut self, mut request: Request<ReqBody>) -> Self::Future {
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        let claims = Claims { iat: now as i64, exp: None };

        let result = self.secret.encode(&claims).map_err(AuthClientError::Encode).and_then(|token| {
            let value = HeaderValue::from_str(&format!("Bearer {token}")).map_err(|_| AuthClientError::InvalidToken)?;
            request.headers_mut().insert(AUTHORIZATION, value);
            Ok(request)
        });

        match result {
            Ok(request) => {
                let future = self.inner.call(request);
                Box::pin(async move { future.await.map_err(AuthClientError::Inner) })
            }
            Err(err) => Box::pin(async move { Err(err) }),
        }
    }
}

/// Errors signing or attaching the client's bearer token, or surfaced by the wrapped transport.
#[derive(Debug, thiserror::Error)]
pub enum AuthClientError<E> {
    /// JWT signing failed.
    #[error("failed to encode jwt claims: {0}")]
    Encode(alloy_rpc_types_engine::JwtError),
    /// The signed token was not a valid HTTP header value.
    #[error("signed token is not a valid header value")]
    InvalidToken,
    /// The wrapped transport returned an error.
    #[error(transparent)]
    Inner(E),
}
