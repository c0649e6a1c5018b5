//! Server-side `tower` middleware rejecting requests that fail [`JwtAuthValidator`].

use crate::validator::JwtAuthValidator;
use http::{Request, Response, StatusCode};
use pin_project::pin_project;
use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};
use tower::{Layer, Service};

/// Wraps an inner `tower` service, rejecting any request whose `Authorization` header does not
/// carry a valid bearer JWT before forwarding it.
#[derive(Clone)]
pub struct AuthLayer {
    validator: JwtAuthValidator,
}

impl AuthLayer {
    /// Creates a layer that checks every request against `validator`.
    pub const fn new(validator: JwtAuthValidator) -> Self {
        Self { validator }
    }
}

impl<S> Layer<S> for AuthLayer {
    type Service = AuthService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AuthService { inner, validator: self.validator.clone() }
    }
}

/// The [`Service`] produced by [`AuthLayer`].
#[derive(Clone)]
pub struct AuthService<S> {
    inner: S,
    validator: JwtAuthValidator,
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for AuthService<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>>,
    ResBody: Default,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = AuthFuture<S::Future, ResBody>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request<ReqBody>) -> Self::Future {
        match self.validator.validate(request.headers()) {
            Ok(()) => AuthFuture::Authorized { future: self.inner.call(request) },
            Err(err) => {
                tracing::debug!(target: "engine::rpc::auth", %err, "rejecting unauthenticated request");
                let mut response = Response::new(ResBody::default());
                *response.status_mut() = StatusCode::UNAUTHORIZED;
                AuthFuture::Unauthorized { response: Some(response) }
            }
        }
    }
}

/// Future returned by [`AuthService`]. Named rather than boxed so the authorized path forwards
/// the inner service's future without an extra allocation.
#[pin_project(project = AuthFutureProj)]
pub enum AuthFuture<F, ResBody> {
    /// The request passed validation; polling the wrapped service's future.
    Authorized {
        #[pin]
        future: F,
    },
    /// The request was rejected; yields a `401` on first poll.
    Unauthorized { response: Option<Response<ResBody>> },
}

impl<F, ResBody, E> Future for AuthFuture<F, ResBody>
where
    F: Future<Output = Result<Response<ResBody>, E>>,
{
    type Output = Result<Response<ResBody>, E>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match self.project() {
            AuthFutureProj::Authorized { future } => future.poll(cx),
            AuthFutureProj::Unauthorized { response } => {
                Poll::Ready(Ok(response.take().expect("AuthFuture polled after completion")))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validator::JwtAuthValidator;
    use alloy_rpc_types_engine::{Claims, JwtSecret};
    use http::header::AUTHORIZATION;
    use std::convert::Infallible;
    use tower::ServiceExt;

    #[derive(Clone)]
    struct Echo;

    impl Service<Request<String>> for Echo {
        type Response = Response<String>;
        type Error = Infallible;
        type Future = std::future::Ready<Result<Self::Response, Infallible>>;

        fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Infallible>> {
            Poll::Ready(Ok(()))
        }

        fn call(&mut self, _req: Request<String>) -> Self::Future {
            std::future::ready(Ok(Response::new(String::new())))
        }
    }

    fn valid_token(secret: &JwtSecret) -> String {
        let iat = std::time::SystemTime::now().duration_since(std::time::UNIX_EPOCH).unwrap().as_secs() as i64;
        secret.encode(&Claims { iat, exp: None }).unwrap()
    }

    #[tokio::test]
    async fn forwards_authorized_requests() {
        let secret = JwtSecret::random();
        let mut service = AuthLayer::new(JwtAuthValidator::new(secret)).layer(Echo);

        let request = Request::builder()
            .header(AUTHORIZATION, format!("Bearer {}", valid_token(&secret)))
            .body(String::new())
            .unwrap();

        let response = service.ready().await.unwrap().call(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn rejects_unauthenticated_requests_with_401() {
        let secret = JwtSecret::random();
        let mut service = AuthLayer::new(JwtAuthValidator::new(secret)).layer(Echo);

        let request = Request::builder().body(String::new()).unwrap();

        let response = service.ready().await.unwrap().call(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
