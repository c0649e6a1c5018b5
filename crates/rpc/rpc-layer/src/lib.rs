//! JWT HS256 authentication for the Engine API's auth-RPC port, per the Engine API
//! authentication scheme: every request carries a bearer token signed with a secret shared out of
//! band with the consensus client, with `iat` required to fall within five seconds of the
//! server's clock.

mod auth_client_layer;
mod auth_layer;
mod validator;

pub use alloy_rpc_types_engine::{JwtError, JwtSecret};
pub use auth_client_layer::{AuthClientError, AuthClientLayer, AuthClientService};
pub use auth_layer::{AuthFuture, AuthLayer, AuthService};
pub use validator::{AuthError, JwtAuthValidator};
