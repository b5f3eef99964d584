//! Identity broker federation.
//!
//! This module implements the broker side of a login:
//!
//! - Authorization redirect construction
//! - Authorization code exchange for an access token
//! - Userinfo retrieval
//! - Username resolution from an ordered claim list
//! - Identity provider allow-listing

pub mod allowlist;
pub mod auth;
pub mod broker;
pub mod claims;
pub mod redirect;
pub mod token;
pub mod userinfo;

pub use allowlist::IdpAllowList;
pub use auth::{AuthState, AuthenticationResult, Authenticator, LoginStage};
pub use broker::{HttpBroker, IdentityBroker};
pub use claims::{ClaimList, ClaimResolver};
pub use redirect::AuthorizeRedirect;
pub use token::{TokenExchangeClient, TokenResponse};
pub use userinfo::{UserInfo, UserInfoClient};
