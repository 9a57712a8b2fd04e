pub mod access_token;
pub mod authority;
pub mod error;
pub mod factory;
pub mod headers;
pub mod http_authority;
pub mod resolver;

pub use access_token::AccessTokenRecord;
pub use authority::{AuthorityError, AuthorityResponse, TokenAuthority};
pub use error::{AuthError, RestError};
pub use factory::build_identity_resolver;
pub use http_authority::HttpTokenAuthority;
pub use resolver::{
    IdentityResolver, caller_id, client_id, get_caller_id, get_client_id, is_public,
};
