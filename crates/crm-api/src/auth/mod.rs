pub mod extractors;
pub mod jwks;
pub mod middleware;

pub use extractors::{ActiveUser, AdminUser, CurrentUser};
pub use jwks::{CachePolicy, ChainedKeySource, HttpKeySource, KeySource, TokenVerifier};
pub use middleware::{auth_middleware, AuthState};
