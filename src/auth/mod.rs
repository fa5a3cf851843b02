mod jwt;
mod password;
mod reset_token;

pub use jwt::{AuthError, Claims, JwtKeys};
pub use password::{hash_password, is_acceptable_password, verify_password, MIN_PASSWORD_LEN};
pub use reset_token::{hash_reset_token, ResetToken};
