pub mod cursor;
pub mod jwt;
pub mod tid;

pub use cursor::{CursorError, decode_cursor, encode_cursor};
pub use jwt::{SessionClaims, create_session_token, validate_session_token};
pub use tid::TidGenerator;
