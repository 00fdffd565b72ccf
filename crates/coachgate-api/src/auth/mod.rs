//! 요청 인증.

pub mod extractor;

pub use extractor::{bearer_token, Authenticated, CoachAuth, CoachOrClientAuth};
