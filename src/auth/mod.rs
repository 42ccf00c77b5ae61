pub mod authentication;
pub mod github;
pub mod session;
pub mod user;

pub use authentication::*;
pub use github::*;
pub use session::*;
pub use user::*;
