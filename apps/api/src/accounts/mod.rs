pub mod handlers;
pub mod login;
pub mod signup;
pub mod validation;
