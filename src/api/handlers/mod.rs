pub mod signup;
pub mod webhooks;
