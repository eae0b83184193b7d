pub mod contributions;
pub mod gifts;
pub mod root;
pub mod webhooks;
