pub mod accounts;
pub mod billing;
pub mod btg_auth;
pub mod integration;
pub mod payments;
pub mod webhooks;
