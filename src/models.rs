pub mod auth;
pub mod billing;
pub mod integration;
pub mod payment;
pub mod webhook;
