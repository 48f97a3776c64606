pub mod auth;
pub mod billing_service;
pub mod btg_client;
pub mod integration_service;
pub mod payment_service;
pub mod token_service;
pub mod webhook_service;
