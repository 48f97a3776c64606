pub mod error;
pub mod qr_code;
pub mod validation;
