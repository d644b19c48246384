//! Integration test modules

mod checkout;
mod email_flow;
mod otp_flow;
