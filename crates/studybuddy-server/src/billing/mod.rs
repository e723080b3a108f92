//! Subscription billing through Stripe Checkout and webhooks

pub mod routes;
pub mod stripe;
pub mod webhook;

pub use stripe::StripeClient;
