//! Email delivery library
//!
//! Providers implement [`EmailProvider`] behind a common trait so the rest of
//! the system never cares whether mail leaves over SMTP or an HTTP API. The
//! [`DeliveryGateway`] layers batching and rate limiting on top and turns
//! provider errors into per-message outcomes.
//!
//! ## Components
//!
//! - **Models**: [`EmailMessage`] with headers and provider custom args
//! - **Providers**: SMTP (lettre), SendGrid (HTTP API), and Mock for tests
//! - **Gateway**: [`DeliveryGateway`] with batch pacing and progress reporting
//!
//! ## Usage
//!
//! ```ignore
//! use email::{DeliveryGateway, EmailMessage, SmtpProvider};
//!
//! let provider = Arc::new(SmtpProvider::from_env()?);
//! let gateway = DeliveryGateway::new(provider, 100, 10);
//! let outcome = gateway.send_one(&message).await;
//! ```

pub mod error;
pub mod gateway;
pub mod models;
pub mod provider;

pub use error::{EmailError, EmailResult};
pub use gateway::{DeliveryGateway, SendOutcome};
pub use models::EmailMessage;
pub use provider::{
    EmailProvider, MockProvider, SendGridProvider, SendResult, SmtpConfig, SmtpProvider,
};
