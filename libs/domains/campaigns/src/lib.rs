//! Campaigns Domain
//!
//! This module provides a complete domain implementation for managing
//! email campaigns: authoring, scheduling, batched delivery with retry,
//! open/click tracking, and suppression handling.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐   ┌─────────────┐
//! │  Handlers   │   │  Scheduler  │  ← HTTP endpoints / cron sweep
//! └──────┬──────┘   └──────┬──────┘
//!        │                 │
//! ┌──────▼──────┐   ┌──────▼──────┐
//! │   Service   │──▶│   Sender    │  ← Business logic / send passes
//! └──────┬──────┘   └──────┬──────┘
//!        │                 │
//! ┌──────▼─────────────────▼──────┐
//! │          Repository           │  ← Data access (trait + impls)
//! └──────────────┬────────────────┘
//!                │
//!         ┌──────▼──────┐
//!         │   Models    │  ← Entities, DTOs, enums
//!         └─────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use domain_campaigns::handlers;
//! use domain_campaigns::repository::InMemoryCampaignRepository;
//! use domain_campaigns::sender::CampaignSender;
//! use domain_campaigns::service::CampaignService;
//! use domain_campaigns::tracking::LinkTracker;
//! use email::MockProvider;
//!
//! // Create repository, sender and service
//! let repository = Arc::new(InMemoryCampaignRepository::new());
//! let tracker = LinkTracker::new("https://api.example.com", "secret");
//! let sender = Arc::new(CampaignSender::new(
//!     repository.clone(),
//!     Arc::new(MockProvider::new()),
//!     tracker.clone(),
//!     "https://app.example.com",
//!     3,
//! ));
//! let service = CampaignService::new(repository, sender, tracker);
//!
//! // Create Axum router
//! let router = handlers::campaigns_router(service);
//! ```

pub mod entity;
pub mod error;
pub mod handlers;
pub mod models;
pub mod postgres;
pub mod render;
pub mod repository;
pub mod retry;
pub mod scheduler;
pub mod sender;
pub mod service;
pub mod tracking;

// Re-export commonly used types
pub use error::{CampaignError, CampaignResult, ErrorBody};
pub use handlers::ApiDoc;
pub use models::{
    Campaign, CampaignFilter, CampaignProgress, CampaignStatus, CreateCampaign, CreateRecipient,
    ProviderEvent, Recipient, RecipientFilter, RecipientStatus, ScheduleRequest, SendRequest,
    SuppressionEntry, SuppressionSource, UnsubscribeRequest, UpdateCampaign,
};
pub use postgres::PgCampaignRepository;
pub use render::TemplateRenderer;
pub use repository::{CampaignRepository, InMemoryCampaignRepository};
pub use scheduler::CampaignScheduler;
pub use sender::CampaignSender;
pub use service::CampaignService;
pub use tracking::{LinkTracker, TrackingOptions};
