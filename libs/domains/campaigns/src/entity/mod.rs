//! Sea-ORM entities for the campaigns domain tables

pub mod campaign;
pub mod email_log;
pub mod recipient;
pub mod suppression;
