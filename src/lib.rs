//! Schema-driven mapping between FortiOS REST objects and configuration
//! records, with CRUD orchestration over an abstract transport.

pub mod config;
pub mod fortios;
pub mod resource;
pub mod schema;
