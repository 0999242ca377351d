pub mod content_service;
pub mod team_service;
pub mod team_structure;

pub use content_service::ContentService;
pub use team_service::{TeamService, Updated};
pub use team_structure::{build_public_structure, PublicLayer, PublicMember};
