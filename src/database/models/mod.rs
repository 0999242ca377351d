pub mod content;
pub mod layer;
pub mod member;
pub mod role;

pub use content::ContentRecord;
pub use layer::{Layer, LayerPatch, NewLayer};
pub use member::{Member, MemberPatch, NewMember, SocialLinks};
pub use role::{NewRole, Role, RolePatch};
