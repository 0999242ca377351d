// Route handlers, one module per API area. Admin checks are attached per
// method with `route_layer`, so public reads and admin writes can share a path.
pub mod auth;
pub mod content;
pub mod files;
pub mod health;
pub mod team;
