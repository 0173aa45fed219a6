// Thin route handlers: extract and validate input, delegate to the models.
// Authorization is enforced by the route layers in `app`.
pub mod auth;
pub mod companies;
pub mod jobs;
pub mod users;
