pub mod admin;
pub mod channels;
pub mod groups;
pub mod health;
pub mod messages;
pub mod tokens;
pub mod users;

use actix_web::web;

/// Registers every route. Scopes sharing a prefix go most specific first,
/// since a matched scope never falls through to the next one.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.configure(health::configure)
        .configure(messages::configure)
        .configure(channels::configure)
        .configure(users::configure)
        .configure(groups::configure)
        .configure(admin::configure)
        .configure(tokens::configure);
}
