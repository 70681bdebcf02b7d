//! HTTP inbound adapter exposing the façade endpoints.
//!
//! Handlers stay thin: they parse the request, call one port, and shape the
//! response. [`configure`] registers every route on an Actix app.

pub mod cache;
pub mod diagnostics;
pub mod error;
pub mod health;
pub mod messages;
pub mod state;

pub use error::ApiResult;

use actix_web::web;

/// Register the façade routes and the JSON error handler.
///
/// Expects `web::Data<HttpState>` and `web::Data<HealthState>` to be
/// registered by the caller.
///
/// # Examples
/// ```
/// use actix_web::{App, web};
/// use backplane::inbound::http::{configure, health::HealthState, state::HttpState};
///
/// let _app = App::new()
///     .app_data(web::Data::new(HttpState::fixtures()))
///     .app_data(web::Data::new(HealthState::new()))
///     .configure(configure);
/// ```
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(error::json_error_handler))
        .service(health::health)
        .service(health::live)
        .service(health::ready)
        .service(
            web::scope("/api")
                .service(diagnostics::info)
                .service(diagnostics::slow)
                .service(diagnostics::simulated_error)
                .service(cache::get_cache)
                .service(cache::put_cache)
                .service(cache::delete_cache)
                .service(messages::publish_message),
        );
}
