pub mod util;
pub mod time_guard;
pub mod config;
pub mod http_response_status_codes;
pub mod webutils;
pub mod handler;
pub mod router;
pub mod pages;
pub mod livereload_client;
pub mod rouille_runner;
pub mod app;
