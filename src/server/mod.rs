pub mod route_builder;

pub use route_builder::{App, build_app, build_router};
