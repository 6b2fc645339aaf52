pub mod config;
pub mod demo;
pub mod interaction;
pub mod layout;
pub mod projection;
pub mod render;
pub mod risk;
pub mod session;
pub mod source;
pub mod topology;
pub mod util;
