pub mod api;
pub mod config;
pub mod consts;
pub mod detection;
pub mod error;
pub mod frame;
pub mod io;
pub mod metadata;
pub mod photometry;
pub mod pipeline;
pub mod policy;
pub mod recommend;
pub mod report;
pub mod sink;
pub mod watch;
