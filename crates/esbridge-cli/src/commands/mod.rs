pub mod decode_hmr;
pub mod transform;
pub mod version;
pub mod watch;
