/// Re-export `Config` from `hitbox-core` for use within this crate.
///
/// All environment-variable parsing lives in `hitbox-core` so it can be
/// shared with integration tests without depending on the full server.
pub use hitbox_core::config::Config;
