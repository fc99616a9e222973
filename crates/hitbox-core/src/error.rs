use thiserror::Error;

/// Why a beacon was not counted.
///
/// The first two variants are client-caused rejections (4xx-equivalent) and
/// leave no side effects behind. `Storage` covers everything
/// infrastructure-caused, including an exhausted conflict-retry budget
/// (5xx-equivalent); the beacon protocol is fire-and-forget, so the SDK
/// swallows both kinds client-side.
#[derive(Debug, Error)]
pub enum IngestError {
    /// Unknown public key, or the site exists but has been deactivated.
    /// The two are deliberately indistinguishable to the caller.
    #[error("no active site for this key")]
    SiteNotFound,

    #[error("origin does not match the registered site origin")]
    OriginMismatch,

    #[error("storage error: {0}")]
    Storage(#[from] anyhow::Error),
}
