//! User-Agent sent on image requests.

/// Default User-Agent for image downloads (identifies the tool and version).
#[must_use]
pub(crate) fn default_image_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("comic-archiver/{version}")
}
