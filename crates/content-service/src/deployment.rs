//! Deployment information.

use content_types::RequestOutcome;

use crate::service::ContentService;

/// Product name reported by [`ContentService::version`].
pub const PRODUCT_NAME: &str = "content-ops";

impl ContentService {
    /// Report the running build.
    pub fn version(&self) -> RequestOutcome {
        let mut outcome = RequestOutcome::new();
        outcome.log_info("Version: Start");
        outcome.log_info(format!(
            "FullName: {PRODUCT_NAME} {}",
            env!("CARGO_PKG_VERSION")
        ));
        outcome.log_info("Version: End");
        outcome
    }
}
