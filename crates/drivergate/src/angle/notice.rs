//! Best-effort "ANGLE in use" notification.

use thiserror::Error;

/// Failure to deliver the in-use notice.
#[derive(Debug, Clone, Error)]
pub enum NoticeError {
    /// The notification channel rejected the notice.
    #[error("failed to deliver ANGLE in-use notice via '{package}': {message}")]
    Delivery {
        /// ANGLE package the notice was addressed to.
        package: String,
        /// Human-readable failure description.
        message: String,
    },
}

/// Sink for the developer-facing notice that a process renders through ANGLE.
pub trait InUseNotifier {
    /// Sends the notice on behalf of `angle_package`.
    ///
    /// # Errors
    ///
    /// Returns [`NoticeError::Delivery`] if the notice cannot be delivered.
    fn notify_angle_in_use(&self, angle_package: &str) -> Result<(), NoticeError>;
}

impl<T> InUseNotifier for &T
where
    T: InUseNotifier + ?Sized,
{
    fn notify_angle_in_use(&self, angle_package: &str) -> Result<(), NoticeError> {
        (**self).notify_angle_in_use(angle_package)
    }
}
