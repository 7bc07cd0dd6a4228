//! Sentry integration helpers.
//!
//! Infrastructure failures are captured to Sentry before they are turned into
//! a result for the caller. Business rejections (empty cart, out of stock,
//! ...) are logged but never reported.

/// Capture an error to Sentry and log it at `error` level.
///
/// Returns the Sentry event id (nil when Sentry is not initialized).
pub fn capture_error<E>(error: &E, context: &str) -> sentry::types::Uuid
where
    E: std::error::Error + ?Sized,
{
    let event_id = sentry::capture_error(error);
    tracing::error!(
        error = %error,
        sentry_event_id = %event_id,
        "{context}"
    );
    event_id
}

/// Set the Sentry user context from a user ID.
///
/// Call this once the caller is known so errors are associated with them.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("checkout", "Placing order", Some(&[("lines", "3")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_without_client_is_noop() {
        let err = std::io::Error::other("disk on fire");
        let event_id = capture_error(&err, "test failure");
        assert!(event_id.is_nil());
    }

    #[test]
    fn test_breadcrumb_without_client_is_noop() {
        add_breadcrumb("checkout", "Placing order", Some(&[("lines", "2")]));
        set_sentry_user(&"user-1", None);
    }
}
