//! Utility macros for reducing boilerplate

/// Macro to implement `FromRef<AppState>` for state extractors.
///
/// Lets a handler ask for just the service it uses instead of the whole
/// application state.
///
/// # Example
/// ```ignore
/// impl_from_ref!(FeedService, feed);
/// // Expands to:
/// impl axum::extract::FromRef<AppState> for FeedService {
///     fn from_ref(state: &AppState) -> Self {
///         state.feed.clone()
///     }
/// }
/// ```
#[macro_export]
macro_rules! impl_from_ref {
    ($type:ty, $field:ident) => {
        impl axum::extract::FromRef<$crate::state::AppState> for $type {
            fn from_ref(state: &$crate::state::AppState) -> Self {
                state.$field.clone()
            }
        }
    };
}
