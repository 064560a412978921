/// Lets handlers extract one `AppState` field directly, e.g.
/// `State(storage): State<SharedStorage>` after `impl_from_ref!(SharedStorage, storage)`.
#[macro_export]
macro_rules! impl_from_ref {
    ($part:ty, $field:ident) => {
        impl axum::extract::FromRef<$crate::state::AppState> for $part {
            fn from_ref(app: &$crate::state::AppState) -> $part {
                app.$field.clone()
            }
        }
    };
}
