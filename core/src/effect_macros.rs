//! Declarative macros for ergonomic effect and dependency construction

/// Create an `Effect::Future` from an async block
///
/// # Example
///
/// ```rust
/// use composable_fetch_core::{async_effect, effect::Effect};
///
/// let effect: Effect<u32> = async_effect! {
///     Some(42)
/// };
/// assert!(matches!(effect, Effect::Future(_)));
/// ```
#[macro_export]
macro_rules! async_effect {
    ($($body:tt)*) => {
        $crate::effect::Effect::Future(
            ::std::boxed::Box::pin(async move { $($body)* })
        )
    };
}

/// Build a [`DependencySnapshot`](crate::DependencySnapshot) from serializable values
///
/// Each argument becomes one entry, in order.
///
/// # Example
///
/// ```rust
/// use composable_fetch_core::deps;
///
/// let user_id = 7;
/// let page = 2;
/// let snapshot = deps![user_id, page];
/// assert_eq!(snapshot.len(), 2);
/// ```
#[macro_export]
macro_rules! deps {
    () => {
        $crate::dependencies::DependencySnapshot::empty()
    };
    ($($dependency:expr),+ $(,)?) => {
        $crate::dependencies::DependencySnapshot::from_values(::std::vec![
            $($crate::dependencies::dependency_value(&$dependency)),+
        ])
    };
}
