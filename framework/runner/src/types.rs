/// Recommended error type for your scenario `main` function and any shared behaviour code that
/// you write for hooks. This type is compatible with [crate::definition::HookResult] so you can
/// use `?` to propagate errors.
pub type RenderTunnelResult<T> = anyhow::Result<T>;
