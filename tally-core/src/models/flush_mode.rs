/// How much work a counter flush performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlushMode {
    /// Persist the actor-set cache. The count cache is rebuilt only if an
    /// external change was reported.
    #[default]
    Flush,
    /// Persist, then unconditionally rebuild the count cache from storage.
    FullResync,
}

impl FlushMode {
    pub fn is_full_resync(self) -> bool {
        matches!(self, Self::FullResync)
    }
}
