//! Thread-bound legacy graphics contexts needed while a backend boots.
//!
//! Some platforms only let an OpenGL backend initialize while a legacy
//! context is current on the calling thread. The bridge makes it current
//! for exactly the duration of backend creation through
//! [`ScopedLegacyContext`], which releases it on every exit path.

/// A platform context that can be made current on the calling thread.
pub trait LegacyContext {
    fn acquire(&mut self) -> Result<(), String>;
    fn release(&mut self);
}

/// For platforms and backends that need nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoLegacyContext;

impl LegacyContext for NoLegacyContext {
    fn acquire(&mut self) -> Result<(), String> {
        Ok(())
    }

    fn release(&mut self) {}
}

/// Holds a legacy context current until dropped.
pub struct ScopedLegacyContext<'a> {
    ctx: &'a mut dyn LegacyContext,
}

impl<'a> ScopedLegacyContext<'a> {
    pub fn acquire(ctx: &'a mut dyn LegacyContext) -> Result<Self, String> {
        ctx.acquire()?;
        Ok(Self { ctx })
    }
}

impl Drop for ScopedLegacyContext<'_> {
    fn drop(&mut self) {
        self.ctx.release();
    }
}
