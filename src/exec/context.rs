//! Execution context passed down to collaborators.
//!
//! The context carries the argument stack that exposes the current positional
//! arguments to nested evaluation, and the active data source. A context
//! belongs to one call chain at a time; share it across threads only behind
//! the caller's own synchronisation.

use std::ops::{Deref, DerefMut};

use tracing::warn;

use crate::value::Value;

/// Stack of positional argument frames.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArgumentStack {
    frames: Vec<Vec<Value>>,
}

impl ArgumentStack {
    pub fn push(&mut self, args: Vec<Value>) {
        self.frames.push(args);
    }

    pub fn pop(&mut self) -> Option<Vec<Value>> {
        self.frames.pop()
    }

    /// The innermost frame, if any.
    pub fn current(&self) -> Option<&[Value]> {
        self.frames.last().map(Vec::as_slice)
    }

    /// Resolves a 1-based `?N` reference against the innermost frame.
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.current()?.get(index.checked_sub(1)?)
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }
}

/// Execution context for one call chain.
#[derive(Debug, Clone, Default)]
pub struct Context {
    args: ArgumentStack,
    data_source: Option<String>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a context whose active data source is `name`.
    pub fn with_data_source(name: impl Into<String>) -> Self {
        Self {
            data_source: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn args(&self) -> &ArgumentStack {
        &self.args
    }

    /// The arguments visible to the code currently running.
    pub fn current_args(&self) -> &[Value] {
        self.args.current().unwrap_or(&[])
    }

    /// The active data source, if one was selected.
    pub fn data_source(&self) -> Option<&str> {
        self.data_source.as_deref()
    }
}

/// Pushes an argument frame for the lifetime of the guard.
///
/// The frame is popped when the guard is dropped, whichever way the enclosing
/// call exits.
#[derive(Debug)]
pub struct ArgScope<'a> {
    ctx: &'a mut Context,
    depth: usize,
}

impl<'a> ArgScope<'a> {
    pub fn push(ctx: &'a mut Context, args: &[Value]) -> Self {
        ctx.args.push(args.to_vec());
        let depth = ctx.args.depth();
        Self { ctx, depth }
    }
}

impl Deref for ArgScope<'_> {
    type Target = Context;

    fn deref(&self) -> &Context {
        &*self.ctx
    }
}

impl DerefMut for ArgScope<'_> {
    fn deref_mut(&mut self) -> &mut Context {
        &mut *self.ctx
    }
}

impl Drop for ArgScope<'_> {
    fn drop(&mut self) {
        if self.ctx.args.depth() != self.depth {
            warn!(
                "Argument stack depth {} on scope exit, expected {}",
                self.ctx.args.depth(),
                self.depth
            );
        }
        self.ctx.args.pop();
    }
}

/// Makes `name` the active data source for the lifetime of the guard, then
/// restores the previous one.
#[derive(Debug)]
pub struct DataSourceScope<'a> {
    ctx: &'a mut Context,
    previous: Option<String>,
}

impl<'a> DataSourceScope<'a> {
    pub fn enter(ctx: &'a mut Context, name: &str) -> Self {
        let previous = ctx.data_source.replace(name.to_string());
        Self { ctx, previous }
    }
}

impl Deref for DataSourceScope<'_> {
    type Target = Context;

    fn deref(&self) -> &Context {
        &*self.ctx
    }
}

impl DerefMut for DataSourceScope<'_> {
    fn deref_mut(&mut self) -> &mut Context {
        &mut *self.ctx
    }
}

impl Drop for DataSourceScope<'_> {
    fn drop(&mut self) {
        self.ctx.data_source = self.previous.take();
    }
}
