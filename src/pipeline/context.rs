//! Shared key/value storage passed through the pipeline.
//!
//! Stages never call each other; every inter-stage datum travels through
//! a [`Context`] under a well-known key. Entries are reference counted
//! (`Arc`), released when the last reference drops, and accounted
//! against a configurable memory budget.

use std::any::Any;
use std::mem;
use std::sync::{Arc, Mutex, PoisonError};

use super::errors::ErrorCode;
use crate::syntax::tokenizer::{Token, TokenStream};
use crate::syntax::tree::{Program, Stmt};

/// Hard budgets enforced by a context. The defaults match the production
/// configuration; tests construct smaller ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextLimits {
    pub max_key_length: usize,
    pub max_entries: usize,
    pub max_memory_bytes: usize,
}

impl Default for ContextLimits {
    fn default() -> Self {
        Self {
            max_key_length: 256,
            max_entries: 512,
            max_memory_bytes: 10 * 1024 * 1024,
        }
    }
}

/// Payloads a context can hold. The pipeline's own data flows through
/// the closed variants; `Opaque` lets embedders attach anything else,
/// with an explicitly declared memory cost.
pub enum Value {
    Source(String),
    Tokens(TokenStream),
    Program(Mutex<Program>),
    Code(String),
    Flag(bool),
    Opaque { payload: Box<dyn Any + Send + Sync>, cost: usize },
}

impl std::fmt::Debug for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Source(text) => f.debug_tuple("Source").field(text).finish(),
            Value::Tokens(tokens) => f.debug_tuple("Tokens").field(tokens).finish(),
            Value::Program(program) => f.debug_tuple("Program").field(program).finish(),
            Value::Code(text) => f.debug_tuple("Code").field(text).finish(),
            Value::Flag(flag) => f.debug_tuple("Flag").field(flag).finish(),
            Value::Opaque { cost, .. } => f
                .debug_struct("Opaque")
                .field("payload", &"<opaque>")
                .field("cost", cost)
                .finish(),
        }
    }
}

impl Value {
    pub fn opaque(payload: impl Any + Send + Sync, cost: usize) -> Self {
        Value::Opaque {
            payload: Box::new(payload),
            cost,
        }
    }

    /// Approximate heap footprint, used for memory accounting.
    pub fn cost(&self) -> usize {
        match self {
            Value::Source(text) | Value::Code(text) => text.len(),
            Value::Tokens(tokens) => tokens.len() * mem::size_of::<Token>(),
            Value::Program(program) => {
                let program = program.lock().unwrap_or_else(PoisonError::into_inner);
                program.node_count() * mem::size_of::<Stmt>()
            }
            Value::Flag(_) => 1,
            Value::Opaque { cost, .. } => *cost,
        }
    }

    pub fn as_source(&self) -> Option<&str> {
        match self {
            Value::Source(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_tokens(&self) -> Option<&TokenStream> {
        match self {
            Value::Tokens(tokens) => Some(tokens),
            _ => None,
        }
    }

    pub fn program(&self) -> Option<&Mutex<Program>> {
        match self {
            Value::Program(program) => Some(program),
            _ => None,
        }
    }

    pub fn as_code(&self) -> Option<&str> {
        match self {
            Value::Code(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_flag(&self) -> Option<bool> {
        match self {
            Value::Flag(flag) => Some(*flag),
            _ => None,
        }
    }
}

struct Entry {
    key: String,
    value: Arc<Value>,
    cost: usize,
}

#[derive(Default)]
struct Inner {
    entries: Vec<Entry>,
    memory: usize,
}

/// Thread-safe key/value store with capped key length, entry count, and
/// tracked memory. A failed mutation leaves the context untouched.
pub struct Context {
    limits: ContextLimits,
    inner: Mutex<Inner>,
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl Context {
    pub fn new() -> Self {
        Self::with_limits(ContextLimits::default())
    }

    pub fn with_limits(limits: ContextLimits) -> Self {
        Self {
            limits,
            inner: Mutex::new(Inner::default()),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Binds or rebinds `key`. Rebinding releases the previous value
    /// once no other holder keeps it alive.
    pub fn set(&self, key: &str, value: Value) -> Result<(), ErrorCode> {
        if key.len() > self.limits.max_key_length {
            return Err(ErrorCode::KeyTooLong);
        }
        let cost = key
            .len()
            .checked_add(value.cost())
            .ok_or(ErrorCode::Overflow)?;

        let mut inner = self.lock();
        match inner.entries.iter().position(|entry| entry.key == key) {
            Some(index) => {
                let replaced_cost = inner.entries[index].cost;
                let memory = inner
                    .memory
                    .saturating_sub(replaced_cost)
                    .checked_add(cost)
                    .ok_or(ErrorCode::Overflow)?;
                if memory > self.limits.max_memory_bytes {
                    return Err(ErrorCode::MemoryLimitExceeded);
                }
                inner.entries[index] = Entry {
                    key: key.to_string(),
                    value: Arc::new(value),
                    cost,
                };
                inner.memory = memory;
            }
            None => {
                if inner.entries.len() >= self.limits.max_entries {
                    return Err(ErrorCode::CapacityExceeded);
                }
                let memory = inner.memory.checked_add(cost).ok_or(ErrorCode::Overflow)?;
                if memory > self.limits.max_memory_bytes {
                    return Err(ErrorCode::MemoryLimitExceeded);
                }
                inner.entries.push(Entry {
                    key: key.to_string(),
                    value: Arc::new(value),
                    cost,
                });
                inner.memory = memory;
            }
        }
        Ok(())
    }

    /// Snapshot reference to the value under `key`. Holders must treat
    /// the value as read-only.
    pub fn get(&self, key: &str) -> Option<Arc<Value>> {
        let inner = self.lock();
        inner
            .entries
            .iter()
            .find(|entry| entry.key == key)
            .map(|entry| Arc::clone(&entry.value))
    }

    /// Owned reference that keeps the value alive across rebinds and
    /// removal until the caller drops it.
    pub fn acquire(&self, key: &str) -> Result<Arc<Value>, ErrorCode> {
        self.get(key).ok_or(ErrorCode::NotFound)
    }

    pub fn contains(&self, key: &str) -> bool {
        let inner = self.lock();
        inner.entries.iter().any(|entry| entry.key == key)
    }

    pub fn remove(&self, key: &str) -> Result<(), ErrorCode> {
        let mut inner = self.lock();
        let index = inner
            .entries
            .iter()
            .position(|entry| entry.key == key)
            .ok_or(ErrorCode::NotFound)?;
        let entry = inner.entries.remove(index);
        inner.memory = inner.memory.saturating_sub(entry.cost);
        Ok(())
    }

    pub fn count(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn memory_usage(&self) -> usize {
        self.lock().memory
    }

    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.entries.clear();
        inner.memory = 0;
    }
}
