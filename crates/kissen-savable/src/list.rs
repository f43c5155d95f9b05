//! Observable lists.
//!
//! A [`KissenList`] is a `Vec` whose mutations report to an optional
//! [`ListAction`]. The action sees the list before and after the change and
//! only runs when the contents actually changed. If it fails the list is
//! restored to its previous contents and the error is returned, so a list
//! backed by storage never drifts from what was persisted.

use std::fmt;
use std::ops::{Deref, Range};

use crate::error::{Result, SavableError};

/// Which mutation triggered a [`ListAction`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListExecution {
    Set,
    Add,
    AddIndex,
    AddAll,
    AddAllIndexIncluded,
    Remove,
    RemoveIndex,
    RemoveAll,
    RemoveRange,
    RemoveIf,
    RetainAll,
    ReplaceAll,
    Replace,
    Clear,
    Undefined,
}

/// Callback fired after a changing mutation with `(execution, before, after)`.
pub type ListAction<T> = Box<dyn FnMut(ListExecution, &[T], &[T]) -> Result<()> + Send>;

/// A list that reports its mutations.
pub struct KissenList<T> {
    items: Vec<T>,
    action: Option<ListAction<T>>,
}

/// List of strings as stored by a savable.
pub type SavableList = KissenList<String>;

impl<T> KissenList<T> {
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            action: None,
        }
    }

    pub fn with_action(mut self, action: ListAction<T>) -> Self {
        self.action = Some(action);
        self
    }

    pub fn has_action(&self) -> bool {
        self.action.is_some()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    pub fn into_inner(self) -> Vec<T> {
        self.items
    }

    /// Mutable access that bypasses the action.
    pub fn silent_mut(&mut self) -> &mut Vec<T> {
        &mut self.items
    }
}

impl<T: Clone + PartialEq> KissenList<T> {
    fn mutate<R>(&mut self, execution: ListExecution, op: impl FnOnce(&mut Vec<T>) -> R) -> Result<R> {
        let Some(action) = self.action.as_mut() else {
            return Ok(op(&mut self.items));
        };

        let before = self.items.clone();
        let result = op(&mut self.items);
        if self.items != before {
            if let Err(e) = action(execution, &before, &self.items) {
                self.items = before;
                return Err(e);
            }
        }
        Ok(result)
    }

    /// `allow_end` admits `index == len`, the position after the last element.
    fn ensure_index(&self, index: usize, allow_end: bool) -> Result<()> {
        let len = self.items.len();
        if index < len || (allow_end && index == len) {
            Ok(())
        } else {
            Err(SavableError::IndexOutOfBounds { index, len })
        }
    }

    /// Replaces the element at `index`, returning the previous one.
    pub fn set(&mut self, index: usize, value: T) -> Result<T> {
        self.ensure_index(index, false)?;
        self.mutate(ListExecution::Set, |items| {
            std::mem::replace(&mut items[index], value)
        })
    }

    pub fn add(&mut self, value: T) -> Result<bool> {
        self.mutate(ListExecution::Add, |items| items.push(value))?;
        Ok(true)
    }

    pub fn insert(&mut self, index: usize, value: T) -> Result<()> {
        self.ensure_index(index, true)?;
        self.mutate(ListExecution::AddIndex, |items| items.insert(index, value))
    }

    pub fn add_all(&mut self, values: impl IntoIterator<Item = T>) -> Result<bool> {
        self.mutate(ListExecution::AddAll, |items| {
            let len = items.len();
            items.extend(values);
            items.len() != len
        })
    }

    pub fn insert_all(&mut self, index: usize, values: impl IntoIterator<Item = T>) -> Result<bool> {
        self.ensure_index(index, true)?;
        self.mutate(ListExecution::AddAllIndexIncluded, |items| {
            let len = items.len();
            items.splice(index..index, values);
            items.len() != len
        })
    }

    pub fn remove_at(&mut self, index: usize) -> Result<T> {
        self.ensure_index(index, false)?;
        self.mutate(ListExecution::RemoveIndex, |items| items.remove(index))
    }

    /// Removes the first element equal to `value`.
    pub fn remove(&mut self, value: &T) -> Result<bool> {
        self.mutate(ListExecution::Remove, |items| {
            match items.iter().position(|item| item == value) {
                Some(index) => {
                    items.remove(index);
                    true
                }
                None => false,
            }
        })
    }

    pub fn remove_range(&mut self, range: Range<usize>) -> Result<()> {
        self.ensure_index(range.end, true)?;
        if range.start > range.end {
            return Err(SavableError::IndexOutOfBounds {
                index: range.start,
                len: range.end,
            });
        }
        self.mutate(ListExecution::RemoveRange, |items| {
            items.drain(range);
        })
    }

    pub fn remove_all(&mut self, values: &[T]) -> Result<bool> {
        self.mutate(ListExecution::RemoveAll, |items| {
            let len = items.len();
            items.retain(|item| !values.contains(item));
            items.len() != len
        })
    }

    pub fn remove_if(&mut self, mut predicate: impl FnMut(&T) -> bool) -> Result<bool> {
        self.mutate(ListExecution::RemoveIf, |items| {
            let len = items.len();
            items.retain(|item| !predicate(item));
            items.len() != len
        })
    }

    pub fn retain_all(&mut self, values: &[T]) -> Result<bool> {
        self.mutate(ListExecution::RetainAll, |items| {
            let len = items.len();
            items.retain(|item| values.contains(item));
            items.len() != len
        })
    }

    pub fn replace_all(&mut self, mut operator: impl FnMut(&T) -> T) -> Result<()> {
        self.mutate(ListExecution::ReplaceAll, |items| {
            for item in items.iter_mut() {
                *item = operator(&*item);
            }
        })
    }

    pub fn clear(&mut self) -> Result<()> {
        self.mutate(ListExecution::Clear, Vec::clear)
    }

    /// Removes `value` if present, otherwise adds it.
    ///
    /// Returns `(now_present, succeeded)`.
    pub fn invert(&mut self, value: T) -> Result<(bool, bool)> {
        if self.items.contains(&value) {
            Ok((false, self.remove(&value)?))
        } else {
            Ok((true, self.add(value)?))
        }
    }

    /// Replaces every element matching `predicate` in place.
    ///
    /// Returns the number of replaced elements.
    pub fn replace(&mut self, mut predicate: impl FnMut(&T) -> bool, value: T) -> Result<usize> {
        self.mutate(ListExecution::Replace, |items| {
            let mut count = 0;
            for item in items.iter_mut().filter(|item| predicate(&**item)) {
                item.clone_from(&value);
                count += 1;
            }
            count
        })
    }

    pub fn replace_value(&mut self, old: &T, value: T) -> Result<usize> {
        self.replace(|item| item == old, value)
    }

    /// Like [`replace`](Self::replace), appending `value` when nothing matched.
    pub fn replace_or_insert(&mut self, mut predicate: impl FnMut(&T) -> bool, value: T) -> Result<usize> {
        self.mutate(ListExecution::Replace, |items| {
            let mut count = 0;
            for item in items.iter_mut().filter(|item| predicate(&**item)) {
                item.clone_from(&value);
                count += 1;
            }
            if count == 0 {
                items.push(value);
            }
            count
        })
    }

    /// Replaces the whole contents, firing the action once.
    pub fn clear_and_add_all(&mut self, values: impl IntoIterator<Item = T>) -> Result<()> {
        self.mutate(ListExecution::AddAll, |items| {
            items.clear();
            items.extend(values);
        })
    }
}

impl<T> Default for KissenList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> From<Vec<T>> for KissenList<T> {
    fn from(items: Vec<T>) -> Self {
        Self {
            items,
            action: None,
        }
    }
}

impl<T> Deref for KissenList<T> {
    type Target = [T];

    fn deref(&self) -> &Self::Target {
        &self.items
    }
}

impl<'a, T> IntoIterator for &'a KissenList<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl<T: fmt::Debug> fmt::Debug for KissenList<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KissenList")
            .field("items", &self.items)
            .field("action", &self.action.is_some())
            .finish()
    }
}
