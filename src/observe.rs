//! Current-value cells with synchronous change notification.
//!
//! Everything runs on one thread, so subscribers are plain `Fn` callbacks
//! invoked in registration order right after the value changes.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

type Callback<T> = Rc<dyn Fn(&T)>;

struct Inner<T> {
    value: RefCell<T>,
    subscribers: RefCell<Vec<(u64, Callback<T>)>>,
    next_id: Cell<u64>,
}

/// A shared value plus its change stream. Clones share the same cell.
pub struct Observable<T> {
    inner: Rc<Inner<T>>,
}

impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: Clone + 'static> Observable<T> {
    pub fn new(value: T) -> Self {
        Self {
            inner: Rc::new(Inner {
                value: RefCell::new(value),
                subscribers: RefCell::new(Vec::new()),
                next_id: Cell::new(0),
            }),
        }
    }

    /// Returns a snapshot of the current value.
    pub fn get(&self) -> T {
        self.inner.value.borrow().clone()
    }

    /// Replaces the value and notifies every subscriber.
    pub fn set(&self, value: T) {
        *self.inner.value.borrow_mut() = value;
        self.notify();
    }

    /// Registers a callback. It is called once immediately with the current
    /// value, then on every `set` until the returned handle is dropped.
    pub fn subscribe(&self, callback: impl Fn(&T) + 'static) -> Subscription {
        let id = self.inner.next_id.get();
        self.inner.next_id.set(id + 1);

        let callback: Callback<T> = Rc::new(callback);
        self.inner
            .subscribers
            .borrow_mut()
            .push((id, Rc::clone(&callback)));
        callback(&self.get());

        let weak = Rc::downgrade(&self.inner);
        Subscription {
            cancel: Some(Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    inner.subscribers.borrow_mut().retain(|(sid, _)| *sid != id);
                }
            })),
        }
    }

    fn notify(&self) {
        // Callbacks may read or set this cell again, so release every borrow first.
        let value = self.get();
        let subscribers: Vec<Callback<T>> = self
            .inner
            .subscribers
            .borrow()
            .iter()
            .map(|(_, cb)| Rc::clone(cb))
            .collect();
        for callback in subscribers {
            callback(&value);
        }
    }
}

/// Keeps a subscription alive; dropping it unsubscribes.
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    /// Keeps the callback registered for the lifetime of the observable.
    pub fn detach(mut self) {
        self.cancel = None;
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscribe_emits_current_value() {
        let cell = Observable::new(3);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let _sub = cell.subscribe(move |v| sink.borrow_mut().push(*v));

        cell.set(4);
        cell.set(5);
        assert_eq!(*seen.borrow(), vec![3, 4, 5]);
    }

    #[test]
    fn test_drop_unsubscribes() {
        let cell = Observable::new(0);
        let count = Rc::new(Cell::new(0));
        let counter = Rc::clone(&count);
        let sub = cell.subscribe(move |_| counter.set(counter.get() + 1));
        drop(sub);

        cell.set(1);
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn test_detach_keeps_callback() {
        let cell = Observable::new(0);
        let count = Rc::new(Cell::new(0));
        let counter = Rc::clone(&count);
        cell.subscribe(move |_| counter.set(counter.get() + 1)).detach();

        cell.set(1);
        cell.set(2);
        assert_eq!(count.get(), 3);
    }

    #[test]
    fn test_clones_share_value() {
        let cell = Observable::new(String::from("a"));
        let other = cell.clone();
        other.set("b".to_string());
        assert_eq!(cell.get(), "b");
    }

    #[test]
    fn test_callback_may_read_cell() {
        let cell = Observable::new(1);
        let reader = cell.clone();
        let seen = Rc::new(Cell::new(0));
        let sink = Rc::clone(&seen);
        let _sub = cell.subscribe(move |_| sink.set(reader.get()));

        cell.set(7);
        assert_eq!(seen.get(), 7);
    }
}
