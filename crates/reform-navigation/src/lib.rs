//! Route-change hooks and scoped guard registrations.
//!
//! Reform does not navigate; the host router does. This crate is the
//! boundary between the two: a [`Router`] carries the current route plus
//! three hook registries, and hands out [`HookHandle`]s that release their
//! registration exactly once.
//!
//! - *before* hooks run ahead of a route change and may veto it by
//!   returning `FormError::NavigationCancelled`. A veto aborts the change
//!   cleanly; after hooks do not run.
//! - *after* hooks fire once a change went through, for post-navigation
//!   cleanup.
//! - *unload* guards answer the host's page-unload check with a warning
//!   message while there is something worth keeping.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use reform_core::{Dispose, FormError};
use slotmap::SlotMap;

slotmap::new_key_type! {
    pub struct HookKey;
}

pub struct RouteChange {
    pub from: String,
    pub to: String,
}

type BeforeHook = Rc<dyn Fn(&RouteChange) -> Result<(), FormError>>;
type AfterHook = Rc<dyn Fn(&RouteChange)>;
type UnloadHook = Rc<dyn Fn() -> Option<String>>;

/// Blocking yes/no confirmation, owned by the host environment.
pub trait ConfirmPrompt {
    fn confirm(&self, message: &str) -> bool;
}

/// A prompt that always answers the same way. Handy for tests and headless
/// hosts.
pub struct AlwaysAnswer(pub bool);

impl ConfirmPrompt for AlwaysAnswer {
    fn confirm(&self, _message: &str) -> bool {
        self.0
    }
}

#[derive(Clone)]
pub struct Router {
    inner: Rc<RouterInner>,
}

struct RouterInner {
    current: RefCell<String>,
    before: RefCell<SlotMap<HookKey, BeforeHook>>,
    after: RefCell<SlotMap<HookKey, AfterHook>>,
    unload: RefCell<SlotMap<HookKey, UnloadHook>>,
}

/// Scoped registration on a [`Router`]: dropping the handle releases it.
/// Releasing twice is a no-op, and a handle that outlives its router
/// releases nothing.
pub struct HookHandle {
    release: Dispose,
}

impl HookHandle {
    pub fn release(&self) {
        self.release.run();
    }

    pub fn is_released(&self) -> bool {
        self.release.is_spent()
    }
}

impl Drop for HookHandle {
    fn drop(&mut self) {
        self.release.run();
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl Router {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RouterInner {
                current: RefCell::new("/".to_string()),
                before: RefCell::new(SlotMap::with_key()),
                after: RefCell::new(SlotMap::with_key()),
                unload: RefCell::new(SlotMap::with_key()),
            }),
        }
    }

    pub fn current(&self) -> String {
        self.inner.current.borrow().clone()
    }

    pub fn listen_before(
        &self,
        f: impl Fn(&RouteChange) -> Result<(), FormError> + 'static,
    ) -> HookHandle {
        let key = self.inner.before.borrow_mut().insert(Rc::new(f));
        self.handle(key, |inner, key| {
            inner.before.borrow_mut().remove(key);
        })
    }

    pub fn listen_after(&self, f: impl Fn(&RouteChange) + 'static) -> HookHandle {
        let key = self.inner.after.borrow_mut().insert(Rc::new(f));
        self.handle(key, |inner, key| {
            inner.after.borrow_mut().remove(key);
        })
    }

    pub fn guard_unload(&self, f: impl Fn() -> Option<String> + 'static) -> HookHandle {
        let key = self.inner.unload.borrow_mut().insert(Rc::new(f));
        self.handle(key, |inner, key| {
            inner.unload.borrow_mut().remove(key);
        })
    }

    /// Run the before hooks, move to `to`, run the after hooks.
    ///
    /// The first vetoing hook aborts the whole change: the route stays where
    /// it was and no after hook fires. The veto is an ordinary `Err` the
    /// caller can catch.
    pub fn navigate(&self, to: impl Into<String>) -> Result<(), FormError> {
        let change = RouteChange {
            from: self.current(),
            to: to.into(),
        };

        let before: Vec<BeforeHook> = self.inner.before.borrow().values().cloned().collect();
        for hook in before {
            hook(&change)?;
        }

        *self.inner.current.borrow_mut() = change.to.clone();
        log::debug!("route change {} -> {}", change.from, change.to);

        let after: Vec<AfterHook> = self.inner.after.borrow().values().cloned().collect();
        for hook in after {
            hook(&change);
        }
        Ok(())
    }

    /// The host's page-unload check: the first registered guard that wants
    /// to block answers with a warning message.
    pub fn check_unload(&self) -> Option<String> {
        let guards: Vec<UnloadHook> = self.inner.unload.borrow().values().cloned().collect();
        guards.iter().find_map(|g| g())
    }

    fn handle(
        &self,
        key: HookKey,
        remove: impl Fn(&RouterInner, HookKey) + 'static,
    ) -> HookHandle {
        let inner: Weak<RouterInner> = Rc::downgrade(&self.inner);
        HookHandle {
            release: Dispose::new(move || {
                if let Some(inner) = inner.upgrade() {
                    remove(&inner, key);
                }
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_navigate_runs_hooks_in_phases() {
        let router = Router::new();
        let order = Rc::new(RefCell::new(Vec::new()));

        let o = order.clone();
        let _before = router.listen_before(move |change| {
            o.borrow_mut().push(format!("before {}", change.to));
            Ok(())
        });
        let o = order.clone();
        let _after = router.listen_after(move |change| {
            o.borrow_mut().push(format!("after {}", change.to));
        });

        router.navigate("/settings").unwrap();
        assert_eq!(router.current(), "/settings");
        assert_eq!(*order.borrow(), vec!["before /settings", "after /settings"]);
    }

    #[test]
    fn test_veto_aborts_cleanly() {
        let router = Router::new();
        let after_ran = Rc::new(RefCell::new(false));

        let _veto = router.listen_before(|_| Err(FormError::NavigationCancelled));
        let flag = after_ran.clone();
        let _after = router.listen_after(move |_| *flag.borrow_mut() = true);

        let err = router.navigate("/away").unwrap_err();
        assert!(err.is_cancelled());
        assert_eq!(router.current(), "/");
        assert!(!*after_ran.borrow());
    }

    #[test]
    fn test_release_is_scoped_and_idempotent() {
        let router = Router::new();
        let count = Rc::new(RefCell::new(0));

        let c = count.clone();
        let handle = router.listen_before(move |_| {
            *c.borrow_mut() += 1;
            Ok(())
        });

        router.navigate("/a").unwrap();
        handle.release();
        handle.release();
        assert!(handle.is_released());
        router.navigate("/b").unwrap();
        assert_eq!(*count.borrow(), 1);
    }

    #[test]
    fn test_dropping_handle_releases_registration() {
        let router = Router::new();
        let count = Rc::new(RefCell::new(0));

        {
            let c = count.clone();
            let _guard = router.listen_before(move |_| {
                *c.borrow_mut() += 1;
                Ok(())
            });
            router.navigate("/a").unwrap();
        }

        router.navigate("/b").unwrap();
        assert_eq!(*count.borrow(), 1);
    }

    #[test]
    fn test_hook_can_release_itself_during_navigation() {
        let router = Router::new();
        let runs = Rc::new(RefCell::new(0));

        let handle: Rc<RefCell<Option<HookHandle>>> = Rc::new(RefCell::new(None));
        let r = runs.clone();
        let h = handle.clone();
        let registered = router.listen_after(move |_| {
            *r.borrow_mut() += 1;
            if let Some(handle) = h.borrow().as_ref() {
                handle.release();
            }
        });
        *handle.borrow_mut() = Some(registered);

        router.navigate("/a").unwrap();
        router.navigate("/b").unwrap();
        assert_eq!(*runs.borrow(), 1);
    }

    #[test]
    fn test_unload_guard() {
        let router = Router::new();
        assert!(router.check_unload().is_none());

        let handle = router.guard_unload(|| Some("unsaved changes".into()));
        assert_eq!(router.check_unload().as_deref(), Some("unsaved changes"));

        handle.release();
        assert!(router.check_unload().is_none());
    }
}
