//! Consumer chain contract.
//!
//! A consumer receives handlers one by one in resolved priority order and, at
//! run time, tries them in that same order.

use crate::container::catalog::Instance;
use std::sync::Arc;

/// Object that accepts an ordered sequence of handlers.
pub trait ConsumerChain {
    type Handler: ?Sized;

    /// Adds `handler` after every previously appended handler.
    fn append_handler(&mut self, handler: Arc<Self::Handler>);
}

/// Ordered handler list shared by the built-in consumers.
pub struct HandlerChain<H: ?Sized> {
    handlers: Vec<Arc<H>>,
}

impl<H: ?Sized> HandlerChain<H> {
    pub fn new() -> Self {
        Self {
            handlers: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<H>> {
        self.handlers.iter()
    }

    /// First `Some` produced by a handler, in append order.
    pub fn first_map<R>(&self, mut f: impl FnMut(&H) -> Option<R>) -> Option<R> {
        self.handlers.iter().find_map(|handler| f(&**handler))
    }
}

impl<H: ?Sized> Default for HandlerChain<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H: ?Sized> ConsumerChain for HandlerChain<H> {
    type Handler = H;

    fn append_handler(&mut self, handler: Arc<H>) {
        self.handlers.push(handler);
    }
}

/// Wraps a handler so consumers can take it back out as `Arc<H>`.
pub fn handler_instance<H: ?Sized + Send + Sync + 'static>(handler: Arc<H>) -> Instance {
    Box::new(handler)
}

#[cfg(test)]
mod tests {
    use super::{ConsumerChain, HandlerChain};
    use std::sync::Arc;

    trait Matcher {
        fn matches(&self, text: &str) -> Option<usize>;
    }

    struct Prefix(&'static str, usize);

    impl Matcher for Prefix {
        fn matches(&self, text: &str) -> Option<usize> {
            text.starts_with(self.0).then_some(self.1)
        }
    }

    #[test]
    fn first_map_respects_append_order() {
        let mut chain: HandlerChain<dyn Matcher> = HandlerChain::new();
        assert!(chain.is_empty());
        assert_eq!(chain.first_map(|m| m.matches("given")), None);

        chain.append_handler(Arc::new(Prefix("giv", 1)));
        chain.append_handler(Arc::new(Prefix("given", 2)));
        assert_eq!(chain.len(), 2);
        assert_eq!(chain.first_map(|m| m.matches("given a step")), Some(1));
        assert_eq!(chain.first_map(|m| m.matches("when")), None);
    }
}
