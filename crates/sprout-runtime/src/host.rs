#![forbid(unsafe_code)]

//! The boundary between the renderer and the output medium.

use sprout_reactivity::Value;

/// Opaque handle to a node owned by a [`HostAdapter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HostNode(u64);

impl HostNode {
    #[must_use]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

/// Platform operations the renderer drives.
///
/// Methods take `&self`: the renderer is shared between component update
/// effects, so adapters keep their node storage behind interior mutability.
pub trait HostAdapter {
    fn create_element(&self, tag: &str) -> HostNode;

    fn create_text(&self, text: &str) -> HostNode;

    /// Replace the content of a text node.
    fn set_text(&self, node: HostNode, text: &str);

    /// Apply one property change. `next == Value::Null` clears the property.
    ///
    /// Keys accepted by [`is_on`] name event handlers and should be
    /// registered as listeners rather than attributes.
    fn patch_prop(&self, node: HostNode, key: &str, prev: &Value, next: &Value);

    /// Insert (or move) `node` into `parent` before `anchor`, appending when
    /// `anchor` is `None`.
    fn insert(&self, node: HostNode, parent: HostNode, anchor: Option<HostNode>);

    /// Detach `node` from its parent, if any.
    fn remove(&self, node: HostNode);

    /// Replace all children of `node` with `text`.
    fn set_element_text(&self, node: HostNode, text: &str);
}

/// `true` for event handler keys: `on` followed by an uppercase letter.
#[must_use]
pub fn is_on(key: &str) -> bool {
    key.strip_prefix("on")
        .and_then(|rest| rest.chars().next())
        .is_some_and(|c| c.is_ascii_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handler_keys() {
        assert!(is_on("onClick"));
        assert!(is_on("onAddFooBar"));
        assert!(!is_on("on"));
        assert!(!is_on("onclick"));
        assert!(!is_on("one"));
        assert!(!is_on("class"));
    }
}
