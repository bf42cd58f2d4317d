#![forbid(unsafe_code)]

//! Shape classification of virtual nodes.

bitflags::bitflags! {
    /// What a vnode is and how its children are represented.
    ///
    /// Computed once when the vnode is built.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ShapeFlags: u8 {
        const ELEMENT            = 0b0000_0001;
        const STATEFUL_COMPONENT = 0b0000_0010;
        const TEXT_CHILDREN      = 0b0000_0100;
        const ARRAY_CHILDREN     = 0b0000_1000;
        const SLOT_CHILDREN      = 0b0001_0000;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bit_values_are_stable() {
        assert_eq!(ShapeFlags::ELEMENT.bits(), 1);
        assert_eq!(ShapeFlags::STATEFUL_COMPONENT.bits(), 2);
        assert_eq!(ShapeFlags::TEXT_CHILDREN.bits(), 4);
        assert_eq!(ShapeFlags::ARRAY_CHILDREN.bits(), 8);
        assert_eq!(ShapeFlags::SLOT_CHILDREN.bits(), 16);
    }
}
