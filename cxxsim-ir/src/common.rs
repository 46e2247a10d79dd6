//! Index newtypes used to address entities inside their owning arena.

macro_rules! define_index {
    ($(#[$attr:meta])* $name:ident) => {
        $(#[$attr])*
        #[derive(
            Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord,
        )]
        pub struct $name(pub(crate) u32);

        impl $name {
            pub(crate) fn new(index: usize) -> Self {
                $name(index as u32)
            }

            pub fn index(self) -> usize {
                self.0 as usize
            }
        }
    };
}

define_index! {
    /// Index of a module inside a [`crate::Design`].
    ModuleId
}
define_index! {
    /// Index of a wire inside its [`crate::Module`].
    WireId
}
define_index! {
    /// Index of a cell inside its [`crate::Module`].
    CellId
}
define_index! {
    /// Index of a process inside its [`crate::Module`].
    ProcId
}
define_index! {
    /// Index of a memory inside its [`crate::Module`].
    MemoryId
}
