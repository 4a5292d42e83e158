use std::fmt::{self, Debug};

/// Macro to implement typesafe ids.
macro_rules! impl_typed_id {
    ($name:ident, $string:expr) => {
        #[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
        #[doc = $string]
        pub struct $name(usize);
        impl $name {
            /// Creates a new typed id from given usize.
            pub const fn new(input: usize) -> Self {
                Self(input)
            }
            /// Converts the typed id into a usize.
            pub const fn into_usize(self: Self) -> usize {
                self.0
            }
        }
        impl From<$name> for usize {
            fn from(input: $name) -> usize {
                input.into_usize()
            }
        }
        impl From<usize> for $name {
            fn from(input: usize) -> $name {
                Self::new(input)
            }
        }
        impl Debug for $name {
            fn fmt(self: &Self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.into_usize())
            }
        }
    };
}

impl_typed_id!(ScopeId, "Unique numeric id of a scope.");

impl ScopeId {
    pub const ROOT: ScopeId = ScopeId::new(0);
}

impl_typed_id!(TypeId, "Unique numeric id of a type.");
impl_typed_id!(VarId, "Unique numeric id of a variable.");
impl_typed_id!(FuncId, "Unique numeric id of a function.");
