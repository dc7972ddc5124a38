//! Menu declarations, buttons and the frozen registry

pub mod button;
pub mod definition;
pub mod registry;

pub use button::{Button, ButtonSpec, ButtonVariant, CallbackToken, MenuRef};
pub use definition::{
    CommandAction, CommandSpec, Menu, MenuBody, MenuDecl, MenuDefinition, MenuKind, MenuOption,
    TextRule,
};
pub use registry::{Registry, RegistryBuilder, RegistryError};
