use sprout_reactivity::ReactivityError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, RuntimeError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuntimeError {
    /// Neither `setup` returned a render function nor the descriptor has one.
    #[error("component `{component}` is missing a render function")]
    MissingRender { component: String },

    /// The renderer or the instance went away before a scheduled render ran.
    #[error("renderer or component instance dropped while an update was pending")]
    InstanceDropped,

    #[error(transparent)]
    Reactivity(#[from] ReactivityError),
}

impl RuntimeError {
    #[must_use]
    pub fn missing_render(component: impl Into<String>) -> Self {
        Self::MissingRender {
            component: component.into(),
        }
    }
}
