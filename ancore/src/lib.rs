//! Host-side pieces around [`anexpr`]: telemetry connections, the local variable manager,
//! light profiles and the board of lit lights.
//!
//! Typical wiring: route each dialect to a [`telemetry::TelemetryConnection`] (or the
//! [`lvars::LVarManager`] for `L:` variables), build an [`anexpr::parser::ExpressionParser`]
//! over those routes, turn a [`profile::Profile`] into light expressions with
//! [`lights::light_expressions`] and attach them to a [`board::LightBoard`].

pub mod board;
pub mod error;
pub mod lights;
pub mod lvars;
pub mod profile;
pub mod telemetry;

pub use error::{AnError, AnResult};

pub mod prelude {
    pub use crate::board::{LightBoard, LightGate, LitLights};
    pub use crate::error::{AnError, AnResult};
    pub use crate::lights::{Light, feature_report, light_expression_text, light_expressions};
    pub use crate::lvars::{LVarChannel, LVarId, LVarManager};
    pub use crate::profile::{ConfigSource, Profile, ProfileChain};
    pub use crate::telemetry::{ManualSource, TelemetryConnection, TelemetrySource};
}
