//! The annunciator lights and how their expressions are put together from a profile.
use std::{collections::HashSet, str::FromStr};

use anexpr::{ast::optimize, light::LightExpression, parser::ExpressionParser};
use log::debug;
use strum::{Display, EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};

use crate::{
    error::{AnError, AnResult},
    profile::ConfigSource,
};

/// Profile key of the expression gating every light.
pub const MASTER_ENABLE: &str = "MasterEnable";
/// Profile key listing the lights whose expression is negated.
pub const INVERT: &str = "Invert";

/// Size of the feature report sent to the panel, report id included.
pub const REPORT_LEN: usize = 5;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Display,
    EnumString,
    EnumIter,
    IntoStaticStr,
)]
pub enum Light {
    #[strum(serialize = "HDG")]
    Hdg,
    #[strum(serialize = "NAV")]
    Nav,
    #[strum(serialize = "APR")]
    Apr,
    #[strum(serialize = "REV")]
    Rev,
    #[strum(serialize = "ALT")]
    Alt,
    #[strum(serialize = "VS")]
    Vs,
    #[strum(serialize = "IAS")]
    Ias,
    #[strum(serialize = "AUTOPILOT")]
    Autopilot,

    GearLGreen,
    GearLRed,
    GearCGreen,
    GearCRed,
    GearRGreen,
    GearRRed,

    MasterWarning,
    EngineFire,
    LowOilPressure,
    LowFuelPressure,
    AntiIce,
    StarterEngaged,
    #[strum(serialize = "APU")]
    Apu,

    MasterCaution,
    Vacuum,
    LowHydPressure,
    AuxFuelPump,
    ParkingBrake,
    LowVolts,
    Door,
}

impl Light {
    pub fn name(self) -> &'static str {
        self.into()
    }

    pub fn parse(name: &str) -> AnResult<Self> {
        Light::from_str(name).map_err(|_| AnError::UnknownLight(name.to_string()))
    }

    /// Byte and bit of this light in the panel's feature report.
    pub fn report_position(self) -> (usize, u8) {
        let index = self as usize;
        // Byte 0 is the report id
        (1 + index / 8, 1 << (index % 8))
    }
}

/// Packs lit lights into the panel's feature report.
pub fn feature_report(lit: impl IntoIterator<Item = Light>) -> [u8; REPORT_LEN] {
    let mut report = [0; REPORT_LEN];
    for light in lit {
        let (byte, bit) = light.report_position();
        report[byte] |= bit;
    }
    report
}

fn inverted_lights<'a>(config: &'a dyn ConfigSource, aircraft: &str) -> HashSet<&'a str> {
    config
        .lookup(aircraft, INVERT)
        .unwrap_or_default()
        .split([',', ' '])
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .collect()
}

/// Source text of a light's expression, master enable and inversion included.
pub fn light_expression_text(config: &dyn ConfigSource, aircraft: &str, light: Light) -> String {
    let text = config.lookup(aircraft, light.name()).unwrap_or("OFF");
    let text = if inverted_lights(config, aircraft).contains(light.name()) {
        format!("NOT({text})")
    } else {
        text.to_string()
    };
    let master = config.lookup(aircraft, MASTER_ENABLE).unwrap_or("ON");
    format!("({master}) AND ({text})")
}

/// Builds the expression of every light for `aircraft`.
pub fn light_expressions(
    config: &dyn ConfigSource,
    aircraft: &str,
    parser: &ExpressionParser,
) -> Vec<LightExpression> {
    Light::iter()
        .map(|light| {
            let text = light_expression_text(config, aircraft, light);
            let root = optimize(parser.parse(&text));
            debug!("{light} for '{aircraft}': {root}");
            LightExpression::new(light.name(), root, true)
        })
        .collect()
}
