//! Compile options.

use crate::decode::DecodeOptions;
use crate::embed::EmbedOptions;
use crate::error::CompileError;
use crate::physical::CoefficientLimits;
use crate::Mode;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompileOptions {
    /// Domain the program's coefficients are written in.
    pub mode: Mode,
    /// Chain coupling; derived from the problem when absent.
    pub chain_strength: Option<f64>,
    /// Pin coupling; derived from the chain strength when absent.
    pub pin_strength: Option<f64>,
    /// Alias chains and fold forced variables before embedding.
    pub optimize: bool,
    /// Also fold variables whose linear term outweighs all their couplings.
    pub fold_dominated: bool,
    /// Pins appended to the program.
    pub extra_pins: BTreeMap<String, bool>,
    pub embed: EmbedOptions,
    pub limits: CoefficientLimits,
    pub decode: DecodeOptions,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            mode: Mode::Ising,
            chain_strength: None,
            pin_strength: None,
            optimize: true,
            fold_dominated: false,
            extra_pins: BTreeMap::new(),
            embed: EmbedOptions::default(),
            limits: CoefficientLimits::default(),
            decode: DecodeOptions::default(),
        }
    }
}

impl CompileOptions {
    pub fn from_json(text: &str) -> Result<Self, CompileError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn to_json(&self) -> Result<String, CompileError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
