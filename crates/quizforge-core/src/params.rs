//! Random parameter assignment.
//!
//! Which assignment a student sees is the caller's policy; this is the
//! default one: each parameter independently takes one of its possible
//! values with uniform probability.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::model::{ParameterMap, ParameterType, ParameterValue, QuestionParameter};

/// Pick one possible value per parameter.
///
/// Number parameters become [`ParameterValue::Number`] when the chosen value
/// parses, otherwise the raw text is kept. Parameters without possible values
/// are left out of the map.
pub fn generate_parameter_map<R: Rng + ?Sized>(
    parameters: &[QuestionParameter],
    rng: &mut R,
) -> ParameterMap {
    let mut map = ParameterMap::new();

    for parameter in parameters {
        let Some(raw) = parameter.possible_values.choose(rng) else {
            tracing::debug!(parameter = %parameter.name, "no possible values, skipping");
            continue;
        };
        map.insert(parameter.name.clone(), to_value(parameter.kind, raw));
    }

    map
}

/// Convert a declared possible value into a typed parameter value.
pub fn to_value(kind: ParameterType, raw: &str) -> ParameterValue {
    match kind {
        ParameterType::Number => match raw.trim().parse::<f64>() {
            Ok(n) if n.is_finite() => ParameterValue::Number(n),
            _ => ParameterValue::Text(raw.to_string()),
        },
        ParameterType::String => ParameterValue::Text(raw.to_string()),
    }
}
