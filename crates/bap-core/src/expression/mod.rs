//! Parametrised formulas evaluated locally and rendered for the backend.

pub mod parser;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::consts::EXPRESSION_SAMPLE_STEP;
use crate::error::{BapError, Result};
use crate::image::Band;
use parser::{format_number, Expr};

const EXPONENTIAL_TEMPLATE: &str =
    "1.0-(1.0/(exp(((min({var}, {max})-{mean})*(1/{max}*{a})))+1.0))";

const GAUSS_TEMPLATE: &str = "exp(((({var}-{mean})/{std})**2)*{factor})/(sqrt(2*pi)*{std})";

fn default_exponential_a() -> f64 {
    -10.0
}

fn default_gauss_factor() -> f64 {
    -0.5
}

/// Serializable choice of formula, built into an [`Expression`] once the
/// input range is known.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Formula {
    Exponential {
        #[serde(default = "default_exponential_a")]
        a: f64,
    },
    Gauss {
        #[serde(default = "default_gauss_factor")]
        factor: f64,
    },
}

impl Default for Formula {
    fn default() -> Self {
        Formula::Exponential {
            a: default_exponential_a(),
        }
    }
}

impl Formula {
    pub fn build(&self, range: (f64, f64)) -> Result<Expression> {
        match self {
            Formula::Exponential { a } => Expression::exponential(range, *a),
            Formula::Gauss { factor } => Expression::gauss(range, *factor),
        }
    }
}

/// Input range sampled at unit steps, both ends included.
pub fn sample_range(range: (f64, f64)) -> Vec<f64> {
    let (min, max) = range;
    let count = ((max - min) / EXPRESSION_SAMPLE_STEP).floor() as usize + 1;
    (0..count)
        .map(|i| min + i as f64 * EXPRESSION_SAMPLE_STEP)
        .collect()
}

/// Population mean and standard deviation.
pub fn mean_std(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, var.sqrt())
}

/// A formula in one free variable with its statistics resolved.
#[derive(Clone, Debug)]
pub struct Expression {
    name: String,
    template: String,
    range: (f64, f64),
    params: BTreeMap<String, f64>,
    ast: Expr,
    max_result: f64,
}

impl Expression {
    /// Build from a template. `{var}` is the free variable; `{min}`, `{max}`,
    /// `{mean}` and `{std}` come from `range`; other placeholders from `params`.
    pub fn new(
        name: impl Into<String>,
        template: impl Into<String>,
        range: (f64, f64),
        params: &[(&str, f64)],
    ) -> Result<Self> {
        let template = template.into();
        if !(range.0 < range.1) {
            return Err(BapError::Expression(format!(
                "range ({}, {}) must be increasing",
                range.0, range.1
            )));
        }
        let (mean, std) = mean_std(&sample_range(range));
        let mut values: BTreeMap<String, f64> =
            params.iter().map(|(k, v)| (k.to_string(), *v)).collect();
        values.insert("min".into(), range.0);
        values.insert("max".into(), range.1);
        values.insert("mean".into(), mean);
        values.insert("std".into(), std);

        let rendered = substitute(&template, &values)?;
        let ast = parser::parse(&rendered)?;
        let max_result = sample_range(range)
            .into_iter()
            .map(|v| ast.eval(v))
            .fold(f64::NEG_INFINITY, f64::max);

        Ok(Self {
            name: name.into(),
            template,
            range,
            params: values,
            ast,
            max_result,
        })
    }

    /// Logistic decay: values near the range start score high when `a < 0`.
    pub fn exponential(range: (f64, f64), a: f64) -> Result<Self> {
        Self::new("Exponential", EXPONENTIAL_TEMPLATE, range, &[("a", a)])
    }

    /// Gaussian bell centred on the range mean. Positive factors are flipped.
    pub fn gauss(range: (f64, f64), factor: f64) -> Result<Self> {
        let factor = if factor > 0.0 {
            warn!(factor, "gauss factor must be negative, flipping its sign");
            -factor
        } else {
            factor
        };
        Self::new("Gauss", GAUSS_TEMPLATE, range, &[("factor", factor)])
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn range(&self) -> (f64, f64) {
        self.range
    }

    pub fn mean(&self) -> f64 {
        self.params.get("mean").copied().unwrap_or_default()
    }

    pub fn std(&self) -> f64 {
        self.params.get("std").copied().unwrap_or_default()
    }

    /// Template with every placeholder but `{var}` filled in.
    pub fn render_local(&self) -> String {
        let mut values = self.params.clone();
        values.remove("var");
        substitute_keep_var(&self.template, &values)
    }

    pub fn eval(&self, var: f64) -> f64 {
        self.ast.eval(var)
    }

    /// Largest output over the sampled input range.
    pub fn max_result(&self) -> f64 {
        self.max_result
    }

    pub fn eval_normalized(&self, var: f64) -> f64 {
        if self.max_result == 0.0 {
            return 0.0;
        }
        self.eval(var) / self.max_result
    }

    /// Backend-grammar rendering, optionally divided by [`max_result`](Self::max_result).
    pub fn backend_expr(&self, normalize: bool) -> String {
        let body = self.ast.to_backend();
        if normalize {
            format!("({body}) / {}", format_number(self.max_result))
        } else {
            body
        }
    }

    pub fn apply_value(&self, value: f64, normalize: bool) -> f64 {
        if normalize {
            self.eval_normalized(value)
        } else {
            self.eval(value)
        }
    }

    /// Evaluate per pixel, keeping the band mask.
    pub fn apply_band(&self, band: &Band, normalize: bool) -> Band {
        band.map(|v| self.apply_value(f64::from(v), normalize) as f32)
    }
}

fn substitute(template: &str, values: &BTreeMap<String, f64>) -> Result<String> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let close = rest[open..]
            .find('}')
            .ok_or_else(|| BapError::Expression(format!("unclosed placeholder in '{template}'")))?;
        let key = &rest[open + 1..open + close];
        if key == "var" {
            out.push_str("var");
        } else {
            let value = values.get(key).ok_or_else(|| {
                BapError::Expression(format!("no value for placeholder '{{{key}}}'"))
            })?;
            out.push_str(&format!("({})", format_number(*value)));
        }
        rest = &rest[open + close + 1..];
    }
    out.push_str(rest);
    Ok(out)
}

fn substitute_keep_var(template: &str, values: &BTreeMap<String, f64>) -> String {
    let mut out = template.to_string();
    for (key, value) in values {
        out = out.replace(&format!("{{{key}}}"), &format_number(*value));
    }
    out
}
