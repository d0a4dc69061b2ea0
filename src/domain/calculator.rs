//! Arithmetic methods exposed over RPC
//!
//! `suma` adds two JSON numbers. Integer inputs stay integers while the sum fits.

use async_trait::async_trait;
use serde_json::{Number, Value};

use crate::{errors::RpcError, registry::RpcMethod, rpc::request::Params};

#[derive(Debug, Default, Clone, Copy)]
pub struct Suma;

#[async_trait]
impl RpcMethod for Suma {
    async fn call(&self, params: Params) -> Result<Value, RpcError> {
        if let Params::Positional(items) = &params {
            if items.len() != 2 {
                return Err(RpcError::invalid_params(
                    "suma expects exactly two positional arguments",
                ));
            }
        }

        let a = numeric_param(&params, "a", 0)?;
        let b = numeric_param(&params, "b", 1)?;
        add_numbers(a, b).map(Value::Number)
    }
}

fn numeric_param<'a>(
    params: &'a Params,
    name: &str,
    position: usize,
) -> Result<&'a Number, RpcError> {
    match params.get(name, position) {
        Some(Value::Number(number)) => Ok(number),
        Some(_) => Err(RpcError::invalid_params(format!("{name} must be a number"))),
        None => Err(RpcError::invalid_params(format!("{name} is required"))),
    }
}

pub fn add_numbers(a: &Number, b: &Number) -> Result<Number, RpcError> {
    if let (Some(left), Some(right)) = (a.as_i64(), b.as_i64()) {
        if let Some(sum) = left.checked_add(right) {
            return Ok(sum.into());
        }
    }

    if let (Some(left), Some(right)) = (a.as_u64(), b.as_u64()) {
        if let Some(sum) = left.checked_add(right) {
            return Ok(sum.into());
        }
    }

    let (Some(left), Some(right)) = (a.as_f64(), b.as_f64()) else {
        return Err(RpcError::internal("operand is not representable as f64"));
    };

    Number::from_f64(left + right)
        .ok_or_else(|| RpcError::internal("sum is not a finite number"))
}
