use knuffel::ast::{Literal, TypeName};
use knuffel::decode::Context;
use knuffel::errors::DecodeError;
use knuffel::span::Spanned;
use knuffel::traits::ErrorSpan;

/// A scalar accepting both integer and decimal literals, range-checked at
/// decode time.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct FloatOrInt<const FROM: i32, const TO: i32>(pub f64);

impl<S: ErrorSpan, const FROM: i32, const TO: i32> knuffel::DecodeScalar<S>
    for FloatOrInt<FROM, TO>
{
    fn type_check(type_name: &Option<Spanned<TypeName, S>>, ctx: &mut Context<S>) {
        if let Some(type_name) = type_name {
            ctx.emit_error(DecodeError::unexpected(
                type_name,
                "type name",
                "no type name expected for this node",
            ));
        }
    }

    fn raw_decode(
        val: &Spanned<Literal, S>,
        ctx: &mut Context<S>,
    ) -> Result<Self, DecodeError<S>> {
        match &**val {
            Literal::Int(v) => match v.try_into() {
                Ok(v) => {
                    let v: i64 = v;
                    if (i64::from(FROM)..=i64::from(TO)).contains(&v) {
                        Ok(Self(v as f64))
                    } else {
                        ctx.emit_error(DecodeError::conversion(
                            val,
                            format!("value must be between {FROM} and {TO}"),
                        ));
                        Ok(Self::default())
                    }
                }
                Err(err) => {
                    ctx.emit_error(DecodeError::conversion(val, err));
                    Ok(Self::default())
                }
            },
            Literal::Decimal(v) => match v.try_into() {
                Ok(v) => {
                    let v: f64 = v;
                    if (f64::from(FROM)..=f64::from(TO)).contains(&v) {
                        Ok(Self(v))
                    } else {
                        ctx.emit_error(DecodeError::conversion(
                            val,
                            format!("value must be between {FROM} and {TO}"),
                        ));
                        Ok(Self::default())
                    }
                }
                Err(err) => {
                    ctx.emit_error(DecodeError::conversion(val, err));
                    Ok(Self::default())
                }
            },
            _ => {
                ctx.emit_error(DecodeError::unsupported(
                    val,
                    "only numbers are recognized here",
                ));
                Ok(Self::default())
            }
        }
    }
}

impl<const FROM: i32, const TO: i32> From<FloatOrInt<FROM, TO>> for f64 {
    fn from(value: FloatOrInt<FROM, TO>) -> Self {
        value.0
    }
}
