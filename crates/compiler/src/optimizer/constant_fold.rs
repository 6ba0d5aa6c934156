//! Constant folding: evaluate a `BinOp`/`UnOp` whose operands are both/all
//! constants at compile time, replacing it with a `Copy` of the result.

use super::Pass;
use crate::ast::{BinOp, UnOp};
use crate::tac::{ConstValue, Instr, Operand, TacFunction};

pub struct ConstantFold;

impl Pass for ConstantFold {
    fn name(&self) -> &'static str {
        "constant-fold"
    }

    fn run(&self, func: &mut TacFunction) -> bool {
        let mut changed = false;
        for block in &mut func.blocks {
            for instr in &mut block.instrs {
                if let Some(folded) = fold(instr) {
                    *instr = folded;
                    changed = true;
                }
            }
        }
        changed
    }
}

fn fold(instr: &Instr) -> Option<Instr> {
    match instr {
        Instr::BinOp { dst, op, lhs, rhs } => {
            let value = fold_binop(*op, lhs.as_const()?, rhs.as_const()?)?;
            Some(Instr::Copy {
                dst: *dst,
                src: Operand::Const(value),
            })
        }
        Instr::UnOp { dst, op, operand } => {
            let value = fold_unop(*op, operand.as_const()?)?;
            Some(Instr::Copy {
                dst: *dst,
                src: Operand::Const(value),
            })
        }
        Instr::Cast { dst, type_name, operand } => {
            let value = fold_cast(type_name, operand.as_const()?)?;
            Some(Instr::Copy {
                dst: *dst,
                src: Operand::Const(value),
            })
        }
        _ => None,
    }
}

fn as_f64(c: &ConstValue) -> Option<f64> {
    match c {
        ConstValue::Int(n) => Some(*n as f64),
        ConstValue::Float(n) => Some(*n),
        _ => None,
    }
}

fn is_float(c: &ConstValue) -> bool {
    matches!(c, ConstValue::Float(_))
}

pub(super) fn fold_binop(op: BinOp, lhs: &ConstValue, rhs: &ConstValue) -> Option<ConstValue> {
    use BinOp::*;
    if let (ConstValue::Bool(l), ConstValue::Bool(r)) = (lhs, rhs) {
        return match op {
            And => Some(ConstValue::Bool(*l && *r)),
            Or => Some(ConstValue::Bool(*l || *r)),
            Eq => Some(ConstValue::Bool(l == r)),
            Neq => Some(ConstValue::Bool(l != r)),
            _ => None,
        };
    }
    if let (ConstValue::Str(l), ConstValue::Str(r)) = (lhs, rhs) {
        return match op {
            Add => Some(ConstValue::Str(format!("{l}{r}"))),
            Eq => Some(ConstValue::Bool(l == r)),
            Neq => Some(ConstValue::Bool(l != r)),
            _ => None,
        };
    }

    let (ConstValue::Int(_) | ConstValue::Float(_), ConstValue::Int(_) | ConstValue::Float(_)) = (lhs, rhs) else {
        return None;
    };

    if matches!(op, Shl | Shr | BitAnd | BitOr | BitXor) {
        let (ConstValue::Int(l), ConstValue::Int(r)) = (lhs, rhs) else {
            return None;
        };
        return match op {
            Shl => Some(ConstValue::Int(l.wrapping_shl(*r as u32))),
            Shr => Some(ConstValue::Int(l.wrapping_shr(*r as u32))),
            BitAnd => Some(ConstValue::Int(l & r)),
            BitOr => Some(ConstValue::Int(l | r)),
            BitXor => Some(ConstValue::Int(l ^ r)),
            _ => unreachable!(),
        };
    }

    let result_is_float = is_float(lhs) || is_float(rhs);
    let l = as_f64(lhs)?;
    let r = as_f64(rhs)?;

    match op {
        Add | Sub | Mul | Div | Mod => {
            let v = match op {
                Add => l + r,
                Sub => l - r,
                Mul => l * r,
                Div => {
                    if r == 0.0 {
                        return None;
                    }
                    l / r
                }
                Mod => {
                    if r == 0.0 {
                        return None;
                    }
                    l % r
                }
                _ => unreachable!(),
            };
            Some(if result_is_float {
                ConstValue::Float(v)
            } else {
                ConstValue::Int(v as i64)
            })
        }
        Eq => Some(ConstValue::Bool(l == r)),
        Neq => Some(ConstValue::Bool(l != r)),
        Lt => Some(ConstValue::Bool(l < r)),
        Gt => Some(ConstValue::Bool(l > r)),
        Le => Some(ConstValue::Bool(l <= r)),
        Ge => Some(ConstValue::Bool(l >= r)),
        _ => None,
    }
}

/// Folds a `(type_name)operand` cast over a known constant, truncating or
/// converting the same way the VM's narrow numeric types would at runtime
/// (`spec.md §4.4` item 6). `int`/`long`/`char` truncate via the target
/// width's `as` cast; `float`/`double` convert through `f64`; `bool` and
/// `string` cast targets aren't numeric truncations and have no defined
/// constant-cast semantics here, so they're left unfolded.
pub(super) fn fold_cast(type_name: &str, operand: &ConstValue) -> Option<ConstValue> {
    let as_i64 = |c: &ConstValue| match c {
        ConstValue::Int(n) => Some(*n),
        ConstValue::Float(n) => Some(*n as i64),
        _ => None,
    };
    match type_name {
        "int" => as_i64(operand).map(|n| ConstValue::Int(n as i32 as i64)),
        "long" => as_i64(operand).map(ConstValue::Int),
        "char" => as_i64(operand).map(|n| ConstValue::Int(n as u16 as i64)),
        "float" => as_f64(operand).map(|n| ConstValue::Float(n as f32 as f64)),
        "double" => as_f64(operand).map(ConstValue::Float),
        _ => None,
    }
}

pub(super) fn fold_unop(op: UnOp, operand: &ConstValue) -> Option<ConstValue> {
    match (op, operand) {
        (UnOp::Neg, ConstValue::Int(n)) => Some(ConstValue::Int(-n)),
        (UnOp::Neg, ConstValue::Float(n)) => Some(ConstValue::Float(-n)),
        (UnOp::Not, ConstValue::Bool(b)) => Some(ConstValue::Bool(!b)),
        (UnOp::BitNot, ConstValue::Int(n)) => Some(ConstValue::Int(!n)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn folds_integer_addition() {
        let mut f = TacFunction::new("C::m");
        let entry = f.entry;
        let dst = f.new_temp();
        f.push(
            entry,
            Instr::BinOp {
                dst,
                op: BinOp::Add,
                lhs: Operand::Const(ConstValue::Int(2)),
                rhs: Operand::Const(ConstValue::Int(3)),
            },
        );
        assert!(ConstantFold.run(&mut f));
        assert_eq!(
            f.block(entry).instrs[0],
            Instr::Copy {
                dst,
                src: Operand::Const(ConstValue::Int(5))
            }
        );
    }

    #[test]
    fn does_not_fold_division_by_zero() {
        let mut f = TacFunction::new("C::m");
        let entry = f.entry;
        let dst = f.new_temp();
        f.push(
            entry,
            Instr::BinOp {
                dst,
                op: BinOp::Div,
                lhs: Operand::Const(ConstValue::Int(1)),
                rhs: Operand::Const(ConstValue::Int(0)),
            },
        );
        assert!(!ConstantFold.run(&mut f));
    }

    #[test]
    fn folds_narrowing_int_cast_of_a_constant() {
        let mut f = TacFunction::new("C::m");
        let entry = f.entry;
        let dst = f.new_temp();
        f.push(
            entry,
            Instr::Cast {
                dst,
                type_name: "int".to_string(),
                operand: Operand::Const(ConstValue::Int(1 << 40)),
            },
        );
        assert!(ConstantFold.run(&mut f));
        assert_eq!(
            f.block(entry).instrs[0],
            Instr::Copy {
                dst,
                src: Operand::Const(ConstValue::Int((1i64 << 40) as i32 as i64))
            }
        );
    }

    #[test]
    fn leaves_non_constant_operands_alone() {
        let mut f = TacFunction::new("C::m");
        let entry = f.entry;
        let t = f.new_temp();
        let dst = f.new_temp();
        f.push(
            entry,
            Instr::BinOp {
                dst,
                op: BinOp::Add,
                lhs: Operand::Temp(t),
                rhs: Operand::Const(ConstValue::Int(3)),
            },
        );
        assert!(!ConstantFold.run(&mut f));
    }
}
