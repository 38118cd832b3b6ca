//! # Bitvector Constraint Library
//!
//! Clause-level building blocks for arithmetic over fixed-width binary
//! numbers: comparators, full adders, ripple-carry sums and a tournament
//! maximum. The full adder CNF follows \[1\], the comparator is the
//! most-significant-bit-first prefix comparison.
//!
//! All builders are pure: they emit their defining clauses into a
//! [`CollectClauses`] collector, allocate any auxiliary variables from the
//! given [`ManageVars`] manager and return handles to the result bits. They
//! never evaluate anything themselves.
//!
//! Bits can be formula literals or compile-time constants. Constants are
//! folded away while building, so comparing a symbolic number against a
//! concrete search threshold costs only the clauses that actually mention a
//! variable.
//!
//! ## References
//!
//! - \[1\] Niklas Eén and Niklas Sörensson: _Translating Pseudo-Boolean
//!     Constraints into SAT_, JSAT 2006.

use rustsat::{
    encodings::CollectClauses,
    instances::ManageVars,
    types::{Assignment, Clause, Lit, TernaryVal},
    OutOfMemory,
};
use thiserror::Error;

/// Errors from the bitvector builders
#[derive(Error, Debug)]
pub enum Error {
    /// A constant does not fit its requested width
    #[error("value {value} does not fit in {width} bits")]
    Overflow {
        /// The value that was to be encoded
        value: usize,
        /// The width it had to fit in
        width: usize,
    },
    /// The carry out of an adder's most significant bit is constant true
    #[error("sum always exceeds the {width} bit width of its operands")]
    SumOverflow {
        /// The width of the adder
        width: usize,
    },
    /// Memory limit from the clause collector
    #[error(transparent)]
    OutOfMemory(#[from] OutOfMemory),
}

/// One bit of a binary number: a formula literal or a constant
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Bit {
    /// A compile-time constant bit
    Const(bool),
    /// A bit represented by a literal
    Lit(Lit),
}

impl Bit {
    /// Evaluates the bit under a concrete assignment
    pub fn value(self, sol: &Assignment) -> bool {
        match self {
            Bit::Const(b) => b,
            Bit::Lit(l) => sol.lit_value(l) == TernaryVal::True,
        }
    }
}

impl From<Lit> for Bit {
    fn from(lit: Lit) -> Self {
        Bit::Lit(lit)
    }
}

impl std::ops::Not for Bit {
    type Output = Bit;

    fn not(self) -> Bit {
        match self {
            Bit::Const(b) => Bit::Const(!b),
            Bit::Lit(l) => Bit::Lit(!l),
        }
    }
}

/// The number of bits needed to represent `max_val`
pub fn required_bits(max_val: usize) -> usize {
    ((usize::BITS - max_val.leading_zeros()) as usize).max(1)
}

/// A fixed-width binary encoding of a non-negative integer, most significant
/// bit first
///
/// The width of a number is chosen once, from the maximum value the
/// represented quantity can take, and stays fixed through all constraints
/// referencing it.
#[derive(Clone, Debug)]
pub struct BinaryNumber {
    bits: Vec<Bit>,
}

impl BinaryNumber {
    /// Encodes a concrete value, left-padded with false bits to `width`
    pub fn constant(value: usize, width: usize) -> Result<Self, Error> {
        if width < usize::BITS as usize && value >> width != 0 {
            return Err(Error::Overflow { value, width });
        }
        let bits = (0..width)
            .rev()
            .map(|idx| Bit::Const(value >> idx & 1 == 1))
            .collect();
        Ok(BinaryNumber { bits })
    }

    /// Allocates a number of `width` fresh variables
    pub fn new(width: usize, var_manager: &mut dyn ManageVars) -> Self {
        let bits = (0..width).map(|_| Bit::Lit(var_manager.new_lit())).collect();
        BinaryNumber { bits }
    }

    /// A number that is `value` if `lit` is true and zero otherwise
    ///
    /// Costs no clauses: the bits set in `value` all alias `lit`.
    pub fn masked(value: usize, width: usize, lit: Lit) -> Result<Self, Error> {
        if width < usize::BITS as usize && value >> width != 0 {
            return Err(Error::Overflow { value, width });
        }
        let bits = (0..width)
            .rev()
            .map(|idx| {
                if value >> idx & 1 == 1 {
                    Bit::Lit(lit)
                } else {
                    Bit::Const(false)
                }
            })
            .collect();
        Ok(BinaryNumber { bits })
    }

    /// Gets the width of the number
    pub fn width(&self) -> usize {
        self.bits.len()
    }

    /// Gets the bits, most significant first
    pub fn bits(&self) -> &[Bit] {
        &self.bits
    }

    /// Decodes the number under a concrete assignment
    pub fn value(&self, sol: &Assignment) -> usize {
        self.bits
            .iter()
            .fold(0, |val, bit| val << 1 | usize::from(bit.value(sol)))
    }

    /// Clones the number extended to `width` with leading false bits
    fn padded(&self, width: usize) -> BinaryNumber {
        debug_assert!(width >= self.width());
        let mut bits = vec![Bit::Const(false); width - self.bits.len()];
        bits.extend_from_slice(&self.bits);
        BinaryNumber { bits }
    }
}

/// Adds a clause with constant bits folded away
///
/// A constant-true member satisfies the clause, which is then dropped;
/// constant-false members are dropped from the clause.
fn add_clause<Col>(collector: &mut Col, bits: &[Bit]) -> Result<(), OutOfMemory>
where
    Col: CollectClauses,
{
    let mut clause = Clause::new();
    for &bit in bits {
        match bit {
            Bit::Const(true) => return Ok(()),
            Bit::Const(false) => (),
            Bit::Lit(l) => clause.add(l),
        }
    }
    collector.add_clause(clause)
}

/// Negated antecedent literals prefixed to every assertion clause of a gadget
fn guard(conds: &[Lit]) -> Vec<Bit> {
    conds.iter().map(|&l| Bit::Lit(!l)).collect()
}

/// A literal (or constant) that is true iff `a == b`
fn bit_equal<Col>(
    a: Bit,
    b: Bit,
    collector: &mut Col,
    var_manager: &mut dyn ManageVars,
) -> Result<Bit, OutOfMemory>
where
    Col: CollectClauses,
{
    match (a, b) {
        (Bit::Const(a), Bit::Const(b)) => Ok(Bit::Const(a == b)),
        (Bit::Const(c), Bit::Lit(x)) | (Bit::Lit(x), Bit::Const(c)) => {
            Ok(Bit::Lit(if c { x } else { !x }))
        }
        (Bit::Lit(x), Bit::Lit(y)) => {
            let e = var_manager.new_lit();
            add_clause(collector, &[Bit::Lit(!e), Bit::Lit(!x), Bit::Lit(y)])?;
            add_clause(collector, &[Bit::Lit(!e), Bit::Lit(x), Bit::Lit(!y)])?;
            add_clause(collector, &[Bit::Lit(e), Bit::Lit(x), Bit::Lit(y)])?;
            add_clause(collector, &[Bit::Lit(e), Bit::Lit(!x), Bit::Lit(!y)])?;
            Ok(Bit::Lit(e))
        }
    }
}

/// A literal (or constant) that is true iff both `a` and `b` are
fn bit_and<Col>(
    a: Bit,
    b: Bit,
    collector: &mut Col,
    var_manager: &mut dyn ManageVars,
) -> Result<Bit, OutOfMemory>
where
    Col: CollectClauses,
{
    match (a, b) {
        (Bit::Const(false), _) | (_, Bit::Const(false)) => Ok(Bit::Const(false)),
        (Bit::Const(true), other) | (other, Bit::Const(true)) => Ok(other),
        (Bit::Lit(x), Bit::Lit(y)) => {
            let c = var_manager.new_lit();
            add_clause(collector, &[Bit::Lit(!c), Bit::Lit(x)])?;
            add_clause(collector, &[Bit::Lit(!c), Bit::Lit(y)])?;
            add_clause(collector, &[Bit::Lit(c), Bit::Lit(!x), Bit::Lit(!y)])?;
            Ok(Bit::Lit(c))
        }
    }
}

/// Enforces `lhs == rhs`, guarded by the antecedent literals in `conds`
///
/// The shorter operand is padded with leading false bits. With an empty
/// `conds` the equality holds unconditionally; otherwise it is required
/// whenever all `conds` literals are true.
pub fn equals<Col>(
    conds: &[Lit],
    lhs: &BinaryNumber,
    rhs: &BinaryNumber,
    collector: &mut Col,
) -> Result<(), OutOfMemory>
where
    Col: CollectClauses,
{
    let width = lhs.width().max(rhs.width());
    let lhs = lhs.padded(width);
    let rhs = rhs.padded(width);
    let guard = guard(conds);
    let mut clause = Vec::with_capacity(guard.len() + 2);
    for (&a, &b) in lhs.bits().iter().zip(rhs.bits()) {
        clause.clear();
        clause.extend_from_slice(&guard);
        clause.extend_from_slice(&[!a, b]);
        add_clause(collector, &clause)?;
        clause.clear();
        clause.extend_from_slice(&guard);
        clause.extend_from_slice(&[a, !b]);
        add_clause(collector, &clause)?;
    }
    Ok(())
}

/// Enforces `lhs <= rhs`, guarded by the antecedent literals in `conds`
///
/// Built most-significant-bit first: while the prefixes are equal, each
/// position requires `lhs`'s bit to not exceed `rhs`'s. The prefix-equality
/// chain is defined with unguarded biconditional clauses and shared across
/// the positions; only the per-position assertions carry the guard. Works
/// with any mix of constant and symbolic bits.
pub fn less_or_equal<Col>(
    conds: &[Lit],
    lhs: &BinaryNumber,
    rhs: &BinaryNumber,
    collector: &mut Col,
    var_manager: &mut dyn ManageVars,
) -> Result<(), OutOfMemory>
where
    Col: CollectClauses,
{
    let width = lhs.width().max(rhs.width());
    let lhs = lhs.padded(width);
    let rhs = rhs.padded(width);
    let guard = guard(conds);
    let mut prefix_eq = Bit::Const(true);
    let mut clause = Vec::with_capacity(guard.len() + 3);
    for idx in 0..width {
        if idx > 0 {
            let eq = bit_equal(lhs.bits()[idx - 1], rhs.bits()[idx - 1], collector, var_manager)?;
            prefix_eq = bit_and(prefix_eq, eq, collector, var_manager)?;
        }
        clause.clear();
        clause.extend_from_slice(&guard);
        clause.extend_from_slice(&[!prefix_eq, !lhs.bits()[idx], rhs.bits()[idx]]);
        add_clause(collector, &clause)?;
    }
    Ok(())
}

/// Enforces that `lhs`'s true bit strictly precedes `rhs`'s
///
/// Both operands must be one-hot rows of the same length (enforced
/// elsewhere, typically by an exactly-one constraint); one clause per
/// position.
pub fn one_hot_less<Col>(lhs: &[Lit], rhs: &[Lit], collector: &mut Col) -> Result<(), OutOfMemory>
where
    Col: CollectClauses,
{
    debug_assert_eq!(lhs.len(), rhs.len());
    for (idx, &a) in lhs.iter().enumerate() {
        let mut clause = Clause::new();
        clause.add(!a);
        for &b in &rhs[idx + 1..] {
            clause.add(b);
        }
        collector.add_clause(clause)?;
    }
    Ok(())
}

/// Builds a literal slice for [`add_clause`] from literal expressions
macro_rules! bits {
    ($($lit:expr),+) => {
        [$(Bit::Lit($lit)),+]
    };
}

/// Encodes a one-bit full adder and returns its `(sum, carry)` bits
///
/// `sum = a XOR b XOR c_in`; `carry = (a AND b) OR (c_in AND (a XOR b))`.
/// Constant inputs fold: with no symbolic input the outputs are constants
/// and no clauses are emitted, with one symbolic input the outputs alias it,
/// and otherwise fresh output variables are defined in both directions.
pub fn full_adder<Col>(
    a: Bit,
    b: Bit,
    c_in: Bit,
    collector: &mut Col,
    var_manager: &mut dyn ManageVars,
) -> Result<(Bit, Bit), OutOfMemory>
where
    Col: CollectClauses,
{
    let mut lits = Vec::with_capacity(3);
    let mut ones = 0usize;
    for bit in [a, b, c_in] {
        match bit {
            Bit::Const(true) => ones += 1,
            Bit::Const(false) => (),
            Bit::Lit(l) => lits.push(l),
        }
    }
    match lits[..] {
        [] => Ok((Bit::Const(ones & 1 == 1), Bit::Const(ones >= 2))),
        [x] => Ok(match ones {
            0 => (Bit::Lit(x), Bit::Const(false)),
            1 => (Bit::Lit(!x), Bit::Lit(x)),
            _ => (Bit::Lit(x), Bit::Const(true)),
        }),
        [x, y] => {
            let s = var_manager.new_lit();
            let c = var_manager.new_lit();
            if ones == 0 {
                // half adder
                add_clause(collector, &bits![!x, y, s])?;
                add_clause(collector, &bits![x, !y, s])?;
                add_clause(collector, &bits![x, y, !s])?;
                add_clause(collector, &bits![!x, !y, !s])?;
                add_clause(collector, &bits![!x, !y, c])?;
                add_clause(collector, &bits![x, !c])?;
                add_clause(collector, &bits![y, !c])?;
            } else {
                // carry-in is set: the sum flips, the carry becomes an or
                add_clause(collector, &bits![!x, y, !s])?;
                add_clause(collector, &bits![x, !y, !s])?;
                add_clause(collector, &bits![x, y, s])?;
                add_clause(collector, &bits![!x, !y, s])?;
                add_clause(collector, &bits![!x, c])?;
                add_clause(collector, &bits![!y, c])?;
                add_clause(collector, &bits![x, y, !c])?;
            }
            Ok((Bit::Lit(s), Bit::Lit(c)))
        }
        [x, y, z] => {
            let s = var_manager.new_lit();
            let c = var_manager.new_lit();
            add_clause(collector, &bits![!x, !y, !z, s])?;
            add_clause(collector, &bits![!x, y, z, s])?;
            add_clause(collector, &bits![x, !y, z, s])?;
            add_clause(collector, &bits![x, y, !z, s])?;
            add_clause(collector, &bits![x, y, z, !s])?;
            add_clause(collector, &bits![x, !y, !z, !s])?;
            add_clause(collector, &bits![!x, y, !z, !s])?;
            add_clause(collector, &bits![!x, !y, z, !s])?;
            add_clause(collector, &bits![!y, !z, c])?;
            add_clause(collector, &bits![!x, !z, c])?;
            add_clause(collector, &bits![!x, !y, c])?;
            add_clause(collector, &bits![y, z, !c])?;
            add_clause(collector, &bits![x, z, !c])?;
            add_clause(collector, &bits![x, y, !c])?;
            Ok((Bit::Lit(s), Bit::Lit(c)))
        }
        _ => unreachable!(),
    }
}

/// Encodes `lhs + rhs` with a ripple-carry chain and returns the sum
///
/// Operands of unequal width are padded with leading false bits; the result
/// has the width of the wider operand. The carry out of the most significant
/// bit is forced false: the caller must size widths so that no sum it cares
/// about overflows, since only in-range non-negative sums occur in this
/// domain.
pub fn adder<Col>(
    lhs: &BinaryNumber,
    rhs: &BinaryNumber,
    collector: &mut Col,
    var_manager: &mut dyn ManageVars,
) -> Result<BinaryNumber, Error>
where
    Col: CollectClauses,
{
    let width = lhs.width().max(rhs.width());
    let lhs = lhs.padded(width);
    let rhs = rhs.padded(width);
    let mut carry = Bit::Const(false);
    let mut sum_rev = Vec::with_capacity(width);
    for idx in (0..width).rev() {
        let (sum, carry_out) =
            full_adder(lhs.bits()[idx], rhs.bits()[idx], carry, collector, var_manager)?;
        sum_rev.push(sum);
        carry = carry_out;
    }
    match carry {
        Bit::Const(false) => (),
        Bit::Const(true) => return Err(Error::SumOverflow { width }),
        Bit::Lit(l) => add_clause(collector, &[Bit::Lit(!l)])?,
    }
    sum_rev.reverse();
    Ok(BinaryNumber { bits: sum_rev })
}

/// Encodes the sum of all `terms` by sequential reduction
///
/// The intermediate adder outputs are the partial-sum variables; a single
/// term is returned as is.
pub fn sum<Col>(
    terms: &[BinaryNumber],
    collector: &mut Col,
    var_manager: &mut dyn ManageVars,
) -> Result<BinaryNumber, Error>
where
    Col: CollectClauses,
{
    let Some((first, rest)) = terms.split_first() else {
        return BinaryNumber::constant(0, 1);
    };
    rest.iter()
        .try_fold(first.clone(), |partial, term| {
            adder(&partial, term, collector, var_manager)
        })
}

/// Encodes the maximum of two numbers
///
/// A selector literal decides which operand propagates: if it is true the
/// left operand is no larger and the result equals the right one, and
/// symmetrically otherwise.
fn max_pair<Col>(
    lhs: &BinaryNumber,
    rhs: &BinaryNumber,
    collector: &mut Col,
    var_manager: &mut dyn ManageVars,
) -> Result<BinaryNumber, Error>
where
    Col: CollectClauses,
{
    let width = lhs.width().max(rhs.width());
    let lhs = lhs.padded(width);
    let rhs = rhs.padded(width);
    if let (Some(l), Some(r)) = (const_value(&lhs), const_value(&rhs)) {
        return BinaryNumber::constant(l.max(r), width);
    }
    let result = BinaryNumber::new(width, var_manager);
    let sel = var_manager.new_lit();
    less_or_equal(&[sel], &lhs, &rhs, collector, var_manager)?;
    less_or_equal(&[!sel], &rhs, &lhs, collector, var_manager)?;
    equals(&[sel], &rhs, &result, collector)?;
    equals(&[!sel], &lhs, &result, collector)?;
    Ok(result)
}

/// Encodes the maximum of all `terms` by tournament reduction
///
/// One fresh partial-maximum number per reduction step; a single term is
/// returned as is.
pub fn maximum<Col>(
    terms: &[BinaryNumber],
    collector: &mut Col,
    var_manager: &mut dyn ManageVars,
) -> Result<BinaryNumber, Error>
where
    Col: CollectClauses,
{
    let Some((first, rest)) = terms.split_first() else {
        return BinaryNumber::constant(0, 1);
    };
    rest.iter()
        .try_fold(first.clone(), |partial, term| {
            max_pair(&partial, term, collector, var_manager)
        })
}

/// The concrete value of a number with only constant bits
fn const_value(num: &BinaryNumber) -> Option<usize> {
    num.bits().iter().try_fold(0, |val, bit| match bit {
        Bit::Const(b) => Some(val << 1 | usize::from(*b)),
        Bit::Lit(_) => None,
    })
}

#[cfg(test)]
mod tests {
    use rustsat::{
        instances::{BasicVarManager, Cnf, ManageVars},
        solvers::{Solve, SolveIncremental, SolverResult},
        types::{Assignment, Lit},
    };
    use rustsat_cadical::CaDiCaL;

    use super::*;

    fn oracle_with(cnf: Cnf) -> CaDiCaL<'static, 'static> {
        let mut oracle = CaDiCaL::default();
        oracle.add_cnf(cnf).unwrap();
        oracle
    }

    /// Assumption literals forcing `num` to `val`
    fn fix(num: &BinaryNumber, val: usize) -> Vec<Lit> {
        let width = num.width();
        num.bits()
            .iter()
            .enumerate()
            .map(|(idx, &bit)| {
                let Bit::Lit(lit) = bit else {
                    panic!("cannot fix constant bit")
                };
                if val >> (width - 1 - idx) & 1 == 1 {
                    lit
                } else {
                    !lit
                }
            })
            .collect()
    }

    #[test]
    fn codec_roundtrip() {
        let empty = Assignment::default();
        for width in 1..=6 {
            for val in 0..1usize << width {
                let num = BinaryNumber::constant(val, width).unwrap();
                assert_eq!(num.width(), width);
                assert_eq!(num.value(&empty), val);
            }
        }
    }

    #[test]
    fn codec_overflow() {
        assert!(matches!(
            BinaryNumber::constant(4, 2),
            Err(Error::Overflow { value: 4, width: 2 })
        ));
        assert!(BinaryNumber::constant(3, 2).is_ok());
    }

    #[test]
    fn width_sizing() {
        assert_eq!(required_bits(0), 1);
        assert_eq!(required_bits(1), 1);
        assert_eq!(required_bits(2), 2);
        assert_eq!(required_bits(7), 3);
        assert_eq!(required_bits(8), 4);
    }

    #[test]
    fn adder_constants_fold() {
        const W: usize = 5;
        let mut vm = BasicVarManager::default();
        let empty = Assignment::default();
        for a in 0..1usize << W {
            for b in 0..1usize << W {
                let mut cnf = Cnf::new();
                let lhs = BinaryNumber::constant(a, W).unwrap();
                let rhs = BinaryNumber::constant(b, W).unwrap();
                let res = adder(&lhs, &rhs, &mut cnf, &mut vm);
                if a + b < 1 << W {
                    let sum = res.unwrap();
                    assert_eq!(sum.value(&empty), a + b);
                    assert_eq!(cnf.len(), 0);
                } else {
                    assert!(matches!(res, Err(Error::SumOverflow { width: W })));
                }
            }
        }
    }

    #[test]
    fn adder_symbolic() {
        const W: usize = 4;
        let mut vm = BasicVarManager::default();
        let mut cnf = Cnf::new();
        let lhs = BinaryNumber::new(W, &mut vm);
        let rhs = BinaryNumber::new(W, &mut vm);
        let sum = adder(&lhs, &rhs, &mut cnf, &mut vm).unwrap();
        let mut oracle = oracle_with(cnf);
        for a in 0..1usize << W {
            for b in 0..1usize << W {
                let mut assumps = fix(&lhs, a);
                assumps.extend(fix(&rhs, b));
                let res = oracle.solve_assumps(&assumps).unwrap();
                if a + b < 1 << W {
                    assert_eq!(res, SolverResult::Sat);
                    let sol = oracle.solution(vm.max_var().unwrap()).unwrap();
                    assert_eq!(sum.value(&sol), a + b);
                } else {
                    // the final carry is forced false
                    assert_eq!(res, SolverResult::Unsat);
                }
            }
        }
    }

    #[test]
    fn sum_of_vector() {
        const W: usize = 5;
        let mut vm = BasicVarManager::default();
        let mut cnf = Cnf::new();
        let terms: Vec<_> = (0..3).map(|_| BinaryNumber::new(W, &mut vm)).collect();
        let total = sum(&terms, &mut cnf, &mut vm).unwrap();
        let mut oracle = oracle_with(cnf);
        for a in 0..8usize {
            for b in 0..8usize {
                for c in 0..8usize {
                    let mut assumps = fix(&terms[0], a);
                    assumps.extend(fix(&terms[1], b));
                    assumps.extend(fix(&terms[2], c));
                    assert_eq!(
                        oracle.solve_assumps(&assumps).unwrap(),
                        SolverResult::Sat
                    );
                    let sol = oracle.solution(vm.max_var().unwrap()).unwrap();
                    assert_eq!(total.value(&sol), a + b + c);
                }
            }
        }
    }

    #[test]
    fn maximum_of_vector() {
        const W: usize = 3;
        let mut vm = BasicVarManager::default();
        let mut cnf = Cnf::new();
        let terms: Vec<_> = (0..3).map(|_| BinaryNumber::new(W, &mut vm)).collect();
        let max = maximum(&terms, &mut cnf, &mut vm).unwrap();
        let mut oracle = oracle_with(cnf);
        for a in 0..1usize << W {
            for b in 0..1usize << W {
                for c in 0..1usize << W {
                    let mut assumps = fix(&terms[0], a);
                    assumps.extend(fix(&terms[1], b));
                    assumps.extend(fix(&terms[2], c));
                    assert_eq!(
                        oracle.solve_assumps(&assumps).unwrap(),
                        SolverResult::Sat
                    );
                    let sol = oracle.solution(vm.max_var().unwrap()).unwrap();
                    assert_eq!(max.value(&sol), a.max(b).max(c));
                }
            }
        }
    }

    #[test]
    fn maximum_of_five() {
        const W: usize = 2;
        let mut vm = BasicVarManager::default();
        let mut cnf = Cnf::new();
        let terms: Vec<_> = (0..5).map(|_| BinaryNumber::new(W, &mut vm)).collect();
        let max = maximum(&terms, &mut cnf, &mut vm).unwrap();
        let mut oracle = oracle_with(cnf);
        for mut code in 0..(1usize << W).pow(5) {
            let mut vals = [0usize; 5];
            let mut assumps = vec![];
            for (term, val) in terms.iter().zip(&mut vals) {
                *val = code % (1 << W);
                code /= 1 << W;
                assumps.extend(fix(term, *val));
            }
            assert_eq!(oracle.solve_assumps(&assumps).unwrap(), SolverResult::Sat);
            let sol = oracle.solution(vm.max_var().unwrap()).unwrap();
            assert_eq!(max.value(&sol), vals.into_iter().max().unwrap());
        }
    }

    #[test]
    fn maximum_of_constants() {
        let empty = Assignment::default();
        let mut vm = BasicVarManager::default();
        let mut cnf = Cnf::new();
        let terms = [
            BinaryNumber::constant(3, 4).unwrap(),
            BinaryNumber::constant(11, 4).unwrap(),
            BinaryNumber::constant(7, 4).unwrap(),
        ];
        let max = maximum(&terms, &mut cnf, &mut vm).unwrap();
        assert_eq!(max.value(&empty), 11);
        assert_eq!(cnf.len(), 0);
    }

    #[test]
    fn compare_to_thresholds() {
        const W: usize = 4;
        let mut vm = BasicVarManager::default();
        let mut cnf = Cnf::new();
        let num = BinaryNumber::new(W, &mut vm);
        let acts: Vec<Lit> = (0..1usize << W)
            .map(|threshold| {
                let act = vm.new_lit();
                let bound = BinaryNumber::constant(threshold, W).unwrap();
                less_or_equal(&[act], &num, &bound, &mut cnf, &mut vm).unwrap();
                act
            })
            .collect();
        let mut oracle = oracle_with(cnf);
        for (threshold, &act) in acts.iter().enumerate() {
            for val in 0..1usize << W {
                let mut assumps = fix(&num, val);
                assumps.push(act);
                let expected = if val <= threshold {
                    SolverResult::Sat
                } else {
                    SolverResult::Unsat
                };
                assert_eq!(oracle.solve_assumps(&assumps).unwrap(), expected);
            }
        }
    }

    #[test]
    fn compare_symbolic() {
        const W: usize = 3;
        let mut vm = BasicVarManager::default();
        let mut cnf = Cnf::new();
        let lhs = BinaryNumber::new(W, &mut vm);
        let rhs = BinaryNumber::new(W, &mut vm);
        less_or_equal(&[], &lhs, &rhs, &mut cnf, &mut vm).unwrap();
        let mut oracle = oracle_with(cnf);
        for a in 0..1usize << W {
            for b in 0..1usize << W {
                let mut assumps = fix(&lhs, a);
                assumps.extend(fix(&rhs, b));
                let expected = if a <= b {
                    SolverResult::Sat
                } else {
                    SolverResult::Unsat
                };
                assert_eq!(oracle.solve_assumps(&assumps).unwrap(), expected);
            }
        }
    }

    #[test]
    fn equality_mixed_widths() {
        const W: usize = 4;
        let mut vm = BasicVarManager::default();
        let mut cnf = Cnf::new();
        let num = BinaryNumber::new(W, &mut vm);
        equals(
            &[],
            &num,
            &BinaryNumber::constant(5, 3).unwrap(),
            &mut cnf,
        )
        .unwrap();
        let mut oracle = oracle_with(cnf);
        for val in 0..1usize << W {
            let expected = if val == 5 {
                SolverResult::Sat
            } else {
                SolverResult::Unsat
            };
            assert_eq!(oracle.solve_assumps(&fix(&num, val)).unwrap(), expected);
        }
    }

    #[test]
    fn full_adder_truth_table() {
        let mut vm = BasicVarManager::default();
        let mut cnf = Cnf::new();
        let ins: Vec<Lit> = (0..3).map(|_| vm.new_lit()).collect();
        let (sum, carry) = full_adder(
            Bit::Lit(ins[0]),
            Bit::Lit(ins[1]),
            Bit::Lit(ins[2]),
            &mut cnf,
            &mut vm,
        )
        .unwrap();
        let mut oracle = oracle_with(cnf);
        for mask in 0..8usize {
            let assumps: Vec<Lit> = ins
                .iter()
                .enumerate()
                .map(|(idx, &l)| if mask >> idx & 1 == 1 { l } else { !l })
                .collect();
            assert_eq!(oracle.solve_assumps(&assumps).unwrap(), SolverResult::Sat);
            let sol = oracle.solution(vm.max_var().unwrap()).unwrap();
            let ones = mask.count_ones() as usize;
            assert_eq!(sum.value(&sol), ones & 1 == 1);
            assert_eq!(carry.value(&sol), ones >= 2);
        }
    }

    #[test]
    fn one_hot_ordering() {
        const N: usize = 4;
        let mut vm = BasicVarManager::default();
        let mut cnf = Cnf::new();
        let lhs: Vec<Lit> = (0..N).map(|_| vm.new_lit()).collect();
        let rhs: Vec<Lit> = (0..N).map(|_| vm.new_lit()).collect();
        one_hot_less(&lhs, &rhs, &mut cnf).unwrap();
        let mut oracle = oracle_with(cnf);
        for hot_l in 0..N {
            for hot_r in 0..N {
                let mut assumps: Vec<Lit> = lhs
                    .iter()
                    .enumerate()
                    .map(|(idx, &l)| if idx == hot_l { l } else { !l })
                    .collect();
                assumps.extend(
                    rhs.iter()
                        .enumerate()
                        .map(|(idx, &l)| if idx == hot_r { l } else { !l }),
                );
                let expected = if hot_l < hot_r {
                    SolverResult::Sat
                } else {
                    SolverResult::Unsat
                };
                assert_eq!(oracle.solve_assumps(&assumps).unwrap(), expected);
            }
        }
    }
}
