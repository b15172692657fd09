//! # Width-Generic ALU
//!
//! Flag arithmetic shared by every CPU in the crate. The rules are identical for the
//! 4-bit, 8-bit and 16-bit machines; only the register width changes:
//!
//! - **Zero**: truncated result is zero
//! - **Sign**: most-significant bit of the truncated result
//! - **Carry**: unwidened sum exceeds the maximum (add), or minuend < subtrahend (sub)
//! - **Overflow**: operand signs agree with each other but not with the result
//!
//! Results carry `Option<bool>` for Carry and Overflow: `None` means "leave the flag
//! untouched", which is how INC/DEC preserve Carry and how shifts leave Overflow alone.

/// Register width of an ALU operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Width {
    /// 4-bit
    Nibble,
    /// 8-bit
    Byte,
    /// 16-bit
    Word,
}

impl Width {
    /// Number of bits in the width.
    pub const fn bits(self) -> u32 {
        match self {
            Width::Nibble => 4,
            Width::Byte => 8,
            Width::Word => 16,
        }
    }

    /// Largest representable unsigned value.
    pub const fn mask(self) -> u32 {
        (1 << self.bits()) - 1
    }

    /// The sign (most-significant) bit.
    pub const fn sign_bit(self) -> u32 {
        1 << (self.bits() - 1)
    }
}

/// Result of an ALU operation plus the flag updates it implies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AluResult {
    /// Truncated result
    pub value: u32,
    /// Zero flag
    pub zero: bool,
    /// Sign flag
    pub sign: bool,
    /// New Carry flag, or `None` to preserve the current one
    pub carry: Option<bool>,
    /// New Overflow flag, or `None` to preserve the current one
    pub overflow: Option<bool>,
}

impl AluResult {
    /// Zero/Sign from `value`; Carry and Overflow untouched.
    pub fn flags_only(width: Width, value: u32) -> Self {
        let value = value & width.mask();
        Self {
            value,
            zero: value == 0,
            sign: value & width.sign_bit() != 0,
            carry: None,
            overflow: None,
        }
    }

    /// Zero/Sign from `value` with an explicit Carry (shift and rotate results).
    pub fn shifted(width: Width, value: u32, carry: bool) -> Self {
        Self {
            carry: Some(carry),
            ..Self::flags_only(width, value)
        }
    }
}

/// Adds `a + b + carry_in`.
///
/// # Examples
///
/// ```
/// use libmicro::alu::{add, Width};
///
/// let r = add(Width::Byte, 0x7F, 0x01, false);
/// assert_eq!(r.value, 0x80);
/// assert_eq!(r.overflow, Some(true));
/// assert_eq!(r.carry, Some(false));
/// ```
pub fn add(width: Width, a: u32, b: u32, carry_in: bool) -> AluResult {
    let a = a & width.mask();
    let b = b & width.mask();
    let sum = a + b + carry_in as u32;
    let value = sum & width.mask();

    AluResult {
        // Carry: unwidened sum exceeds the register maximum
        carry: Some(sum > width.mask()),
        // Overflow: both operands differ in sign from the result
        overflow: Some((a ^ value) & (b ^ value) & width.sign_bit() != 0),
        ..AluResult::flags_only(width, value)
    }
}

/// Subtracts `a - b - borrow_in`.
pub fn sub(width: Width, a: u32, b: u32, borrow_in: bool) -> AluResult {
    let a = a & width.mask();
    let b = b & width.mask();
    let subtrahend = b + borrow_in as u32;
    let value = a.wrapping_sub(subtrahend) & width.mask();

    AluResult {
        // Carry doubles as borrow
        carry: Some(a < subtrahend),
        // Overflow: operands differ in sign and the result took the subtrahend's sign
        overflow: Some((a ^ b) & (a ^ value) & width.sign_bit() != 0),
        ..AluResult::flags_only(width, value)
    }
}

/// Result of AND/OR/XOR/NOT/TEST: Carry and Overflow cleared.
pub fn logic(width: Width, value: u32) -> AluResult {
    AluResult {
        carry: Some(false),
        overflow: Some(false),
        ..AluResult::flags_only(width, value)
    }
}

/// Increment by one, preserving Carry.
pub fn inc(width: Width, a: u32) -> AluResult {
    AluResult {
        carry: None,
        ..add(width, a, 1, false)
    }
}

/// Decrement by one, preserving Carry.
pub fn dec(width: Width, a: u32) -> AluResult {
    AluResult {
        carry: None,
        ..sub(width, a, 1, false)
    }
}

/// Even parity of the low byte: true when the number of set bits is even.
pub fn parity_even(value: u32) -> bool {
    (value & 0xFF).count_ones() % 2 == 0
}
