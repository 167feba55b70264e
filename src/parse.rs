use crate::error::ValueError;

// 64-bit polynomial rolling hash. the seed and multiplier are the FNV offset basis and prime,
// which spread short keys far enough apart that the usual `h * 31 + b` collisions ("Aa" vs "BB")
// can't happen.
const HASH_SEED: u64 = 0xcbf2_9ce4_8422_2325;
const HASH_MULTIPLIER: u64 = 0x0000_0100_0000_01b3;

/// Fingerprint of a key, used as the fast index into an aggregation table.
#[inline]
pub fn fingerprint(key: &[u8]) -> u64 {
    key.iter().fold(HASH_SEED, |h, &b| {
        h.wrapping_mul(HASH_MULTIPLIER).wrapping_add(b as u64)
    })
}

/// Drops the line terminator, `\n` or `\r\n`, if there is one.
#[inline]
pub fn strip_terminator(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

/// Splits `key;value` on the first `;`. `None` means the record has no delimiter.
#[inline]
pub fn split_record(line: &[u8]) -> Option<(&[u8], &[u8])> {
    let sep_pos = line.iter().position(|c| *c == b';')?;
    Some((&line[..sep_pos], &line[sep_pos + 1..]))
}

/// Decodes a value of the shape `-?[0-9]+(\.[0-9]+)?` without going through `str::parse`.
///
/// The integer and fractional digits are accumulated separately and combined at the end, so
/// `12.3` is computed as `12 + 3 / 10`. Anything outside the grammar (exponents, a leading `+`,
/// stray bytes, a dangling `.`) is rejected.
pub fn read_value(s: &[u8]) -> Result<f64, ValueError> {
    let (negative, digits, offset) = match s {
        [b'-', rest @ ..] => (true, rest, 1),
        _ => (false, s, 0),
    };
    if digits.is_empty() {
        return Err(ValueError::Empty);
    }

    let mut int_part = 0u64;
    let mut i = 0;
    while i < digits.len() && digits[i] != b'.' {
        int_part = push_digit(int_part, digits[i], offset + i)?;
        i += 1;
    }
    if i == 0 {
        // no integer digits, e.g. ".5"
        return Err(ValueError::InvalidByte {
            byte: b'.',
            pos: offset,
        });
    }

    let mut value = int_part as f64;
    if i < digits.len() {
        let frac = &digits[i + 1..];
        if frac.is_empty() {
            return Err(ValueError::InvalidByte {
                byte: b'.',
                pos: offset + i,
            });
        }
        let mut frac_part = 0u64;
        let mut divisor = 1f64;
        for (j, &b) in frac.iter().enumerate() {
            frac_part = push_digit(frac_part, b, offset + i + 1 + j)?;
            divisor *= 10.;
        }
        value += frac_part as f64 / divisor;
    }

    Ok(if negative { -value } else { value })
}

#[inline]
fn push_digit(acc: u64, byte: u8, pos: usize) -> Result<u64, ValueError> {
    if !byte.is_ascii_digit() {
        return Err(ValueError::InvalidByte { byte, pos });
    }
    acc.checked_mul(10)
        .and_then(|v| v.checked_add((byte - b'0') as u64))
        .ok_or(ValueError::Overflow)
}
