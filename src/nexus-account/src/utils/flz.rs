//! FastLZ (level 1) codec compatible with Solady's `LibZip.flzDecompress`.
//!
//! Stream format, one instruction at a time:
//! - `c < 0x20`: literal run, copy the next `c + 1` bytes.
//! - otherwise `t = c >> 5` is a back-reference: length `t + 2` (or `9 + next byte` when
//!   `t == 7`), distance `((c & 0x1f) << 8 | next byte) + 1`.
//!
//! The compressor is a greedy single-pass matcher. Its output is not byte-identical to
//! Solady's `flzCompress`, but any conforming decompressor reproduces the input.

use crate::errors::DecodeError;

const MIN_MATCH: usize = 3;
const MAX_MATCH: usize = 264;
const MAX_DISTANCE: usize = 8192;
const MAX_LITERAL_RUN: usize = 32;
const HASH_BITS: u32 = 13;

fn hash3(bytes: &[u8]) -> usize {
    let v = u32::from(bytes[0]) | (u32::from(bytes[1]) << 8) | (u32::from(bytes[2]) << 16);
    (v.wrapping_mul(2_654_435_769) >> (32 - HASH_BITS)) as usize
}

fn flush_literals(out: &mut Vec<u8>, literals: &[u8]) {
    for chunk in literals.chunks(MAX_LITERAL_RUN) {
        out.push((chunk.len() - 1) as u8);
        out.extend_from_slice(chunk);
    }
}

fn emit_match(out: &mut Vec<u8>, len: usize, distance: usize) {
    let off = distance - 1;
    let hi = (off >> 8) as u8;
    let lo = (off & 0xff) as u8;
    if len - 2 < 7 {
        out.push((((len - 2) as u8) << 5) | hi);
        out.push(lo);
    } else {
        out.push((7 << 5) | hi);
        out.push((len - 9) as u8);
        out.push(lo);
    }
}

pub fn flz_compress(input: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(input.len() + input.len() / 32 + 1);
    let mut table = vec![usize::MAX; 1 << HASH_BITS];
    let mut anchor = 0usize;
    let mut i = 0usize;

    while i + MIN_MATCH <= input.len() {
        let h = hash3(&input[i..]);
        let candidate = table[h];
        table[h] = i;

        if candidate != usize::MAX
            && i - candidate <= MAX_DISTANCE
            && input[candidate..candidate + MIN_MATCH] == input[i..i + MIN_MATCH]
        {
            let mut len = MIN_MATCH;
            while len < MAX_MATCH && i + len < input.len() && input[candidate + len] == input[i + len] {
                len += 1;
            }
            flush_literals(&mut out, &input[anchor..i]);
            emit_match(&mut out, len, i - candidate);
            i += len;
            anchor = i;
        } else {
            i += 1;
        }
    }

    flush_literals(&mut out, &input[anchor..]);
    out
}

pub fn flz_decompress(input: &[u8]) -> Result<Vec<u8>, DecodeError> {
    let mut out: Vec<u8> = Vec::with_capacity(input.len() * 2);
    let mut i = 0usize;

    while i < input.len() {
        let c = input[i];
        let t = c >> 5;

        if t == 0 {
            let run = usize::from(c) + 1;
            let literal = input.get(i + 1..i + 1 + run).ok_or(DecodeError::InvalidCompression)?;
            out.extend_from_slice(literal);
            i += 1 + run;
            continue;
        }

        let (len, lo, step) = if t == 7 {
            let extra = *input.get(i + 1).ok_or(DecodeError::InvalidCompression)?;
            let lo = *input.get(i + 2).ok_or(DecodeError::InvalidCompression)?;
            (9 + usize::from(extra), lo, 3)
        } else {
            let lo = *input.get(i + 1).ok_or(DecodeError::InvalidCompression)?;
            (usize::from(t) + 2, lo, 2)
        };
        let distance = ((usize::from(c & 0x1f) << 8) | usize::from(lo)) + 1;
        if distance > out.len() {
            return Err(DecodeError::InvalidCompression);
        }

        // Overlapping copies are byte-by-byte.
        let start = out.len() - distance;
        for k in 0..len {
            let b = out[start + k];
            out.push(b);
        }
        i += step;
    }

    Ok(out)
}
