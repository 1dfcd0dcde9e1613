//! Evaluation weight storage and loading.
//!
//! The weight blob is opaque to the search: a magic tag, a format version,
//! a phase count, then per phase one signed 16-bit table per pattern shape
//! followed by the two parity weights. Values are in scaled-score units
//! (1/256 disc). Files may be zstd-compressed.

use std::fmt;
use std::fs;
use std::io::{self, Read};
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt};

use crate::eval::pattern::{N_SHAPES, PATTERNS, SHAPE_TABLE_SIZES};
use crate::eval::pattern_feature::PatternFeature;

/// `EDAX` in little-endian byte order.
pub const WEIGHTS_MAGIC: u32 = u32::from_le_bytes(*b"EDAX");

/// Current weight-file format version.
pub const WEIGHTS_VERSION: u16 = 1;

/// Game phases: two plies each.
pub const N_PHASES: usize = 30;

/// zstd frame magic, for transparent decompression.
const ZSTD_MAGIC: [u8; 4] = [0x28, 0xB5, 0x2F, 0xFD];

/// Pattern weight tables for all phases.
pub struct Weights {
    /// `tables[phase * N_SHAPES + shape]`, each `3^shape_size` entries.
    tables: Vec<Box<[i16]>>,
    /// Per phase: weight added for even/odd empty count.
    parity: Vec<[i16; 2]>,
}

impl Weights {
    /// All-zero weights: the evaluation degenerates to 0 everywhere, which
    /// keeps exact endgame solving correct and is the fallback when no
    /// weight file is supplied.
    pub fn zero() -> Weights {
        let mut tables = Vec::with_capacity(N_PHASES * N_SHAPES);
        for _ in 0..N_PHASES {
            for shape in 0..N_SHAPES {
                tables.push(vec![0i16; SHAPE_TABLE_SIZES[shape]].into_boxed_slice());
            }
        }
        Weights {
            tables,
            parity: vec![[0; 2]; N_PHASES],
        }
    }

    /// Loads weights from a file, decompressing zstd frames transparently.
    pub fn from_file(path: &Path) -> Result<Weights, WeightsError> {
        let raw = fs::read(path)?;
        let data = if raw.len() >= 4 && raw[..4] == ZSTD_MAGIC {
            zstd::decode_all(&raw[..])?
        } else {
            raw
        };
        Self::from_bytes(&data)
    }

    /// Parses an uncompressed weight blob.
    pub fn from_bytes(data: &[u8]) -> Result<Weights, WeightsError> {
        let expected = Self::expected_len();
        if data.len() != expected {
            // The header is validated first so a wrong file reports the
            // most specific error.
            if data.len() < 8 {
                return Err(WeightsError::SizeMismatch {
                    expected,
                    actual: data.len(),
                });
            }
        }

        let mut r = data;
        let magic = r.read_u32::<LittleEndian>()?;
        if magic != WEIGHTS_MAGIC {
            return Err(WeightsError::BadMagic { magic });
        }
        let version = r.read_u16::<LittleEndian>()?;
        if version != WEIGHTS_VERSION {
            return Err(WeightsError::BadVersion { version });
        }
        let n_phases = r.read_u16::<LittleEndian>()? as usize;
        if n_phases != N_PHASES {
            return Err(WeightsError::BadPhaseCount { n_phases });
        }
        if data.len() != expected {
            return Err(WeightsError::SizeMismatch {
                expected,
                actual: data.len(),
            });
        }

        let mut tables = Vec::with_capacity(N_PHASES * N_SHAPES);
        let mut parity = Vec::with_capacity(N_PHASES);
        for _ in 0..N_PHASES {
            for shape in 0..N_SHAPES {
                let mut table = vec![0i16; SHAPE_TABLE_SIZES[shape]];
                r.read_i16_into::<LittleEndian>(&mut table)?;
                tables.push(table.into_boxed_slice());
            }
            let even = r.read_i16::<LittleEndian>()?;
            let odd = r.read_i16::<LittleEndian>()?;
            parity.push([even, odd]);
        }

        Ok(Weights { tables, parity })
    }

    /// Exact byte length of a valid uncompressed blob.
    pub fn expected_len() -> usize {
        let per_phase: usize = SHAPE_TABLE_SIZES.iter().sum::<usize>() * 2 + 4;
        8 + N_PHASES * per_phase
    }

    /// Sums the weights selected by `feature` for the given phase, plus
    /// the parity term. Raw scaled-score units.
    #[inline]
    pub fn score(&self, phase: usize, feature: &PatternFeature, n_empties: u32) -> i32 {
        let phase = phase.min(N_PHASES - 1);
        let base = phase * N_SHAPES;
        let mut sum: i32 = 0;
        for (f, pattern) in PATTERNS.iter().enumerate() {
            let table = crate::uget!(self.tables; base + pattern.shape as usize);
            sum += *crate::uget!(table; feature.indices[f] as usize) as i32;
        }
        sum + self.parity[phase][(n_empties & 1) as usize] as i32
    }
}

/// Error raised when an evaluation blob fails validation.
#[derive(Debug)]
pub enum WeightsError {
    Io(io::Error),
    BadMagic { magic: u32 },
    BadVersion { version: u16 },
    BadPhaseCount { n_phases: usize },
    SizeMismatch { expected: usize, actual: usize },
}

impl fmt::Display for WeightsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WeightsError::Io(err) => write!(f, "weights i/o error: {err}"),
            WeightsError::BadMagic { magic } => {
                write!(f, "weights file has wrong magic {magic:#010x}")
            }
            WeightsError::BadVersion { version } => {
                write!(f, "unsupported weights version {version}")
            }
            WeightsError::BadPhaseCount { n_phases } => {
                write!(f, "weights file has {n_phases} phases, expected {N_PHASES}")
            }
            WeightsError::SizeMismatch { expected, actual } => {
                write!(f, "weights file is {actual} bytes, expected {expected}")
            }
        }
    }
}

impl std::error::Error for WeightsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            WeightsError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for WeightsError {
    fn from(err: io::Error) -> Self {
        WeightsError::Io(err)
    }
}
