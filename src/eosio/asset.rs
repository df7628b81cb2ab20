// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Token symbols and asset amounts (`1.0000 EOS`).

use std::fmt;
use std::str::FromStr;

use super::serializer::{BinaryReader, BinaryWriter, Pack, SerializerError, SerializerResult, Unpack};

const MAX_PRECISION: u8 = 18;
const MAX_CODE_LEN: usize = 7;

/// Up to seven uppercase letters packed little-endian into a `u64`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct SymbolCode(u64);

impl SymbolCode {
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl FromStr for SymbolCode {
    type Err = SerializerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() || s.len() > MAX_CODE_LEN || !s.bytes().all(|b| b.is_ascii_uppercase()) {
            return Err(SerializerError::InvalidValue(format!("invalid symbol code `{s}`")));
        }
        let value = s
            .bytes()
            .enumerate()
            .fold(0u64, |acc, (i, b)| acc | (u64::from(b) << (8 * i)));
        Ok(Self(value))
    }
}

impl fmt::Display for SymbolCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bytes: Vec<u8> = self
            .0
            .to_le_bytes()
            .into_iter()
            .take_while(|&b| b != 0)
            .collect();
        f.write_str(&String::from_utf8_lossy(&bytes))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Symbol {
    pub precision: u8,
    pub code: SymbolCode,
}

impl Symbol {
    /// Rejects a precision above 18, which no amount can be formatted with.
    pub fn from_raw(raw: u64) -> SerializerResult<Self> {
        let precision = (raw & 0xff) as u8;
        if precision > MAX_PRECISION {
            return Err(SerializerError::InvalidValue(format!(
                "symbol precision {precision} exceeds {MAX_PRECISION}"
            )));
        }
        Ok(Self {
            precision,
            code: SymbolCode(raw >> 8),
        })
    }

    pub fn raw(&self) -> u64 {
        u64::from(self.precision) | (self.code.0 << 8)
    }
}

impl FromStr for Symbol {
    type Err = SerializerError;

    /// Parses `4,EOS`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (precision, code) = s
            .split_once(',')
            .ok_or_else(|| SerializerError::InvalidValue(format!("invalid symbol `{s}`")))?;
        let precision: u8 = precision
            .trim()
            .parse()
            .map_err(|_| SerializerError::InvalidValue(format!("invalid precision in `{s}`")))?;
        if precision > MAX_PRECISION {
            return Err(SerializerError::InvalidValue(format!("precision too large in `{s}`")));
        }
        Ok(Self {
            precision,
            code: code.trim().parse()?,
        })
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.precision, self.code)
    }
}

impl Pack for Symbol {
    fn pack(&self, writer: &mut BinaryWriter) {
        writer.write_u64(self.raw());
    }
}

impl Unpack for Symbol {
    fn unpack(reader: &mut BinaryReader<'_>) -> SerializerResult<Self> {
        Self::from_raw(reader.read_u64()?)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Asset {
    pub amount: i64,
    pub symbol: Symbol,
}

impl FromStr for Asset {
    type Err = SerializerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || SerializerError::InvalidValue(format!("invalid asset `{s}`"));
        let (amount, code) = s.trim().split_once(' ').ok_or_else(invalid)?;
        let (negative, digits) = match amount.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, amount),
        };
        let (whole, fraction) = digits.split_once('.').unwrap_or((digits, ""));
        if whole.is_empty() || !whole.bytes().chain(fraction.bytes()).all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let precision = u8::try_from(fraction.len()).map_err(|_| invalid())?;
        if precision > MAX_PRECISION {
            return Err(invalid());
        }
        let magnitude: i64 = format!("{whole}{fraction}").parse().map_err(|_| invalid())?;
        Ok(Self {
            amount: if negative { -magnitude } else { magnitude },
            symbol: Symbol {
                precision,
                code: code.trim().parse()?,
            },
        })
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let precision = u32::from(self.symbol.precision);
        let sign = if self.amount < 0 { "-" } else { "" };
        let magnitude = self.amount.unsigned_abs();
        if precision == 0 {
            return write!(f, "{sign}{magnitude} {}", self.symbol.code);
        }
        let scale = 10u64.pow(precision);
        write!(
            f,
            "{sign}{}.{:0width$} {}",
            magnitude / scale,
            magnitude % scale,
            self.symbol.code,
            width = precision as usize
        )
    }
}

impl Pack for Asset {
    fn pack(&self, writer: &mut BinaryWriter) {
        writer.write_i64(self.amount);
        self.symbol.pack(writer);
    }
}

impl Unpack for Asset {
    fn unpack(reader: &mut BinaryReader<'_>) -> SerializerResult<Self> {
        Ok(Self {
            amount: reader.read_i64()?,
            symbol: Symbol::unpack(reader)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn asset_string_forms() {
        for s in ["1.0000 EOS", "-0.5000 EOS", "42 NFT", "0.00000001 BTC"] {
            let asset: Asset = s.parse().unwrap();
            assert_eq!(asset.to_string(), s);
        }
    }

    #[test]
    fn asset_binary_layout() {
        let asset: Asset = "1.0000 EOS".parse().unwrap();
        assert_eq!(asset.amount, 10_000);
        assert_eq!(
            asset.pack_to_vec(),
            vec![0x10, 0x27, 0, 0, 0, 0, 0, 0, 4, b'E', b'O', b'S', 0, 0, 0, 0]
        );
    }

    #[test]
    fn symbol_parsing() {
        let symbol: Symbol = "4,EOS".parse().unwrap();
        assert_eq!(symbol.precision, 4);
        assert_eq!(symbol.code.to_string(), "EOS");
        assert_eq!(Symbol::from_raw(symbol.raw()).unwrap(), symbol);
        assert!("4,eos".parse::<Symbol>().is_err());
        assert!("EOS".parse::<Symbol>().is_err());
    }

    #[test]
    fn oversized_wire_precision_is_rejected() {
        for precision in [19u8, 20, 64, 255] {
            let mut bytes = "1.0000 EOS".parse::<Asset>().unwrap().pack_to_vec();
            bytes[8] = precision;
            let err = Asset::unpack(&mut BinaryReader::new(&bytes)).unwrap_err();
            assert!(matches!(err, SerializerError::InvalidValue(_)), "{precision}: {err:?}");
        }

        let mut bytes = "1.000000000000000000 EOS".parse::<Asset>().unwrap().pack_to_vec();
        assert_eq!(bytes[8], 18);
        let asset = Asset::unpack(&mut BinaryReader::new(&bytes)).unwrap();
        assert_eq!(asset.to_string(), "1.000000000000000000 EOS");
        bytes[8] = 19;
        assert!(Asset::unpack(&mut BinaryReader::new(&bytes)).is_err());
    }

    #[test]
    fn rejects_malformed_assets() {
        assert!("1.0000".parse::<Asset>().is_err());
        assert!("abc EOS".parse::<Asset>().is_err());
        assert!("1.0 TOOLONGCODE".parse::<Asset>().is_err());
    }
}
