//! Physical address decomposition.
//!
//! Maps a flat physical address onto (channel, rank, bank, row, column)
//! coordinates by bit slicing. The low bits covering one full burst
//! (`jedec_data_bus_bits / 8 * bl` bytes) are discarded first; the remaining
//! fields are extracted low-to-high in the order the selected scheme names
//! them, least-significant field last in the scheme name.

use serde::Deserialize;

use crate::config::Config;

/// Field orderings for address decomposition.
///
/// Variant names list the fields from most-significant to least-significant
/// bits. `RowColRankBankChan` therefore places the channel bits lowest,
/// which interleaves consecutive bursts across channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum MappingScheme {
    #[serde(alias = "chan:rank:row:col:bank")]
    ChanRankRowColBank,

    #[serde(alias = "chan:rank:row:bank:col")]
    ChanRankRowBankCol,

    #[serde(alias = "chan:rank:col:bank:row")]
    ChanRankColBankRow,

    #[default]
    #[serde(alias = "row:col:rank:bank:chan")]
    RowColRankBankChan,

    #[serde(alias = "row:bank:rank:col:chan")]
    RowBankRankColChan,
}

/// A physical address decomposed into device coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedAddress {
    pub chan: usize,
    pub rank: usize,
    pub bank: usize,
    pub row: u64,
    pub col: u64,
}

/// Pure address-mapping function, fixed at init from the system profile.
#[derive(Debug, Clone)]
pub struct AddressMapping {
    scheme: MappingScheme,
    offset_bits: u32,
    chan_bits: u32,
    rank_bits: u32,
    bank_bits: u32,
    row_bits: u32,
    col_bits: u32,
}

fn log2(val: u64) -> u32 {
    val.trailing_zeros()
}

impl AddressMapping {
    /// Builds the mapping from validated configuration.
    ///
    /// All counts are guaranteed powers of two by `Config::validate`.
    pub fn new(cfg: &Config) -> Self {
        let bytes_per_transaction = cfg.system.jedec_data_bus_bits / 8 * cfg.device.bl;
        Self {
            scheme: cfg.system.address_mapping,
            offset_bits: log2(bytes_per_transaction),
            chan_bits: log2(cfg.system.num_chans),
            rank_bits: log2(cfg.system.num_ranks),
            bank_bits: log2(cfg.device.num_banks),
            row_bits: log2(cfg.device.num_rows),
            col_bits: log2(cfg.device.num_cols),
        }
    }

    /// Decomposes a physical address into (chan, rank, bank, row, col).
    pub fn map(&self, addr: u64) -> DecodedAddress {
        let mut bits = addr >> self.offset_bits;
        let mut take = |width: u32| -> u64 {
            let field = bits & ((1u64 << width) - 1);
            bits >>= width;
            field
        };

        let (chan, rank, bank, row, col);
        match self.scheme {
            MappingScheme::ChanRankRowColBank => {
                bank = take(self.bank_bits);
                col = take(self.col_bits);
                row = take(self.row_bits);
                rank = take(self.rank_bits);
                chan = take(self.chan_bits);
            }
            MappingScheme::ChanRankRowBankCol => {
                col = take(self.col_bits);
                bank = take(self.bank_bits);
                row = take(self.row_bits);
                rank = take(self.rank_bits);
                chan = take(self.chan_bits);
            }
            MappingScheme::ChanRankColBankRow => {
                row = take(self.row_bits);
                bank = take(self.bank_bits);
                col = take(self.col_bits);
                rank = take(self.rank_bits);
                chan = take(self.chan_bits);
            }
            MappingScheme::RowColRankBankChan => {
                chan = take(self.chan_bits);
                bank = take(self.bank_bits);
                rank = take(self.rank_bits);
                col = take(self.col_bits);
                row = take(self.row_bits);
            }
            MappingScheme::RowBankRankColChan => {
                chan = take(self.chan_bits);
                col = take(self.col_bits);
                rank = take(self.rank_bits);
                bank = take(self.bank_bits);
                row = take(self.row_bits);
            }
        }

        DecodedAddress {
            chan: chan as usize,
            rank: rank as usize,
            bank: bank as usize,
            row,
            col,
        }
    }
}
