//! Value types moving through the memory system.
//!
//! A `Transaction` is a request as the CPU sees it (address + direction).
//! A `BusPacket` is a JEDEC command or a data burst as the command/data
//! buses see it. The controller decomposes each admitted transaction into
//! an (ACTIVATE, column command) pair of bus packets.

use std::fmt;

use crate::common::addr::DecodedAddress;
use crate::config::RowBufferPolicy;

/// Direction of a memory request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionKind {
    Read,
    Write,
    /// Read data travelling back to the caller.
    ReturnData,
}

/// An in-flight memory request owned by the controller.
#[derive(Debug, Clone)]
pub struct Transaction {
    pub kind: TransactionKind,
    pub addr: u64,
    pub data: u64,
    /// Cycle the transaction entered the transaction queue.
    pub time_added: u64,
    /// Cycle the bank was activated for this request, or the cycle of the
    /// column command when the request hit an already-open row.
    pub time_act_issued: Option<u64>,
}

impl Transaction {
    pub fn new(kind: TransactionKind, addr: u64, data: u64) -> Self {
        Self {
            kind,
            addr,
            data,
            time_added: 0,
            time_act_issued: None,
        }
    }

    /// The column command this transaction decomposes into under the given
    /// row-buffer policy.
    pub fn column_command(&self, policy: RowBufferPolicy) -> CommandKind {
        match (self.kind, policy) {
            (TransactionKind::Read, RowBufferPolicy::OpenPage) => CommandKind::Read,
            (TransactionKind::Read, RowBufferPolicy::ClosePage) => CommandKind::ReadP,
            (TransactionKind::Write, RowBufferPolicy::OpenPage) => CommandKind::Write,
            (TransactionKind::Write, RowBufferPolicy::ClosePage) => CommandKind::WriteP,
            (TransactionKind::ReturnData, _) => CommandKind::Data,
        }
    }
}

/// Kinds of packets carried by the command and data buses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    Activate,
    Read,
    ReadP,
    Write,
    WriteP,
    Precharge,
    Refresh,
    /// A burst on the data bus (either direction).
    Data,
}

impl CommandKind {
    pub fn is_read(self) -> bool {
        matches!(self, CommandKind::Read | CommandKind::ReadP)
    }

    pub fn is_write(self) -> bool {
        matches!(self, CommandKind::Write | CommandKind::WriteP)
    }

    /// READ, READ_P, WRITE, or WRITE_P.
    pub fn is_column(self) -> bool {
        self.is_read() || self.is_write()
    }

    pub fn name(self) -> &'static str {
        match self {
            CommandKind::Activate => "ACTIVATE",
            CommandKind::Read => "READ",
            CommandKind::ReadP => "READ_P",
            CommandKind::Write => "WRITE",
            CommandKind::WriteP => "WRITE_P",
            CommandKind::Precharge => "PRECHARGE",
            CommandKind::Refresh => "REFRESH",
            CommandKind::Data => "DATA",
        }
    }
}

/// One command or data burst on a modeled bus.
///
/// Immutable after creation; owned by whichever queue currently holds it
/// and dropped once consumed on the far side of the bus.
#[derive(Debug, Clone)]
pub struct BusPacket {
    pub kind: CommandKind,
    pub addr: u64,
    pub row: u64,
    pub col: u64,
    pub rank: usize,
    pub bank: usize,
    pub data: u64,
    /// Arrival order stamp, assigned by the command queue at enqueue.
    pub(crate) seq: u64,
}

impl BusPacket {
    pub fn new(kind: CommandKind, addr: u64, decoded: &DecodedAddress, data: u64) -> Self {
        Self {
            kind,
            addr,
            row: decoded.row,
            col: decoded.col,
            rank: decoded.rank,
            bank: decoded.bank,
            data,
            seq: 0,
        }
    }

    /// The data-bus twin of a WRITE/WRITE_P command.
    pub fn data_twin(&self) -> Self {
        Self {
            kind: CommandKind::Data,
            seq: 0,
            ..self.clone()
        }
    }
}

impl fmt::Display for BusPacket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} addr={:#x} rank={} bank={} row={:#x} col={:#x}",
            self.kind.name(),
            self.addr,
            self.rank,
            self.bank,
            self.row,
            self.col
        )
    }
}
