use std::io::{
    Cursor,
    Write,
};

use byteorder::{
    NetworkEndian,
    ReadBytesExt,
    WriteBytesExt,
};

use {
    Error,
    Result,
};
use core::repr::{
    eth_types,
    EthernetAddress,
    Ipv4Address,
};

/// https://www.iana.org/assignments/arp-parameters/arp-parameters.xhtml#arp-parameters-2
pub mod hw_types {
    pub const ETHERNET: u16 = 0x0001;
}

/// ARP operation.
///
/// Opcodes other than REQUEST and REPLY are carried verbatim; the receive
/// path decides what to do with them.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Op {
    Request,
    Reply,
    Unknown(u16),
}

impl Op {
    /// Creates an operation from the on-wire opcode.
    pub fn from_op_code(op_code: u16) -> Op {
        match op_code {
            1 => Op::Request,
            2 => Op::Reply,
            i => Op::Unknown(i),
        }
    }

    /// Returns the on-wire opcode.
    pub fn op_code(&self) -> u16 {
        match *self {
            Op::Request => 1,
            Op::Reply => 2,
            Op::Unknown(i) => i,
        }
    }
}

/// An ARP message for IPv4 over Ethernet.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Arp {
    pub op: Op,
    pub source_hw_addr: EthernetAddress,
    pub source_proto_addr: Ipv4Address,
    pub target_hw_addr: EthernetAddress,
    pub target_proto_addr: Ipv4Address,
}

impl Arp {
    /// Returns the buffer size needed to serialize the ARP message.
    pub fn buffer_len(&self) -> usize {
        // 8 for header + 20 for addresses.
        28
    }

    /// Tries to deserialize a buffer into an ARP message.
    ///
    /// Octets past the first 28 are ignored. Fails with `Malformed` if the
    /// buffer is shorter than a full message or any of the hardware type,
    /// protocol type, or address length fields does not describe IPv4 over
    /// Ethernet.
    pub fn deserialize(buffer: &[u8]) -> Result<Arp> {
        if buffer.len() < 28 {
            return Err(Error::Malformed);
        }

        let hw_type = (&buffer[0 .. 2]).read_u16::<NetworkEndian>().unwrap();
        let proto_type = (&buffer[2 .. 4]).read_u16::<NetworkEndian>().unwrap();
        let hw_addr_len = buffer[4];
        let proto_addr_len = buffer[5];
        let op_code = (&buffer[6 .. 8]).read_u16::<NetworkEndian>().unwrap();

        if hw_type != hw_types::ETHERNET || proto_type != eth_types::IPV4 || hw_addr_len != 6
            || proto_addr_len != 4
        {
            return Err(Error::Malformed);
        }

        Ok(Arp {
            op: Op::from_op_code(op_code),
            source_hw_addr: EthernetAddress::try_new(&buffer[8 .. 14]).unwrap(),
            source_proto_addr: Ipv4Address::try_new(&buffer[14 .. 18]).unwrap(),
            target_hw_addr: EthernetAddress::try_new(&buffer[18 .. 24]).unwrap(),
            target_proto_addr: Ipv4Address::try_new(&buffer[24 .. 28]).unwrap(),
        })
    }

    /// Serializes the ARP message into a buffer.
    pub fn serialize(&self, buffer: &mut [u8]) -> Result<()> {
        if self.buffer_len() > buffer.len() {
            return Err(Error::Exhausted);
        }

        let mut writer = Cursor::new(buffer);
        writer
            .write_u16::<NetworkEndian>(hw_types::ETHERNET)
            .unwrap();
        writer.write_u16::<NetworkEndian>(eth_types::IPV4).unwrap();
        writer.write_u8(6).unwrap();
        writer.write_u8(4).unwrap();
        writer
            .write_u16::<NetworkEndian>(self.op.op_code())
            .unwrap();
        writer.write(self.source_hw_addr.as_bytes()).unwrap();
        writer.write(self.source_proto_addr.as_bytes()).unwrap();
        writer.write(self.target_hw_addr.as_bytes()).unwrap();
        writer.write(self.target_proto_addr.as_bytes()).unwrap();

        Ok(())
    }
}
